// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Execution knobs and per-call flags.

/// Upper bound on worker threads picked by [`SamplerConfig::default`].
pub const DEFAULT_MAX_WORKERS: usize = 64;

/// Default number of frontier entries per work unit.
pub const DEFAULT_CHUNK_SIZE: usize = 256;

/// How a sampler spreads a hop across threads.
///
/// Neither knob affects the sampled output, only how fast it is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SamplerConfig {
    /// Worker threads per hop; `1` runs serially.
    pub workers: usize,
    /// Frontier entries per work unit.
    pub chunk_size: usize,
}

impl SamplerConfig {
    /// Serial execution with the default chunk size.
    pub fn serial() -> Self {
        Self {
            workers: 1,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Replaces the worker count (clamped to at least 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Replaces the chunk size (clamped to at least 1).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}

impl Default for SamplerConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism()
            .map_or(1, std::num::NonZeroUsize::get)
            .min(DEFAULT_MAX_WORKERS);
        Self {
            workers,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Per-call behavior switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleFlags {
    /// Emit the hop index of every row.
    pub return_hops: bool,
    /// Draw with replacement.
    pub with_replacement: bool,
    /// Expand each `(label, vertex)` at most once per hop.
    pub dedupe_sources: bool,
}
