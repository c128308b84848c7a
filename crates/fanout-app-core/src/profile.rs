// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted sampling profiles.
//!
//! A profile bundles the execution knobs ([`SamplerConfig`]), the per-call
//! flags ([`SampleFlags`]) and the RNG seed, so a tool can reproduce a
//! sampling run from a stored JSON document:
//!
//! ```json
//! {
//!   "workers": 0,
//!   "chunk_size": 256,
//!   "return_hops": true,
//!   "with_replacement": false,
//!   "dedupe_sources": false,
//!   "seed": 42
//! }
//! ```
//!
//! Missing fields take their defaults; unknown fields are rejected.

use fanout_core::{RngState, SampleFlags, SamplerConfig, DEFAULT_CHUNK_SIZE};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ConfigService, ConfigStore};

/// Key under which the default profile is stored.
pub const DEFAULT_PROFILE: &str = "sampling";

/// Upper bound accepted for an explicit worker count.
pub const MAX_PROFILE_WORKERS: usize = 1024;

/// Stored sampler settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SamplingProfile {
    /// Worker threads per hop; `0` picks the machine default.
    pub workers: usize,
    /// Frontier entries per work unit.
    pub chunk_size: usize,
    /// Emit the hop index of every row.
    pub return_hops: bool,
    /// Draw with replacement.
    pub with_replacement: bool,
    /// Expand each `(label, vertex)` at most once per hop.
    pub dedupe_sources: bool,
    /// Seed of the RNG stream.
    pub seed: u64,
}

impl Default for SamplingProfile {
    fn default() -> Self {
        Self {
            workers: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            return_hops: false,
            with_replacement: false,
            dedupe_sources: false,
            seed: 0,
        }
    }
}

impl SamplingProfile {
    /// Checks the knobs are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::Invalid("chunk_size must be at least 1".into()));
        }
        if self.workers > MAX_PROFILE_WORKERS {
            return Err(ConfigError::Invalid(format!(
                "workers must be at most {MAX_PROFILE_WORKERS}, got {}",
                self.workers
            )));
        }
        Ok(())
    }

    /// Execution knobs described by this profile.
    pub fn sampler_config(&self) -> SamplerConfig {
        let base = if self.workers == 0 {
            SamplerConfig::default()
        } else {
            SamplerConfig::serial().with_workers(self.workers)
        };
        base.with_chunk_size(self.chunk_size)
    }

    /// Per-call flags described by this profile.
    pub fn flags(&self) -> SampleFlags {
        SampleFlags {
            return_hops: self.return_hops,
            with_replacement: self.with_replacement,
            dedupe_sources: self.dedupe_sources,
        }
    }

    /// Fresh RNG state seeded from this profile.
    pub fn rng_state(&self) -> RngState {
        RngState::new(self.seed)
    }
}

/// Loads and saves [`SamplingProfile`]s through a [`ConfigStore`].
pub struct ProfileService<S> {
    config: ConfigService<S>,
}

impl<S: ConfigStore> ProfileService<S> {
    /// Service over `store`.
    pub fn new(store: S) -> Self {
        Self {
            config: ConfigService::new(store),
        }
    }

    /// Loads the profile stored under `name`, or the default profile when
    /// none is stored.
    pub fn load(&self, name: &str) -> Result<SamplingProfile, ConfigError> {
        let profile: SamplingProfile = self.config.load_or_default(name)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Loads the profile stored under [`DEFAULT_PROFILE`].
    pub fn load_default(&self) -> Result<SamplingProfile, ConfigError> {
        self.load(DEFAULT_PROFILE)
    }

    /// Validates and stores `profile` under `name`.
    pub fn save(&self, name: &str, profile: &SamplingProfile) -> Result<(), ConfigError> {
        profile.validate()?;
        self.config.save(name, profile)
    }

    /// Borrow the inner store.
    pub fn store(&self) -> &S {
        self.config.store()
    }

    /// Consume the service and return the inner store.
    pub fn into_inner(self) -> S {
        self.config.into_inner()
    }
}
