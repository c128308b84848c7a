// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors surfaced by a sampling call.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::ident::Hop;

/// Errors emitted by the sampler.
///
/// A sampling call is collective: when any shard reports one of these during
/// a hop, the whole call fails with it and no partial output is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// The request or graph is malformed (empty fan-out, inconsistent label
    /// inputs, misaligned property arrays, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A vertex lies outside the id space it was checked against.
    #[error("vertex {vertex} out of range (hop {hop:?}, shard {shard:?})")]
    OutOfRange {
        /// Offending vertex id.
        vertex: i128,
        /// Hop during which it was detected; `None` while validating seeds.
        hop: Option<Hop>,
        /// Shard that detected it; `None` when detected before routing.
        shard: Option<usize>,
    },

    /// A vertex inside the graph's id space is owned by no partition.
    ///
    /// Indicates a misconfigured partition assignment rather than user error.
    #[error("no partition owns vertex {vertex} (hop {hop:?})")]
    UnknownOwner {
        /// Offending vertex id.
        vertex: i128,
        /// Hop during which routing failed; `None` while validating seeds.
        hop: Option<Hop>,
    },

    /// Working memory for an intermediate buffer could not be reserved.
    #[error("allocation failure: {what} ({requested} more elements)")]
    AllocationFailure {
        /// Buffer that failed to grow.
        what: &'static str,
        /// Additional capacity that was requested.
        requested: usize,
    },
}

impl SampleError {
    /// Shorthand for [`SampleError::InvalidArgument`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Attaches hop context to routing and range errors that lack it.
    pub(crate) fn at_hop(self, at: Hop) -> Self {
        match self {
            Self::OutOfRange {
                vertex,
                hop: None,
                shard,
            } => Self::OutOfRange {
                vertex,
                hop: Some(at),
                shard,
            },
            Self::UnknownOwner { vertex, hop: None } => Self::UnknownOwner {
                vertex,
                hop: Some(at),
            },
            other => other,
        }
    }

    /// Attaches shard and hop context to an error raised inside a shard.
    pub(crate) fn on_shard(self, at_shard: usize, at: Hop) -> Self {
        match self {
            Self::OutOfRange { vertex, hop, shard } => Self::OutOfRange {
                vertex,
                hop: hop.or(Some(at)),
                shard: shard.or(Some(at_shard)),
            },
            other => other.at_hop(at),
        }
    }
}

/// Reserves `additional` slots in `buf`, mapping failure to
/// [`SampleError::AllocationFailure`].
pub(crate) fn try_reserve<T>(
    buf: &mut Vec<T>,
    additional: usize,
    what: &'static str,
) -> Result<(), SampleError> {
    buf.try_reserve(additional)
        .map_err(|_: TryReserveError| SampleError::AllocationFailure {
            what,
            requested: additional,
        })
}
