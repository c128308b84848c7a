// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! fanout-core: deterministic multi-hop neighbor sampling over a partitioned
//! graph.
//!
//! A [`PartitionedGraph`] is a set of CSR [`GraphPartition`]s, each owning a
//! contiguous vertex range (one per shard). A [`NeighborSampler`] expands a
//! batch of seed vertices hop by hop: every hop routes the frontier to the
//! owning shards, samples each entry's out-edges in parallel and feeds the
//! sampled destinations into the next hop. Output rows are grouped by seed
//! label and carry per-label offsets.
//!
//! Sampling is reproducible: each random draw is keyed by the entry's path
//! context, vertex, hop and draw index, so a fixed [`RngState`] produces the
//! same sample for any shard count, worker count or chunk size.
//!
//! ```
//! use fanout_core::{
//!     GraphPartition, NeighborSampler, PartitionedGraph, RngState, SampleRequest, SamplerConfig,
//! };
//!
//! // 0 -> {1, 2, 3}, 1 -> {2}
//! let part: GraphPartition<i32> = GraphPartition::new(0, vec![0, 3, 4, 4, 4], vec![1, 2, 3, 2])?;
//! let graph = PartitionedGraph::new(4, vec![part])?;
//! let sampler = NeighborSampler::new(&graph, SamplerConfig::serial());
//!
//! let mut rng = RngState::new(42);
//! let results = sampler.sample(SampleRequest::new(vec![0], vec![2]), &mut rng)?;
//! assert_eq!(results[0].len(), 2);
//! # Ok::<(), fanout_core::SampleError>(())
//! ```
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::module_name_repetitions,
    clippy::cast_possible_truncation
)]

/// Result assembly and label offsets.
pub mod assemble;
/// Execution knobs and per-call flags.
pub mod config;
/// Multi-hop driver and request types.
pub mod coordinator;
mod error;
/// Parallel hop executor.
pub mod exec;
mod ident;
/// CSR partitions and the partitioned graph.
pub mod partition;
/// Deterministic random streams.
pub mod rng;
/// Frontier routing.
pub mod router;
/// Local adjacency sampling.
pub mod sampler;

pub use assemble::{OutputShape, SampleResult};
pub use config::{SampleFlags, SamplerConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS};
pub use coordinator::{HopStats, NeighborSampler, SampleReport, SampleRequest};
pub use error::SampleError;
pub use ident::{EdgeIdType, EdgeType, EdgeWeight, Hop, Label, VertexId};
pub use partition::{GraphPartition, Neighbors, PartitionedGraph};
pub use rng::{CounterStream, DrawKey, Prng, RngState, RngStream};
pub use sampler::{Fanout, LocalSampler, SampleEdge};
