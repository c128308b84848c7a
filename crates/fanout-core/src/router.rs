// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Frontier routing: which shard expands which entry.
//!
//! # Routing Rule
//!
//! ```text
//! shard(v) = the partition whose [first, first + local_count) contains v
//! ```
//!
//! Routing is stable: entries keep their frontier order within a shard, and
//! every routed entry remembers its frontier ordinal so the merge can restore
//! the canonical order no matter which worker expanded it. Entries whose
//! vertex has no out-edges are pruned here and never reach a sampler.

use crate::error::SampleError;
use crate::ident::{EdgeIdType, EdgeWeight, Hop, Label, VertexId};
use crate::partition::PartitionedGraph;

/// A vertex entering a hop, with the context inherited from its seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrontierEntry<V> {
    /// Vertex to expand.
    pub vertex: V,
    /// Label of the seed this entry descends from.
    pub label: Label,
    /// Path context; keys the entry's random draws.
    pub lineage: u64,
}

/// A frontier grouped by owning shard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoutedFrontier {
    /// `per_shard[s]` lists frontier ordinals owned by shard `s`, ascending.
    pub per_shard: Vec<Vec<usize>>,
    /// Entries dropped because their vertex has no out-edges.
    pub pruned: usize,
}

impl RoutedFrontier {
    /// Number of entries that will be expanded.
    pub fn routed(&self) -> usize {
        self.per_shard.iter().map(Vec::len).sum()
    }
}

/// Groups `frontier` by owning shard.
///
/// # Errors
///
/// [`SampleError::OutOfRange`] or [`SampleError::UnknownOwner`] (tagged with
/// `hop`) when an entry's vertex cannot be placed. Routing stops at the first
/// such entry in frontier order.
pub fn route<V, E, W>(
    frontier: &[FrontierEntry<V>],
    graph: &PartitionedGraph<V, E, W>,
    hop: Hop,
) -> Result<RoutedFrontier, SampleError>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    let mut routed = RoutedFrontier {
        per_shard: vec![Vec::new(); graph.num_partitions()],
        pruned: 0,
    };
    for (ordinal, entry) in frontier.iter().enumerate() {
        let shard = graph.owner_of(entry.vertex).map_err(|e| e.at_hop(hop))?;
        let degree = graph.partitions()[shard]
            .degree(entry.vertex)
            .map_err(|e| e.at_hop(hop))?;
        if degree == 0 {
            routed.pruned += 1;
        } else {
            routed.per_shard[shard].push(ordinal);
        }
    }
    Ok(routed)
}

/// Items from one shard that a worker expands serially.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkUnit {
    /// Shard owning every entry in the unit.
    pub shard: usize,
    /// Frontier ordinals to expand, ascending.
    pub ordinals: Vec<usize>,
}

/// Splits routed shards into work units of at most `chunk_size` entries.
///
/// Units are ordered canonically: shard ascending, then chunk ascending.
/// Empty shards produce no units. A `chunk_size` of 0 is treated as 1.
pub fn build_work_units(routed: RoutedFrontier, chunk_size: usize) -> Vec<WorkUnit> {
    let chunk_size = chunk_size.max(1);
    let mut units = Vec::new();
    for (shard, ordinals) in routed.per_shard.into_iter().enumerate() {
        for chunk in ordinals.chunks(chunk_size) {
            units.push(WorkUnit {
                shard,
                ordinals: chunk.to_vec(),
            });
        }
    }
    units
}
