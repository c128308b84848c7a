// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Partitioned CSR adjacency.
//!
//! A [`GraphPartition`] is one shard's slice of the graph: the out-edges of a
//! contiguous vertex-id range stored as CSR (offsets + neighbor ids) with
//! optional per-edge weight, id and type arrays aligned 1:1 with the neighbor
//! ids. A [`PartitionedGraph`] is the ordered set of partitions plus the global
//! vertex count; it answers "which shard owns `v`".
//!
//! Both are read-only for the duration of a sampling call and are shared by
//! reference across worker threads.

use std::ops::Range;

use crate::error::SampleError;
use crate::ident::{EdgeIdType, EdgeType, EdgeWeight, VertexId};

/// Out-edges of one vertex, borrowed from its partition.
#[derive(Debug, Clone, Copy)]
pub struct Neighbors<'a, V, E, W> {
    /// Destination vertex of each out-edge.
    pub dsts: &'a [V],
    /// Per-edge weights, when the graph carries them.
    pub weights: Option<&'a [W]>,
    /// Per-edge ids, when the graph carries them.
    pub edge_ids: Option<&'a [E]>,
    /// Per-edge types, when the graph carries them.
    pub edge_types: Option<&'a [EdgeType]>,
}

impl<V, E, W> Neighbors<'_, V, E, W> {
    /// Out-degree.
    pub fn len(&self) -> usize {
        self.dsts.len()
    }

    /// True for a vertex without out-edges.
    pub fn is_empty(&self) -> bool {
        self.dsts.is_empty()
    }
}

/// One shard's adjacency slice.
#[derive(Debug, Clone)]
pub struct GraphPartition<V, E = i32, W = f32> {
    first: u64,
    offsets: Vec<usize>,
    indices: Vec<V>,
    weights: Option<Vec<W>>,
    edge_ids: Option<Vec<E>>,
    edge_types: Option<Vec<EdgeType>>,
}

impl<V, E, W> GraphPartition<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    /// Builds a partition owning `[first, first + offsets.len() - 1)`.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when `first` is negative, `offsets` is
    /// empty, does not start at 0, decreases, or does not end at
    /// `indices.len()`.
    pub fn new(first: V, offsets: Vec<usize>, indices: Vec<V>) -> Result<Self, SampleError> {
        let first = first
            .to_index()
            .ok_or_else(|| SampleError::invalid("partition start is negative"))?;
        let Some(&last) = offsets.last() else {
            return Err(SampleError::invalid("offsets must have local_count + 1 entries"));
        };
        if offsets[0] != 0 {
            return Err(SampleError::invalid("offsets must start at 0"));
        }
        if offsets.windows(2).any(|w| w[1] < w[0]) {
            return Err(SampleError::invalid("offsets must be non-decreasing"));
        }
        if last != indices.len() {
            return Err(SampleError::invalid(format!(
                "offsets end at {last} but {} neighbor ids were supplied",
                indices.len()
            )));
        }
        Ok(Self {
            first,
            offsets,
            indices,
            weights: None,
            edge_ids: None,
            edge_types: None,
        })
    }

    /// Attaches per-edge weights.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when the array is not aligned with the
    /// neighbor ids.
    pub fn with_weights(mut self, weights: Vec<W>) -> Result<Self, SampleError> {
        self.check_aligned(weights.len(), "weights")?;
        self.weights = Some(weights);
        Ok(self)
    }

    /// Attaches per-edge ids.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when the array is not aligned with the
    /// neighbor ids.
    pub fn with_edge_ids(mut self, edge_ids: Vec<E>) -> Result<Self, SampleError> {
        self.check_aligned(edge_ids.len(), "edge ids")?;
        self.edge_ids = Some(edge_ids);
        Ok(self)
    }

    /// Attaches per-edge types.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when the array is not aligned with the
    /// neighbor ids.
    pub fn with_edge_types(mut self, edge_types: Vec<EdgeType>) -> Result<Self, SampleError> {
        self.check_aligned(edge_types.len(), "edge types")?;
        self.edge_types = Some(edge_types);
        Ok(self)
    }

    fn check_aligned(&self, len: usize, what: &str) -> Result<(), SampleError> {
        if len == self.indices.len() {
            Ok(())
        } else {
            Err(SampleError::invalid(format!(
                "{what} has {len} entries, expected {}",
                self.indices.len()
            )))
        }
    }

    /// Index of the first owned vertex.
    pub fn first_vertex(&self) -> u64 {
        self.first
    }

    /// Number of owned vertices.
    pub fn local_count(&self) -> usize {
        self.offsets.len() - 1
    }

    /// Owned vertex indices as a half-open range.
    pub fn vertex_range(&self) -> Range<u64> {
        self.first..self.first.saturating_add(self.local_count() as u64)
    }

    /// Number of stored edges.
    pub fn edge_count(&self) -> usize {
        self.indices.len()
    }

    /// True when `v` is owned by this partition.
    pub fn contains(&self, v: V) -> bool {
        v.to_index()
            .is_some_and(|idx| self.vertex_range().contains(&idx))
    }

    pub(crate) fn contains_index(&self, idx: u64) -> bool {
        self.vertex_range().contains(&idx)
    }

    /// Out-edges of `v`.
    ///
    /// # Errors
    ///
    /// [`SampleError::OutOfRange`] when `v` is not owned by this partition.
    pub fn local_neighbors(&self, v: V) -> Result<Neighbors<'_, V, E, W>, SampleError> {
        let local = v
            .to_index()
            .filter(|idx| self.contains_index(*idx))
            .and_then(|idx| usize::try_from(idx - self.first).ok())
            .ok_or(SampleError::OutOfRange {
                vertex: v.to_i128(),
                hop: None,
                shard: None,
            })?;
        let span = self.offsets[local]..self.offsets[local + 1];
        Ok(Neighbors {
            dsts: &self.indices[span.clone()],
            weights: self.weights.as_deref().map(|w| &w[span.clone()]),
            edge_ids: self.edge_ids.as_deref().map(|e| &e[span.clone()]),
            edge_types: self.edge_types.as_deref().map(|t| &t[span]),
        })
    }

    /// Out-degree of `v`.
    ///
    /// # Errors
    ///
    /// [`SampleError::OutOfRange`] when `v` is not owned by this partition.
    pub fn degree(&self, v: V) -> Result<usize, SampleError> {
        self.local_neighbors(v).map(|n| n.len())
    }

    /// True when the partition carries weights.
    pub fn has_weights(&self) -> bool {
        self.weights.is_some()
    }

    /// True when the partition carries edge ids.
    pub fn has_edge_ids(&self) -> bool {
        self.edge_ids.is_some()
    }

    /// True when the partition carries edge types.
    pub fn has_edge_types(&self) -> bool {
        self.edge_types.is_some()
    }
}

/// A graph whose out-edges are split across shards by source vertex.
#[derive(Debug, Clone)]
pub struct PartitionedGraph<V, E = i32, W = f32> {
    num_vertices: u64,
    partitions: Vec<GraphPartition<V, E, W>>,
    starts: Vec<u64>,
}

impl<V, E, W> PartitionedGraph<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    /// Assembles partitions over the vertex space `[0, num_vertices)`.
    ///
    /// Partitions are ordered by their first vertex; shard `i` is the `i`-th
    /// partition in that order. Gaps between partitions are accepted here and
    /// reported as [`SampleError::UnknownOwner`] when a vertex inside one is
    /// routed.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when there are no partitions, ranges
    /// overlap or exceed `num_vertices`, or partitions disagree on which
    /// per-edge property arrays exist.
    pub fn new(
        num_vertices: u64,
        mut partitions: Vec<GraphPartition<V, E, W>>,
    ) -> Result<Self, SampleError> {
        if partitions.is_empty() {
            return Err(SampleError::invalid("a graph needs at least one partition"));
        }
        partitions.sort_by_key(GraphPartition::first_vertex);

        let mut covered = 0_u64;
        for (shard, part) in partitions.iter().enumerate() {
            let range = part.vertex_range();
            if range.start < covered {
                return Err(SampleError::invalid(format!(
                    "partition {shard} starting at {} overlaps its predecessor",
                    range.start
                )));
            }
            if range.end > num_vertices {
                return Err(SampleError::invalid(format!(
                    "partition {shard} ends at {} beyond {num_vertices} vertices",
                    range.end
                )));
            }
            covered = range.end;
        }

        let first = &partitions[0];
        let shape = (first.has_weights(), first.has_edge_ids(), first.has_edge_types());
        if partitions
            .iter()
            .any(|p| (p.has_weights(), p.has_edge_ids(), p.has_edge_types()) != shape)
        {
            return Err(SampleError::invalid(
                "partitions disagree on which edge properties are present",
            ));
        }

        let starts = partitions.iter().map(GraphPartition::first_vertex).collect();
        Ok(Self {
            num_vertices,
            partitions,
            starts,
        })
    }

    /// Size of the vertex-id space.
    pub fn num_vertices(&self) -> u64 {
        self.num_vertices
    }

    /// Number of shards.
    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// All partitions in shard order.
    pub fn partitions(&self) -> &[GraphPartition<V, E, W>] {
        &self.partitions
    }

    /// Partition `shard`, if it exists.
    pub fn partition(&self, shard: usize) -> Option<&GraphPartition<V, E, W>> {
        self.partitions.get(shard)
    }

    /// Total stored edges across all shards.
    pub fn edge_count(&self) -> usize {
        self.partitions.iter().map(GraphPartition::edge_count).sum()
    }

    /// Shard owning `v`.
    ///
    /// # Errors
    ///
    /// [`SampleError::OutOfRange`] when `v` is negative or not below
    /// [`Self::num_vertices`]; [`SampleError::UnknownOwner`] when no partition
    /// covers it.
    pub fn owner_of(&self, v: V) -> Result<usize, SampleError> {
        let idx = v
            .to_index()
            .filter(|idx| *idx < self.num_vertices)
            .ok_or(SampleError::OutOfRange {
                vertex: v.to_i128(),
                hop: None,
                shard: None,
            })?;
        let slot = self.starts.partition_point(|start| *start <= idx);
        slot.checked_sub(1)
            .filter(|shard| self.partitions[*shard].contains_index(idx))
            .ok_or(SampleError::UnknownOwner {
                vertex: v.to_i128(),
                hop: None,
            })
    }

    /// True when every partition carries weights.
    pub fn has_weights(&self) -> bool {
        self.partitions[0].has_weights()
    }

    /// True when every partition carries edge ids.
    pub fn has_edge_ids(&self) -> bool {
        self.partitions[0].has_edge_ids()
    }

    /// True when every partition carries edge types.
    pub fn has_edge_types(&self) -> bool {
        self.partitions[0].has_edge_types()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    type Part = GraphPartition<i32, i32, f32>;

    // 0 -> {1, 2, 3}, 1 -> {2}, 2 -> {}, 3 -> {}
    fn whole() -> Part {
        Part::new(0, vec![0, 3, 4, 4, 4], vec![1, 2, 3, 2]).unwrap()
    }

    #[test]
    fn local_neighbors_returns_csr_slice() {
        let p = whole();
        assert_eq!(p.local_neighbors(0).unwrap().dsts, &[1, 2, 3]);
        assert_eq!(p.local_neighbors(1).unwrap().dsts, &[2]);
        assert!(p.local_neighbors(3).unwrap().is_empty());
        assert_eq!(p.degree(0).unwrap(), 3);
    }

    #[test]
    fn local_neighbors_rejects_foreign_vertices() {
        let p = Part::new(2, vec![0, 1, 1], vec![0]).unwrap();
        assert!(matches!(
            p.local_neighbors(0),
            Err(SampleError::OutOfRange { vertex: 0, .. })
        ));
        assert!(matches!(
            p.local_neighbors(4),
            Err(SampleError::OutOfRange { vertex: 4, .. })
        ));
        assert!(matches!(
            p.local_neighbors(-1),
            Err(SampleError::OutOfRange { vertex: -1, .. })
        ));
        assert_eq!(p.local_neighbors(2).unwrap().dsts, &[0]);
    }

    #[test]
    fn malformed_offsets_are_rejected() {
        assert!(Part::new(0, vec![], vec![]).is_err());
        assert!(Part::new(0, vec![1, 1], vec![0]).is_err());
        assert!(Part::new(0, vec![0, 2, 1], vec![0, 1]).is_err());
        assert!(Part::new(0, vec![0, 1], vec![0, 1]).is_err());
        assert!(Part::new(-1, vec![0], vec![]).is_err());
    }

    #[test]
    fn property_arrays_must_align() {
        assert!(whole().with_weights(vec![1.0; 3]).is_err());
        let p = whole()
            .with_weights(vec![1.0, 2.0, 3.0, 4.0])
            .unwrap()
            .with_edge_ids(vec![10, 11, 12, 13])
            .unwrap()
            .with_edge_types(vec![0, 1, 0, 1])
            .unwrap();
        let n = p.local_neighbors(1).unwrap();
        assert_eq!(n.weights, Some(&[4.0_f32][..]));
        assert_eq!(n.edge_ids, Some(&[13][..]));
        assert_eq!(n.edge_types, Some(&[1][..]));
    }

    #[test]
    fn owner_of_routes_by_range() {
        let a = Part::new(0, vec![0, 1, 2], vec![2, 3]).unwrap();
        let b = Part::new(2, vec![0, 0, 1], vec![0]).unwrap();
        let g = PartitionedGraph::new(4, vec![b, a]).unwrap();
        assert_eq!(g.num_partitions(), 2);
        assert_eq!(g.owner_of(0).unwrap(), 0);
        assert_eq!(g.owner_of(1).unwrap(), 0);
        assert_eq!(g.owner_of(2).unwrap(), 1);
        assert_eq!(g.owner_of(3).unwrap(), 1);
        assert!(matches!(
            g.owner_of(4),
            Err(SampleError::OutOfRange { .. })
        ));
        assert!(matches!(
            g.owner_of(-2),
            Err(SampleError::OutOfRange { .. })
        ));
    }

    #[test]
    fn gaps_report_unknown_owner() {
        let a = Part::new(0, vec![0, 0], vec![]).unwrap();
        let b = Part::new(3, vec![0, 0], vec![]).unwrap();
        let g = PartitionedGraph::new(4, vec![a, b]).unwrap();
        assert!(matches!(
            g.owner_of(1),
            Err(SampleError::UnknownOwner { vertex: 1, .. })
        ));
        assert_eq!(g.owner_of(3).unwrap(), 1);
    }

    #[test]
    fn overlapping_or_oversized_partitions_are_rejected() {
        let a = Part::new(0, vec![0, 0, 0], vec![]).unwrap();
        let b = Part::new(1, vec![0, 0], vec![]).unwrap();
        assert!(PartitionedGraph::new(4, vec![a.clone(), b]).is_err());
        assert!(PartitionedGraph::new(1, vec![a]).is_err());
        assert!(PartitionedGraph::<i32, i32, f32>::new(1, vec![]).is_err());
    }

    #[test]
    fn mixed_property_presence_is_rejected() {
        let a = Part::new(0, vec![0, 1], vec![1])
            .unwrap()
            .with_weights(vec![1.0])
            .unwrap();
        let b = Part::new(1, vec![0, 0], vec![]).unwrap();
        assert!(PartitionedGraph::new(2, vec![a, b]).is_err());
    }
}
