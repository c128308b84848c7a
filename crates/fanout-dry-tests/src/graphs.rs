// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Edge-list graph builder and canned graphs.

use fanout_core::{
    EdgeIdType, EdgeType, EdgeWeight, GraphPartition, PartitionedGraph, Prng, SampleError,
    VertexId,
};

/// Shard counts exercised by invariance tests.
pub const SHARD_COUNTS: &[usize] = &[1, 2, 3, 5];

/// Builds a [`PartitionedGraph`] from a directed edge list.
///
/// Vertices `[0, num_vertices)` are split into contiguous, non-empty shards of
/// near-equal size. Edges keep their insertion order within each source's
/// adjacency. Destinations are not checked against `num_vertices`, so tests
/// can build graphs with dangling edges.
///
/// # Example
///
/// ```
/// use fanout_dry_tests::EdgeListBuilder;
///
/// let graph = EdgeListBuilder::<i32>::new(3)
///     .edge(0, 1)
///     .edge(1, 2)
///     .build(2)
///     .unwrap();
/// assert_eq!(graph.num_partitions(), 2);
/// assert_eq!(graph.edge_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct EdgeListBuilder<V, E = i32, W = f32> {
    num_vertices: u64,
    edges: Vec<(u64, u64)>,
    weights: Option<Vec<W>>,
    edge_ids: Option<Vec<E>>,
    edge_types: Option<Vec<EdgeType>>,
    _vertex: std::marker::PhantomData<V>,
}

impl<V, E, W> EdgeListBuilder<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    /// Empty edge list over `num_vertices` vertices.
    pub fn new(num_vertices: u64) -> Self {
        Self {
            num_vertices,
            edges: Vec::new(),
            weights: None,
            edge_ids: None,
            edge_types: None,
            _vertex: std::marker::PhantomData,
        }
    }

    /// Appends one edge.
    pub fn edge(mut self, src: u64, dst: u64) -> Self {
        self.edges.push((src, dst));
        self
    }

    /// Appends many edges.
    pub fn edges(mut self, edges: impl IntoIterator<Item = (u64, u64)>) -> Self {
        self.edges.extend(edges);
        self
    }

    /// Per-edge weights in insertion order.
    pub fn weights(mut self, weights: Vec<W>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Per-edge ids in insertion order.
    pub fn edge_ids(mut self, edge_ids: Vec<E>) -> Self {
        self.edge_ids = Some(edge_ids);
        self
    }

    /// Per-edge types in insertion order.
    pub fn edge_types(mut self, edge_types: Vec<EdgeType>) -> Self {
        self.edge_types = Some(edge_types);
        self
    }

    /// Number of edges added so far.
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Edges in insertion order.
    pub fn edge_list(&self) -> &[(u64, u64)] {
        &self.edges
    }

    /// Splits the graph into `shards` partitions (clamped to
    /// `1..=num_vertices`).
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when an id does not fit `V`, a source
    /// is outside the vertex space, or a property array is misaligned.
    pub fn build(&self, shards: usize) -> Result<PartitionedGraph<V, E, W>, SampleError> {
        let n = usize::try_from(self.num_vertices)
            .map_err(|_| SampleError::invalid("vertex count exceeds usize"))?;
        for (what, len) in [
            ("weights", self.weights.as_ref().map(Vec::len)),
            ("edge ids", self.edge_ids.as_ref().map(Vec::len)),
            ("edge types", self.edge_types.as_ref().map(Vec::len)),
        ] {
            if len.is_some_and(|len| len != self.edges.len()) {
                return Err(SampleError::invalid(format!("{what} misaligned with edges")));
            }
        }

        // Stable bucket of edge positions by source.
        let mut by_src: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (pos, &(src, _)) in self.edges.iter().enumerate() {
            let bucket = usize::try_from(src)
                .ok()
                .and_then(|s| by_src.get_mut(s))
                .ok_or_else(|| SampleError::invalid(format!("source {src} outside graph")))?;
            bucket.push(pos);
        }

        let mut partitions = Vec::new();
        for range in split_ranges(n, shards) {
            let mut offsets = vec![0_usize];
            let mut positions = Vec::new();
            for src in range.clone() {
                positions.extend_from_slice(&by_src[src]);
                offsets.push(positions.len());
            }
            let indices = positions
                .iter()
                .map(|&p| vertex::<V>(self.edges[p].1))
                .collect::<Result<Vec<_>, _>>()?;
            let mut part = GraphPartition::new(vertex::<V>(range.start as u64)?, offsets, indices)?;
            if let Some(w) = &self.weights {
                part = part.with_weights(positions.iter().map(|&p| w[p]).collect())?;
            }
            if let Some(ids) = &self.edge_ids {
                part = part.with_edge_ids(positions.iter().map(|&p| ids[p]).collect())?;
            }
            if let Some(types) = &self.edge_types {
                part = part.with_edge_types(positions.iter().map(|&p| types[p]).collect())?;
            }
            partitions.push(part);
        }
        PartitionedGraph::new(self.num_vertices, partitions)
    }
}

fn vertex<V: VertexId>(index: u64) -> Result<V, SampleError> {
    V::from_index(index)
        .ok_or_else(|| SampleError::invalid(format!("vertex {index} does not fit the id width")))
}

/// Contiguous near-equal ranges covering `0..n`, none empty.
fn split_ranges(n: usize, shards: usize) -> Vec<std::ops::Range<usize>> {
    let shards = shards.clamp(1, n.max(1));
    let (base, extra) = (n / shards, n % shards);
    let mut start = 0;
    (0..shards)
        .map(|s| {
            let len = base + usize::from(s < extra);
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

/// `0 -> {1, 2, 3}`, `1 -> {2}`; vertices 2 and 3 have no out-edges.
pub fn scenario_graph<V, E, W>() -> EdgeListBuilder<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    EdgeListBuilder::new(4).edges([(0, 1), (0, 2), (0, 3), (1, 2)])
}

/// Directed ring `i -> i + 1 (mod n)`; every vertex has out-degree 1.
pub fn ring_graph<V, E, W>(n: u64) -> EdgeListBuilder<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    EdgeListBuilder::new(n).edges((0..n).map(|i| (i, (i + 1) % n.max(1))))
}

/// Random multigraph where each vertex draws an out-degree in
/// `0..=max_degree` and uniform destinations (self-loops and parallel edges
/// allowed).
pub fn random_graph<V, E, W>(n: u64, max_degree: u64, seed: u64) -> EdgeListBuilder<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    let mut rng = Prng::from_seed_u64(seed);
    let mut edges = Vec::new();
    for src in 0..n {
        let degree = rng.next_below(max_degree + 1);
        for _ in 0..degree {
            edges.push((src, rng.next_below(n.max(1))));
        }
    }
    EdgeListBuilder::new(n).edges(edges)
}
