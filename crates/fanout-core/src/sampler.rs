// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Local adjacency sampling for one frontier entry.
//!
//! | fan-out      | degree        | replacement | result |
//! |--------------|---------------|-------------|--------|
//! | `All` (`-1`) | any           | any         | every out-edge, no draws |
//! | `Limit(k)`   | `<= k`        | no          | every out-edge |
//! | `Limit(k)`   | `> k`         | no          | `k` distinct out-edges |
//! | `Limit(k)`   | `> 0`         | yes         | exactly `k` draws, duplicates allowed |
//! | any          | `0`           | any         | nothing |
//!
//! Draws are uniform unless the graph carries weights, in which case they are
//! proportional to the edge weight. Every draw comes from the sub-stream keyed
//! by `(lineage, vertex, hop, draw)`.

use rustc_hash::FxHashSet;

use crate::error::{try_reserve, SampleError};
use crate::ident::{EdgeIdType, EdgeType, EdgeWeight, Hop, Label, VertexId};
use crate::partition::{GraphPartition, Neighbors};
use crate::rng::{DrawKey, RngStream};
use crate::router::FrontierEntry;

/// Per-hop sampling bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Fanout {
    /// Take the entire neighborhood (`-1`).
    All,
    /// Take at most this many neighbors (exactly this many with replacement).
    Limit(usize),
}

impl Fanout {
    /// Parses one fan-out entry; `-1` means [`Fanout::All`].
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] for entries below `-1`.
    pub fn from_entry(entry: i32) -> Result<Self, SampleError> {
        match entry {
            -1 => Ok(Self::All),
            k if k >= 0 => Ok(Self::Limit(k.unsigned_abs() as usize)),
            k => Err(SampleError::invalid(format!(
                "fan-out entries must be >= -1, got {k}"
            ))),
        }
    }

    /// Parses a whole fan-out list.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when the list is empty or any entry is
    /// below `-1`.
    pub fn parse_list(entries: &[i32]) -> Result<Vec<Self>, SampleError> {
        if entries.is_empty() {
            return Err(SampleError::invalid("fan-out must name at least one hop"));
        }
        entries.iter().copied().map(Self::from_entry).collect()
    }
}

/// One sampled `(src, dst)` occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleEdge<V, E, W> {
    /// Source vertex (the frontier entry that was expanded).
    pub src: V,
    /// Sampled destination.
    pub dst: V,
    /// Edge weight, when the graph carries weights.
    pub weight: Option<W>,
    /// Edge id, when the graph carries edge ids.
    pub edge_id: Option<E>,
    /// Edge type, when the graph carries edge types.
    pub edge_type: Option<EdgeType>,
    /// Hop that produced the edge.
    pub hop: Hop,
    /// Label inherited from the seed.
    pub label: Label,
}

/// Samples out-edges from one partition.
#[derive(Debug)]
pub struct LocalSampler<'g, V, E, W, R: ?Sized> {
    partition: &'g GraphPartition<V, E, W>,
    stream: &'g R,
    with_replacement: bool,
}

impl<'g, V, E, W, R> LocalSampler<'g, V, E, W, R>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
    R: RngStream + ?Sized,
{
    /// Sampler over `partition` drawing from `stream`.
    pub fn new(partition: &'g GraphPartition<V, E, W>, stream: &'g R, with_replacement: bool) -> Self {
        Self {
            partition,
            stream,
            with_replacement,
        }
    }

    /// Samples the out-edges of `entry.vertex` for hop `hop`.
    ///
    /// # Errors
    ///
    /// [`SampleError::OutOfRange`] when the vertex is not owned by this
    /// partition; [`SampleError::AllocationFailure`] when the buffers for the
    /// requested fan-out cannot be reserved.
    pub fn sample(
        &self,
        entry: &FrontierEntry<V>,
        hop: Hop,
        fanout: Fanout,
    ) -> Result<Vec<SampleEdge<V, E, W>>, SampleError> {
        let neighbors = self.partition.local_neighbors(entry.vertex)?;
        let mut out = Vec::new();
        try_reserve(&mut out, self.max_edges(neighbors.len(), fanout), "local sample buffer")?;
        let positions = self.select(entry, hop, fanout, &neighbors)?;
        out.extend(positions.into_iter().map(|p| SampleEdge {
            src: entry.vertex,
            dst: neighbors.dsts[p],
            weight: neighbors.weights.map(|w| w[p]),
            edge_id: neighbors.edge_ids.map(|e| e[p]),
            edge_type: neighbors.edge_types.map(|t| t[p]),
            hop,
            label: entry.label,
        }));
        Ok(out)
    }

    // Upper bound on the edges one expansion can produce.
    fn max_edges(&self, degree: usize, fanout: Fanout) -> usize {
        match fanout {
            _ if degree == 0 => 0,
            Fanout::All => degree,
            Fanout::Limit(k) if self.with_replacement => k,
            Fanout::Limit(k) => k.min(degree),
        }
    }

    fn select(
        &self,
        entry: &FrontierEntry<V>,
        hop: Hop,
        fanout: Fanout,
        neighbors: &Neighbors<'_, V, E, W>,
    ) -> Result<Vec<usize>, SampleError> {
        let degree = neighbors.len();
        if degree == 0 {
            return Ok(Vec::new());
        }
        let k = match fanout {
            Fanout::All => return Ok((0..degree).collect()),
            Fanout::Limit(k) => k,
        };
        if !self.with_replacement && degree <= k {
            return Ok((0..degree).collect());
        }

        let draws = Draws {
            stream: self.stream,
            lineage: entry.lineage,
            vertex: entry.vertex.to_index().unwrap_or_default(),
            hop,
        };
        match (neighbors.weights, self.with_replacement) {
            (None, false) => Ok(uniform_without_replacement(&draws, degree, k)),
            (None, true) => uniform_with_replacement(&draws, degree, k),
            (Some(weights), false) => Ok(weighted_without_replacement(&draws, weights, k)),
            (Some(weights), true) => weighted_with_replacement(&draws, weights, k),
        }
    }
}

struct Draws<'a, R: ?Sized> {
    stream: &'a R,
    lineage: u64,
    vertex: u64,
    hop: Hop,
}

impl<R: RngStream + ?Sized> Draws<'_, R> {
    fn below(&self, draw: usize, bound: usize) -> usize {
        let value = self.slot(draw).next_below(bound as u64);
        usize::try_from(value).unwrap_or(0)
    }

    fn unit(&self, draw: usize) -> f64 {
        self.slot(draw).next_f64()
    }

    fn slot(&self, draw: usize) -> crate::rng::Prng {
        self.stream.substream(DrawKey {
            lineage: self.lineage,
            vertex: self.vertex,
            hop: self.hop,
            draw: draw as u64,
        })
    }
}

// Floyd's combination algorithm: exactly `k` draws, `k` distinct positions.
fn uniform_without_replacement<R: RngStream + ?Sized>(
    draws: &Draws<'_, R>,
    degree: usize,
    k: usize,
) -> Vec<usize> {
    let mut chosen: FxHashSet<usize> = FxHashSet::default();
    chosen.reserve(k);
    for (draw, j) in (degree - k..degree).enumerate() {
        let t = draws.below(draw, j + 1);
        if !chosen.insert(t) {
            chosen.insert(j);
        }
    }
    let mut positions: Vec<usize> = chosen.into_iter().collect();
    positions.sort_unstable();
    positions
}

fn uniform_with_replacement<R: RngStream + ?Sized>(
    draws: &Draws<'_, R>,
    degree: usize,
    k: usize,
) -> Result<Vec<usize>, SampleError> {
    let mut positions = Vec::new();
    try_reserve(&mut positions, k, "sampled positions")?;
    positions.extend((0..k).map(|draw| draws.below(draw, degree)));
    Ok(positions)
}

fn usable_weight<W: EdgeWeight>(w: W) -> f64 {
    let w = w.to_f64();
    if w.is_finite() && w > 0.0 {
        w
    } else {
        0.0
    }
}

// Efraimidis-Spirakis: key = ln(u) / w, keep the `k` largest keys.
fn weighted_without_replacement<R: RngStream + ?Sized, W: EdgeWeight>(
    draws: &Draws<'_, R>,
    weights: &[W],
    k: usize,
) -> Vec<usize> {
    let mut keyed: Vec<(f64, usize)> = weights
        .iter()
        .enumerate()
        .filter_map(|(pos, w)| {
            let w = usable_weight(*w);
            (w > 0.0).then(|| (draws.unit(pos).ln() / w, pos))
        })
        .collect();
    if keyed.len() > k {
        keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
        keyed.truncate(k);
    }
    let mut positions: Vec<usize> = keyed.into_iter().map(|(_, pos)| pos).collect();
    positions.sort_unstable();
    positions
}

fn weighted_with_replacement<R: RngStream + ?Sized, W: EdgeWeight>(
    draws: &Draws<'_, R>,
    weights: &[W],
    k: usize,
) -> Result<Vec<usize>, SampleError> {
    let mut prefix = Vec::with_capacity(weights.len());
    let mut total = 0.0_f64;
    let mut last_positive = None;
    for (pos, w) in weights.iter().enumerate() {
        let w = usable_weight(*w);
        if w > 0.0 {
            last_positive = Some(pos);
        }
        total += w;
        prefix.push(total);
    }
    let Some(last_positive) = last_positive else {
        return Ok(Vec::new());
    };
    let mut positions = Vec::new();
    try_reserve(&mut positions, k, "sampled positions")?;
    positions.extend((0..k).map(|draw| {
        let target = draws.unit(draw) * total;
        prefix
            .partition_point(|cum| *cum <= target)
            .min(last_positive)
    }));
    Ok(positions)
}
