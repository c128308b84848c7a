// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-hop sampling driver.
//!
//! A call walks the state machine
//!
//! ```text
//! Init -> Hop(0) -> Hop(1) -> ... -> Hop(K-1) -> Done
//! ```
//!
//! where `K` is the fan-out length. Each hop routes the current frontier to
//! the owning shards, expands every routed entry in parallel, merges the hop
//! output back into frontier order and derives the next frontier from the
//! sampled destinations. The hop barrier is the end of the parallel section:
//! the next frontier is only built from the complete output of a hop.
//!
//! A failure on any shard aborts the whole call; nothing partial is returned.

use rustc_hash::FxHashSet;
use tracing::{debug, instrument, warn};

use crate::assemble::{merge_hop, EntrySample, OutputShape, ResultAssembler, SampleResult};
use crate::config::{SampleFlags, SamplerConfig};
use crate::error::{try_reserve, SampleError};
use crate::exec::execute_parallel;
use crate::ident::{EdgeIdType, EdgeWeight, Hop, Label, VertexId};
use crate::partition::PartitionedGraph;
use crate::rng::{derive_lineage, seed_lineage, RngState, RngStream};
use crate::router::{build_work_units, route, FrontierEntry, WorkUnit};
use crate::sampler::{Fanout, LocalSampler};

/// Inputs of one sampling call. Consumed by the call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleRequest<V> {
    /// Seed vertices.
    pub starting_vertices: Vec<V>,
    /// Label of each seed (parallel to `starting_vertices`).
    pub starting_labels: Option<Vec<Label>>,
    /// CSR-style seed ranges per label: label `l` owns seeds
    /// `offsets[l]..offsets[l + 1]`.
    pub starting_label_offsets: Option<Vec<usize>>,
    /// Output shard of each label.
    pub label_to_output_shard: Option<Vec<u32>>,
    /// One entry per hop; `-1` takes the whole neighborhood.
    pub fan_out: Vec<i32>,
    /// Behavior switches.
    pub flags: SampleFlags,
}

impl<V> SampleRequest<V> {
    /// Unlabelled request with default flags.
    pub fn new(starting_vertices: Vec<V>, fan_out: Vec<i32>) -> Self {
        Self {
            starting_vertices,
            starting_labels: None,
            starting_label_offsets: None,
            label_to_output_shard: None,
            fan_out,
            flags: SampleFlags::default(),
        }
    }

    /// Assigns a label to every seed.
    #[must_use]
    pub fn with_labels(mut self, labels: Vec<Label>) -> Self {
        self.starting_labels = Some(labels);
        self
    }

    /// Groups seeds into labels by CSR offsets.
    #[must_use]
    pub fn with_label_offsets(mut self, offsets: Vec<usize>) -> Self {
        self.starting_label_offsets = Some(offsets);
        self
    }

    /// Routes each label's rows to an output shard.
    #[must_use]
    pub fn with_output_mapping(mut self, mapping: Vec<u32>) -> Self {
        self.label_to_output_shard = Some(mapping);
        self
    }

    /// Replaces all flags.
    #[must_use]
    pub fn with_flags(mut self, flags: SampleFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Sets `return_hops`.
    #[must_use]
    pub fn return_hops(mut self, on: bool) -> Self {
        self.flags.return_hops = on;
        self
    }

    /// Sets `with_replacement`.
    #[must_use]
    pub fn with_replacement(mut self, on: bool) -> Self {
        self.flags.with_replacement = on;
        self
    }

    /// Sets `dedupe_sources`.
    #[must_use]
    pub fn dedupe_sources(mut self, on: bool) -> Self {
        self.flags.dedupe_sources = on;
        self
    }
}

/// Per-hop counters of a finished call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopStats {
    /// Hop index.
    pub hop: Hop,
    /// Entries in the hop's frontier.
    pub frontier: usize,
    /// Entries handed to a sampler.
    pub routed: usize,
    /// Entries dropped for having no out-edges.
    pub pruned: usize,
    /// Work units executed.
    pub units: usize,
    /// Edges sampled.
    pub edges: usize,
}

/// Results of a call together with per-hop counters.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport<V, E, W> {
    /// One result per output shard.
    pub results: Vec<SampleResult<V, E, W>>,
    /// Counters, one entry per hop.
    pub hops: Vec<HopStats>,
}

/// Multi-hop neighbor sampler over a partitioned graph.
#[derive(Debug, Clone, Copy)]
pub struct NeighborSampler<'g, V, E = i32, W = f32> {
    graph: &'g PartitionedGraph<V, E, W>,
    config: SamplerConfig,
}

impl<'g, V, E, W> NeighborSampler<'g, V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    /// Sampler over `graph` with the given execution knobs.
    pub fn new(graph: &'g PartitionedGraph<V, E, W>, config: SamplerConfig) -> Self {
        Self { graph, config }
    }

    /// Graph being sampled.
    pub fn graph(&self) -> &'g PartitionedGraph<V, E, W> {
        self.graph
    }

    /// Execution knobs in use.
    pub fn config(&self) -> SamplerConfig {
        self.config
    }

    /// Samples `request`, drawing from `rng` and advancing it.
    ///
    /// Returns one result per output shard, exactly one without a
    /// label-to-output-shard mapping.
    ///
    /// # Errors
    ///
    /// * [`SampleError::InvalidArgument`] for a malformed request.
    /// * [`SampleError::OutOfRange`] for a seed outside the vertex space, or
    ///   a sampled destination outside it (tagged with the hop).
    /// * [`SampleError::UnknownOwner`] for a vertex owned by no partition.
    /// * [`SampleError::AllocationFailure`] when a buffer cannot grow.
    pub fn sample(
        &self,
        request: SampleRequest<V>,
        rng: &mut RngState,
    ) -> Result<Vec<SampleResult<V, E, W>>, SampleError> {
        let stream = rng.next_stream();
        self.sample_with_stream(request, &stream)
    }

    /// Samples `request` drawing from an injected stream.
    ///
    /// # Errors
    ///
    /// See [`NeighborSampler::sample`].
    pub fn sample_with_stream<R>(
        &self,
        request: SampleRequest<V>,
        stream: &R,
    ) -> Result<Vec<SampleResult<V, E, W>>, SampleError>
    where
        R: RngStream + ?Sized,
    {
        self.sample_with_report(request, stream)
            .map(|report| report.results)
    }

    /// Like [`NeighborSampler::sample_with_stream`], also returning per-hop
    /// counters.
    ///
    /// # Errors
    ///
    /// See [`NeighborSampler::sample`].
    #[instrument(
        skip_all,
        fields(
            seeds = request.starting_vertices.len(),
            hops = request.fan_out.len(),
            shards = self.graph.num_partitions(),
            workers = self.config.workers,
        )
    )]
    pub fn sample_with_report<R>(
        &self,
        request: SampleRequest<V>,
        stream: &R,
    ) -> Result<SampleReport<V, E, W>, SampleError>
    where
        R: RngStream + ?Sized,
    {
        let plan = CallPlan::prepare(self.graph, request)?;
        let shape = OutputShape {
            weights: self.graph.has_weights(),
            edge_ids: self.graph.has_edge_ids(),
            edge_types: self.graph.has_edge_types(),
            hops: plan.flags.return_hops,
            labels: plan.labelled,
        };
        let mut coordinator = HopCoordinator {
            graph: self.graph,
            config: self.config,
            stream,
            flags: plan.flags,
            fanouts: plan.fanouts,
            frontier: plan.frontier,
            assembler: ResultAssembler::new(shape, plan.label_count)?,
            stats: Vec::new(),
            state: HopState::Init,
        };
        while coordinator.state != HopState::Done {
            if let Err(err) = coordinator.step() {
                warn!(state = ?coordinator.state, error = %err, "sampling aborted");
                return Err(err);
            }
        }
        let results = coordinator.assembler.finish(plan.mapping.as_deref())?;
        Ok(SampleReport {
            results,
            hops: coordinator.stats,
        })
    }
}

/// A validated request.
struct CallPlan<V> {
    fanouts: Vec<Fanout>,
    frontier: Vec<FrontierEntry<V>>,
    label_count: usize,
    labelled: bool,
    mapping: Option<Vec<u32>>,
    flags: SampleFlags,
}

impl<V: VertexId> CallPlan<V> {
    fn prepare<E, W>(
        graph: &PartitionedGraph<V, E, W>,
        request: SampleRequest<V>,
    ) -> Result<Self, SampleError>
    where
        E: EdgeIdType,
        W: EdgeWeight,
    {
        let SampleRequest {
            starting_vertices,
            starting_labels,
            starting_label_offsets,
            label_to_output_shard,
            fan_out,
            flags,
        } = request;

        let fanouts = Fanout::parse_list(&fan_out)?;
        if Hop::try_from(fanouts.len()).is_err() {
            return Err(SampleError::invalid("too many hops"));
        }

        let labelled = starting_labels.is_some() || starting_label_offsets.is_some();
        let (labels, label_count) = resolve_labels(
            starting_vertices.len(),
            starting_labels,
            starting_label_offsets,
        )?;

        if let Some(mapping) = &label_to_output_shard {
            if !labelled {
                return Err(SampleError::invalid(
                    "label-to-output-shard mapping needs starting labels or offsets",
                ));
            }
            if mapping.len() != label_count {
                return Err(SampleError::invalid(format!(
                    "label-to-output-shard mapping has {} entries for {label_count} labels",
                    mapping.len()
                )));
            }
        }

        for &v in &starting_vertices {
            graph.owner_of(v)?;
        }

        let mut frontier = Vec::new();
        try_reserve(&mut frontier, starting_vertices.len(), "seed frontier")?;
        let mut seen = FxHashSet::default();
        for (position, (vertex, label)) in starting_vertices.into_iter().zip(labels).enumerate() {
            if flags.dedupe_sources && !seen.insert((label, vertex)) {
                continue;
            }
            frontier.push(FrontierEntry {
                vertex,
                label,
                lineage: seed_lineage(position),
            });
        }

        Ok(Self {
            fanouts,
            frontier,
            label_count,
            labelled,
            mapping: label_to_output_shard,
            flags,
        })
    }
}

/// Per-seed labels and the label count.
///
/// Unlabelled requests get a single implicit label `0`.
fn resolve_labels(
    seeds: usize,
    labels: Option<Vec<Label>>,
    offsets: Option<Vec<usize>>,
) -> Result<(Vec<Label>, usize), SampleError> {
    if let Some(labels) = &labels {
        if labels.len() != seeds {
            return Err(SampleError::invalid(format!(
                "{} starting labels for {seeds} starting vertices",
                labels.len()
            )));
        }
        if let Some(bad) = labels.iter().find(|l| **l < 0) {
            return Err(SampleError::invalid(format!("negative label {bad}")));
        }
    }

    match (labels, offsets) {
        (None, None) => Ok((vec![0; seeds], 1)),
        (Some(labels), None) => {
            let count = labels
                .iter()
                .max()
                .map_or(0, |max| max.unsigned_abs() as usize + 1);
            Ok((labels, count))
        }
        (given, Some(offsets)) => {
            if offsets.first() != Some(&0) {
                return Err(SampleError::invalid("label offsets must start at 0"));
            }
            if offsets.windows(2).any(|w| w[0] > w[1]) {
                return Err(SampleError::invalid("label offsets must be non-decreasing"));
            }
            if offsets.last() != Some(&seeds) {
                return Err(SampleError::invalid(format!(
                    "label offsets end at {:?}, expected {seeds}",
                    offsets.last()
                )));
            }
            let count = offsets.len() - 1;
            let mut derived = Vec::with_capacity(seeds);
            for (l, span) in offsets.windows(2).enumerate() {
                let label = Label::try_from(l)
                    .map_err(|_| SampleError::invalid("label count exceeds the label width"))?;
                derived.extend(std::iter::repeat_n(label, span[1] - span[0]));
            }
            if let Some(given) = given {
                if let Some(i) = given.iter().zip(&derived).position(|(a, b)| a != b) {
                    return Err(SampleError::invalid(format!(
                        "starting label {} of seed {i} disagrees with label offsets ({})",
                        given[i], derived[i]
                    )));
                }
            }
            Ok((derived, count))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HopState {
    Init,
    Hop(Hop),
    Done,
}

struct HopCoordinator<'a, V, E, W, R: ?Sized> {
    graph: &'a PartitionedGraph<V, E, W>,
    config: SamplerConfig,
    stream: &'a R,
    flags: SampleFlags,
    fanouts: Vec<Fanout>,
    frontier: Vec<FrontierEntry<V>>,
    assembler: ResultAssembler<V, E, W>,
    stats: Vec<HopStats>,
    state: HopState,
}

impl<V, E, W, R> HopCoordinator<'_, V, E, W, R>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
    R: RngStream + ?Sized,
{
    /// Advances the state machine by one transition.
    fn step(&mut self) -> Result<(), SampleError> {
        self.state = match self.state {
            HopState::Init => HopState::Hop(0),
            HopState::Hop(hop) => {
                self.run_hop(hop)?;
                let next = hop + 1;
                if (next as usize) < self.fanouts.len() {
                    HopState::Hop(next)
                } else {
                    HopState::Done
                }
            }
            HopState::Done => HopState::Done,
        };
        Ok(())
    }

    fn run_hop(&mut self, hop: Hop) -> Result<(), SampleError> {
        let fanout = self.fanouts[hop as usize];
        let routed = route(&self.frontier, self.graph, hop)?;
        let (routed_count, pruned) = (routed.routed(), routed.pruned);
        let units = build_work_units(routed, self.config.chunk_size);

        let graph = self.graph;
        let stream = self.stream;
        let frontier = &self.frontier;
        let with_replacement = self.flags.with_replacement;
        let job = |unit: &WorkUnit| -> Result<Vec<EntrySample<V, E, W>>, SampleError> {
            let partition = graph
                .partition(unit.shard)
                .ok_or_else(|| SampleError::invalid(format!("no shard {}", unit.shard)))?;
            let sampler = LocalSampler::new(partition, stream, with_replacement);
            let mut out = Vec::new();
            try_reserve(&mut out, unit.ordinals.len(), "work unit output")?;
            for &ordinal in &unit.ordinals {
                let edges = sampler
                    .sample(&frontier[ordinal], hop, fanout)
                    .map_err(|e| e.on_shard(unit.shard, hop))?;
                out.push(EntrySample { ordinal, edges });
            }
            Ok(out)
        };
        let outputs = execute_parallel(&units, self.config.workers, job)?;
        let merged = merge_hop(outputs);

        let edges: usize = merged.iter().map(|s| s.edges.len()).sum();
        self.assembler.append_hop(&merged)?;
        debug!(
            hop,
            frontier = self.frontier.len(),
            routed = routed_count,
            pruned,
            units = units.len(),
            edges,
            "hop complete"
        );
        self.stats.push(HopStats {
            hop,
            frontier: self.frontier.len(),
            routed: routed_count,
            pruned,
            units: units.len(),
            edges,
        });

        let last = hop as usize + 1 == self.fanouts.len();
        self.frontier = if last {
            Vec::new()
        } else {
            next_frontier(&self.frontier, &merged, edges, self.flags.dedupe_sources)?
        };
        Ok(())
    }
}

/// Sampled destinations in canonical order, inheriting label and lineage.
fn next_frontier<V, E, W>(
    frontier: &[FrontierEntry<V>],
    merged: &[EntrySample<V, E, W>],
    edges: usize,
    dedupe: bool,
) -> Result<Vec<FrontierEntry<V>>, SampleError>
where
    V: VertexId,
{
    let mut next = Vec::new();
    try_reserve(&mut next, edges, "next frontier")?;
    let mut seen = FxHashSet::default();
    for sample in merged {
        let parent = &frontier[sample.ordinal];
        for (draw, edge) in sample.edges.iter().enumerate() {
            if dedupe && !seen.insert((parent.label, edge.dst)) {
                continue;
            }
            next.push(FrontierEntry {
                vertex: edge.dst,
                label: parent.label,
                lineage: derive_lineage(parent.lineage, draw as u64),
            });
        }
    }
    Ok(next)
}
