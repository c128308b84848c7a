// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical merge of hop outputs and final result assembly.
//!
//! # Row Order
//!
//! Rows are grouped by label. Within a label they appear in hop order, then
//! frontier-ordinal order, then draw order. Because frontier ordinals are
//! assigned canonically, the order is the same for every shard and worker
//! count.
//!
//! # Label Offsets
//!
//! ```text
//! offsets[l]           = rows of all labels < l
//! offsets[label_count] = total rows
//! ```

use std::ops::Range;

use crate::error::{try_reserve, SampleError};
use crate::exec::UnitOutput;
use crate::ident::{EdgeType, Hop, Label};
use crate::sampler::SampleEdge;

/// Edges sampled from one frontier entry.
#[derive(Debug, Clone, PartialEq)]
pub struct EntrySample<V, E, W> {
    /// Frontier ordinal of the expanded entry.
    pub ordinal: usize,
    /// Sampled edges in draw order.
    pub edges: Vec<SampleEdge<V, E, W>>,
}

/// Flattens per-unit outputs into frontier-ordinal order.
pub fn merge_hop<V, E, W>(
    outputs: Vec<UnitOutput<Vec<EntrySample<V, E, W>>>>,
) -> Vec<EntrySample<V, E, W>> {
    let mut flat: Vec<EntrySample<V, E, W>> =
        outputs.into_iter().flat_map(|(_, samples)| samples).collect();
    flat.sort_by_key(|s| s.ordinal);
    debug_assert!(
        flat.windows(2).all(|w| w[0].ordinal < w[1].ordinal),
        "frontier entry expanded twice"
    );
    flat
}

/// Which optional output columns to materialize.
///
/// A column is present only when the matching input view or flag was
/// supplied; absent inputs never turn into synthesized defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputShape {
    /// Emit `weights`.
    pub weights: bool,
    /// Emit `edge_ids`.
    pub edge_ids: bool,
    /// Emit `edge_types`.
    pub edge_types: bool,
    /// Emit `hops`.
    pub hops: bool,
    /// Emit `labels` and `label_offsets`.
    pub labels: bool,
}

/// Final output of a sampling call (one per output shard).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SampleResult<V, E, W> {
    /// Source vertex per row.
    pub srcs: Vec<V>,
    /// Destination vertex per row.
    pub dsts: Vec<V>,
    /// Edge weight per row, when the graph carries weights.
    pub weights: Option<Vec<W>>,
    /// Edge id per row, when the graph carries edge ids.
    pub edge_ids: Option<Vec<E>>,
    /// Edge type per row, when the graph carries edge types.
    pub edge_types: Option<Vec<EdgeType>>,
    /// Hop per row, when `return_hops` was set.
    pub hops: Option<Vec<Hop>>,
    /// Label per row, when seeds were labelled.
    pub labels: Option<Vec<Label>>,
    /// Row range per label (`label_count + 1` entries), when seeds were
    /// labelled.
    pub label_offsets: Option<Vec<usize>>,
}

impl<V: Copy, E, W> SampleResult<V, E, W> {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.srcs.len()
    }

    /// True when nothing was sampled.
    pub fn is_empty(&self) -> bool {
        self.srcs.is_empty()
    }

    /// Row range of `label`, when label offsets are present.
    pub fn label_rows(&self, label: Label) -> Option<Range<usize>> {
        let offsets = self.label_offsets.as_ref()?;
        let l = usize::try_from(label).ok()?;
        Some(*offsets.get(l)?..*offsets.get(l + 1)?)
    }

    /// `(src, dst)` pairs in row order.
    pub fn pairs(&self) -> impl Iterator<Item = (V, V)> + '_ {
        self.srcs.iter().copied().zip(self.dsts.iter().copied())
    }
}

/// Accumulates hop outputs and lays them out by label.
#[derive(Debug)]
pub struct ResultAssembler<V, E, W> {
    shape: OutputShape,
    label_count: usize,
    rows: Vec<SampleEdge<V, E, W>>,
    per_label: Vec<usize>,
}

impl<V, E, W> ResultAssembler<V, E, W>
where
    V: Copy,
    E: Copy,
    W: Copy,
{
    /// Empty assembler for `label_count` labels.
    ///
    /// # Errors
    ///
    /// [`SampleError::AllocationFailure`] when the per-label counters cannot
    /// be reserved.
    pub fn new(shape: OutputShape, label_count: usize) -> Result<Self, SampleError> {
        let mut per_label = Vec::new();
        try_reserve(&mut per_label, label_count, "per-label row counts")?;
        per_label.resize(label_count, 0);
        Ok(Self {
            shape,
            label_count,
            rows: Vec::new(),
            per_label,
        })
    }

    /// Rows accumulated so far.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True before any row was appended.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Appends one hop's merged output.
    ///
    /// # Errors
    ///
    /// [`SampleError::AllocationFailure`] when the row buffer cannot grow;
    /// [`SampleError::InvalidArgument`] for a label outside the declared
    /// label count.
    pub fn append_hop(&mut self, merged: &[EntrySample<V, E, W>]) -> Result<(), SampleError> {
        let added: usize = merged.iter().map(|s| s.edges.len()).sum();
        try_reserve(&mut self.rows, added, "sample result rows")?;
        for edge in merged.iter().flat_map(|s| s.edges.iter()) {
            let slot = usize::try_from(edge.label)
                .ok()
                .filter(|l| *l < self.label_count)
                .ok_or_else(|| {
                    SampleError::invalid(format!("label {} outside label space", edge.label))
                })?;
            self.per_label[slot] += 1;
            self.rows.push(*edge);
        }
        Ok(())
    }

    /// Lays rows out by label and splits them across output shards.
    ///
    /// Without a mapping a single result is returned. With a mapping of one
    /// shard per label, `max(mapping) + 1` results are returned; each keeps
    /// the global label indexing of `label_offsets`, with empty ranges for
    /// labels routed elsewhere.
    ///
    /// # Errors
    ///
    /// [`SampleError::InvalidArgument`] when the mapping length differs from
    /// the label count; [`SampleError::AllocationFailure`] when an output
    /// buffer cannot be reserved.
    pub fn finish(self, mapping: Option<&[u32]>) -> Result<Vec<SampleResult<V, E, W>>, SampleError> {
        if let Some(mapping) = mapping {
            if mapping.len() != self.label_count {
                return Err(SampleError::invalid(format!(
                    "label-to-output-shard mapping has {} entries for {} labels",
                    mapping.len(),
                    self.label_count
                )));
            }
        }

        // Stable counting sort by label.
        let offset_len = self.label_count.saturating_add(1);
        let mut starts = Vec::new();
        try_reserve(&mut starts, offset_len, "label starts")?;
        starts.push(0_usize);
        let mut total = 0_usize;
        for count in &self.per_label {
            total += count;
            starts.push(total);
        }
        let mut cursor = Vec::new();
        try_reserve(&mut cursor, offset_len, "label cursors")?;
        cursor.extend_from_slice(&starts);
        let mut order = Vec::new();
        try_reserve(&mut order, self.rows.len(), "label order")?;
        order.resize(self.rows.len(), 0_usize);
        for (row, edge) in self.rows.iter().enumerate() {
            let slot = edge.label.unsigned_abs() as usize;
            order[cursor[slot]] = row;
            cursor[slot] += 1;
        }

        let shard_count = mapping
            .and_then(|m| m.iter().max())
            .map_or(1, |max| *max as usize + 1);
        let mut results = Vec::new();
        try_reserve(&mut results, shard_count, "output shards")?;
        for shard in 0..shard_count {
            let owns = |label: usize| mapping.is_none_or(|m| m[label] as usize == shard);
            let mut offsets = Vec::new();
            try_reserve(&mut offsets, offset_len, "label offsets")?;
            offsets.push(0_usize);
            let mut picked: Vec<usize> = Vec::new();
            for label in 0..self.label_count {
                if owns(label) {
                    let span = starts[label]..starts[label + 1];
                    try_reserve(&mut picked, span.len(), "output shard rows")?;
                    picked.extend_from_slice(&order[span]);
                }
                offsets.push(picked.len());
            }
            results.push(self.gather(&picked, offsets));
        }
        Ok(results)
    }

    fn gather(&self, picked: &[usize], offsets: Vec<usize>) -> SampleResult<V, E, W> {
        let rows = || picked.iter().map(|&r| &self.rows[r]);
        let shape = self.shape;
        SampleResult {
            srcs: rows().map(|e| e.src).collect(),
            dsts: rows().map(|e| e.dst).collect(),
            weights: shape
                .weights
                .then(|| rows().filter_map(|e| e.weight).collect()),
            edge_ids: shape
                .edge_ids
                .then(|| rows().filter_map(|e| e.edge_id).collect()),
            edge_types: shape
                .edge_types
                .then(|| rows().filter_map(|e| e.edge_type).collect()),
            hops: shape.hops.then(|| rows().map(|e| e.hop).collect()),
            labels: shape.labels.then(|| rows().map(|e| e.label).collect()),
            label_offsets: shape.labels.then_some(offsets),
        }
    }
}
