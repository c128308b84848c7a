// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use fanout_core::{
    EdgeIdType, EdgeWeight, NeighborSampler, PartitionedGraph, RngState, SampleError,
    SampleRequest, SampleResult, SamplerConfig, VertexId,
};

/// Worker counts exercised by invariance tests.
pub const WORKER_COUNTS: &[usize] = &[1, 2, 4, 8];

/// Seeds exercised by determinism tests.
pub const SEEDS: &[u64] = &[0, 1, 42, 0xdead_beef, u64::MAX];

/// Runs `request` on `graph` with a fresh RNG state seeded by `seed`.
pub fn run<V, E, W>(
    graph: &PartitionedGraph<V, E, W>,
    config: SamplerConfig,
    request: SampleRequest<V>,
    seed: u64,
) -> Result<Vec<SampleResult<V, E, W>>, SampleError>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    NeighborSampler::new(graph, config).sample(request, &mut RngState::new(seed))
}

/// Like [`run`], expecting exactly one output shard.
pub fn run_single<V, E, W>(
    graph: &PartitionedGraph<V, E, W>,
    request: SampleRequest<V>,
    seed: u64,
) -> SampleResult<V, E, W>
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    let mut results = run(graph, SamplerConfig::serial(), request, seed).unwrap();
    assert_eq!(results.len(), 1, "expected a single output shard");
    results.remove(0)
}

/// Asserts label offsets are well formed and agree with the label column.
pub fn assert_label_offsets<V: VertexId, E, W>(result: &SampleResult<V, E, W>, label_count: usize) {
    let offsets = result.label_offsets.as_ref().unwrap();
    let labels = result.labels.as_ref().unwrap();
    assert_eq!(offsets.len(), label_count + 1);
    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[0] <= w[1]), "{offsets:?}");
    assert_eq!(offsets[label_count], result.len());
    for label in 0..label_count {
        let span = offsets[label]..offsets[label + 1];
        assert!(
            labels[span].iter().all(|l| *l as usize == label),
            "rows of label {label} are not contiguous"
        );
    }
}
