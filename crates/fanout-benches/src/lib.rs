// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared setup for the fanout-core benchmarks.
#![forbid(unsafe_code)]

use fanout_core::{PartitionedGraph, SampleError};
use fanout_dry_tests::random_graph;

/// Vertex count of the benchmark graph.
pub const BENCH_VERTICES: u64 = 20_000;

/// Maximum out-degree of the benchmark graph.
pub const BENCH_MAX_DEGREE: u64 = 32;

/// Weighted random graph split into `shards` partitions.
pub fn bench_graph(shards: usize) -> Result<PartitionedGraph<i64, i64, f32>, SampleError> {
    let builder = random_graph(BENCH_VERTICES, BENCH_MAX_DEGREE, 0x0bad_5eed);
    let weights = (0..builder.edge_count())
        .map(|i| f32::from(u8::try_from(i % 13).unwrap_or(0)) + 1.0)
        .collect();
    builder.weights(weights).build(shards)
}

/// Evenly spaced seed vertices.
pub fn bench_seeds(count: usize) -> Vec<i64> {
    let step = (BENCH_VERTICES as usize / count.max(1)).max(1);
    (0..count).map(|i| ((i * step) % BENCH_VERTICES as usize) as i64).collect()
}
