// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Order-insensitive views of sampling results.

use fanout_core::{SampleResult, VertexId};

/// `(src, dst)` rows sorted, for multiset comparisons.
pub fn sorted_pairs<V: VertexId, E, W>(result: &SampleResult<V, E, W>) -> Vec<(V, V)> {
    let mut pairs: Vec<(V, V)> = result.pairs().collect();
    pairs.sort_unstable();
    pairs
}

/// Destinations sampled from `src` within `rows`, sorted.
pub fn destinations_of<V: VertexId, E, W>(
    result: &SampleResult<V, E, W>,
    rows: std::ops::Range<usize>,
    src: V,
) -> Vec<V> {
    let mut dsts: Vec<V> = rows
        .filter(|&r| result.srcs[r] == src)
        .map(|r| result.dsts[r])
        .collect();
    dsts.sort_unstable();
    dsts
}
