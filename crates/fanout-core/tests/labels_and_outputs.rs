// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Label handling, output-shard mapping and optional output columns.
#![allow(clippy::unwrap_used)]

mod common;

use common::{assert_label_offsets, run, run_single};
use fanout_core::{
    EdgeIdType, EdgeWeight, PartitionedGraph, SampleRequest, SamplerConfig, VertexId,
};
use fanout_dry_tests::{scenario_graph, sorted_pairs, EdgeListBuilder};

fn scenario() -> PartitionedGraph<i32, i32, f32> {
    scenario_graph().build(2).unwrap()
}

#[test]
fn label_offsets_input_groups_seeds() {
    let graph = scenario();
    // label 0: [0], label 1: [], label 2: [1, 0]
    let request = SampleRequest::new(vec![0, 1, 0], vec![-1]).with_label_offsets(vec![0, 1, 1, 3]);
    let result = run_single(&graph, request, 3);
    assert_label_offsets(&result, 3);
    assert_eq!(result.label_offsets, Some(vec![0, 3, 3, 7]));
    assert_eq!(result.label_rows(1), Some(3..3));
}

#[test]
fn labels_and_matching_offsets_are_accepted() {
    let graph = scenario();
    let request = SampleRequest::new(vec![0, 1], vec![-1])
        .with_labels(vec![0, 1])
        .with_label_offsets(vec![0, 1, 2]);
    let result = run_single(&graph, request, 3);
    assert_eq!(result.label_offsets, Some(vec![0, 3, 4]));
}

#[test]
fn sparse_labels_leave_empty_ranges() {
    let graph = scenario();
    let request = SampleRequest::new(vec![1, 0], vec![-1]).with_labels(vec![3, 1]);
    let result = run_single(&graph, request, 3);
    assert_label_offsets(&result, 4);
    assert_eq!(result.label_offsets, Some(vec![0, 0, 3, 3, 4]));
    assert_eq!(result.labels, Some(vec![1, 1, 1, 3]));
}

#[test]
fn labelled_request_without_seeds_is_empty_with_single_offset() {
    let graph = scenario();
    let request = SampleRequest::new(vec![], vec![2]).with_labels(vec![]);
    let result = run_single(&graph, request, 3);
    assert!(result.is_empty());
    assert_eq!(result.label_offsets, Some(vec![0]));
    assert_eq!(result.labels, Some(vec![]));
}

#[test]
fn unlabelled_request_without_seeds_is_empty() {
    let graph = scenario();
    let result = run_single(&graph, SampleRequest::new(vec![], vec![2]), 3);
    assert!(result.is_empty());
    assert_eq!(result.label_offsets, None);
}

#[test]
fn mapping_routes_labels_to_output_shards() {
    let graph = scenario();
    let request = SampleRequest::new(vec![0, 1, 1], vec![-1])
        .with_labels(vec![0, 1, 2])
        .with_output_mapping(vec![2, 0, 2]);
    let results = run(&graph, SamplerConfig::serial(), request, 9).unwrap();
    assert_eq!(results.len(), 3);

    assert_eq!(sorted_pairs(&results[0]), vec![(1, 2)]);
    assert_eq!(results[0].label_offsets, Some(vec![0, 0, 1, 1]));

    assert!(results[1].is_empty());
    assert_eq!(results[1].label_offsets, Some(vec![0, 0, 0, 0]));

    assert_eq!(
        sorted_pairs(&results[2]),
        vec![(0, 1), (0, 2), (0, 3), (1, 2)]
    );
    assert_eq!(results[2].label_offsets, Some(vec![0, 3, 3, 4]));
    assert_eq!(results[2].labels, Some(vec![0, 0, 0, 2]));
}

#[test]
fn optional_columns_follow_inputs() {
    let bare = run_single(&scenario(), SampleRequest::new(vec![0], vec![-1]), 1);
    assert_eq!(bare.weights, None);
    assert_eq!(bare.edge_ids, None);
    assert_eq!(bare.edge_types, None);
    assert_eq!(bare.hops, None);

    let graph: PartitionedGraph<i32, i64, f64> = scenario_graph()
        .weights(vec![0.25, 0.5, 0.75, 1.0])
        .edge_ids(vec![100, 101, 102, 103])
        .edge_types(vec![1, 2, 3, 4])
        .build(2)
        .unwrap();
    let full = run_single(
        &graph,
        SampleRequest::new(vec![0], vec![-1, -1]).return_hops(true),
        1,
    );
    assert_eq!(full.pairs().collect::<Vec<_>>(), vec![(0, 1), (0, 2), (0, 3), (1, 2)]);
    assert_eq!(full.weights, Some(vec![0.25, 0.5, 0.75, 1.0]));
    assert_eq!(full.edge_ids, Some(vec![100, 101, 102, 103]));
    assert_eq!(full.edge_types, Some(vec![1, 2, 3, 4]));
    assert_eq!(full.hops, Some(vec![0, 0, 0, 1]));
}

#[test]
fn converging_paths_are_kept_unless_deduped() {
    // 0 -> {1, 2}, 1 -> {3}, 2 -> {3}, 3 -> {0}
    let graph: PartitionedGraph<i32, i32, f32> = EdgeListBuilder::new(4)
        .edges([(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)])
        .build(2)
        .unwrap();

    let kept = run_single(&graph, SampleRequest::new(vec![0], vec![-1, -1, -1]), 1);
    // Vertex 3 is reached twice at hop 1, so it is expanded twice at hop 2.
    assert_eq!(
        sorted_pairs(&kept),
        vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 0), (3, 0)]
    );

    let deduped = run_single(
        &graph,
        SampleRequest::new(vec![0], vec![-1, -1, -1]).dedupe_sources(true),
        1,
    );
    assert_eq!(
        sorted_pairs(&deduped),
        vec![(0, 1), (0, 2), (1, 3), (2, 3), (3, 0)]
    );
}

fn scenario_rows_for<V, E, W>()
where
    V: VertexId,
    E: EdgeIdType,
    W: EdgeWeight,
{
    let graph: PartitionedGraph<V, E, W> = scenario_graph().build(3).unwrap();
    let seed = V::from_index(0).unwrap();
    let result = run_single(&graph, SampleRequest::new(vec![seed], vec![-1, 1]), 4);
    let dsts: Vec<u64> = result
        .dsts
        .iter()
        .map(|d| d.to_index().unwrap())
        .collect();
    assert_eq!(&dsts[..3], &[1, 2, 3]);
    assert_eq!(&dsts[3..], &[2]);
}

#[test]
fn every_width_combination_samples_the_same_graph() {
    scenario_rows_for::<i32, i32, f32>();
    scenario_rows_for::<i32, i64, f32>();
    scenario_rows_for::<i32, i64, f64>();
    scenario_rows_for::<i64, i64, f32>();
    scenario_rows_for::<i64, i64, f64>();
    scenario_rows_for::<u32, u32, f32>();
    scenario_rows_for::<u64, u64, f64>();
}
