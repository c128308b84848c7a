// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for fanout crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`graphs`] - Edge-list graph builder and canned graphs
//! - [`results`] - Order-insensitive views of sampling results

pub mod config;
pub mod graphs;
pub mod results;

pub use config::InMemoryConfigStore;
pub use graphs::{random_graph, ring_graph, scenario_graph, EdgeListBuilder, SHARD_COUNTS};
pub use results::{destinations_of, sorted_pairs};
