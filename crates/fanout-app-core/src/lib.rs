// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared application services for fanout tools (config, sampling profiles).
//! Keeps storage adapters thin and independent of the sampling engine.
#![forbid(unsafe_code)]

pub mod config;
pub mod profile;

pub use config::{ConfigError, ConfigService, ConfigStore};
pub use profile::{ProfileService, SamplingProfile, DEFAULT_PROFILE, MAX_PROFILE_WORKERS};
