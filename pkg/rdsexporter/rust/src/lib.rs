// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

// Correctness
#![deny(clippy::indexing_slicing)]
#![deny(clippy::string_slice)]
#![deny(clippy::cast_possible_wrap)]
#![deny(clippy::undocumented_unsafe_blocks)]
// Panicking code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unimplemented)]
#![deny(clippy::todo)]
// Debug code that shouldn't be in production
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]

//! Prometheus exporter for Amazon RDS instances: low-resolution engine
//! statistics and high-resolution OS metrics, scraped on demand.

pub mod aws;
pub mod basic;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod collector;
pub mod config;
pub mod enhanced;
pub mod errors;
pub mod metrics;
pub mod server;
pub mod sessions;
pub mod stats;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_utils;

pub use collector::Exporter;
pub use errors::{Error, Result};
pub use sessions::{Instance, SessionPool};
