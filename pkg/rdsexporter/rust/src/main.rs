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

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use rds_exporter::aws::AwsClientFactory;
use rds_exporter::cli::Args;
use rds_exporter::config::load_config;
use rds_exporter::metrics::Collect;
use rds_exporter::server::{self, MetricsService};
use rds_exporter::stats::RequestStats;
use rds_exporter::{Exporter, SessionPool};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.check {
        return Ok(());
    }

    let log_level = args.level();
    simple_logger::init_with_level(log_level)?;
    info!(
        "Starting RDS exporter {} (log level {:?})",
        env!("CARGO_PKG_VERSION"),
        log_level
    );

    let config = load_config(&args.config_file).with_context(|| {
        format!(
            "Can't read configuration file {}",
            args.config_file.display()
        )
    })?;

    let stats = Arc::new(RequestStats::new());
    let factory = AwsClientFactory::new(Arc::clone(&stats), args.trace).await?;
    let pool = SessionPool::build(&config.instances, &factory)
        .await
        .context("Can't create sessions")?;

    let exporter = Exporter::new(pool, config.basic, config.max_concurrency);
    let collectors: Vec<Arc<dyn Collect>> = vec![Arc::new(exporter), stats];

    let listener = TcpListener::bind(args.listen_address)
        .await
        .with_context(|| format!("Failed to listen on {}", args.listen_address))?;
    info!(
        "Metrics: http://{}{}",
        args.listen_address, args.telemetry_path
    );

    server::run(listener, MetricsService::new(collectors, args.telemetry_path)).await
}
