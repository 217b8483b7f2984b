// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use clap::Parser;
use log::Level;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rds-exporter", version, about = "Prometheus exporter for Amazon RDS")]
pub struct Args {
    /// Address on which to expose metrics and web interface.
    #[arg(long = "web.listen-address", default_value = "0.0.0.0:9042")]
    pub listen_address: SocketAddr,

    /// Path under which to expose exporter's metrics.
    #[arg(long = "web.telemetry-path", default_value = "/metrics")]
    pub telemetry_path: String,

    /// Path to the YAML configuration file.
    #[arg(long = "config.file", default_value = "config.yml")]
    pub config_file: PathBuf,

    #[arg(long = "log.level", default_value = "info")]
    pub log_level: Level,

    /// Log every upstream request. Refused when running under CI.
    #[arg(long = "log.trace")]
    pub trace: bool,

    /// Parse flags and exit.
    #[arg(long)]
    pub check: bool,
}

impl Args {
    /// Effective log level; tracing upstream requests needs at least debug.
    pub fn level(&self) -> Level {
        if self.trace {
            self.log_level.max(Level::Debug)
        } else {
            self.log_level
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["rds-exporter"]).unwrap();
        assert_eq!(args.listen_address, "0.0.0.0:9042".parse().unwrap());
        assert_eq!(args.telemetry_path, "/metrics");
        assert_eq!(args.config_file, PathBuf::from("config.yml"));
        assert_eq!(args.level(), Level::Info);
        assert!(!args.trace);
        assert!(!args.check);
    }

    #[test]
    fn test_dotted_flags() {
        let args = Args::try_parse_from([
            "rds-exporter",
            "--web.listen-address",
            "127.0.0.1:9100",
            "--web.telemetry-path=/rds",
            "--config.file",
            "/etc/rds.yml",
            "--log.level",
            "warn",
            "--log.trace",
        ])
        .unwrap();
        assert_eq!(args.listen_address.port(), 9100);
        assert_eq!(args.telemetry_path, "/rds");
        assert_eq!(args.config_file, PathBuf::from("/etc/rds.yml"));
        assert_eq!(args.log_level, Level::Warn);
        assert_eq!(args.level(), Level::Debug);
    }

    #[test]
    fn test_invalid_listen_address() {
        assert!(Args::try_parse_from(["rds-exporter", "--web.listen-address", "nope"]).is_err());
    }
}
