// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use crate::errors::Error;
use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PERIOD_SECONDS: u64 = 60;
pub const DEFAULT_DELAY_SECONDS: u64 = 600;
pub const DEFAULT_RANGE_SECONDS: u64 = 600;
pub const DEFAULT_MAX_CONCURRENCY: usize = 64;
/// Upper bound for `delay_seconds` and `range_seconds`: CloudWatch keeps
/// statistics for at most 455 days.
pub const MAX_WINDOW_SECONDS: u64 = 455 * 86_400;

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub basic: BasicSettings,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    pub instances: Vec<InstanceConfig>,
}

/// Window of the low-resolution statistics query: `[now - delay - range, now - delay]`
/// aggregated by `period`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BasicSettings {
    pub period_seconds: u64,
    pub delay_seconds: u64,
    pub range_seconds: u64,
}

impl Default for BasicSettings {
    fn default() -> Self {
        Self {
            period_seconds: DEFAULT_PERIOD_SECONDS,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            range_seconds: DEFAULT_RANGE_SECONDS,
        }
    }
}

impl BasicSettings {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub fn range(&self) -> Duration {
        Duration::from_secs(self.range_seconds)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InstanceConfig {
    pub region: String,
    pub instance: String,
    #[serde(default)]
    pub aws_access_key: Option<String>,
    #[serde(default)]
    pub aws_secret_key: Option<String>,
    #[serde(default)]
    pub aws_role_arn: Option<String>,
    #[serde(default)]
    pub disable_basic_metrics: bool,
    #[serde(default)]
    pub disable_enhanced_metrics: bool,
    /// Extra constant labels. An empty value removes the default label of that name.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Where a scope's credentials come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Static {
        access_key: String,
        secret_key: String,
    },
    AssumeRole {
        role_arn: String,
    },
    Ambient,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl InstanceConfig {
    pub fn credential_source(&self) -> CredentialSource {
        if let (Some(access_key), Some(secret_key)) = (
            non_empty(&self.aws_access_key),
            non_empty(&self.aws_secret_key),
        ) {
            return CredentialSource::Static {
                access_key: access_key.to_string(),
                secret_key: secret_key.to_string(),
            };
        }
        if let Some(role_arn) = non_empty(&self.aws_role_arn) {
            return CredentialSource::AssumeRole {
                role_arn: role_arn.to_string(),
            };
        }
        CredentialSource::Ambient
    }

    /// Identity used to share one client between instances. Empty for ambient credentials.
    pub fn credential_identity(&self) -> String {
        match self.credential_source() {
            CredentialSource::Static { access_key, .. } => access_key,
            CredentialSource::AssumeRole { role_arn } => role_arn,
            CredentialSource::Ambient => String::new(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), Error> {
        if self.instances.is_empty() {
            return Err(Error::Config("at least one instance must be present".into()));
        }
        for (i, instance) in self.instances.iter().enumerate() {
            if instance.region.is_empty() {
                return Err(Error::Config(format!("instance #{i}: region is empty")));
            }
            if instance.instance.is_empty() {
                return Err(Error::Config(format!("instance #{i}: instance is empty")));
            }
        }
        if self.basic.period_seconds == 0 {
            return Err(Error::Config("basic.period_seconds must be positive".into()));
        }
        if self.basic.range_seconds < self.basic.period_seconds {
            return Err(Error::Config(
                "basic.range_seconds must not be shorter than basic.period_seconds".into(),
            ));
        }
        for (name, value) in [
            ("delay_seconds", self.basic.delay_seconds),
            ("range_seconds", self.basic.range_seconds),
        ] {
            if value > MAX_WINDOW_SECONDS {
                return Err(Error::Config(format!(
                    "basic.{name} must not exceed {MAX_WINDOW_SECONDS}"
                )));
            }
        }
        if self.max_concurrency == 0 {
            return Err(Error::Config("max_concurrency must be positive".into()));
        }
        Ok(())
    }

    /// Drop repeated `(region, instance)` entries, keeping the first.
    fn dedup_instances(&mut self) {
        let mut seen = HashSet::new();
        self.instances.retain(|i| {
            let fresh = seen.insert((i.region.clone(), i.instance.clone()));
            if !fresh {
                warn!(
                    "ignoring duplicate configuration for {}/{}",
                    i.region, i.instance
                );
            }
            fresh
        });
    }
}

pub fn parse_config(contents: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(contents).context("parsing configuration")?;
    config.dedup_instances();
    config.validate()?;
    if config.basic.delay_seconds != DEFAULT_DELAY_SECONDS {
        warn!(
            "using custom CloudWatch delay of {}s; a small delay may read incomplete statistics",
            config.basic.delay_seconds
        );
    }
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("loading {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
basic:
  period_seconds: 120
  delay_seconds: 300
  range_seconds: 900
max_concurrency: 8
instances:
  - region: us-east-1
    instance: aurora-mysql-56
    aws_access_key: AKIAEXAMPLE
    aws_secret_key: secret
    labels:
      team: storage
      instance: ""
  - region: us-west-2
    instance: psql-10
    aws_role_arn: arn:aws:iam::123456789012:role/rds-reader
    disable_enhanced_metrics: true
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.basic.period(), Duration::from_secs(120));
        assert_eq!(config.basic.delay(), Duration::from_secs(300));
        assert_eq!(config.basic.range(), Duration::from_secs(900));
        assert_eq!(config.max_concurrency, 8);
        assert_eq!(config.instances.len(), 2);

        let first = &config.instances[0];
        assert_eq!(
            first.credential_source(),
            CredentialSource::Static {
                access_key: "AKIAEXAMPLE".into(),
                secret_key: "secret".into()
            }
        );
        assert_eq!(first.labels.get("team").map(String::as_str), Some("storage"));
        assert_eq!(first.labels.get("instance").map(String::as_str), Some(""));

        let second = &config.instances[1];
        assert!(second.disable_enhanced_metrics);
        assert!(!second.disable_basic_metrics);
        assert_eq!(
            second.credential_identity(),
            "arn:aws:iam::123456789012:role/rds-reader"
        );
    }

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = parse_config("instances:\n  - region: us-east-1\n    instance: db\n").unwrap();
        assert_eq!(config.basic, BasicSettings::default());
        assert_eq!(config.max_concurrency, DEFAULT_MAX_CONCURRENCY);
        assert_eq!(config.instances[0].credential_source(), CredentialSource::Ambient);
        assert_eq!(config.instances[0].credential_identity(), "");
    }

    #[test]
    fn test_access_key_without_secret_is_ambient() {
        let instance = InstanceConfig {
            region: "us-east-1".into(),
            instance: "db".into(),
            aws_access_key: Some("AKIAEXAMPLE".into()),
            aws_secret_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(instance.credential_source(), CredentialSource::Ambient);
    }

    #[test]
    fn test_static_credentials_win_over_role() {
        let instance = InstanceConfig {
            region: "us-east-1".into(),
            instance: "db".into(),
            aws_access_key: Some("AKIAEXAMPLE".into()),
            aws_secret_key: Some("secret".into()),
            aws_role_arn: Some("arn:aws:iam::1:role/r".into()),
            ..Default::default()
        };
        assert_eq!(instance.credential_identity(), "AKIAEXAMPLE");
    }

    #[test]
    fn test_rejects_empty_instances() {
        let err = parse_config("instances: []\n").unwrap_err();
        assert!(format!("{err:#}").contains("at least one instance"));
    }

    #[test]
    fn test_rejects_missing_region() {
        let err = parse_config("instances:\n  - region: \"\"\n    instance: db\n").unwrap_err();
        assert!(format!("{err:#}").contains("region is empty"));
    }

    #[test]
    fn test_rejects_range_shorter_than_period() {
        let yaml = "basic:\n  period_seconds: 60\n  range_seconds: 30\n\
                    instances:\n  - region: r\n    instance: i\n";
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn test_rejects_oversized_window() {
        let instances = "instances:\n  - region: r\n    instance: i\n";
        for basic in [
            "basic:\n  delay_seconds: 18446744073709551615\n",
            "basic:\n  range_seconds: 39312001\n",
        ] {
            let err = parse_config(&format!("{basic}{instances}")).unwrap_err();
            assert!(format!("{err:#}").contains("must not exceed"));
        }
        let longest = format!("basic:\n  range_seconds: {MAX_WINDOW_SECONDS}\n{instances}");
        assert!(parse_config(&longest).is_ok());
    }

    #[test]
    fn test_rejects_zero_concurrency() {
        let yaml = "max_concurrency: 0\ninstances:\n  - region: r\n    instance: i\n";
        assert!(parse_config(yaml).is_err());
    }

    #[test]
    fn test_duplicate_instances_keep_first() {
        let yaml = r#"
instances:
  - region: us-east-1
    instance: db
  - region: us-east-1
    instance: db
    disable_basic_metrics: true
  - region: us-west-2
    instance: db
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.instances.len(), 2);
        assert!(!config.instances[0].disable_basic_metrics);
        assert_eq!(config.instances[1].region, "us-west-2");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "instances:\n  - region: eu-west-1\n    instance: db\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.instances[0].region, "eu-west-1");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.yml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "instances: [: bad").unwrap();
        assert!(load_config(&path).is_err());
    }
}
