// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

//! Groups configured instances into credential scopes, builds one client per
//! scope and resolves each instance's resource ID through paginated discovery.
//! The pool is immutable once built.

use crate::client::{ClientFactory, CloudApi, DiscoveryPage, ScopeKey};
use crate::config::InstanceConfig;
use crate::errors::{Error, Result};
use crate::metrics::{Labels, const_labels};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub region: String,
    pub name: String,
    pub disable_basic_metrics: bool,
    pub disable_enhanced_metrics: bool,
    pub labels: BTreeMap<String, String>,
    /// Stable upstream identifier; empty until discovery resolves it.
    pub resource_id: String,
    /// Zero when high-resolution monitoring is off for the instance.
    pub monitoring_interval: Duration,
}

impl Instance {
    fn from_config(config: &InstanceConfig) -> Self {
        Self {
            region: config.region.clone(),
            name: config.instance.clone(),
            disable_basic_metrics: config.disable_basic_metrics,
            disable_enhanced_metrics: config.disable_enhanced_metrics,
            labels: config.labels.clone(),
            resource_id: String::new(),
            monitoring_interval: Duration::ZERO,
        }
    }

    pub fn const_labels(&self) -> Labels {
        const_labels(&self.region, &self.name, &self.labels)
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.name)
    }
}

/// Instances sharing a region and credential identity, and their shared client.
pub struct CredentialScope {
    key: ScopeKey,
    client: Arc<dyn CloudApi>,
    instances: Vec<Arc<Instance>>,
}

impl CredentialScope {
    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    pub fn client(&self) -> &Arc<dyn CloudApi> {
        &self.client
    }

    pub fn instances(&self) -> &[Arc<Instance>] {
        &self.instances
    }
}

impl fmt::Debug for CredentialScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialScope")
            .field("key", &self.key)
            .field("instances", &self.instances)
            .finish_non_exhaustive()
    }
}

struct PendingScope {
    key: ScopeKey,
    client: Arc<dyn CloudApi>,
    instances: Vec<Instance>,
}

#[derive(Debug)]
pub struct SessionPool {
    scopes: Vec<CredentialScope>,
    index: HashMap<(String, String), (usize, usize)>,
}

impl SessionPool {
    /// Builds the pool. Only client construction failures are fatal; discovery
    /// failures leave the affected instances unresolved, and those are dropped.
    pub async fn build(configs: &[InstanceConfig], factory: &dyn ClientFactory) -> Result<Self> {
        info!("Creating sessions...");
        let mut pending: Vec<PendingScope> = Vec::new();
        for config in configs {
            let key = ScopeKey::new(&config.region, config.credential_identity());
            let instance = Instance::from_config(config);
            if let Some(scope) = pending.iter_mut().find(|s| s.key == key) {
                scope.instances.push(instance);
                continue;
            }
            let client = factory.connect(&key, &config.credential_source()).await?;
            debug!("[{}] client ready", key.region);
            pending.push(PendingScope {
                key,
                client,
                instances: vec![instance],
            });
        }

        for scope in &mut pending {
            resolve(scope).await;
        }

        let mut scopes = Vec::new();
        let mut index = HashMap::new();
        for scope in pending {
            let mut instances = Vec::new();
            for instance in scope.instances {
                if instance.resource_id.is_empty() {
                    error!(
                        "{}",
                        Error::UnresolvedInstance {
                            instance: instance.to_string()
                        }
                    );
                    continue;
                }
                index.insert(
                    (instance.region.clone(), instance.name.clone()),
                    (scopes.len(), instances.len()),
                );
                instances.push(Arc::new(instance));
            }
            if instances.is_empty() {
                warn!("[{}] no instances resolved, dropping scope", scope.key.region);
                continue;
            }
            scopes.push(CredentialScope {
                key: scope.key,
                client: scope.client,
                instances,
            });
        }

        let pool = Self { scopes, index };
        pool.log_table();
        Ok(pool)
    }

    pub fn scopes(&self) -> &[CredentialScope] {
        &self.scopes
    }

    /// Every resolved instance together with its scope.
    pub fn instances(&self) -> impl Iterator<Item = (&CredentialScope, &Arc<Instance>)> {
        self.scopes
            .iter()
            .flat_map(|scope| scope.instances.iter().map(move |i| (scope, i)))
    }

    /// Looks up a resolved instance and the scope owning it.
    pub fn get(&self, region: &str, name: &str) -> Option<(&CredentialScope, &Arc<Instance>)> {
        let &(s, i) = self.index.get(&(region.to_string(), name.to_string()))?;
        let scope = self.scopes.get(s)?;
        scope.instances.get(i).map(|instance| (scope, instance))
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn log_table(&self) {
        info!(
            "{:<20} {:<40} {:<30} {}",
            "Region", "Instance", "Resource ID", "Interval"
        );
        for (_, instance) in self.instances() {
            info!(
                "{:<20} {:<40} {:<30} {:?}",
                instance.region, instance.name, instance.resource_id, instance.monitoring_interval
            );
        }
        info!("Using {} sessions.", self.scopes.len());
    }
}

/// Walks the discovery listing for `scope` and fills in resource IDs of the
/// configured instances. Stops at the first failing page.
async fn resolve(scope: &mut PendingScope) {
    let mut marker = None;
    loop {
        let page: DiscoveryPage = match scope.client.list_instances(marker.take()).await {
            Ok(page) => page,
            Err(e) => {
                let err = Error::Discovery {
                    scope: scope.key.to_string(),
                    source: Box::new(e),
                };
                error!("[{}] {err}", scope.key.region);
                return;
            }
        };
        for record in page.instances {
            for instance in scope.instances.iter_mut().filter(|i| i.name == record.name) {
                instance.resource_id = record.resource_id.clone();
                instance.monitoring_interval = record.monitoring_interval;
            }
        }
        match page.next_marker {
            Some(next) => marker = Some(next),
            None => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::DiscoveredInstance;
    use crate::test_utils::{FakeCloud, FakeFactory};

    fn instance_config(region: &str, name: &str) -> InstanceConfig {
        InstanceConfig {
            region: region.to_string(),
            instance: name.to_string(),
            ..Default::default()
        }
    }

    fn discovered(name: &str, resource_id: &str) -> DiscoveredInstance {
        DiscoveredInstance {
            name: name.to_string(),
            resource_id: resource_id.to_string(),
            monitoring_interval: Duration::from_secs(60),
        }
    }

    #[tokio::test]
    async fn test_resolves_across_pages() {
        let cloud = FakeCloud::new()
            .with_page(vec![discovered("db-a", "db-AAA"), discovered("other", "db-OTH")])
            .with_page(vec![discovered("db-b", "db-BBB")]);
        let factory = FakeFactory::new().with_cloud(ScopeKey::new("us-east-1", ""), cloud);

        let configs = vec![
            instance_config("us-east-1", "db-a"),
            instance_config("us-east-1", "db-b"),
        ];
        let pool = SessionPool::build(&configs, &factory).await.unwrap();

        assert_eq!(pool.scopes().len(), 1);
        assert_eq!(pool.len(), 2);
        let (_, b) = pool.get("us-east-1", "db-b").unwrap();
        assert_eq!(b.resource_id, "db-BBB");
        assert_eq!(b.monitoring_interval, Duration::from_secs(60));
        assert!(pool.get("us-east-1", "other").is_none());
    }

    #[tokio::test]
    async fn test_one_client_per_scope() {
        let factory = FakeFactory::new()
            .with_cloud(
                ScopeKey::new("us-east-1", "AKID"),
                FakeCloud::new().with_page(vec![discovered("a", "db-A"), discovered("b", "db-B")]),
            )
            .with_cloud(
                ScopeKey::new("us-east-1", ""),
                FakeCloud::new().with_page(vec![discovered("c", "db-C")]),
            );
        let keyed = |name: &str| InstanceConfig {
            aws_access_key: Some("AKID".to_string()),
            aws_secret_key: Some("secret".to_string()),
            ..instance_config("us-east-1", name)
        };
        let configs = vec![keyed("a"), instance_config("us-east-1", "c"), keyed("b")];

        let pool = SessionPool::build(&configs, &factory).await.unwrap();

        assert_eq!(factory.connects().len(), 2);
        assert_eq!(pool.scopes().len(), 2);
        let (scope_a, _) = pool.get("us-east-1", "a").unwrap();
        let (scope_b, _) = pool.get("us-east-1", "b").unwrap();
        assert_eq!(scope_a.key(), scope_b.key());
        assert!(Arc::ptr_eq(scope_a.client(), scope_b.client()));
    }

    #[tokio::test]
    async fn test_unresolved_instances_and_empty_scopes_are_dropped() {
        let factory = FakeFactory::new()
            .with_cloud(
                ScopeKey::new("us-east-1", ""),
                FakeCloud::new().with_page(vec![discovered("known", "db-K")]),
            )
            .with_cloud(ScopeKey::new("eu-west-1", ""), FakeCloud::new().with_page(vec![]));
        let configs = vec![
            instance_config("us-east-1", "known"),
            instance_config("us-east-1", "missing"),
            instance_config("eu-west-1", "ghost"),
        ];

        let pool = SessionPool::build(&configs, &factory).await.unwrap();

        assert_eq!(pool.scopes().len(), 1);
        assert_eq!(pool.len(), 1);
        assert!(pool.get("us-east-1", "missing").is_none());
        assert!(pool.get("eu-west-1", "ghost").is_none());
    }

    #[tokio::test]
    async fn test_discovery_failure_keeps_earlier_pages() {
        let cloud = FakeCloud::new()
            .with_page(vec![discovered("first", "db-1")])
            .with_failing_page("throttled")
            .with_page(vec![discovered("third", "db-3")]);
        let factory = FakeFactory::new().with_cloud(ScopeKey::new("us-east-1", ""), cloud);
        let configs = vec![
            instance_config("us-east-1", "first"),
            instance_config("us-east-1", "third"),
        ];

        let pool = SessionPool::build(&configs, &factory).await.unwrap();

        assert!(pool.get("us-east-1", "first").is_some());
        assert!(pool.get("us-east-1", "third").is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_is_fatal() {
        let factory = FakeFactory::new().with_failing_scope(ScopeKey::new("us-east-1", "BAD"));
        let configs = vec![InstanceConfig {
            aws_role_arn: Some("BAD".to_string()),
            ..instance_config("us-east-1", "db")
        }];

        let err = SessionPool::build(&configs, &factory).await.unwrap_err();
        assert!(matches!(err, Error::AuthConfig { .. }));
    }

    #[tokio::test]
    async fn test_instance_labels() {
        let factory = FakeFactory::new().with_cloud(
            ScopeKey::new("us-east-1", ""),
            FakeCloud::new().with_page(vec![discovered("db", "db-X")]),
        );
        let mut config = instance_config("us-east-1", "db");
        config.labels.insert("env".to_string(), "prod".to_string());
        config.labels.insert("region".to_string(), String::new());

        let pool = SessionPool::build(&[config], &factory).await.unwrap();
        let (_, instance) = pool.get("us-east-1", "db").unwrap();
        let labels = instance.const_labels();

        assert_eq!(labels.get("env").map(String::as_str), Some("prod"));
        assert_eq!(labels.get("instance").map(String::as_str), Some("db"));
        assert!(!labels.contains_key("region"));
    }
}
