// Test plan data model
//
// The test plan is the baseline document produced by an external discovery
// process: which nodes and pods to disrupt (and how often), plus the set of
// monitored endpoints with their recorded status codes and headers. It is
// loaded once at startup and never mutated afterwards; every component holds
// it behind an `Arc`.
//
// Persisted form is YAML with human-readable interval strings ("30s", "5m").

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::selector::build_filter;

fn default_interval() -> Duration {
    Duration::from_secs(600)
}

fn default_method() -> String {
    "GET".to_string()
}

/// Declarative filter used to choose which cluster objects a query returns.
///
/// Field and label fragments are comma-joined into the filter expressions the
/// cluster API expects; an empty fragment list matches everything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Selector {
    pub fields: Vec<String>,
    pub labels: Vec<String>,
    pub enabled: bool,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
}

impl Default for Selector {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            labels: Vec::new(),
            enabled: false,
            interval: default_interval(),
        }
    }
}

impl Selector {
    /// Field filter expression for list calls.
    pub fn field_filter(&self) -> String {
        build_filter(&self.fields)
    }

    /// Label filter expression for list calls.
    pub fn label_filter(&self) -> String {
        build_filter(&self.labels)
    }
}

/// Node disruption targets: a selector plus an optional explicit allow-list
/// of node names. When `items` is non-empty the allow-list wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NodeDisruption {
    #[serde(flatten)]
    pub selector: Selector,
    pub items: Vec<String>,
}

/// Disruption section: node cordon loop and pod kill loop settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Disruption {
    pub nodes: NodeDisruption,
    pub pods: Selector,
}

/// One previously observed, known-good HTTP interaction.
///
/// Endpoint URLs are not required to be unique; duplicates are legal and
/// probed independently.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub code: u16,
    #[serde(default)]
    pub pod_selector: BTreeMap<String, String>,
}

/// Endpoints discovered under one ingress object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

/// Monitoring section: the recorded endpoint baseline and how often to
/// re-validate it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Monitoring {
    pub enabled: bool,
    #[serde(with = "humantime_serde", default = "default_interval")]
    pub interval: Duration,
    pub success_http_codes: Vec<String>,
    pub routes: Vec<Route>,
}

impl Default for Monitoring {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: Duration::from_secs(60),
            success_http_codes: Vec::new(),
            routes: Vec::new(),
        }
    }
}

/// Root aggregate. Immutable after load.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TestPlan {
    pub disruption: Disruption,
    pub monitoring: Monitoring,
}

impl TestPlan {
    /// Load a test plan from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the plan
    /// fails validation. Load errors are fatal at startup.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read test plan from {:?}", path))?;

        let plan: TestPlan = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse test plan from {:?}", path))?;

        plan.validate()?;

        tracing::info!("Loaded test plan from {:?}", path);
        Ok(plan)
    }

    /// Persist the plan as YAML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize test plan")?;
        fs::write(path, yaml).with_context(|| format!("Failed to write test plan to {:?}", path))
    }

    /// Count of monitored endpoints across all routes.
    pub fn endpoint_count(&self) -> usize {
        self.monitoring
            .routes
            .iter()
            .map(|r| r.endpoints.len())
            .sum()
    }

    /// Validate the plan.
    ///
    /// # Errors
    ///
    /// Returns an error if an enabled section has a zero interval or a
    /// monitored endpoint is missing its URL or method.
    pub fn validate(&self) -> Result<()> {
        if self.disruption.nodes.selector.enabled && self.disruption.nodes.selector.interval.is_zero() {
            anyhow::bail!("Node disruption is enabled but its interval is zero");
        }
        if self.disruption.pods.enabled && self.disruption.pods.interval.is_zero() {
            anyhow::bail!("Pod disruption is enabled but its interval is zero");
        }
        if self.monitoring.enabled {
            if self.monitoring.interval.is_zero() {
                anyhow::bail!("Monitoring is enabled but its interval is zero");
            }
            for route in &self.monitoring.routes {
                for endpoint in &route.endpoints {
                    if endpoint.url.is_empty() {
                        anyhow::bail!(
                            "Route {}.{} has an endpoint with an empty URL",
                            route.namespace,
                            route.name
                        );
                    }
                    if endpoint.method.is_empty() {
                        anyhow::bail!(
                            "Endpoint {} has an empty HTTP method",
                            endpoint.url
                        );
                    }
                }
            }
        }
        Ok(())
    }
}
