// Cluster API seam
//
// The disruption loops only ever touch the cluster through the
// `ClusterClient` trait: list/update on nodes, list/delete on pods, each
// parameterized by the filter strings built in `selector`. The trait keeps
// the loops testable against an in-memory fake and keeps cluster
// authentication out of the core.
//
// `HttpCluster` is the production implementation, a thin REST adapter over
// the cluster API server. TLS verification is disabled on its client; this
// controller targets disposable test environments by design.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

/// Transient cluster-API failure. The loops log these and keep going; none
/// of them is fatal after startup.
#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("cluster API request failed: {0}")]
    Api(String),

    #[error("cluster API returned unexpected status {status} for {operation}")]
    Status { operation: &'static str, status: u16 },
}

/// A schedulable compute node as seen by the disruption loops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeObject {
    pub name: String,
    pub unschedulable: bool,
}

/// A workload instance (namespace-scoped).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodObject {
    pub namespace: String,
    pub name: String,
}

/// Cluster operations the chaos loops need. Implemented by `HttpCluster` in
/// production and by `fake::FakeCluster` in tests.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List nodes matching the given field/label filters (empty = no filter).
    async fn list_nodes(
        &self,
        field_filter: &str,
        label_filter: &str,
    ) -> Result<Vec<NodeObject>, ClusterError>;

    /// Mark a node (un)schedulable. Cordoning does not evict workloads.
    async fn set_node_unschedulable(
        &self,
        name: &str,
        unschedulable: bool,
    ) -> Result<(), ClusterError>;

    /// List pods across all namespaces matching the given filters.
    async fn list_pods(
        &self,
        field_filter: &str,
        label_filter: &str,
    ) -> Result<Vec<PodObject>, ClusterError>;

    /// Delete a pod with zero grace period, bypassing normal shutdown.
    async fn force_delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError>;
}

/// REST adapter over the cluster API server.
pub struct HttpCluster {
    base_url: String,
    client: reqwest::Client,
}

impl HttpCluster {
    /// Build a client against `base_url`, optionally sending a bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = token {
            let value = format!("Bearer {}", token);
            headers.insert(
                reqwest::header::AUTHORIZATION,
                value
                    .parse()
                    .context("Cluster API token is not a valid header value")?,
            );
        }

        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .default_headers(headers)
            .build()
            .context("Failed to build cluster API client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Build a client from `ENTROPIC_CLUSTER_URL` / `ENTROPIC_CLUSTER_TOKEN`.
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("ENTROPIC_CLUSTER_URL")
            .context("ENTROPIC_CLUSTER_URL is not set; disruption loops need cluster API access")?;
        let token = std::env::var("ENTROPIC_CLUSTER_TOKEN").ok();
        Self::new(&base_url, token)
    }

    fn selector_query<'a>(field_filter: &'a str, label_filter: &'a str) -> Vec<(&'static str, &'a str)> {
        let mut query = Vec::new();
        if !field_filter.is_empty() {
            query.push(("fieldSelector", field_filter));
        }
        if !label_filter.is_empty() {
            query.push(("labelSelector", label_filter));
        }
        query
    }
}

fn api_err(err: reqwest::Error) -> ClusterError {
    ClusterError::Api(err.to_string())
}

fn check_status(operation: &'static str, resp: &reqwest::Response) -> Result<(), ClusterError> {
    if resp.status().is_success() {
        Ok(())
    } else {
        Err(ClusterError::Status {
            operation,
            status: resp.status().as_u16(),
        })
    }
}

#[async_trait]
impl ClusterClient for HttpCluster {
    async fn list_nodes(
        &self,
        field_filter: &str,
        label_filter: &str,
    ) -> Result<Vec<NodeObject>, ClusterError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/nodes", self.base_url))
            .query(&Self::selector_query(field_filter, label_filter))
            .send()
            .await
            .map_err(api_err)?;
        check_status("list nodes", &resp)?;

        let body: serde_json::Value = resp.json().await.map_err(api_err)?;
        let nodes = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| NodeObject {
                        name: item["metadata"]["name"].as_str().unwrap_or_default().to_string(),
                        unschedulable: item["spec"]["unschedulable"].as_bool().unwrap_or(false),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(nodes)
    }

    async fn set_node_unschedulable(
        &self,
        name: &str,
        unschedulable: bool,
    ) -> Result<(), ClusterError> {
        let resp = self
            .client
            .patch(format!("{}/api/v1/nodes/{}", self.base_url, name))
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/strategic-merge-patch+json",
            )
            .json(&json!({ "spec": { "unschedulable": unschedulable } }))
            .send()
            .await
            .map_err(api_err)?;
        check_status("update node", &resp)
    }

    async fn list_pods(
        &self,
        field_filter: &str,
        label_filter: &str,
    ) -> Result<Vec<PodObject>, ClusterError> {
        let resp = self
            .client
            .get(format!("{}/api/v1/pods", self.base_url))
            .query(&Self::selector_query(field_filter, label_filter))
            .send()
            .await
            .map_err(api_err)?;
        check_status("list pods", &resp)?;

        let body: serde_json::Value = resp.json().await.map_err(api_err)?;
        let pods = body["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|item| PodObject {
                        namespace: item["metadata"]["namespace"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                        name: item["metadata"]["name"].as_str().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(pods)
    }

    async fn force_delete_pod(&self, namespace: &str, name: &str) -> Result<(), ClusterError> {
        let resp = self
            .client
            .delete(format!(
                "{}/api/v1/namespaces/{}/pods/{}",
                self.base_url, namespace, name
            ))
            .query(&[("gracePeriodSeconds", "0")])
            .send()
            .await
            .map_err(api_err)?;
        check_status("delete pod", &resp)
    }
}
