// Endpoint validation engine
//
// Probes every recorded endpoint concurrently and matches the live response
// against the baseline with exact comparison: status code must equal the
// recorded one, and every recorded header must be present with an exactly
// equal value. Headers the response grew since discovery are ignored. A
// probe that gets no response at all (DNS, TLS, timeout, refused) counts as
// a mismatch, never as a fatal error.

use anyhow::{Context, Result};
use reqwest::header::HeaderMap;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::metrics;
use crate::plan::{Endpoint, TestPlan};

/// Build the shared probe client. Certificate verification is disabled for
/// all outbound probes; this controller targets test environments with
/// self-signed or absent certificates.
pub fn insecure_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .context("Failed to build probe HTTP client")
}

/// Outcome of a single endpoint probe.
#[derive(Debug)]
struct ProbeOutcome {
    route: String,
    url: String,
    result: std::result::Result<(), String>,
}

pub struct EndpointValidator {
    client: reqwest::Client,
    fail_fast: bool,
}

impl EndpointValidator {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            fail_fast: false,
        }
    }

    /// Return on the first mismatch instead of awaiting every probe. Probes
    /// still in flight are aborted before `validate` returns; their results
    /// are discarded.
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }

    /// Probe every endpoint in the plan concurrently. Returns true iff every
    /// probe matched its recorded baseline.
    pub async fn validate(&self, plan: &TestPlan) -> bool {
        let mut probes = JoinSet::new();
        for route in &plan.monitoring.routes {
            for endpoint in &route.endpoints {
                let client = self.client.clone();
                let endpoint = endpoint.clone();
                let route_name = format!("{}.{}", route.namespace, route.name);
                probes.spawn(async move { probe_endpoint(&client, route_name, endpoint).await });
            }
        }
        metrics::MONITORED_ENDPOINTS.set(probes.len() as i64);

        let mut all_matched = true;
        while let Some(joined) = probes.join_next().await {
            let matched = match joined {
                Ok(outcome) => {
                    match &outcome.result {
                        Ok(()) => debug!("{} matches its baseline", outcome.url),
                        Err(reason) => warn!(
                            "Unexpected response from {} ({}): {}",
                            outcome.url, outcome.route, reason
                        ),
                    }
                    outcome.result.is_ok()
                }
                Err(e) => {
                    error!("Probe task failed: {}", e);
                    false
                }
            };

            if !matched {
                all_matched = false;
                if self.fail_fast {
                    // Cancel the stragglers; the overall answer is already no.
                    probes.abort_all();
                    break;
                }
            }
        }
        all_matched
    }
}

async fn probe_endpoint(
    client: &reqwest::Client,
    route: String,
    endpoint: Endpoint,
) -> ProbeOutcome {
    let method = reqwest::Method::from_bytes(endpoint.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let result = match client.request(method, &endpoint.url).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            matches_endpoint(&endpoint, status, response.headers())
        }
        Err(e) => Err(format!("no response: {}", e)),
    };

    let label = if result.is_ok() { "matched" } else { "mismatched" };
    metrics::ENDPOINT_PROBES_TOTAL.with_label_values(&[label]).inc();

    ProbeOutcome {
        route,
        url: endpoint.url,
        result,
    }
}

/// Exact match rule against the recorded baseline. Header names are looked
/// up case-insensitively (HTTP semantics) but values compare byte-for-byte.
fn matches_endpoint(
    endpoint: &Endpoint,
    status: u16,
    headers: &HeaderMap,
) -> std::result::Result<(), String> {
    if status != endpoint.code {
        return Err(format!(
            "status code doesn't match, expected {} got {}",
            endpoint.code, status
        ));
    }

    for (name, expected) in &endpoint.headers {
        match headers.get(name).and_then(|v| v.to_str().ok()) {
            Some(actual) if actual == expected => {}
            Some(actual) => {
                return Err(format!(
                    "header {} doesn't match, expected {:?} got {:?}",
                    name, expected, actual
                ))
            }
            None => return Err(format!("header {} missing from response", name)),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::{Monitoring, Route};
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::collections::BTreeMap;
    use std::net::SocketAddr;

    fn endpoint(url: &str, code: u16, headers: &[(&str, &str)]) -> Endpoint {
        Endpoint {
            url: url.to_string(),
            method: "GET".to_string(),
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            code,
            pod_selector: BTreeMap::new(),
        }
    }

    fn plan_with(endpoints: Vec<Endpoint>) -> TestPlan {
        TestPlan {
            monitoring: Monitoring {
                enabled: true,
                routes: vec![Route {
                    name: "fixture".to_string(),
                    namespace: "test".to_string(),
                    endpoints,
                }],
                ..Monitoring::default()
            },
            ..TestPlan::default()
        }
    }

    /// Bind a local fixture server with known routes and headers.
    async fn serve_fixture() -> SocketAddr {
        let app = Router::new()
            .route("/ok", get(|| async { ([("x-build", "1.2.3")], "ok") }))
            .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
            .route(
                "/broken",
                get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn test_match_rule_exact_status() {
        let ep = endpoint("http://x/", 200, &[]);
        assert!(matches_endpoint(&ep, 200, &HeaderMap::new()).is_ok());
        assert!(matches_endpoint(&ep, 301, &HeaderMap::new()).is_err());
        // Validation-time matching is exact: a 2xx-family code is not enough.
        assert!(matches_endpoint(&ep, 204, &HeaderMap::new()).is_err());
    }

    #[test]
    fn test_match_rule_headers() {
        let ep = endpoint("http://x/", 200, &[("x-build", "1.2.3")]);

        let mut live = HeaderMap::new();
        live.insert("x-build", "1.2.3".parse().unwrap());
        live.insert("x-extra", "ignored".parse().unwrap());
        assert!(matches_endpoint(&ep, 200, &live).is_ok());

        // Values are compared case-sensitively.
        let mut wrong_case = HeaderMap::new();
        wrong_case.insert("x-build", "1.2.3-RC".parse().unwrap());
        assert!(matches_endpoint(&ep, 200, &wrong_case).is_err());

        assert!(matches_endpoint(&ep, 200, &HeaderMap::new()).is_err());
    }

    #[tokio::test]
    async fn test_validate_all_endpoints_match() {
        let addr = serve_fixture().await;
        let plan = plan_with(vec![
            endpoint(&format!("http://{}/ok", addr), 200, &[]),
            endpoint(&format!("http://{}/missing", addr), 404, &[]),
        ]);

        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(validator.validate(&plan).await);
    }

    #[tokio::test]
    async fn test_validate_fails_when_live_code_changes() {
        let addr = serve_fixture().await;
        // Baseline recorded 404 for this route, but it now answers 500.
        let plan = plan_with(vec![
            endpoint(&format!("http://{}/ok", addr), 200, &[]),
            endpoint(&format!("http://{}/broken", addr), 404, &[]),
        ]);

        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(!validator.validate(&plan).await);
    }

    #[tokio::test]
    async fn test_validate_checks_recorded_headers() {
        let addr = serve_fixture().await;
        let url = format!("http://{}/ok", addr);

        let good = plan_with(vec![endpoint(&url, 200, &[("x-build", "1.2.3")])]);
        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(validator.validate(&good).await);

        // Flipping one recorded header value flips the verdict.
        let stale = plan_with(vec![endpoint(&url, 200, &[("x-build", "9.9.9")])]);
        assert!(!validator.validate(&stale).await);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_mismatch() {
        // Nothing listens on this port; the probe error must count as a
        // failed match, not a panic or a fatal error.
        let plan = plan_with(vec![endpoint("http://127.0.0.1:9/", 200, &[])]);
        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(!validator.validate(&plan).await);
    }

    #[tokio::test]
    async fn test_empty_plan_validates() {
        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(validator.validate(&TestPlan::default()).await);
    }

    #[tokio::test]
    async fn test_duplicate_urls_probed_independently() {
        let addr = serve_fixture().await;
        let url = format!("http://{}/ok", addr);
        let plan = plan_with(vec![
            endpoint(&url, 200, &[]),
            endpoint(&url, 200, &[]),
            endpoint(&url, 204, &[]),
        ]);

        let validator = EndpointValidator::new(insecure_client().unwrap());
        assert!(!validator.validate(&plan).await);
    }

    #[tokio::test]
    async fn test_fail_fast_still_reports_failure() {
        let addr = serve_fixture().await;
        let plan = plan_with(vec![
            endpoint(&format!("http://{}/ok", addr), 200, &[]),
            endpoint(&format!("http://{}/broken", addr), 200, &[]),
        ]);

        let validator = EndpointValidator::new(insecure_client().unwrap()).fail_fast(true);
        assert!(!validator.validate(&plan).await);
    }
}
