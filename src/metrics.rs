// Prometheus metrics for the chaos controller
//
// Exposed on the /metrics HTTP endpoint:
// - cordon/uncordon and pod deletion counts
// - endpoint probe outcomes
// - validation run outcomes
// - monitored endpoint count (gauge)

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

lazy_static! {
    pub static ref REGISTRY: Arc<Registry> = Arc::new(Registry::new());

    // Disruption metrics
    pub static ref NODES_CORDONED_TOTAL: IntCounter = IntCounter::new(
        "nodes_cordoned_total",
        "Total number of nodes marked unschedulable"
    ).expect("Failed to create nodes cordoned metric");

    pub static ref NODES_UNCORDONED_TOTAL: IntCounter = IntCounter::new(
        "nodes_uncordoned_total",
        "Total number of nodes returned to schedulable"
    ).expect("Failed to create nodes uncordoned metric");

    pub static ref PODS_FORCE_DELETED_TOTAL: IntCounter = IntCounter::new(
        "pods_force_deleted_total",
        "Total number of pods deleted with zero grace period"
    ).expect("Failed to create pods deleted metric");

    // Monitoring metrics
    pub static ref ENDPOINT_PROBES_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("endpoint_probes_total", "Endpoint probe outcomes"),
        &["result"]
    ).expect("Failed to create endpoint probes metric");

    pub static ref VALIDATION_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        prometheus::Opts::new("validation_runs_total", "Full validation run outcomes"),
        &["result"]
    ).expect("Failed to create validation runs metric");

    pub static ref MONITORED_ENDPOINTS: IntGauge = IntGauge::new(
        "monitored_endpoints",
        "Number of endpoints probed in the last validation run"
    ).expect("Failed to create monitored endpoints metric");
}

/// Register all metrics - must be called once at startup.
pub fn init() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(NODES_CORDONED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(NODES_UNCORDONED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(PODS_FORCE_DELETED_TOTAL.clone()))?;
    REGISTRY.register(Box::new(ENDPOINT_PROBES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(VALIDATION_RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(MONITORED_ENDPOINTS.clone()))?;
    Ok(())
}

/// Gather all metrics in Prometheus text format.
pub fn gather_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| anyhow::anyhow!("Failed to encode metrics: {}", e))?;
    String::from_utf8(buffer).map_err(|e| anyhow::anyhow!("Invalid UTF-8 in metrics: {}", e))
}
