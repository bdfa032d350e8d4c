// Endpoint monitoring
//
// `status` classifies freshly observed status codes against wildcard masks
// (discovery-time, used when a baseline is recorded). `validator` re-probes
// the recorded baseline with exact matching. `MonitorLoop` runs the
// validator on a fixed interval for the lifetime of the process.

pub mod status;
pub mod validator;

pub use status::is_success_code;
pub use validator::EndpointValidator;

use std::sync::Arc;
use tracing::{info, warn};

use crate::metrics;
use crate::plan::TestPlan;
use crate::shutdown::Shutdown;

pub struct MonitorLoop {
    plan: Arc<TestPlan>,
    validator: EndpointValidator,
    shutdown: Shutdown,
}

impl MonitorLoop {
    pub fn new(plan: Arc<TestPlan>, validator: EndpointValidator, shutdown: Shutdown) -> Self {
        Self {
            plan,
            validator,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let interval = self.plan.monitoring.interval;
        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let all_matched = self.validator.validate(&self.plan).await;
            if all_matched {
                info!(
                    "All {} monitored endpoints match their baseline",
                    self.plan.endpoint_count()
                );
                metrics::VALIDATION_RUNS_TOTAL.with_label_values(&["pass"]).inc();
            } else {
                warn!("Some monitored endpoints deviate from their baseline");
                metrics::VALIDATION_RUNS_TOTAL.with_label_values(&["fail"]).inc();
            }

            if self.shutdown.sleep(interval).await {
                break;
            }
        }
        info!("Endpoint monitor stopped");
    }
}
