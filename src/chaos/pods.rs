// Pod kill loop
//
// Cycle: list matching pods, pick one uniformly at random, force-delete it
// (zero grace period), sleep a random fraction of the configured interval.
// Unlike the node loop, a failed listing just skips the cycle; there is no
// retry-until-success phase. Each cycle works on a fresh immutable snapshot.

use rand::Rng;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::chaos::jittered;
use crate::cluster::{ClusterClient, PodObject};
use crate::metrics;
use crate::plan::TestPlan;
use crate::shutdown::Shutdown;

pub struct PodChaos {
    cluster: Arc<dyn ClusterClient>,
    plan: Arc<TestPlan>,
    shutdown: Shutdown,
}

impl PodChaos {
    pub fn new(cluster: Arc<dyn ClusterClient>, plan: Arc<TestPlan>, shutdown: Shutdown) -> Self {
        Self {
            cluster,
            plan,
            shutdown,
        }
    }

    /// One deletion cycle over a pod snapshot. An empty snapshot is skipped;
    /// picking a random index over zero candidates is invalid.
    pub async fn run_cycle(&self, pods: &[PodObject]) {
        if pods.is_empty() {
            warn!("No pod candidates found, skipping this cycle");
            return;
        }

        let index = rand::rng().random_range(0..pods.len());
        let target = &pods[index];
        info!("Force deleting pod {}.{}", target.namespace, target.name);
        match self
            .cluster
            .force_delete_pod(&target.namespace, &target.name)
            .await
        {
            Ok(()) => metrics::PODS_FORCE_DELETED_TOTAL.inc(),
            Err(e) => warn!(
                "Cannot delete pod {}.{}: {}",
                target.namespace, target.name, e
            ),
        }
    }

    pub async fn run(mut self) {
        let selector = &self.plan.disruption.pods;
        let field_filter = selector.field_filter();
        let label_filter = selector.label_filter();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            match self.cluster.list_pods(&field_filter, &label_filter).await {
                Ok(pods) => self.run_cycle(&pods).await,
                Err(e) => warn!("Cannot get a list of running pods, skipping this cycle: {}", e),
            }

            let pause = jittered(selector.interval);
            debug!("Next pod deletion in {:?}", pause);
            if self.shutdown.sleep(pause).await {
                break;
            }
        }
        info!("Pod kill loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::fake::FakeCluster;
    use crate::plan::Selector;
    use crate::shutdown;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn plan_with_pod_chaos(labels: &[&str]) -> Arc<TestPlan> {
        let mut plan = TestPlan::default();
        plan.disruption.pods = Selector {
            labels: labels.iter().map(|s| s.to_string()).collect(),
            enabled: true,
            interval: Duration::from_secs(120),
            ..Selector::default()
        };
        Arc::new(plan)
    }

    fn chaos(cluster: Arc<FakeCluster>, plan: Arc<TestPlan>) -> (PodChaos, shutdown::ShutdownHandle) {
        let (handle, token) = shutdown::channel();
        (PodChaos::new(cluster, plan, token), handle)
    }

    #[tokio::test]
    async fn test_cycle_deletes_exactly_one_pod() {
        let cluster = Arc::new(FakeCluster::with_pods(&[
            ("shop", "web-1"),
            ("shop", "web-2"),
            ("infra", "cache-1"),
        ]));
        let (chaos, _handle) = chaos(cluster.clone(), plan_with_pod_chaos(&[]));

        let pods = cluster.list_pods("", "").await.unwrap();
        chaos.run_cycle(&pods).await;

        assert_eq!(cluster.deleted_pods().len(), 1);
        assert_eq!(cluster.list_pods("", "").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_candidate_set_issues_no_delete() {
        let cluster = Arc::new(FakeCluster::with_pods(&[]));
        let (chaos, _handle) = chaos(cluster.clone(), plan_with_pod_chaos(&[]));

        chaos.run_cycle(&[]).await;

        assert!(cluster.deleted_pods().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_failure_skips_cycle_and_continues() {
        let cluster = Arc::new(FakeCluster::with_pods(&[("shop", "web-1"), ("shop", "web-2")]));
        cluster.pod_list_failures.store(1, Ordering::SeqCst);
        let (chaos, handle) = chaos(cluster.clone(), plan_with_pod_chaos(&[]));

        let task = tokio::spawn(chaos.run());

        // First cycle fails to list and deletes nothing; later cycles delete.
        tokio::time::sleep(Duration::from_secs(600)).await;
        handle.trigger();
        tokio::time::timeout(Duration::from_secs(3600), task)
            .await
            .expect("loop must stop after shutdown")
            .unwrap();

        assert!(!cluster.deleted_pods().is_empty());
    }

    #[tokio::test]
    async fn test_selector_filters_are_passed_through() {
        let cluster = Arc::new(FakeCluster::with_pods(&[("shop", "web-1")]));
        let plan = plan_with_pod_chaos(&["chaos=true", "app=web"]);
        let (chaos, handle) = chaos(cluster.clone(), plan);

        let task = tokio::spawn(chaos.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.trigger();
        let _ = task.await;

        assert_eq!(
            cluster.last_pod_filters(),
            (String::new(), "chaos=true,app=web".to_string())
        );
    }
}
