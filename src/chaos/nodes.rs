// Node cordon loop
//
// Cycle: uncordon every candidate we left unschedulable, pick one candidate
// uniformly at random, cordon it, then sleep a random fraction of the
// configured interval. The candidate set is listed once at startup (retrying
// until the first listing succeeds) and treated as an immutable snapshot;
// bookkeeping on that snapshot guarantees at most one candidate is ever
// deliberately held unschedulable between cycles.

use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::chaos::jittered;
use crate::cluster::{ClusterClient, ClusterError, NodeObject};
use crate::metrics;
use crate::plan::TestPlan;
use crate::selector::build_named_filter;
use crate::shutdown::Shutdown;

/// Backoff between initial listing attempts.
const LIST_RETRY_BACKOFF: Duration = Duration::from_secs(60);

pub struct NodeChaos {
    cluster: Arc<dyn ClusterClient>,
    plan: Arc<TestPlan>,
    shutdown: Shutdown,
}

impl NodeChaos {
    pub fn new(cluster: Arc<dyn ClusterClient>, plan: Arc<TestPlan>, shutdown: Shutdown) -> Self {
        Self {
            cluster,
            plan,
            shutdown,
        }
    }

    /// List candidate nodes: the explicit allow-list when `items` is set,
    /// otherwise the configured field/label selectors.
    pub async fn list_candidates(&self) -> Result<Vec<NodeObject>, ClusterError> {
        let nodes = &self.plan.disruption.nodes;
        if !nodes.items.is_empty() {
            let filter = build_named_filter(&nodes.items, "metadata.name=");
            self.cluster.list_nodes(&filter, "").await
        } else {
            self.cluster
                .list_nodes(&nodes.selector.field_filter(), &nodes.selector.label_filter())
                .await
        }
    }

    /// Initial listing. Never gives up: failures are logged and retried after
    /// a fixed backoff until the list succeeds or shutdown fires (None).
    pub async fn acquire_candidates(&mut self) -> Option<Vec<NodeObject>> {
        loop {
            if self.shutdown.is_triggered() {
                return None;
            }
            match self.list_candidates().await {
                Ok(candidates) => {
                    info!("{} candidate nodes found", candidates.len());
                    return Some(candidates);
                }
                Err(e) => {
                    error!("Cannot get a list of nodes, retrying: {}", e);
                    if self.shutdown.sleep(LIST_RETRY_BACKOFF).await {
                        return None;
                    }
                }
            }
        }
    }

    /// One cordon cycle over the candidate snapshot. Update failures are
    /// logged and non-fatal; the snapshot's flags track what we believe is
    /// cordoned so the next cycle can undo it.
    pub async fn run_cycle(&self, candidates: &mut [NodeObject]) {
        // Make every candidate schedulable again first.
        for node in candidates.iter_mut().filter(|n| n.unschedulable) {
            match self.cluster.set_node_unschedulable(&node.name, false).await {
                Ok(()) => {
                    node.unschedulable = false;
                    metrics::NODES_UNCORDONED_TOTAL.inc();
                }
                Err(e) => warn!("Cannot uncordon node {}: {}", node.name, e),
            }
        }

        // Never disable the only available target.
        if candidates.len() < 2 {
            warn!(
                "Only {} candidate node(s) found, cannot cordon any off",
                candidates.len()
            );
            return;
        }

        let index = rand::rng().random_range(0..candidates.len());
        let target = &mut candidates[index];
        info!("Cordoning off node {}", target.name);
        match self.cluster.set_node_unschedulable(&target.name, true).await {
            Ok(()) => {
                target.unschedulable = true;
                metrics::NODES_CORDONED_TOTAL.inc();
            }
            Err(e) => warn!("Cannot cordon node {}: {}", target.name, e),
        }
    }

    pub async fn run(mut self) {
        let Some(mut candidates) = self.acquire_candidates().await else {
            return;
        };

        loop {
            if self.shutdown.is_triggered() {
                break;
            }
            self.run_cycle(&mut candidates).await;

            let pause = jittered(self.plan.disruption.nodes.selector.interval);
            debug!("Next node cordon in {:?}", pause);
            if self.shutdown.sleep(pause).await {
                break;
            }
        }
        info!("Node cordon loop stopped");
    }
}
