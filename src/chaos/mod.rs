// Disruption scheduler
//
// Two independent, non-terminating control loops that disturb live cluster
// state on a randomized schedule: `nodes` cordons a random candidate node
// each cycle (uncordoning last cycle's victim first), `pods` force-deletes a
// random workload instance. The loops share no mutable state and may act on
// related resources at the same time; that overlap is intentional chaos.

pub mod nodes;
pub mod pods;

pub use nodes::NodeChaos;
pub use pods::PodChaos;

use rand::Rng;
use std::time::Duration;

/// Uniformly random duration in `[0, interval)`. A zero interval yields zero.
pub(crate) fn jittered(interval: Duration) -> Duration {
    let nanos = interval.as_nanos() as u64;
    if nanos == 0 {
        return Duration::ZERO;
    }
    Duration::from_nanos(rand::rng().random_range(0..nanos))
}
