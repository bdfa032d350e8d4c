//! Entropic chaos controller library
//!
//! Core pieces: the disruption scheduler (random node cordons and pod kills
//! driven by a test plan), the endpoint validation engine (concurrent probes
//! matched exactly against a recorded baseline), and the wildcard status-code
//! classifier used when that baseline is recorded.

pub mod chaos;
pub mod cluster;
pub mod metrics;
pub mod metrics_server;
pub mod monitor;
pub mod plan;
pub mod selector;
pub mod shutdown;
