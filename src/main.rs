// Entropic - Main Entry Point
//
// Chaos controller for cluster resilience testing:
// - chaos mode runs the disruption loops and the endpoint monitor until
//   the process is asked to stop
// - verify mode replays the recorded endpoint baseline once and sets the
//   exit code accordingly

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use entropic::chaos::{NodeChaos, PodChaos};
use entropic::cluster::{ClusterClient, HttpCluster};
use entropic::monitor::validator::insecure_client;
use entropic::monitor::{EndpointValidator, MonitorLoop};
use entropic::plan::TestPlan;
use entropic::{metrics, metrics_server, shutdown};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

/// Entropic: scheduled chaos for cluster nodes and workloads
#[derive(Parser, Debug)]
#[command(name = "entropic")]
#[command(version = "0.1.0")]
#[command(about = "Disrupts cluster nodes and workloads on a schedule and validates endpoint baselines", long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the disruption loops and the endpoint monitor
    Chaos {
        /// Test plan file
        #[arg(long, default_value = "./testplan.yaml")]
        plan: PathBuf,

        /// Port for the Prometheus metrics endpoint (0 disables it)
        #[arg(long, default_value_t = 9090)]
        metrics_port: u16,
    },
    /// Validate monitored endpoints against the recorded baseline once
    Verify {
        /// Test plan file
        #[arg(long, default_value = "./testplan.yaml")]
        plan: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(filter.into())
                .from_env_lossy(),
        )
        .init();

    match args.command {
        Commands::Chaos { plan, metrics_port } => run_chaos(&plan, metrics_port).await,
        Commands::Verify { plan } => run_verify(&plan).await,
    }
}

/// Run all enabled background loops until ctrl-c.
async fn run_chaos(plan_path: &Path, metrics_port: u16) -> Result<()> {
    let plan = Arc::new(TestPlan::load(plan_path)?);
    metrics::init().context("Failed to initialize metrics")?;

    let (handle, _) = shutdown::channel();
    let mut tasks = Vec::new();

    let nodes_enabled = plan.disruption.nodes.selector.enabled;
    let pods_enabled = plan.disruption.pods.enabled;

    if nodes_enabled || pods_enabled {
        let cluster: Arc<dyn ClusterClient> = Arc::new(
            HttpCluster::from_env().context("Disruption loops need cluster API access")?,
        );

        if nodes_enabled {
            info!("Launching the node cordon loop");
            let node_loop = NodeChaos::new(cluster.clone(), plan.clone(), handle.subscribe());
            tasks.push(tokio::spawn(node_loop.run()));
        }
        if pods_enabled {
            info!("Launching the pod killer");
            let pod_loop = PodChaos::new(cluster.clone(), plan.clone(), handle.subscribe());
            tasks.push(tokio::spawn(pod_loop.run()));
        }
    }

    if plan.monitoring.enabled {
        info!(
            "Launching the endpoint monitor, re-validating every {:?}",
            plan.monitoring.interval
        );
        let validator = EndpointValidator::new(insecure_client()?);
        let monitor = MonitorLoop::new(plan.clone(), validator, handle.subscribe());
        tasks.push(tokio::spawn(monitor.run()));
    }

    if tasks.is_empty() {
        info!("Nothing is enabled in the test plan; idling until interrupted");
    }

    if metrics_port != 0 {
        let metrics_shutdown = handle.subscribe();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = metrics_server::run(metrics_port, metrics_shutdown).await {
                error!("Metrics server failed: {}", e);
            }
        }));
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutdown requested, draining background loops");
    handle.trigger();

    for task in tasks {
        let _ = task.await;
    }
    info!("Entropic stopped");
    Ok(())
}

/// One-shot baseline validation; exit code 1 when any endpoint deviates.
async fn run_verify(plan_path: &Path) -> Result<()> {
    let plan = TestPlan::load(plan_path)?;

    info!(
        "Verifying {} endpoints against their recorded baseline",
        plan.endpoint_count()
    );
    let validator = EndpointValidator::new(insecure_client()?);
    if validator.validate(&plan).await {
        info!("Done. All valid.");
        Ok(())
    } else {
        error!("Done. Some endpoints deviate from their baseline.");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["entropic", "verify", "--plan", "plan.yaml"]);
        assert!(matches!(args.command, Commands::Verify { .. }));

        let args = Args::parse_from(["entropic", "chaos", "--metrics-port", "0"]);
        match args.command {
            Commands::Chaos { metrics_port, .. } => assert_eq!(metrics_port, 0),
            _ => panic!("expected chaos subcommand"),
        }
    }
}
