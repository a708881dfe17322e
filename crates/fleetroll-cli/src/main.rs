use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use fleetroll_core::CapacityOverrides;
use fleetroll_engine::{inspector, Roller, Waiter};
use fleetroll_provider::{FleetProvider, SimFleet};

#[derive(Parser)]
#[command(
    name = "fleetroll",
    about = "fleetroll — zero-downtime instance rolls for autoscaling groups",
    version,
    propagate_version = true,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace every in-service instance in the group with fresh ones.
    ///
    /// Bursts capacity up, waits for the replacements to serve traffic,
    /// detaches and terminates the old instances, then restores the
    /// original desired/max capacity.
    Roll {
        /// Autoscaling group to roll
        group: String,
        /// Steady-state capacity to restore (default: current desired)
        #[arg(long)]
        desired_capacity: Option<u32>,
        /// Burst capacity while old and new instances coexist
        /// (default: twice the larger of current and desired)
        #[arg(long)]
        deployment_capacity: Option<u32>,
        /// Max capacity to restore (default: current max)
        #[arg(long)]
        max_capacity: Option<u32>,
        /// Convergence polling interval in milliseconds
        #[arg(long, default_value = "500")]
        poll_interval_ms: u64,
        /// Give up on any single wait after this many seconds
        /// (default: wait forever)
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Roll an in-process simulated fleet instead of a real group
        #[arg(long)]
        simulate: bool,
        /// Size the simulated fleet starts at
        #[arg(long, default_value = "3", requires = "simulate")]
        simulate_capacity: u32,
    },
    /// Print the computed roll plan without mutating anything.
    Plan {
        /// Autoscaling group to plan against
        group: String,
        /// Steady-state capacity to restore (default: current desired)
        #[arg(long)]
        desired_capacity: Option<u32>,
        /// Burst capacity while old and new instances coexist
        #[arg(long)]
        deployment_capacity: Option<u32>,
        /// Max capacity to restore (default: current max)
        #[arg(long)]
        max_capacity: Option<u32>,
        /// Plan against an in-process simulated fleet
        #[arg(long)]
        simulate: bool,
        /// Size the simulated fleet starts at
        #[arg(long, default_value = "3", requires = "simulate")]
        simulate_capacity: u32,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Roll {
            group,
            desired_capacity,
            deployment_capacity,
            max_capacity,
            poll_interval_ms,
            timeout_secs,
            simulate,
            simulate_capacity,
        } => {
            let overrides = CapacityOverrides {
                desired: desired_capacity,
                deployment: deployment_capacity,
                max: max_capacity,
            };
            let provider = provider_for(&group, simulate, simulate_capacity).await?;
            let waiter = Waiter::new(Duration::from_millis(poll_interval_ms))
                .with_timeout(timeout_secs.map(Duration::from_secs));

            let mut roller = Roller::new(provider.as_ref(), waiter);
            let report = roller.run(&group, &overrides).await?;

            println!(
                "rolled {group}: {} retired, {} launched",
                report.retired.len(),
                report.launched.len()
            );
            for (id, err) in &report.failed {
                println!("  left behind: {id} ({err})");
            }
            Ok(())
        }
        Commands::Plan {
            group,
            desired_capacity,
            deployment_capacity,
            max_capacity,
            simulate,
            simulate_capacity,
        } => {
            let overrides = CapacityOverrides {
                desired: desired_capacity,
                deployment: deployment_capacity,
                max: max_capacity,
            };
            let provider = provider_for(&group, simulate, simulate_capacity).await?;
            let view = inspector::inspect(provider.as_ref(), &group).await?;
            let plan = fleetroll_engine::plan(view.desired, view.max, &overrides)?;

            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(())
        }
    }
}

async fn provider_for(
    group: &str,
    simulate: bool,
    simulate_capacity: u32,
) -> anyhow::Result<Box<dyn FleetProvider>> {
    if simulate {
        info!(group = %group, capacity = simulate_capacity, "using simulated fleet");
        let fleet = SimFleet::new(group, simulate_capacity, simulate_capacity * 2).with_latency(2);
        return Ok(Box::new(fleet));
    }

    #[cfg(feature = "aws")]
    return Ok(Box::new(fleetroll_provider::AwsFleet::from_env().await));

    #[cfg(not(feature = "aws"))]
    anyhow::bail!("this build has no cloud provider; rebuild with --features aws or pass --simulate")
}
