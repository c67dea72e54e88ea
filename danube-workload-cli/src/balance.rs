use anyhow::{Context, Result};
use clap::Args;
use danube_workload::workload_metrics::describe_metrics;
use danube_workload::{
    record_balancing_result, BalancingResult, NodeId, SubscriptionName, WorkBalancer,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use prettytable::{format, Cell, Row, Table};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::snapshot::{load_config, load_view, save_view};

#[derive(Debug, Args)]
#[command(after_help = "Examples:
  danube-workload-cli balance --state state.json --nodes consumer-1,consumer-2
  danube-workload-cli balance --state state.json --subscriptions /default/orders:billing --out state.json
  danube-workload-cli balance --state state.json --config workload.yml --consumers-per-subscription 3 --output json
  danube-workload-cli balance --state state.json --metrics-out /var/lib/node_exporter/danube_workload.prom

Without --subscriptions or --nodes the ones known to the stored view are kept.")]
pub(crate) struct Balance {
    #[arg(long, help = "Assignment view produced by the previous pass (JSON, missing file = empty view)")]
    state: PathBuf,
    #[arg(long, help = "YAML file with the workload limits")]
    config: Option<PathBuf>,
    #[arg(long, help = "Replication target, overrides the config file")]
    consumers_per_subscription: Option<usize>,
    #[arg(long, help = "Node capacity, overrides the config file")]
    max_subscriptions_per_consumer: Option<usize>,
    #[arg(long, value_delimiter = ',', help = "Subscriptions to serve (comma separated)")]
    subscriptions: Vec<String>,
    #[arg(long, value_delimiter = ',', help = "Active consumer nodes (comma separated)")]
    nodes: Vec<String>,
    #[arg(long, help = "Where to store the balanced assignment view")]
    out: Option<PathBuf>,
    #[arg(long, help = "Write the pass metrics in Prometheus text format to this file")]
    metrics_out: Option<PathBuf>,
    #[arg(long, value_parser = ["json"], help = "Output format: json (default: table)")]
    output: Option<String>,
}

pub(crate) fn handle(args: Balance) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;

    // Command line limits take precedence over the config file
    if let Some(consumers_per_subscription) = args.consumers_per_subscription {
        config.consumers_per_subscription = consumers_per_subscription;
    }
    if let Some(max_subscriptions_per_consumer) = args.max_subscriptions_per_consumer {
        config.max_subscriptions_per_consumer = max_subscriptions_per_consumer;
    }

    let balancer = WorkBalancer::new(config).context("Invalid workload limits")?;
    let current = load_view(&args.state)?;

    let subscriptions: Vec<SubscriptionName> = if args.subscriptions.is_empty() {
        current.subscriptions().cloned().collect()
    } else {
        args.subscriptions.into_iter().map(SubscriptionName::from).collect()
    };
    let nodes: Vec<NodeId> = if args.nodes.is_empty() {
        current.nodes().cloned().collect()
    } else {
        args.nodes.into_iter().map(NodeId::from).collect()
    };

    // Installed before the pass so that nothing recorded is lost
    let metrics = args
        .metrics_out
        .as_ref()
        .map(|_| install_metrics_recorder())
        .transpose()?;

    let result = balancer.balance(&subscriptions, &nodes, &current);
    info!(%result, "balancing pass completed");

    if let Some(out) = &args.out {
        save_view(out, result.state())?;
    }

    if let (Some(handle), Some(path)) = (&metrics, &args.metrics_out) {
        record_balancing_result(&result);
        write_metrics(handle, path)?;
    }

    if matches!(args.output.as_deref(), Some("json")) {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_table(&result);
    }

    Ok(())
}

fn install_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install the Prometheus recorder")?;
    describe_metrics();
    Ok(handle)
}

/// Textfile collector format, the file is replaced as a whole
fn write_metrics(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    fs::write(path, handle.render())
        .with_context(|| format!("Failed to write metrics to {}", path.display()))?;
    info!(path = %path.display(), "stored the balancing metrics");
    Ok(())
}

fn print_table(result: &BalancingResult) {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("ENTITY"),
        Cell::new("TOTAL"),
        Cell::new("REMOVED"),
        Cell::new("ADDED"),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("subscriptions"),
        Cell::new(&result.subscriptions.total.to_string()),
        Cell::new(&result.subscriptions.removed.to_string()),
        Cell::new(&result.subscriptions.added.to_string()),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("nodes"),
        Cell::new(&result.nodes.active.to_string()),
        Cell::new(&result.nodes.inactive.to_string()),
        Cell::new(&result.nodes.added.to_string()),
    ]));
    table.add_row(Row::new(vec![
        Cell::new("assignments"),
        Cell::new(&result.assignments_total.to_string()),
        Cell::new(&result.assignments_removed.to_string()),
        Cell::new(&result.assignments_added.to_string()),
    ]));
    table.printstd();

    println!();
    println!("Missing resources: {}", result.missing_resources);
    for (subscription, missing) in &result.unmet_subscriptions {
        println!("  {:<40} {} missing", subscription.as_str(), missing);
    }
}
