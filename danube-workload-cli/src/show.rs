use anyhow::Result;
use clap::Args;
use danube_workload::AssignmentView;
use prettytable::{format, Cell, Row, Table};
use std::path::PathBuf;

use crate::snapshot::load_existing_view;

#[derive(Debug, Args)]
#[command(after_help = "Examples:
  danube-workload-cli show --state state.json
  danube-workload-cli show --state state.json --output json")]
pub(crate) struct Show {
    #[arg(long, help = "Stored assignment view (JSON)")]
    state: PathBuf,
    #[arg(long, value_parser = ["json"], help = "Output format: json (default: table)")]
    output: Option<String>,
}

pub(crate) fn handle(args: Show) -> Result<()> {
    let view = load_existing_view(&args.state)?;

    if matches!(args.output.as_deref(), Some("json")) {
        println!("{}", serde_json::to_string_pretty(&node_loads(&view))?);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("NODE"),
        Cell::new("LOAD"),
        Cell::new("SUBSCRIPTIONS"),
    ]));
    for node in view.nodes() {
        let subscriptions: Vec<String> = view
            .assignments_for_node(node)
            .iter()
            .map(|assignment| {
                if assignment.is_auto_assigned() {
                    assignment.subscription.to_string()
                } else {
                    format!("{} (pinned)", assignment.subscription)
                }
            })
            .collect();
        table.add_row(Row::new(vec![
            Cell::new(node.as_str()),
            Cell::new(&view.assignments_count_for_node(node).to_string()),
            Cell::new(&subscriptions.join("\n")),
        ]));
    }
    table.printstd();

    println!();
    println!(
        "Subscriptions: {}, nodes: {}, assignments: {}",
        view.subscriptions_count(),
        view.nodes_count(),
        view.assignments_count()
    );

    Ok(())
}

fn node_loads(view: &AssignmentView) -> serde_json::Value {
    let nodes: Vec<serde_json::Value> = view
        .nodes()
        .map(|node| {
            serde_json::json!({
                "node": node,
                "load": view.assignments_count_for_node(node),
                "subscriptions": view.assignments_for_node(node),
            })
        })
        .collect();

    serde_json::json!({
        "subscriptions": view.subscriptions_count(),
        "nodes": nodes,
        "assignments": view.assignments_count(),
    })
}
