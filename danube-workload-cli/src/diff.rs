use anyhow::Result;
use clap::Args;
use prettytable::{format, Cell, Row, Table};
use std::path::PathBuf;

use crate::snapshot::load_existing_view;

#[derive(Debug, Args)]
#[command(after_help = "Examples:
  danube-workload-cli diff --from previous.json --to state.json
  danube-workload-cli diff --from previous.json --to state.json --output json")]
pub(crate) struct Diff {
    #[arg(long, help = "Assignment view before the change (JSON)")]
    from: PathBuf,
    #[arg(long, help = "Assignment view after the change (JSON)")]
    to: PathBuf,
    #[arg(long, value_parser = ["json"], help = "Output format: json (default: table)")]
    output: Option<String>,
}

pub(crate) fn handle(args: Diff) -> Result<()> {
    let source = load_existing_view(&args.from)?;
    let target = load_existing_view(&args.to)?;
    let diff = source.diff(&target);

    if matches!(args.output.as_deref(), Some("json")) {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    if diff.is_empty() {
        println!("No assignment changes");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.add_row(Row::new(vec![
        Cell::new("CHANGE"),
        Cell::new("SUBSCRIPTION"),
        Cell::new("NODE"),
    ]));
    for assignment in &diff.removed {
        table.add_row(Row::new(vec![
            Cell::new("stop"),
            Cell::new(assignment.subscription.as_str()),
            Cell::new(assignment.node.as_str()),
        ]));
    }
    for assignment in &diff.added {
        table.add_row(Row::new(vec![
            Cell::new("start"),
            Cell::new(assignment.subscription.as_str()),
            Cell::new(assignment.node.as_str()),
        ]));
    }
    table.printstd();

    println!();
    println!("{} to stop, {} to start", diff.removed.len(), diff.added.len());
    Ok(())
}
