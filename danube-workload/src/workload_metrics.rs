// Metric names published for balancing passes.
// The balancer itself never records anything; callers decide when a pass counts
// and call `record_balancing_result` after persisting its view.

use crate::balancing_result::BalancingResult;
use metrics::{counter, gauge};

#[derive(Debug, Clone, Copy)]
pub struct Metric {
    pub name: &'static str,
    pub description: &'static str,
}

pub const COUNTERS: [Metric; 2] = [BALANCING_PASSES_TOTAL, ASSIGNMENT_CHANGES_TOTAL];
pub const GAUGES: [Metric; 4] = [
    WORKLOAD_SUBSCRIPTIONS,
    WORKLOAD_NODES,
    WORKLOAD_ASSIGNMENTS,
    WORKLOAD_MISSING_RESOURCES,
];

pub const BALANCING_PASSES_TOTAL: Metric = Metric {
    name: "danube_workload_balancing_passes_total",
    description: "Total number of balancing passes (result=balanced|missing_resources)",
};

pub const ASSIGNMENT_CHANGES_TOTAL: Metric = Metric {
    name: "danube_workload_assignment_changes_total",
    description: "Total number of assignments started or stopped by balancing (op=add|remove)",
};

pub const WORKLOAD_SUBSCRIPTIONS: Metric = Metric {
    name: "danube_workload_subscriptions",
    description: "Subscriptions considered by the last balancing pass",
};

pub const WORKLOAD_NODES: Metric = Metric {
    name: "danube_workload_nodes",
    description: "Active consumer nodes seen by the last balancing pass",
};

pub const WORKLOAD_ASSIGNMENTS: Metric = Metric {
    name: "danube_workload_assignments",
    description: "Assignments in the view produced by the last balancing pass",
};

pub const WORKLOAD_MISSING_RESOURCES: Metric = Metric {
    name: "danube_workload_missing_resources",
    description: "Replicas still missing to reach the replication target of every subscription",
};

/// Publishes the statistics of a balancing pass through the `metrics` facade
pub fn record_balancing_result(result: &BalancingResult) {
    let outcome = if result.is_balanced() {
        "balanced"
    } else {
        "missing_resources"
    };
    counter!(BALANCING_PASSES_TOTAL.name, "result" => outcome).increment(1);
    counter!(ASSIGNMENT_CHANGES_TOTAL.name, "op" => "add")
        .increment(result.assignments_added as u64);
    counter!(ASSIGNMENT_CHANGES_TOTAL.name, "op" => "remove")
        .increment(result.assignments_removed as u64);

    gauge!(WORKLOAD_SUBSCRIPTIONS.name).set(result.subscriptions.total as f64);
    gauge!(WORKLOAD_NODES.name).set(result.nodes.active as f64);
    gauge!(WORKLOAD_ASSIGNMENTS.name).set(result.assignments_total as f64);
    gauge!(WORKLOAD_MISSING_RESOURCES.name).set(result.missing_resources as f64);
}

/// Registers descriptions for every metric, once a recorder is installed
pub fn describe_metrics() {
    for metric in COUNTERS {
        metrics::describe_counter!(metric.name, metric.description);
    }
    for metric in GAUGES {
        metrics::describe_gauge!(metric.name, metric.description);
    }
}
