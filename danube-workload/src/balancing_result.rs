use crate::assignment::SubscriptionName;
use crate::view::AssignmentView;

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// BalancingResult holds the outcome of one balancing pass
///
/// The coordination layer persists `state` as the next "current" view and uses
/// the counters to drive monitoring, e.g. alerting when `missing_resources`
/// stays above zero across passes.
#[derive(Debug, Clone, Serialize)]
pub struct BalancingResult {
    /// The balanced view, handed to the next pass as its current state
    #[serde(skip)]
    state: AssignmentView,
    pub subscriptions: SubscriptionsStats,
    pub nodes: NodesStats,
    /// Sum over subscriptions of the shortfall to the replication target
    pub missing_resources: usize,
    /// Subscriptions still short of the replication target, with their shortfall
    pub unmet_subscriptions: BTreeMap<SubscriptionName, usize>,
    /// Assignments present before the pass and gone after it
    pub assignments_removed: usize,
    /// Assignments created by the pass
    pub assignments_added: usize,
    /// Assignments in the balanced view
    pub assignments_total: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubscriptionsStats {
    /// Subscriptions considered by the pass
    pub total: usize,
    /// Subscriptions dropped since the previous view
    pub removed: usize,
    /// Subscriptions unknown to the previous view
    pub added: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NodesStats {
    /// Consumer nodes reported alive
    pub active: usize,
    /// Nodes of the previous view that are gone
    pub inactive: usize,
    /// Nodes unknown to the previous view
    pub added: usize,
}

impl BalancingResult {
    pub fn builder(state: AssignmentView) -> BalancingResultBuilder {
        BalancingResultBuilder {
            result: BalancingResult {
                assignments_total: state.assignments_count(),
                state,
                subscriptions: SubscriptionsStats::default(),
                nodes: NodesStats::default(),
                missing_resources: 0,
                unmet_subscriptions: BTreeMap::new(),
                assignments_removed: 0,
                assignments_added: 0,
            },
        }
    }

    pub fn state(&self) -> &AssignmentView {
        &self.state
    }

    pub fn into_state(self) -> AssignmentView {
        self.state
    }

    /// True when every subscription reached its replication target
    pub fn is_balanced(&self) -> bool {
        self.missing_resources == 0
    }

    /// Number of assignments that consumers have to stop or start
    pub fn assignments_changed(&self) -> usize {
        self.assignments_removed + self.assignments_added
    }
}

impl fmt::Display for BalancingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subscriptions: {} ({} removed, {} new), nodes: {} ({} inactive, {} new), \
             assignments: {} (-{} +{}), missing resources: {}",
            self.subscriptions.total,
            self.subscriptions.removed,
            self.subscriptions.added,
            self.nodes.active,
            self.nodes.inactive,
            self.nodes.added,
            self.assignments_total,
            self.assignments_removed,
            self.assignments_added,
            self.missing_resources
        )
    }
}

pub struct BalancingResultBuilder {
    result: BalancingResult,
}

impl BalancingResultBuilder {
    pub fn with_subscriptions_stats(mut self, total: usize, removed: usize, added: usize) -> Self {
        self.result.subscriptions = SubscriptionsStats {
            total,
            removed,
            added,
        };
        self
    }

    pub fn with_nodes_stats(mut self, active: usize, inactive: usize, added: usize) -> Self {
        self.result.nodes = NodesStats {
            active,
            inactive,
            added,
        };
        self
    }

    /// Records the per subscription shortfall; missing resources is their sum
    pub fn with_unmet_subscriptions(mut self, unmet: BTreeMap<SubscriptionName, usize>) -> Self {
        self.result.missing_resources = unmet.values().sum();
        self.result.unmet_subscriptions = unmet;
        self
    }

    /// Records how much the balanced view differs from `previous`
    pub fn with_changes_from(mut self, previous: &AssignmentView) -> Self {
        let diff = previous.diff(&self.result.state);
        self.result.assignments_removed = diff.removed.len();
        self.result.assignments_added = diff.added.len();
        self
    }

    pub fn build(self) -> BalancingResult {
        self.result
    }
}
