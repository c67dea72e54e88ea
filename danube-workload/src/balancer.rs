use crate::assignment::{NodeId, SubscriptionName};
use crate::available_work::available_work;
use crate::balancing_result::BalancingResult;
use crate::config::WorkloadConfig;
use crate::errors::Result;
use crate::view::{AssignmentView, Transformer};

use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// WorkBalancer - assigns subscriptions to consumer nodes
///
/// Given the subscriptions that must be served, the consumer nodes reported alive
/// and the view produced by the previous pass, the balancer computes the next view:
///
/// ## Balancing pass:
/// 1. **Diff**: compares the inputs with the previous view (removed / new
///    subscriptions, inactive / new nodes)
/// 2. **Topology**: forgets removed subscriptions and inactive nodes together with
///    their assignments, registers the new ones
/// 3. **Minimize**: sheds auto-assigned replicas above `consumers_per_subscription`
///    and auto-assigned work above `max_subscriptions_per_consumer` on a node
/// 4. **Fill**: adds the available work needed to reach the replication target
/// 5. **Equalize**: moves auto-assigned work from the most to the least loaded nodes
///    until their loads differ by at most one
///
/// Fill and equalize repeat until neither changes the view, which makes the result
/// a fixed point: balancing it again with the same inputs changes nothing.
///
/// Operator pinned assignments (`auto_assigned == false`) are never removed or moved.
///
/// All steps run inside a single [`AssignmentView::transform`], so callers only
/// see the complete balanced view.
#[derive(Debug, Clone)]
pub struct WorkBalancer {
    consumers_per_subscription: usize,
    max_subscriptions_per_consumer: usize,
}

impl WorkBalancer {
    pub fn new(config: WorkloadConfig) -> Result<Self> {
        config.validate()?;
        Ok(WorkBalancer {
            consumers_per_subscription: config.consumers_per_subscription,
            max_subscriptions_per_consumer: config.max_subscriptions_per_consumer,
        })
    }

    pub fn with_limits(
        consumers_per_subscription: usize,
        max_subscriptions_per_consumer: usize,
    ) -> Result<Self> {
        Self::new(WorkloadConfig::new(
            consumers_per_subscription,
            max_subscriptions_per_consumer,
        ))
    }

    pub fn config(&self) -> WorkloadConfig {
        WorkloadConfig::new(
            self.consumers_per_subscription,
            self.max_subscriptions_per_consumer,
        )
    }

    /// Computes the next assignment view.
    ///
    /// Duplicated entries in `subscriptions` or `active_nodes` are ignored. The
    /// computation is pure: the same inputs always produce the same view.
    pub fn balance(
        &self,
        subscriptions: &[SubscriptionName],
        active_nodes: &[NodeId],
        current_state: &AssignmentView,
    ) -> BalancingResult {
        let subscriptions: BTreeSet<&SubscriptionName> = subscriptions.iter().collect();
        let active_nodes: BTreeSet<&NodeId> = active_nodes.iter().collect();

        let diff = TopologyDiff::between(current_state, &subscriptions, &active_nodes);
        if !diff.is_empty() {
            debug!(
                removed_subscriptions = ?diff.removed_subscriptions,
                inactive_nodes = ?diff.inactive_nodes,
                new_subscriptions = ?diff.new_subscriptions,
                new_nodes = ?diff.new_nodes,
                "topology changed since the previous balancing pass"
            );
        }

        let balanced_state = current_state.transform(|transformer| {
            diff.apply(transformer);
            self.minimize_workload(transformer);

            loop {
                let work = available_work(
                    transformer.state(),
                    self.consumers_per_subscription,
                    self.max_subscriptions_per_consumer,
                );
                let filled = work.len();
                for assignment in work {
                    transformer.add_assignment(assignment);
                }

                let transferred = self.equalize_workload(transformer);
                if filled == 0 && transferred == 0 {
                    break;
                }
                debug!(filled, transferred, "filled and equalized workload");
            }
        });

        info!(
            subscriptions = subscriptions.len(),
            nodes = active_nodes.len(),
            previous_assignments = current_state.assignments_count(),
            assignments = balanced_state.assignments_count(),
            "balanced subscriptions across consumer nodes"
        );

        let unmet = self.unmet_subscriptions(&subscriptions, &balanced_state);

        BalancingResult::builder(balanced_state)
            .with_subscriptions_stats(
                subscriptions.len(),
                diff.removed_subscriptions.len(),
                diff.new_subscriptions.len(),
            )
            .with_nodes_stats(
                active_nodes.len(),
                diff.inactive_nodes.len(),
                diff.new_nodes.len(),
            )
            .with_unmet_subscriptions(unmet)
            .with_changes_from(current_state)
            .build()
    }

    /// Removes surplus auto-assigned work: replicas above the replication target
    /// first, then whatever keeps a node above its capacity.
    fn minimize_workload(&self, transformer: &mut Transformer) {
        let state = transformer.state();

        let mut redundant: Vec<(SubscriptionName, NodeId)> = state
            .subscriptions()
            .flat_map(|subscription| self.find_redundant_assignments(state, subscription))
            .collect();

        for (subscription, node) in &redundant {
            transformer.remove_assignment(subscription, node);
        }

        let state = transformer.state();
        let overflow: Vec<(SubscriptionName, NodeId)> = state
            .nodes()
            .flat_map(|node| self.find_overflowing_assignments(state, node))
            .collect();

        for (subscription, node) in &overflow {
            transformer.remove_assignment(subscription, node);
        }

        redundant.extend(overflow);
        if !redundant.is_empty() {
            debug!(removed = redundant.len(), "removed redundant assignments");
        }
    }

    fn find_redundant_assignments(
        &self,
        state: &AssignmentView,
        subscription: &SubscriptionName,
    ) -> Vec<(SubscriptionName, NodeId)> {
        let surplus = state
            .assignments_count_for_subscription(subscription)
            .saturating_sub(self.consumers_per_subscription);

        state
            .assignments_for_subscription(subscription)
            .into_iter()
            .filter(|assignment| assignment.is_auto_assigned())
            .take(surplus)
            .map(|assignment| (assignment.subscription, assignment.node))
            .collect()
    }

    fn find_overflowing_assignments(
        &self,
        state: &AssignmentView,
        node: &NodeId,
    ) -> Vec<(SubscriptionName, NodeId)> {
        let overflow = state
            .assignments_count_for_node(node)
            .saturating_sub(self.max_subscriptions_per_consumer);

        state
            .assignments_for_node(node)
            .into_iter()
            .filter(|assignment| assignment.is_auto_assigned())
            .take(overflow)
            .map(|assignment| (assignment.subscription, assignment.node))
            .collect()
    }

    /// Moves auto-assigned work from loaded to idle nodes.
    ///
    /// Each round pairs the most loaded node with the least loaded one and moves
    /// subscriptions between them while their loads differ by more than one. When
    /// that pair is blocked (every subscription of the source is pinned or already
    /// served by the target) the next pairs are tried, sources by load descending and
    /// targets by load ascending. Rounds repeat until one moves nothing.
    ///
    /// Every move goes from a node with load `L` to one with load `l < L - 1`, which
    /// strictly lowers the sum of squared loads, so the loop terminates.
    ///
    /// Returns the number of transfers performed.
    fn equalize_workload(&self, transformer: &mut Transformer) -> usize {
        let state = transformer.state();
        if state.subscriptions_count() < 2 || state.nodes_count() == 0 {
            return 0;
        }

        let mut transfers = 0;
        loop {
            let loads = node_loads(transformer.state());

            let mut sources = loads.clone();
            sources.sort_by(|(a_node, a_load), (b_node, b_load)| {
                b_load.cmp(a_load).then_with(|| a_node.cmp(b_node))
            });
            let mut targets = loads;
            targets.sort_by(|(a_node, a_load), (b_node, b_load)| {
                a_load.cmp(b_load).then_with(|| a_node.cmp(b_node))
            });

            let mut transferred = 0;
            'pairs: for (max_loaded, max_load) in &sources {
                for (min_loaded, min_load) in &targets {
                    if *max_load <= *min_load + 1 {
                        // targets only get more loaded from here
                        break;
                    }
                    transferred = self.transfer_between(transformer, max_loaded, min_loaded);
                    if transferred > 0 {
                        break 'pairs;
                    }
                }
            }

            if transferred == 0 {
                break;
            }
            transfers += transferred;
        }

        transfers
    }

    fn transfer_between(
        &self,
        transformer: &mut Transformer,
        max_loaded: &NodeId,
        min_loaded: &NodeId,
    ) -> usize {
        let mut max_load = transformer.state().assignments_count_for_node(max_loaded);
        let mut min_load = transformer.state().assignments_count_for_node(min_loaded);

        let mut transferred = 0;
        while max_load > min_load + 1 && min_load < self.max_subscriptions_per_consumer {
            let Some(subscription) =
                subscription_for_transfer(transformer.state(), max_loaded, min_loaded)
            else {
                break;
            };
            if !transformer.transfer_assignment(max_loaded, min_loaded, &subscription) {
                break;
            }
            transferred += 1;
            max_load -= 1;
            min_load += 1;
        }
        transferred
    }

    /// Shortfall to the replication target of each requested subscription.
    fn unmet_subscriptions(
        &self,
        subscriptions: &BTreeSet<&SubscriptionName>,
        state: &AssignmentView,
    ) -> BTreeMap<SubscriptionName, usize> {
        let mut unmet = BTreeMap::new();
        for subscription in subscriptions {
            let assigned = state.assignments_count_for_subscription(subscription);
            if assigned != self.consumers_per_subscription {
                info!(
                    subscription = %subscription,
                    assignments = assigned,
                    target = self.consumers_per_subscription,
                    "subscription assignments differ from the replication target"
                );
            }
            let missing = self.consumers_per_subscription.saturating_sub(assigned);
            if missing > 0 {
                unmet.insert((*subscription).clone(), missing);
            }
        }
        unmet
    }
}

/// Entities that appeared or disappeared since the previous view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyDiff {
    /// Known to the view, no longer requested
    pub removed_subscriptions: Vec<SubscriptionName>,
    /// Known to the view, no longer alive
    pub inactive_nodes: Vec<NodeId>,
    /// Requested, unknown to the view
    pub new_subscriptions: Vec<SubscriptionName>,
    /// Alive, unknown to the view
    pub new_nodes: Vec<NodeId>,
}

impl TopologyDiff {
    /// Compares the requested subscriptions and active nodes with what `state` knows.
    /// Duplicated entries are ignored.
    pub fn compute(
        state: &AssignmentView,
        subscriptions: &[SubscriptionName],
        active_nodes: &[NodeId],
    ) -> Self {
        Self::between(
            state,
            &subscriptions.iter().collect(),
            &active_nodes.iter().collect(),
        )
    }

    fn between(
        state: &AssignmentView,
        subscriptions: &BTreeSet<&SubscriptionName>,
        active_nodes: &BTreeSet<&NodeId>,
    ) -> Self {
        TopologyDiff {
            removed_subscriptions: state
                .subscriptions()
                .filter(|s| !subscriptions.contains(s))
                .cloned()
                .collect(),
            inactive_nodes: state
                .nodes()
                .filter(|n| !active_nodes.contains(n))
                .cloned()
                .collect(),
            new_subscriptions: subscriptions
                .iter()
                .filter(|s| !state.contains_subscription(s))
                .map(|s| (*s).clone())
                .collect(),
            new_nodes: active_nodes
                .iter()
                .filter(|n| !state.contains_node(n))
                .map(|n| (*n).clone())
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.removed_subscriptions.is_empty()
            && self.inactive_nodes.is_empty()
            && self.new_subscriptions.is_empty()
            && self.new_nodes.is_empty()
    }

    fn apply(&self, transformer: &mut Transformer) {
        for subscription in &self.removed_subscriptions {
            transformer.remove_subscription(subscription);
        }
        for node in &self.inactive_nodes {
            transformer.remove_node(node);
        }
        for subscription in &self.new_subscriptions {
            transformer.add_subscription(subscription.clone());
        }
        for node in &self.new_nodes {
            transformer.add_node(node.clone());
        }
    }
}

fn node_loads(state: &AssignmentView) -> Vec<(NodeId, usize)> {
    state
        .nodes()
        .map(|node| (node.clone(), state.assignments_count_for_node(node)))
        .collect()
}

/// First auto-assigned subscription of `from`, in name order, that `to` does not serve yet
fn subscription_for_transfer(
    state: &AssignmentView,
    from: &NodeId,
    to: &NodeId,
) -> Option<SubscriptionName> {
    state
        .subscriptions_for_node(from)
        .find(|subscription| {
            !state.is_assigned(subscription, to)
                && state
                    .get_assignment(subscription, from)
                    .is_some_and(|assignment| assignment.is_auto_assigned())
        })
        .cloned()
}

#[cfg(test)]
#[path = "balancer_test.rs"]
mod balancer_test;
