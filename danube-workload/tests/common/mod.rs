#![allow(dead_code)]

use danube_workload::{
    AssignmentView, BalancingResult, NodeId, SubscriptionAssignment, SubscriptionName,
    TopologyDiff,
};
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::BTreeSet;

pub fn subscription(i: usize) -> SubscriptionName {
    SubscriptionName::new(format!("/default/topic-{:03}:sub", i))
}

pub fn node(i: usize) -> NodeId {
    NodeId::new(format!("consumer-{:02}", i))
}

pub fn subs(names: &[&str]) -> Vec<SubscriptionName> {
    names.iter().map(|s| SubscriptionName::from(*s)).collect()
}

pub fn nodes(ids: &[&str]) -> Vec<NodeId> {
    ids.iter().map(|n| NodeId::from(*n)).collect()
}

/// A cluster whose membership and subscription set drift between balancing passes
pub struct ChurningCluster {
    pub subscriptions: BTreeSet<usize>,
    pub nodes: BTreeSet<usize>,
    next_subscription: usize,
    next_node: usize,
}

impl ChurningCluster {
    pub fn new(subscriptions: usize, nodes: usize) -> Self {
        ChurningCluster {
            subscriptions: (0..subscriptions).collect(),
            nodes: (0..nodes).collect(),
            next_subscription: subscriptions,
            next_node: nodes,
        }
    }

    /// Adds and removes a few subscriptions and nodes
    pub fn churn(&mut self, rng: &mut StdRng) {
        for _ in 0..rng.gen_range(0..3) {
            self.subscriptions.insert(self.next_subscription);
            self.next_subscription += 1;
        }
        if !self.subscriptions.is_empty() && rng.gen_bool(0.5) {
            let victim = pick(&self.subscriptions, rng);
            self.subscriptions.remove(&victim);
        }
        if rng.gen_bool(0.3) {
            self.nodes.insert(self.next_node);
            self.next_node += 1;
        }
        if self.nodes.len() > 1 && rng.gen_bool(0.3) {
            let victim = pick(&self.nodes, rng);
            self.nodes.remove(&victim);
        }
    }

    pub fn subscription_names(&self) -> Vec<SubscriptionName> {
        self.subscriptions.iter().map(|i| subscription(*i)).collect()
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(|i| node(*i)).collect()
    }
}

fn pick(set: &BTreeSet<usize>, rng: &mut StdRng) -> usize {
    let index = rng.gen_range(0..set.len());
    *set.iter().nth(index).unwrap()
}

/// Pins one random (subscription, node) pair of the current cluster, like an operator would
pub fn pin_random(
    view: &AssignmentView,
    cluster: &ChurningCluster,
    rng: &mut StdRng,
) -> AssignmentView {
    if cluster.subscriptions.is_empty() || cluster.nodes.is_empty() {
        return view.clone();
    }
    let subscription = subscription(pick(&cluster.subscriptions, rng));
    let node = node(pick(&cluster.nodes, rng));

    view.transform(|transformer| {
        transformer.add_subscription(subscription.clone());
        transformer.add_node(node.clone());
        transformer.remove_assignment(&subscription, &node);
        transformer.add_assignment(SubscriptionAssignment::pinned(subscription, node));
    })
}

pub fn pinned_count(view: &AssignmentView, subscription: &SubscriptionName) -> usize {
    view.assignments_for_subscription(subscription)
        .iter()
        .filter(|a| !a.is_auto_assigned())
        .count()
}

/// Checks every guarantee of a balancing pass
pub fn assert_balanced(
    result: &BalancingResult,
    previous: &AssignmentView,
    subscriptions: &[SubscriptionName],
    active_nodes: &[NodeId],
    consumers_per_subscription: usize,
    max_subscriptions_per_consumer: usize,
) {
    let state = result.state();

    // the view knows exactly the requested entities
    let requested: BTreeSet<&SubscriptionName> = subscriptions.iter().collect();
    let active: BTreeSet<&NodeId> = active_nodes.iter().collect();
    assert_eq!(state.subscriptions().collect::<BTreeSet<_>>(), requested);
    assert_eq!(state.nodes().collect::<BTreeSet<_>>(), active);
    assert!(TopologyDiff::compute(state, subscriptions, active_nodes).is_empty());

    // replication target, unless pins exceed it
    for subscription in state.subscriptions() {
        let count = state.assignments_count_for_subscription(subscription);
        let pinned = pinned_count(state, subscription);
        assert!(
            count <= consumers_per_subscription || count == pinned,
            "{} has {} assignments ({} pinned)",
            subscription,
            count,
            pinned
        );
    }

    // capacity, unless the node only holds pins
    for node in state.nodes() {
        let assignments = state.assignments_for_node(node);
        let pinned = assignments.iter().filter(|a| !a.auto_assigned).count();
        assert!(
            assignments.len() <= max_subscriptions_per_consumer || assignments.len() == pinned,
            "{} holds {} assignments",
            node,
            assignments.len()
        );
    }

    // pins of surviving entities are untouched
    for assignment in previous.assignments().filter(|a| !a.auto_assigned) {
        if requested.contains(&assignment.subscription) && active.contains(&assignment.node) {
            assert_eq!(
                state.get_assignment(&assignment.subscription, &assignment.node),
                Some(assignment.clone()),
                "pinned assignment {} was lost",
                assignment
            );
        }
    }

    // no pair of nodes can still be evened out
    for heavy in state.nodes() {
        for light in state.nodes() {
            let heavy_load = state.assignments_count_for_node(heavy);
            let light_load = state.assignments_count_for_node(light);
            if heavy_load > light_load + 1 && light_load < max_subscriptions_per_consumer {
                let movable = state.assignments_for_node(heavy).into_iter().any(|a| {
                    a.auto_assigned && !state.is_assigned(&a.subscription, light)
                });
                assert!(
                    !movable,
                    "{} ({}) could still give work to {} ({})",
                    heavy,
                    heavy_load,
                    light,
                    light_load
                );
            }
        }
    }

    // missing resources is the total shortfall
    let missing: usize = subscriptions
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(|s| {
            consumers_per_subscription.saturating_sub(state.assignments_count_for_subscription(s))
        })
        .sum();
    assert_eq!(result.missing_resources, missing);
}
