use crate::assignment::{NodeId, SubscriptionAssignment, SubscriptionName};
use crate::errors::{Result, WorkloadError};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// AssignmentView - immutable snapshot of which consumer nodes serve which subscriptions
///
/// The view holds the known subscriptions, the known consumer nodes and the
/// assignments between them. Both indexes are kept in sync:
/// - every assignment references a known subscription and a known node
/// - a (subscription, node) pair is assigned at most once
///
/// A view is never mutated in place. [`AssignmentView::transform`] hands a
/// [`Transformer`] over a private copy to a closure and returns the resulting
/// view only once the closure has finished, so callers observe either the
/// previous snapshot or the complete new one.
///
/// Iteration follows identifier order, which keeps every algorithm built on
/// top of the view deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "AssignmentSnapshot", try_from = "AssignmentSnapshot")]
pub struct AssignmentView {
    /// subscription -> (node -> auto_assigned)
    subscriptions: BTreeMap<SubscriptionName, BTreeMap<NodeId, bool>>,
    /// node -> subscriptions served by the node
    nodes: BTreeMap<NodeId, BTreeSet<SubscriptionName>>,
}

impl AssignmentView {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a view from its raw parts, rejecting assignments that break the view invariants.
    pub fn new<S, N, A>(subscriptions: S, nodes: N, assignments: A) -> Result<Self>
    where
        S: IntoIterator<Item = SubscriptionName>,
        N: IntoIterator<Item = NodeId>,
        A: IntoIterator<Item = SubscriptionAssignment>,
    {
        let mut view = AssignmentView::empty();
        for subscription in subscriptions {
            view.insert_subscription(subscription);
        }
        for node in nodes {
            view.insert_node(node);
        }

        for assignment in assignments {
            if !view.subscriptions.contains_key(&assignment.subscription) {
                return Err(WorkloadError::UnknownSubscription {
                    subscription: assignment.subscription,
                    node: assignment.node,
                });
            }
            if !view.nodes.contains_key(&assignment.node) {
                return Err(WorkloadError::UnknownNode {
                    subscription: assignment.subscription,
                    node: assignment.node,
                });
            }
            if view.is_assigned(&assignment.subscription, &assignment.node) {
                return Err(WorkloadError::DuplicateAssignment {
                    subscription: assignment.subscription,
                    node: assignment.node,
                });
            }
            view.insert_assignment(assignment);
        }

        Ok(view)
    }

    /// Builds a view whose known subscriptions and nodes are exactly the ones referenced
    /// by `assignments`. A repeated pair keeps the flag of its last occurrence.
    pub fn from_assignments<A>(assignments: A) -> Self
    where
        A: IntoIterator<Item = SubscriptionAssignment>,
    {
        let mut view = AssignmentView::empty();
        for assignment in assignments {
            view.insert_subscription(assignment.subscription.clone());
            view.insert_node(assignment.node.clone());
            view.insert_assignment(assignment);
        }
        view
    }

    /// Applies a set of mutations and returns the resulting snapshot.
    ///
    /// The closure receives a [`Transformer`] over a private copy of this view;
    /// `self` is left untouched.
    pub fn transform<F>(&self, f: F) -> AssignmentView
    where
        F: FnOnce(&mut Transformer),
    {
        let mut transformer = Transformer {
            state: self.clone(),
        };
        f(&mut transformer);
        transformer.state
    }

    /// Loads a view from its JSON snapshot form, validating it like [`AssignmentView::new`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// JSON snapshot form of the view, the format read back by [`AssignmentView::from_json`]
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn subscriptions(&self) -> impl Iterator<Item = &SubscriptionName> + '_ {
        self.subscriptions.keys()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NodeId> + '_ {
        self.nodes.keys()
    }

    pub fn subscriptions_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn nodes_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn contains_subscription(&self, subscription: &SubscriptionName) -> bool {
        self.subscriptions.contains_key(subscription)
    }

    pub fn contains_node(&self, node: &NodeId) -> bool {
        self.nodes.contains_key(node)
    }

    /// All assignments, ordered by subscription then node
    pub fn assignments(&self) -> impl Iterator<Item = SubscriptionAssignment> + '_ {
        self.subscriptions
            .iter()
            .flat_map(|(subscription, nodes)| {
                nodes.iter().map(move |(node, auto_assigned)| SubscriptionAssignment {
                    subscription: subscription.clone(),
                    node: node.clone(),
                    auto_assigned: *auto_assigned,
                })
            })
    }

    pub fn assignments_count(&self) -> usize {
        self.nodes.values().map(BTreeSet::len).sum()
    }

    pub fn assignments_for_subscription(
        &self,
        subscription: &SubscriptionName,
    ) -> Vec<SubscriptionAssignment> {
        self.subscriptions
            .get(subscription)
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|(node, auto_assigned)| SubscriptionAssignment {
                        subscription: subscription.clone(),
                        node: node.clone(),
                        auto_assigned: *auto_assigned,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn assignments_for_node(&self, node: &NodeId) -> Vec<SubscriptionAssignment> {
        self.subscriptions_for_node(node)
            .filter_map(|subscription| self.get_assignment(subscription, node))
            .collect()
    }

    pub fn assignments_count_for_subscription(&self, subscription: &SubscriptionName) -> usize {
        self.subscriptions
            .get(subscription)
            .map_or(0, BTreeMap::len)
    }

    pub fn assignments_count_for_node(&self, node: &NodeId) -> usize {
        self.nodes.get(node).map_or(0, BTreeSet::len)
    }

    pub fn nodes_for_subscription<'a>(
        &'a self,
        subscription: &SubscriptionName,
    ) -> impl Iterator<Item = &'a NodeId> + 'a {
        self.subscriptions
            .get(subscription)
            .into_iter()
            .flat_map(|nodes| nodes.keys())
    }

    pub fn subscriptions_for_node<'a>(
        &'a self,
        node: &NodeId,
    ) -> impl Iterator<Item = &'a SubscriptionName> + 'a {
        self.nodes.get(node).into_iter().flatten()
    }

    pub fn is_assigned(&self, subscription: &SubscriptionName, node: &NodeId) -> bool {
        self.subscriptions
            .get(subscription)
            .is_some_and(|nodes| nodes.contains_key(node))
    }

    pub fn get_assignment(
        &self,
        subscription: &SubscriptionName,
        node: &NodeId,
    ) -> Option<SubscriptionAssignment> {
        let auto_assigned = *self.subscriptions.get(subscription)?.get(node)?;
        Some(SubscriptionAssignment {
            subscription: subscription.clone(),
            node: node.clone(),
            auto_assigned,
        })
    }

    /// Assignments of this view that are absent from `target`
    pub fn deletions(&self, target: &AssignmentView) -> Vec<SubscriptionAssignment> {
        self.assignments()
            .filter(|a| !target.is_assigned(&a.subscription, &a.node))
            .collect()
    }

    /// Assignments of `target` that are absent from this view
    pub fn additions(&self, target: &AssignmentView) -> Vec<SubscriptionAssignment> {
        target.deletions(self)
    }

    pub fn diff(&self, target: &AssignmentView) -> AssignmentDiff {
        AssignmentDiff {
            removed: self.deletions(target),
            added: self.additions(target),
        }
    }

    fn insert_subscription(&mut self, subscription: SubscriptionName) {
        self.subscriptions.entry(subscription).or_default();
    }

    fn insert_node(&mut self, node: NodeId) {
        self.nodes.entry(node).or_default();
    }

    // callers guarantee both ends are known
    fn insert_assignment(&mut self, assignment: SubscriptionAssignment) {
        if let Some(nodes) = self.subscriptions.get_mut(&assignment.subscription) {
            nodes.insert(assignment.node.clone(), assignment.auto_assigned);
        }
        if let Some(subscriptions) = self.nodes.get_mut(&assignment.node) {
            subscriptions.insert(assignment.subscription);
        }
    }
}

/// Assignment level difference between two views
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssignmentDiff {
    /// Assignments to stop (present in the source view only)
    pub removed: Vec<SubscriptionAssignment>,
    /// Assignments to start (present in the target view only)
    pub added: Vec<SubscriptionAssignment>,
}

impl AssignmentDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }

    pub fn len(&self) -> usize {
        self.removed.len() + self.added.len()
    }
}

/// Transient builder handed to the closure of [`AssignmentView::transform`].
///
/// Reads through [`Transformer::state`] observe every mutation applied so far.
#[derive(Debug)]
pub struct Transformer {
    state: AssignmentView,
}

impl Transformer {
    /// The work-in-progress view
    pub fn state(&self) -> &AssignmentView {
        &self.state
    }

    pub fn add_subscription(&mut self, subscription: SubscriptionName) {
        self.state.insert_subscription(subscription);
    }

    /// Forgets the subscription together with all of its assignments
    pub fn remove_subscription(&mut self, subscription: &SubscriptionName) {
        if let Some(nodes) = self.state.subscriptions.remove(subscription) {
            for node in nodes.keys() {
                if let Some(served) = self.state.nodes.get_mut(node) {
                    served.remove(subscription);
                }
            }
        }
    }

    pub fn add_node(&mut self, node: NodeId) {
        self.state.insert_node(node);
    }

    /// Forgets the consumer node together with all of its assignments
    pub fn remove_node(&mut self, node: &NodeId) {
        if let Some(served) = self.state.nodes.remove(node) {
            for subscription in &served {
                if let Some(nodes) = self.state.subscriptions.get_mut(subscription) {
                    nodes.remove(node);
                }
            }
        }
    }

    /// Adds the assignment, returns false when one of its ends is unknown
    /// or the pair is already assigned.
    pub fn add_assignment(&mut self, assignment: SubscriptionAssignment) -> bool {
        if !self.state.contains_subscription(&assignment.subscription)
            || !self.state.contains_node(&assignment.node)
            || self
                .state
                .is_assigned(&assignment.subscription, &assignment.node)
        {
            return false;
        }
        self.state.insert_assignment(assignment);
        true
    }

    pub fn remove_assignment(
        &mut self,
        subscription: &SubscriptionName,
        node: &NodeId,
    ) -> Option<SubscriptionAssignment> {
        let auto_assigned = self
            .state
            .subscriptions
            .get_mut(subscription)?
            .remove(node)?;
        if let Some(served) = self.state.nodes.get_mut(node) {
            served.remove(subscription);
        }
        Some(SubscriptionAssignment {
            subscription: subscription.clone(),
            node: node.clone(),
            auto_assigned,
        })
    }

    /// Moves the subscription from one node to another in a single step.
    ///
    /// The moved assignment is auto-assigned on the target node. Nothing changes
    /// when `from` does not serve the subscription, or `to` is unknown or already
    /// serves it.
    pub fn transfer_assignment(
        &mut self,
        from: &NodeId,
        to: &NodeId,
        subscription: &SubscriptionName,
    ) -> bool {
        if !self.state.is_assigned(subscription, from)
            || !self.state.contains_node(to)
            || self.state.is_assigned(subscription, to)
        {
            return false;
        }
        self.remove_assignment(subscription, from);
        self.state.insert_assignment(SubscriptionAssignment {
            subscription: subscription.clone(),
            node: to.clone(),
            auto_assigned: true,
        });
        true
    }
}

/// Flat serialized form of an [`AssignmentView`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    #[serde(default)]
    pub subscriptions: Vec<SubscriptionName>,
    #[serde(default)]
    pub nodes: Vec<NodeId>,
    #[serde(default)]
    pub assignments: Vec<SubscriptionAssignment>,
}

impl From<AssignmentView> for AssignmentSnapshot {
    fn from(view: AssignmentView) -> Self {
        AssignmentSnapshot {
            subscriptions: view.subscriptions().cloned().collect(),
            nodes: view.nodes().cloned().collect(),
            assignments: view.assignments().collect(),
        }
    }
}

impl TryFrom<AssignmentSnapshot> for AssignmentView {
    type Error = WorkloadError;

    fn try_from(snapshot: AssignmentSnapshot) -> Result<Self> {
        AssignmentView::new(snapshot.subscriptions, snapshot.nodes, snapshot.assignments)
    }
}

#[cfg(test)]
#[path = "view_test.rs"]
mod view_test;
