use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a subscription that needs consumer nodes serving it.
///
/// Danube subscriptions are usually written as `/{namespace}/{topic}:{subscription}`,
/// but the balancer treats the value as opaque and only relies on its ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionName(String);

impl SubscriptionName {
    pub fn new(name: impl Into<String>) -> Self {
        SubscriptionName(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriptionName {
    fn from(name: &str) -> Self {
        SubscriptionName::new(name)
    }
}

impl From<String> for SubscriptionName {
    fn from(name: String) -> Self {
        SubscriptionName(name)
    }
}

/// Identifies a live consumer node (a worker process able to serve subscriptions).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        NodeId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        NodeId::new(id)
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        NodeId(id)
    }
}

/// A subscription served by one consumer node.
///
/// `auto_assigned == false` marks an assignment pinned by an operator;
/// the balancer never removes or moves those.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionAssignment {
    pub subscription: SubscriptionName,
    pub node: NodeId,
    #[serde(default = "default_auto_assigned")]
    pub auto_assigned: bool,
}

fn default_auto_assigned() -> bool {
    true
}

impl SubscriptionAssignment {
    /// Creates an assignment owned by the balancer
    pub fn auto(subscription: impl Into<SubscriptionName>, node: impl Into<NodeId>) -> Self {
        Self {
            subscription: subscription.into(),
            node: node.into(),
            auto_assigned: true,
        }
    }

    /// Creates an operator pinned assignment
    pub fn pinned(subscription: impl Into<SubscriptionName>, node: impl Into<NodeId>) -> Self {
        Self {
            subscription: subscription.into(),
            node: node.into(),
            auto_assigned: false,
        }
    }

    pub fn is_auto_assigned(&self) -> bool {
        self.auto_assigned
    }
}

impl fmt::Display for SubscriptionAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}{}",
            self.subscription,
            self.node,
            if self.auto_assigned { "" } else { " (pinned)" }
        )
    }
}
