use crate::assignment::{NodeId, SubscriptionName};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, WorkloadError>;

#[derive(Debug, Error)]
pub enum WorkloadError {
    #[error("Invalid workload configuration: {0}")]
    InvalidConfig(String),

    #[error("Assignment {subscription} -> {node} references an unknown subscription")]
    UnknownSubscription {
        subscription: SubscriptionName,
        node: NodeId,
    },

    #[error("Assignment {subscription} -> {node} references an unknown consumer node")]
    UnknownNode {
        subscription: SubscriptionName,
        node: NodeId,
    },

    #[error("Duplicate assignment {subscription} -> {node}")]
    DuplicateAssignment {
        subscription: SubscriptionName,
        node: NodeId,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
