use crate::errors::{Result, WorkloadError};
use serde::{Deserialize, Serialize};

/// Capacity parameters carried by the work balancer.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Target number of consumer nodes serving each subscription
    pub consumers_per_subscription: usize,
    /// Maximum number of subscriptions a single consumer node may serve
    pub max_subscriptions_per_consumer: usize,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            consumers_per_subscription: 2,
            max_subscriptions_per_consumer: 200,
        }
    }
}

impl WorkloadConfig {
    pub fn new(consumers_per_subscription: usize, max_subscriptions_per_consumer: usize) -> Self {
        Self {
            consumers_per_subscription,
            max_subscriptions_per_consumer,
        }
    }

    /// Rejects limits that would make every subscription permanently unserved
    pub fn validate(&self) -> Result<()> {
        if self.consumers_per_subscription == 0 {
            return Err(WorkloadError::InvalidConfig(
                "consumers_per_subscription must be at least 1".to_string(),
            ));
        }
        if self.max_subscriptions_per_consumer == 0 {
            return Err(WorkloadError::InvalidConfig(
                "max_subscriptions_per_consumer must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
