//! # Danube Workload
//!
//! Assignment of subscriptions to consumer nodes for the Danube pub/sub platform.
//!
//! ## Core Responsibilities
//!
//! - **Replication**: every subscription is served by `consumers_per_subscription` nodes
//! - **Capacity**: no node serves more than `max_subscriptions_per_consumer` subscriptions
//! - **Stability**: work already placed stays where it is unless a node leaves, a
//!   subscription goes away, or the load is uneven
//! - **Fairness**: node loads converge to within one assignment of each other
//!
//! ## Architecture
//!
//! The [`WorkBalancer`] is a pure function over immutable snapshots:
//! 1. Receives the requested subscriptions, the live consumer nodes and the previous [`AssignmentView`]
//! 2. Applies the topology changes, sheds surplus work and fills the gaps inside one transform
//! 3. Equalizes node loads
//! 4. Returns a [`BalancingResult`] carrying the new view and the pass statistics
//!
//! Persisting the view, electing the node that runs the balancer and starting the
//! consumers are left to the caller.

pub mod assignment;
pub mod available_work;
pub mod balancer;
pub mod balancing_result;
pub mod config;
pub mod errors;
pub mod view;
pub mod workload_metrics;

// Re-export main types
pub use assignment::{NodeId, SubscriptionAssignment, SubscriptionName};
pub use available_work::available_work;
pub use balancer::{TopologyDiff, WorkBalancer};
pub use balancing_result::{BalancingResult, NodesStats, SubscriptionsStats};
pub use config::WorkloadConfig;
pub use errors::{Result, WorkloadError};
pub use view::{AssignmentDiff, AssignmentSnapshot, AssignmentView, Transformer};
pub use workload_metrics::record_balancing_result;
