//! Randomized churn over many consecutive balancing passes.
//!
//! Every pass feeds the previous result back in, with subscriptions and nodes coming
//! and going and operators pinning assignments, and checks all the guarantees of a
//! balancing pass plus idempotence. Seeds are fixed so failures reproduce.

mod common;

use common::{assert_balanced, pin_random, ChurningCluster};
use danube_workload::{AssignmentView, TopologyDiff, WorkBalancer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn run_churn(seed: u64, consumers_per_subscription: usize, max_subscriptions_per_consumer: usize) {
    let mut rng = StdRng::seed_from_u64(seed);
    let balancer =
        WorkBalancer::with_limits(consumers_per_subscription, max_subscriptions_per_consumer)
            .unwrap();
    let mut cluster = ChurningCluster::new(8, 3);
    let mut state = AssignmentView::empty();

    for _ in 0..40 {
        cluster.churn(&mut rng);
        if rng.gen_bool(0.2) {
            state = pin_random(&state, &cluster, &mut rng);
        }

        let subscriptions = cluster.subscription_names();
        let active = cluster.node_ids();

        let result = balancer.balance(&subscriptions, &active, &state);
        assert_balanced(
            &result,
            &state,
            &subscriptions,
            &active,
            consumers_per_subscription,
            max_subscriptions_per_consumer,
        );

        // balancing the result again is a no-op
        let again = balancer.balance(&subscriptions, &active, result.state());
        assert_eq!(again.state(), result.state(), "seed {}", seed);
        assert_eq!(again.missing_resources, result.missing_resources);

        // the next pass sees no topology change when inputs are stable
        assert!(TopologyDiff::compute(result.state(), &subscriptions, &active).is_empty());

        state = result.into_state();
    }
}

#[test]
fn churn_with_ample_capacity() {
    for seed in 0..10 {
        run_churn(seed, 2, 100);
    }
}

#[test]
fn churn_with_tight_capacity() {
    for seed in 10..20 {
        run_churn(seed, 2, 4);
    }
}

#[test]
fn churn_with_high_replication() {
    for seed in 20..30 {
        run_churn(seed, 3, 6);
    }
}

#[test]
fn churn_with_single_replica() {
    for seed in 30..40 {
        run_churn(seed, 1, 5);
    }
}

/// **Test:** Lowering capacity between passes
///
/// **Expectation:** The next pass brings every node back under the new limit.
#[test]
fn shrinking_capacity_is_honoured() {
    let mut cluster = ChurningCluster::new(20, 4);
    let mut rng = StdRng::seed_from_u64(99);
    cluster.churn(&mut rng);

    let subscriptions = cluster.subscription_names();
    let active = cluster.node_ids();

    let generous = WorkBalancer::with_limits(2, 50).unwrap();
    let first = generous.balance(&subscriptions, &active, &AssignmentView::empty());

    let strict = WorkBalancer::with_limits(2, 5).unwrap();
    let second = strict.balance(&subscriptions, &active, first.state());

    assert_balanced(&second, first.state(), &subscriptions, &active, 2, 5);
    for node in second.state().nodes() {
        assert!(second.state().assignments_count_for_node(node) <= 5);
    }
    assert!(second.missing_resources > 0);
}
