use crate::assignment::{NodeId, SubscriptionAssignment};
use crate::view::AssignmentView;

use std::collections::BTreeMap;

/// Available work: the assignments still missing from a view.
///
/// ## Algorithm
/// Subscriptions are visited in name order. Each one below
/// `consumers_per_subscription` is offered to the nodes that do not serve it yet
/// and still have room under `max_subscriptions_per_consumer`, least loaded first
/// (ties by node id). Loads are updated as work is handed out, so later
/// subscriptions see the effect of earlier choices.
///
/// A subscription ends up with `min(consumers_per_subscription, usable nodes)`
/// assignments; nodes already at capacity are skipped.
///
/// ## Returns
/// New auto-assigned assignments, none of which duplicates an existing pair
pub fn available_work(
    view: &AssignmentView,
    consumers_per_subscription: usize,
    max_subscriptions_per_consumer: usize,
) -> Vec<SubscriptionAssignment> {
    let mut loads: BTreeMap<&NodeId, usize> = view
        .nodes()
        .map(|node| (node, view.assignments_count_for_node(node)))
        .collect();

    let mut work = Vec::new();

    for subscription in view.subscriptions() {
        let missing = consumers_per_subscription
            .saturating_sub(view.assignments_count_for_subscription(subscription));
        if missing == 0 {
            continue;
        }

        let mut candidates: Vec<(&NodeId, usize)> = loads
            .iter()
            .filter(|(node, load)| {
                **load < max_subscriptions_per_consumer && !view.is_assigned(subscription, node)
            })
            .map(|(node, load)| (*node, *load))
            .collect();

        candidates.sort_by_key(|&(node, load)| (load, node));

        for (node, _) in candidates.into_iter().take(missing) {
            if let Some(load) = loads.get_mut(node) {
                *load += 1;
            }
            work.push(SubscriptionAssignment::auto(subscription.clone(), node.clone()));
        }
    }

    work
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::SubscriptionName;

    fn view_with(subscriptions: &[&str], nodes: &[&str]) -> AssignmentView {
        AssignmentView::new(
            subscriptions.iter().map(|s| SubscriptionName::from(*s)),
            nodes.iter().map(|n| NodeId::from(*n)),
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_fills_every_subscription_to_target() {
        let view = view_with(&["a", "b", "c"], &["n1", "n2"]);

        let work = available_work(&view, 2, 3);

        assert_eq!(work.len(), 6);
        for subscription in ["a", "b", "c"] {
            let count = work
                .iter()
                .filter(|w| w.subscription.as_str() == subscription)
                .count();
            assert_eq!(count, 2);
        }
        assert!(work.iter().all(|w| w.auto_assigned));
    }

    #[test]
    fn test_prefers_least_loaded_nodes() {
        let view = AssignmentView::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec!["n1".into(), "n2".into(), "n3".into()],
            vec![
                SubscriptionAssignment::auto("a", "n1"),
                SubscriptionAssignment::auto("b", "n1"),
            ],
        )
        .unwrap();

        let work = available_work(&view, 1, 10);

        // only c is missing, n2 and n3 are empty, n2 wins the tie by id
        assert_eq!(work, vec![SubscriptionAssignment::auto("c", "n2")]);
    }

    #[test]
    fn test_respects_capacity() {
        let view = view_with(&["a", "b", "c"], &["n1"]);

        let work = available_work(&view, 1, 2);

        assert_eq!(work.len(), 2);
        assert_eq!(work[0], SubscriptionAssignment::auto("a", "n1"));
        assert_eq!(work[1], SubscriptionAssignment::auto("b", "n1"));
    }

    #[test]
    fn test_never_duplicates_existing_pairs() {
        let view = AssignmentView::new(
            vec!["a".into()],
            vec!["n1".into(), "n2".into()],
            vec![SubscriptionAssignment::pinned("a", "n1")],
        )
        .unwrap();

        let work = available_work(&view, 3, 10);

        // only n2 is usable, a stays one short
        assert_eq!(work, vec![SubscriptionAssignment::auto("a", "n2")]);
    }

    #[test]
    fn test_no_nodes_no_work() {
        let view = view_with(&["a", "b"], &[]);
        assert!(available_work(&view, 2, 10).is_empty());
    }
}
