//! Property-based tests for the order status machine.

use proptest::prelude::*;

use super::status::{OrderStatus, is_valid_transition, transition_map};

fn status_strategy() -> impl Strategy<Value = OrderStatus> {
    prop::sample::select(OrderStatus::ALL.to_vec())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The predicate and the published adjacency never disagree.
    #[test]
    fn prop_predicate_matches_adjacency(from in status_strategy(), to in status_strategy()) {
        let map = transition_map();
        let listed = map[from.as_str()].contains(&to.as_str());
        prop_assert_eq!(is_valid_transition(from, to), listed);
    }

    /// Terminal statuses have no way out and no status loops to itself.
    #[test]
    fn prop_no_self_loops_or_terminal_exits(from in status_strategy(), to in status_strategy()) {
        if from == to || from.is_terminal() {
            prop_assert!(!is_valid_transition(from, to));
        }
    }

    /// Nothing moves backwards through the lifecycle.
    #[test]
    fn prop_transitions_move_forward(from in status_strategy(), to in status_strategy()) {
        if is_valid_transition(from, to) {
            prop_assert!(to > from);
        }
    }
}
