//! Property-based tests for order totals.

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::pricing::{DeliveryPolicy, compute_totals};

/// Prices from 0.01 to 999.99.
fn price() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn lines() -> impl Strategy<Value = Vec<(Decimal, i32)>> {
    prop::collection::vec((price(), 1i32..20), 1..10)
}

fn policy() -> impl Strategy<Value = DeliveryPolicy> {
    (0i64..1_000, 0i64..10_000).prop_map(|(fee, threshold)| DeliveryPolicy {
        fee: Decimal::new(fee, 2),
        free_threshold: Decimal::new(threshold, 2),
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Total is always subtotal plus delivery fee.
    #[test]
    fn prop_total_is_subtotal_plus_fee(lines in lines(), policy in policy()) {
        let totals = compute_totals(&lines, &policy);
        prop_assert_eq!(totals.total, totals.subtotal + totals.delivery_fee);
    }

    /// Points are the floor of the subtotal.
    #[test]
    fn prop_points_are_floor_of_subtotal(lines in lines(), policy in policy()) {
        let totals = compute_totals(&lines, &policy);
        prop_assert_eq!(Decimal::from(totals.points_earned), totals.subtotal.floor());
    }

    /// The fee is either waived or the flat policy fee.
    #[test]
    fn prop_fee_waived_only_at_threshold(lines in lines(), policy in policy()) {
        let totals = compute_totals(&lines, &policy);
        if totals.subtotal >= policy.free_threshold {
            prop_assert_eq!(totals.delivery_fee, Decimal::ZERO);
        } else {
            prop_assert_eq!(totals.delivery_fee, policy.fee);
        }
    }
}
