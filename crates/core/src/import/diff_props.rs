//! Property-based tests for image-set diffing.

use std::collections::BTreeSet;

use proptest::prelude::*;

use super::diff::ImageDiff;

fn url_set() -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set("https://img\\.example\\.com/[a-e]{1,2}\\.jpg", 0..8)
        .prop_map(|set| set.into_iter().collect())
}

fn as_set(urls: &[String]) -> BTreeSet<String> {
    urls.iter().cloned().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// keep = E ∩ N, add = N \ E, delete = E \ N.
    #[test]
    fn prop_diff_matches_set_algebra(existing in url_set(), desired in url_set()) {
        let diff = ImageDiff::compute(&existing, &desired);
        let e = as_set(&existing);
        let n = as_set(&desired);

        prop_assert_eq!(as_set(&diff.keep), &e & &n);
        prop_assert_eq!(as_set(&diff.to_add), &n - &e);
        prop_assert_eq!(as_set(&diff.to_delete), &e - &n);
    }

    /// Applying the diff to E yields exactly N.
    #[test]
    fn prop_applying_diff_yields_desired(existing in url_set(), desired in url_set()) {
        let diff = ImageDiff::compute(&existing, &desired);
        let mut state = as_set(&existing);
        for url in &diff.to_delete {
            state.remove(url);
        }
        state.extend(diff.to_add.iter().cloned());
        prop_assert_eq!(state, as_set(&desired));
    }

    /// Diffing a set against itself changes nothing.
    #[test]
    fn prop_identity_diff_is_empty(existing in url_set()) {
        prop_assert!(!ImageDiff::compute(&existing, &existing).has_changes());
    }
}
