//! Property-based tests for version ordering.
//!
//! These tests use proptest to generate random inputs and verify that
//! ordering invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use std::cmp::Ordering;

    use crate::version::{compare, max_by_version, sort_by_version, strip_prefix, VersionKey};
    use proptest::prelude::*;

    fn semver_string() -> impl Strategy<Value = String> {
        (0u64..50, 0u64..50, 0u64..50, any::<bool>()).prop_map(|(major, minor, patch, prefixed)| {
            let prefix = if prefixed { "v" } else { "" };
            format!("{prefix}{major}.{minor}.{patch}")
        })
    }

    /// Semver strings mixed with short dotted strings that mostly do not parse
    fn mixed_version() -> impl Strategy<Value = String> {
        prop_oneof![semver_string(), "v?[0-9]{1,2}(\\.[0-9]{1,2}){0,1}", "[a-z]{1,5}"]
    }

    proptest! {
        /// Property: compare is antisymmetric
        #[test]
        fn compare_is_antisymmetric(a in "[v0-9a-z.]{0,8}", b in "[v0-9a-z.]{0,8}") {
            prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
        }

        /// Property: a version is always equal to itself
        #[test]
        fn compare_is_reflexive(a in ".*") {
            prop_assert_eq!(compare(&a, &a), Ordering::Equal);
        }

        /// Property: the leading v never changes the order of semver versions
        #[test]
        fn compare_ignores_leading_v(a in semver_string(), b in semver_string()) {
            let bare_a = strip_prefix(&a).to_string();
            let bare_b = strip_prefix(&b).to_string();
            prop_assert_eq!(compare(&a, &b), compare(&bare_a, &bare_b));
        }

        /// Property: sorting semver versions yields a non-decreasing sequence
        #[test]
        fn sort_semver_is_non_decreasing(versions in prop::collection::vec(semver_string(), 0..20)) {
            let mut versions = versions;
            sort_by_version(&mut versions, |v| v.as_str());
            for pair in versions.windows(2) {
                prop_assert_ne!(compare(&pair[0], &pair[1]), Ordering::Greater);
            }
        }

        /// Property: sorting any versions yields a permutation of the input
        #[test]
        fn sort_is_a_permutation(versions in prop::collection::vec("[v0-9a-z.]{0,6}", 0..20)) {
            let mut sorted = versions.clone();
            sort_by_version(&mut sorted, |v| v.as_str());

            let mut expected = versions.clone();
            let mut actual = sorted.clone();
            expected.sort();
            actual.sort();
            prop_assert_eq!(expected, actual);
        }

        /// Property: sorted batches are non-decreasing under compare, mixed or not
        #[test]
        fn sort_mixed_agrees_with_compare(versions in prop::collection::vec(mixed_version(), 0..20)) {
            let mut sorted = versions;
            sort_by_version(&mut sorted, |v| v.as_str());
            for pair in sorted.windows(2) {
                prop_assert_ne!(compare(&pair[0], &pair[1]), Ordering::Greater);
            }
        }

        /// Property: the order bundles use is transitive over mixed versions
        #[test]
        fn version_key_is_transitive(a in mixed_version(), b in mixed_version(), c in mixed_version()) {
            let (a, b, c) = (VersionKey::new(&a), VersionKey::new(&b), VersionKey::new(&c));
            if a <= b && b <= c {
                prop_assert!(a <= c);
            }
            if a < b && b < c {
                prop_assert!(a < c);
            }
        }

        /// Property: exactly one of less, equal, greater holds
        #[test]
        fn compare_is_total(a in mixed_version(), b in mixed_version()) {
            let forward = compare(&a, &b);
            let backward = compare(&b, &a);
            prop_assert_eq!(forward, backward.reverse());
            prop_assert_eq!(forward == Ordering::Equal, VersionKey::new(&a) == VersionKey::new(&b));
        }

        /// Property: the maximum is the last element of the sorted batch
        #[test]
        fn max_is_last_of_sorted(versions in prop::collection::vec(semver_string(), 1..20)) {
            let mut sorted = versions.clone();
            sort_by_version(&mut sorted, |v| v.as_str());
            let max = max_by_version(versions, |v| v.as_str());
            prop_assert_eq!(max.as_deref().map(strip_prefix), sorted.last().map(|v| strip_prefix(v)));
        }
    }
}
