//! Property-based tests for the differ invariants
//!
//! These pin the algebraic properties the change classification must hold
//! for arbitrary snapshot pairs: idempotence, symmetry under argument
//! reversal, and the partition property (every path lands in exactly one
//! category or is omitted as unchanged).

use proptest::collection::btree_map;
use proptest::prelude::*;
use relic::{ChangeSet, StateSnapshot};
use std::collections::BTreeMap;

/// Small path/fingerprint alphabets so snapshots overlap often
fn arb_snapshot() -> impl Strategy<Value = StateSnapshot> {
    let path = prop_oneof![
        "[a-e]\\.txt",
        "dir/[a-e]\\.rs",
        "deep/sub/[a-c]\\.md",
    ];
    let fingerprint = "[0-9a-f]{8}";
    btree_map(path, fingerprint, 0..12).prop_map(|map: BTreeMap<String, String>| {
        map.into_iter().collect::<StateSnapshot>()
    })
}

proptest! {
    #[test]
    fn diff_of_identical_snapshots_is_empty(snapshot in arb_snapshot()) {
        let changes = ChangeSet::between(&snapshot, &snapshot);
        prop_assert!(changes.is_empty());
    }

    #[test]
    fn diff_is_symmetric(a in arb_snapshot(), b in arb_snapshot()) {
        let forward = ChangeSet::between(&a, &b);
        let backward = ChangeSet::between(&b, &a);

        prop_assert_eq!(&forward.added, &backward.deleted);
        prop_assert_eq!(&forward.deleted, &backward.added);
        prop_assert_eq!(&forward.modified, &backward.modified);
    }

    #[test]
    fn diff_partitions_every_path(a in arb_snapshot(), b in arb_snapshot()) {
        let changes = ChangeSet::between(&a, &b);

        for path in changes.added.iter() {
            prop_assert!(!a.contains(path) && b.contains(path));
        }
        for path in changes.deleted.iter() {
            prop_assert!(a.contains(path) && !b.contains(path));
        }
        for path in changes.modified.iter() {
            prop_assert!(a.contains(path) && b.contains(path));
            prop_assert_ne!(a.get(path), b.get(path));
        }

        // No path may be classified twice
        let mut seen: Vec<&str> = changes.iter().map(|(_, p)| p).collect();
        let before = seen.len();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), before);

        // Paths in both snapshots with equal fingerprints are omitted
        for (path, fp) in a.iter() {
            if b.get(path) == Some(fp) {
                prop_assert!(!changes.iter().any(|(_, p)| p == path));
            }
        }
    }

    #[test]
    fn classified_count_never_exceeds_union(a in arb_snapshot(), b in arb_snapshot()) {
        let changes = ChangeSet::between(&a, &b);
        let union: std::collections::BTreeSet<&str> =
            a.paths().chain(b.paths()).collect();
        prop_assert!(changes.total() <= union.len());
    }
}
