//! Property-based tests for the reconciliation core.
//!
//! Uses proptest to generate random trees and flat maps and verify the
//! structural laws the rest of the tool leans on: flatten/unflatten
//! round-trips, diff partition algebra, and the two merge policy
//! equations. Coercion and plan rendering must never panic on any input.
//!
//! Run with: `cargo test --test proptest_fuzz`

use std::collections::BTreeSet;

use proptest::prelude::*;

use param_sync::coerce::coerce;
use param_sync::diff::{DiffEngine, MergePolicy};
use param_sync::tree::{unflatten, Branch, FlatMap, Leaf, Node, Secret, SEPARATOR};

// =============================================================================
// Strategies
// =============================================================================

fn segment_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,7}"
}

fn leaf_strategy() -> impl Strategy<Value = Leaf> {
    prop_oneof![
        "[ -~]{0,12}".prop_map(Leaf::Str),
        any::<i64>().prop_map(Leaf::Int),
        any::<bool>().prop_map(Leaf::Bool),
        Just(Leaf::Null),
        prop::collection::vec("[a-z]{1,6}", 0..4).prop_map(Leaf::list),
        "[ -~]{1,12}".prop_map(|p| Leaf::Secret(Secret::new(p))),
    ]
}

/// Trees whose branches are never empty, so the flatten round-trip holds.
fn tree_strategy() -> impl Strategy<Value = Node> {
    let leaf = leaf_strategy().prop_map(Node::Leaf);
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop::collection::btree_map(segment_strategy(), inner, 1..4)
            .prop_map(|children| Node::Branch(children.into_iter().collect::<Branch>()))
    })
    // the root itself is always a branch (possibly empty)
    .prop_map(|node| match node {
        Node::Branch(_) => node,
        leaf => {
            let mut children = Branch::new();
            children.insert("root".to_string(), leaf);
            Node::Branch(children)
        }
    })
}

fn flat_map_strategy() -> impl Strategy<Value = FlatMap> {
    tree_strategy().prop_map(|tree| tree.flatten(SEPARATOR))
}

// =============================================================================
// Round-trip laws
// =============================================================================

proptest! {
    #[test]
    fn prop_unflatten_inverts_flatten(tree in tree_strategy()) {
        let flat = tree.flatten(SEPARATOR);
        let rebuilt = unflatten(&flat, SEPARATOR).expect("flatten output never conflicts");
        prop_assert_eq!(rebuilt, tree);
    }

    #[test]
    fn prop_flatten_inverts_unflatten(flat in flat_map_strategy()) {
        let tree = unflatten(&flat, SEPARATOR).expect("derived from a tree");
        prop_assert_eq!(tree.flatten(SEPARATOR), flat);
    }

    #[test]
    fn prop_flat_paths_are_absolute(tree in tree_strategy()) {
        for path in tree.flatten(SEPARATOR).keys() {
            prop_assert!(path.starts_with(SEPARATOR));
        }
    }
}

// =============================================================================
// Diff partition algebra
// =============================================================================

proptest! {
    #[test]
    fn prop_partitions_cover_and_are_disjoint(
        remote in flat_map_strategy(),
        local in flat_map_strategy(),
    ) {
        let engine = DiffEngine::from_flat(remote.clone(), local.clone());
        let added = engine.added();
        let removed = engine.removed();
        let changed = engine.changed();
        let unchanged = engine.unchanged();

        prop_assert!(added.is_disjoint(&removed));
        prop_assert!(added.is_disjoint(&changed));
        prop_assert!(added.is_disjoint(&unchanged));
        prop_assert!(removed.is_disjoint(&changed));
        prop_assert!(removed.is_disjoint(&unchanged));
        prop_assert!(changed.is_disjoint(&unchanged));

        let mut union = added;
        union.extend(removed);
        union.extend(changed);
        union.extend(unchanged);
        let all_keys: BTreeSet<String> =
            remote.keys().chain(local.keys()).cloned().collect();
        prop_assert_eq!(union, all_keys);
    }

    #[test]
    fn prop_plan_never_mutates_inputs(
        remote in flat_map_strategy(),
        local in flat_map_strategy(),
    ) {
        let engine = DiffEngine::from_flat(remote.clone(), local.clone());
        let _ = engine.plan().to_string();
        let plan = engine.plan();
        for path in plan.add.keys() {
            prop_assert!(local.contains_key(path) && !remote.contains_key(path));
        }
        for path in plan.delete.keys() {
            prop_assert!(remote.contains_key(path) && !local.contains_key(path));
        }
        for path in plan.change.keys() {
            prop_assert!(remote.contains_key(path) && local.contains_key(path));
        }
    }
}

// =============================================================================
// Merge policy equations
// =============================================================================

proptest! {
    #[test]
    fn prop_remote_wins_is_remote_plus_added(
        remote in flat_map_strategy(),
        local in flat_map_strategy(),
    ) {
        let engine = DiffEngine::from_flat(remote.clone(), local.clone());
        let Ok(merged) = engine.merge(MergePolicy::RemoteWins) else {
            // two independent maps can conflict structurally; that is a
            // rejected unflatten, not a policy violation
            return Ok(());
        };
        let result = merged.flatten(SEPARATOR);

        let mut expected = remote.clone();
        for path in engine.added() {
            expected.insert(path.clone(), local[&path].clone());
        }
        prop_assert_eq!(result, expected);
    }

    #[test]
    fn prop_preserve_local_keeps_every_local_value(
        remote in flat_map_strategy(),
        local in flat_map_strategy(),
    ) {
        let engine = DiffEngine::from_flat(remote.clone(), local.clone());
        let Ok(merged) = engine.merge(MergePolicy::PreserveLocal) else {
            return Ok(());
        };
        let result = merged.flatten(SEPARATOR);

        // target unchanged wherever it has a key...
        for (path, leaf) in &local {
            prop_assert_eq!(result.get(path), Some(leaf));
        }
        // ...plus the remote's removed keys preserved
        for path in engine.removed() {
            prop_assert_eq!(result.get(&path), remote.get(&path));
        }
        prop_assert_eq!(result.len(), local.len() + engine.removed().len());
    }
}

// =============================================================================
// Never-panic surfaces
// =============================================================================

proptest! {
    #[test]
    fn prop_coerce_never_panics(mut tree in tree_strategy()) {
        let issues = coerce(&mut tree);
        // coerced scalars must be gone unless they were reported
        if issues.is_empty() {
            for leaf in tree.flatten(SEPARATOR).values() {
                prop_assert!(!matches!(
                    leaf,
                    Leaf::Bool(_) | Leaf::Int(_) | Leaf::Float(_) | Leaf::Null
                ));
            }
        }
    }

    #[test]
    fn prop_describe_never_panics(
        remote in flat_map_strategy(),
        local in flat_map_strategy(),
    ) {
        let engine = DiffEngine::from_flat(remote, local);
        let text = engine.plan().to_string();
        prop_assert!(!text.is_empty());
    }
}
