mod error;

pub mod prelude;
pub mod testing;
pub mod tree;
pub mod values;

#[doc(hidden)]
/// This is a hidden module to make the macros defined on this crate available for the users.
pub mod __dependencies {
    pub use blake3;
    pub use digest;
    pub use itertools;
    pub use paste;
    pub use proptest;
    pub use test_strategy;
    pub use thiserror::Error;
    pub use tracing;
}

/// Generates the property suite every [`MerkleBTree`](crate::tree::MerkleBTree)
/// must pass, for one combining hash.
///
/// ```ignore
/// mbtree::test_tree_properties!(sha256, sha2::Sha256);
/// ```
#[macro_export]
macro_rules! test_tree_properties {
    ($name:ident, $digest:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_tree_properties_ $name:snake>] {
                use $crate::__dependencies::{
                    proptest::{collection::vec, prelude::*},
                    test_strategy,
                };
                use $crate::{prelude::*, testing::*};

                type Tree = MerkleBTree<Pair, $digest>;

                fn digests(tree: &Tree) -> Vec<Vec<Option<Hash>>> {
                    tree.levels()
                        .iter()
                        .map(|level| level.iter().map(|node| node.hash()).collect::<Vec<_>>())
                        .collect()
                }

                /// `(depth, index)` of the node holding `key` and of each of
                /// its ancestors.
                fn path(tree: &Tree, key: u64) -> Vec<(usize, usize)> {
                    let levels = tree.levels();
                    let mut path = Vec::new();
                    let mut wanted = None;

                    for (depth, level) in levels.iter().enumerate().rev() {
                        for (index, node) in level.iter().enumerate() {
                            let hit = match wanted {
                                Some(parent) => *node == parent,
                                None => keys(node).contains(&key),
                            };
                            if hit {
                                path.push((depth, index));
                                wanted = node.parent();
                            }
                        }
                    }

                    path
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test]
                fn test_scenario_ordered_inserts() {
                    let tree = Tree::from_items(3, (1..=7).map(pair)).unwrap();

                    assert_shape(
                        &tree,
                        &[&[&[4]], &[&[2], &[6]], &[&[1], &[3], &[5], &[7]]],
                    );
                    assert_eq!(tree.height(), 3);

                    let d = |key: u64| pair(key).digest().unwrap();
                    let h = |parts: &[&[u8]]| Hash::combine::<$digest, _>(parts.iter().copied());

                    let leaves = [1, 3, 5, 7].map(|key| h(&[d(key).as_slice()]));
                    let left = h(&[d(2).as_slice(), leaves[0].as_ref(), leaves[1].as_ref()]);
                    let right = h(&[d(6).as_slice(), leaves[2].as_ref(), leaves[3].as_ref()]);
                    let root = h(&[d(4).as_slice(), left.as_ref(), right.as_ref()]);

                    assert_eq!(tree.root_digest(), Some(root));
                    assert_eq!(tree.root_digest_hex(), root.to_hex());
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test]
                fn test_scenario_remove_shrinks_height() {
                    let mut tree = Tree::from_items(3, (1..=7).map(pair)).unwrap();

                    assert_eq!(tree.remove(&Pair::probe(7)), Some(pair(7)));

                    assert_shape(&tree, &[&[&[2, 4]], &[&[1], &[3], &[5, 6]]]);
                    assert_eq!(tree.height(), 2);
                    assert_eq!(tree.len(), 6);
                    assert!(tree.verify().unwrap());
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_scenario_get_on_empty_tree(#[strategy(orders())] order: usize, key: u64) {
                    let tree = Tree::new(order)?;

                    prop_assert!(tree.get(&Pair::probe(key)).is_none());
                    prop_assert!(!tree.contains(&Pair::probe(key)));
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_scenario_overwrite_rehashes_path_only(
                    #[strategy(orders())] order: usize,
                    #[strategy(distinct_keys(1..200))] keys: Vec<u64>,
                    #[strategy(0..#keys.len())] which: usize,
                    value: String,
                ) {
                    let mut tree = Tree::from_items(order, keys.iter().copied().map(pair))?;
                    let key = keys[which];
                    prop_assume!(value != pair(key).value);

                    let before = digests(&tree);
                    let path = path(&tree, key);
                    prop_assert_eq!(path.last(), Some(&(0, 0)));

                    $crate::prop_assert_does_not_change!(
                        tree.put(Item::new(key, value.clone()))?,
                        (tree.len(), shape(&tree))
                    );
                    prop_assert_eq!(tree.get(&Pair::probe(key)).map(|item| &item.value), Some(&value));

                    let after = digests(&tree);
                    for (depth, level) in before.iter().enumerate() {
                        for (index, digest) in level.iter().enumerate() {
                            let on_path = path.contains(&(depth, index));
                            prop_assert_eq!(after[depth][index] != *digest, on_path);
                        }
                    }
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_contents_are_strictly_ascending(tree: Tree) {
                    for (left, right) in tree.contents().iter().zip(tree.contents().iter().skip(1)) {
                        prop_assert!(left.key < right.key);
                    }
                    prop_assert_eq!(tree.contents().len(), tree.len());
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_mutations_keep_invariants(
                    mut tree: Tree,
                    #[strategy(vec((any::<bool>(), 0..512u64), 1..64))] ops: Vec<(bool, u64)>,
                ) {
                    for (insert, key) in ops {
                        if insert {
                            tree.put(pair(key))?;
                        } else {
                            tree.remove(&Pair::probe(key));
                        }

                        prop_assert_eq!(check_invariants(&tree), Ok(()));
                        prop_assert_eq!(tree.compute_root_digest()?, tree.root_digest());
                    }
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_put_twice_is_put_once(tree: Tree, key: u64) {
                    let mut once = tree.clone();
                    once.put(pair(key))?;

                    let mut twice = once.clone();
                    $crate::prop_assert_does_not_change!(twice.put(pair(key))?, twice.root_digest());

                    prop_assert_eq!(shape(&once), shape(&twice));
                    prop_assert_eq!(once, twice);
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_new_key_changes_root_digest(mut tree: Tree, key: u64) {
                    prop_assume!(!tree.contains(&Pair::probe(key)));

                    $crate::prop_assert_changes!(tree.put(pair(key))?, tree.root_digest());
                    $crate::prop_assert_changes!(tree.remove(&Pair::probe(key)), tree.len());
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_round_trip_in_reverse(
                    #[strategy(orders())] order: usize,
                    #[strategy(distinct_keys(1..300))] keys: Vec<u64>,
                ) {
                    let mut tree = Tree::from_items(order, keys.iter().copied().map(pair))?;

                    for key in keys.iter().rev() {
                        prop_assert!(tree.remove(&Pair::probe(*key)).is_some());
                    }

                    prop_assert!(tree.is_empty());
                    prop_assert_eq!(tree.root_digest_hex(), "");
                    prop_assert_eq!(tree, Tree::new(order)?);
                }

                #[cfg_attr(coverage_nightly, coverage(off))]
                #[test_strategy::proptest(fork = false)]
                fn test_same_history_same_digest(
                    #[strategy(orders())] order: usize,
                    #[strategy(vec(0..1000u64, 0..200))] keys: Vec<u64>,
                ) {
                    let a = Tree::from_items(order, keys.iter().copied().map(pair))?;
                    let b = Tree::from_items(order, keys.iter().copied().map(pair))?;

                    prop_assert_eq!(a.root_digest_hex(), b.root_digest_hex());
                }
            }
        }
    };
}

#[macro_export]
macro_rules! test_to_bytes {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_to_bytes_$type:snake>] {
                use std::{ collections::hash_map::DefaultHasher, hash::Hasher };

                use $crate::__dependencies::{
                    proptest::prelude::*,
                    test_strategy,
                };

                use $crate::prelude::*;
                use super::$type;

                $crate::test_to_hex!($type);

                #[test]
                fn test_default_is_zero() {
                    assert!(<$type>::default().is_zero());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_zero_is_same_as_zero_bytes(item: $type) {
                    prop_assert_eq!(
                        item.is_zero(),
                        item.to_bytes() == <$type>::default().to_bytes()
                    );
                }

                #[test_strategy::proptest(fork = false)]
                fn test_roundtrip(a: $type) {
                    prop_assert_eq!(a.clone(), <$type>::from_bytes(&a.to_bytes())?);
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_different_on_different_objects(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.to_bytes() == b.to_bytes());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_hash_consistency(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.hash_bytes() == b.hash_bytes());
                }

                #[test_strategy::proptest(fork = false)]
                fn test_std_hash_consistency(a: $type, b: $type) {
                    let mut hasher_a = DefaultHasher::new();
                    hasher_a.write(&a.to_bytes());

                    let mut hasher_b = DefaultHasher::new();
                    hasher_b.write(&b.to_bytes());

                    prop_assert_eq!(a.hash_bytes() == b.hash_bytes(), hasher_a.finish() == hasher_b.finish());
                }
            }
        }
    };
}

#[macro_export]
macro_rules! test_to_hex {
    ($type:ty) => {
        $crate::__dependencies::paste::paste! {
            mod [<test_to_hex_$type:snake>] {
                use $crate::__dependencies::{
                    proptest::prelude::*,
                    test_strategy,
                };

                use $crate::prelude::*;
                use super::$type;

                #[test_strategy::proptest(fork = false)]
                fn test_roundtrip(a: $type) {
                    prop_assert_eq!(a.clone(), <$type>::from_hex(&a.to_hex())?);
                }

                #[test_strategy::proptest(fork = false)]
                fn test_is_different_on_different_objects(a: $type, b: $type) {
                    prop_assert_eq!(a == b, a.to_hex() == b.to_hex());
                }
            }
        }
    };
}

#[macro_export]
macro_rules! prop_assert_changes {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        prop_assert_eq!($value, old_value);

        $action;

        prop_assert_ne!($value, old_value);
    };
}

#[macro_export]
macro_rules! prop_assert_does_not_change {
    ($action: expr, $value: expr) => {
        let old_value = $value.clone();

        $action;

        prop_assert_eq!($value, old_value);
    };
}
