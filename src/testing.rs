use std::{cmp::Ordering, fmt::Debug};

use itertools::Itertools;
use proptest::{
    collection::hash_set,
    prelude::*,
    sample::SizeRange,
    strategy::ValueTree,
    test_runner::{Config as TestConfig, TestRunner},
};

use crate::prelude::*;

/// The item type most suites store: numeric keys with a small payload.
pub type Pair = Item<u64, String>;

pub fn pair(key: u64) -> Pair {
    Item::new(key, format!("v{key}"))
}

/// Generates distinct keys, in random order.
pub fn distinct_keys(size: impl Into<SizeRange>) -> impl Strategy<Value = Vec<u64>> {
    hash_set(any::<u64>(), size)
        .prop_map(|keys| keys.into_iter().sorted().collect_vec())
        .prop_shuffle()
}

/// Generates valid tree orders, biased towards the small ones where
/// rebalancing happens most.
pub fn orders() -> impl Strategy<Value = usize> {
    prop_oneof![
        4 => MIN_ORDER..=6usize,
        1 => 7..=64usize,
    ]
}

pub fn unwrap_strategy<T>(strategy: impl Strategy<Value = T>) -> T {
    let mut test_runner = TestRunner::new(TestConfig::default());

    strategy
        .new_tree(&mut test_runner)
        .expect("Failed to get new value from strategy")
        .current()
}

/// An item whose digest can be made to fail, to exercise error paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flaky {
    pub key: u64,
    pub broken: bool,
}

impl Flaky {
    pub fn fine(key: u64) -> Self {
        Self { key, broken: false }
    }

    pub fn broken(key: u64) -> Self {
        Self { key, broken: true }
    }
}

impl Content for Flaky {
    fn compare(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }

    fn digest(&self) -> Result<Vec<u8>> {
        if self.broken {
            return Err(Error::digest(format!("item {} refuses to be hashed", self.key)));
        }

        Ok(self.key.hash_bytes().as_bytes().to_vec())
    }
}

pub fn keys(node: &NodeRef<'_, Pair>) -> Vec<u64> {
    node.contents().map(|item| item.key).collect()
}

/// The keys of every node, grouped by level, root first.
pub fn shape<D>(tree: &MerkleBTree<Pair, D>) -> Vec<Vec<Vec<u64>>> {
    tree.levels()
        .iter()
        .map(|level| level.iter().map(keys).collect_vec())
        .collect()
}

#[track_caller]
pub fn assert_shape<D>(tree: &MerkleBTree<Pair, D>, expected: &[&[&[u64]]]) {
    let expected = expected
        .iter()
        .map(|level| level.iter().map(|node| node.to_vec()).collect_vec())
        .collect_vec();

    assert_eq!(shape(tree), expected, "\n{tree}");
}

macro_rules! ensure {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err(format!($($arg)+));
        }
    };
}

/// Checks every structural invariant of `tree`, and that its cached root
/// digest agrees with a from-scratch recomputation.
pub fn check_invariants<T, D>(tree: &MerkleBTree<T, D>) -> std::result::Result<(), String>
where
    T: Content + Debug,
    D: CombiningHash,
{
    let order = tree.order();
    let levels = tree.levels();

    let Some(root) = tree.root() else {
        ensure!(tree.is_empty(), "no root but {} items", tree.len());
        ensure!(tree.height() == 0, "no root but height {}", tree.height());
        return Ok(());
    };

    ensure!(root.is_root(), "root {root:?} has a parent");
    ensure!(!root.is_empty(), "root {root:?} is empty");
    ensure!(levels.len() == tree.height(), "height {} but {} levels", tree.height(), levels.len());

    for (depth, level) in levels.iter().enumerate() {
        let bottom = depth + 1 == levels.len();

        for node in level {
            let len = node.len();
            let children = node.children().len();

            ensure!(node.hash().is_some(), "{node:?} was never hashed");
            ensure!(len <= order.max_contents(), "{node:?} holds too many items");
            ensure!(
                node.is_root() || len >= order.min_contents(),
                "{node:?} holds too few items"
            );
            ensure!(
                node.is_leaf() == bottom,
                "{node:?} at depth {depth} breaks equal leaf depth"
            );
            ensure!(
                node.is_leaf() || children == len + 1,
                "{node:?} has {children} children for {len} items"
            );

            for (left, right) in node.contents().tuple_windows() {
                ensure!(
                    left.compare(right) == Ordering::Less,
                    "{node:?} is out of order at {left:?}, {right:?}"
                );
            }

            for child in node.children() {
                ensure!(child.parent() == Some(*node), "{child:?} lost its parent link");
            }
        }
    }

    let reachable = levels.iter().map(Vec::len).sum::<usize>();
    ensure!(
        reachable == tree.node_count(),
        "{reachable} nodes reachable, {} allocated",
        tree.node_count()
    );

    let mut walked = Vec::with_capacity(tree.len());
    in_order(root, &mut walked);

    ensure!(walked.len() == tree.len(), "{} items reachable, len is {}", walked.len(), tree.len());
    for (left, right) in walked.iter().tuple_windows() {
        ensure!(
            left.compare(right) == Ordering::Less,
            "in-order walk is out of order at {left:?}, {right:?}"
        );
    }

    match tree.verify() {
        Ok(true) => Ok(()),
        Ok(false) => Err(format!(
            "cached root digest {} disagrees with {:?}",
            tree.root_digest_hex(),
            tree.compute_root_digest()
        )),
        Err(error) => Err(format!("recomputing the root digest failed: {error}")),
    }
}

fn in_order<'a, T>(node: NodeRef<'a, T>, out: &mut Vec<&'a T>) {
    let contents = node.contents().collect_vec();

    for (slot, item) in contents.into_iter().enumerate() {
        if let Some(child) = node.child(slot) {
            in_order(child, out);
        }
        out.push(item);
    }

    if let Some(child) = node.child(node.len()) {
        in_order(child, out);
    }
}
