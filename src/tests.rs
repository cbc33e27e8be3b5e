extern crate std;

use std::{ops::Range, prelude::v1::*};

use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn permutations(keys: &[u32]) -> Vec<Vec<u32>> {
    if keys.len() <= 1 {
        return vec![keys.to_vec()];
    }

    let mut out = Vec::new();
    for i in 0..keys.len() {
        let mut rest = keys.to_vec();
        let first = rest.remove(i);

        for mut tail in permutations(&rest) {
            tail.insert(0, first);
            out.push(tail);
        }
    }
    out
}

fn tree_of(keys: &[u32]) -> AvlTree<TestNode> {
    let mut tree = AvlTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none());
        tree.assert_invariants();
    }

    tree
}

fn level_keys(tree: &AvlTree<TestNode>) -> Vec<u32> {
    tree.level_order().map(|node| node.key).collect()
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }

    assert_eq!(tree.len(), keys.len());
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn insert_find_every_order_up_to_five() {
    for n in 1..=5 {
        let keys: Vec<u32> = (0..n).collect();
        for order in permutations(&keys) {
            insert_find_all(&order);
        }
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
        assert!(!tree.contains_key(key));
    }

    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        assert_eq!(tree.remove(key).map(|node| node.key), Some(*key));
        tree.assert_invariants();
    }

    assert!(tree.is_empty());
}

#[test]
fn insert_remove_every_order_up_to_five() {
    for n in 1..=5 {
        let keys: Vec<u32> = (0..n).collect();
        for order in permutations(&keys) {
            insert_remove_all(&order);
        }
    }
}

#[test]
fn duplicate_insert_hands_item_back() {
    let mut tree = tree_of(&[6, 7, 4, 5, 3, 2]);
    let before = level_keys(&tree);

    let rejected = tree.insert(TestNode::new(5)).expect("5 is already present");
    assert_eq!(rejected.key, 5);
    assert!(rejected.links.parent().is_none());

    assert_eq!(tree.len(), 6);
    assert_eq!(level_keys(&tree), before);
    tree.assert_invariants();
}

#[test]
fn scenario_shapes() {
    let tree = tree_of(&(0..10).collect::<Vec<_>>());
    assert_eq!(tree.len(), 10);
    assert_eq!(tree.height(), 4);
    assert_eq!(level_keys(&tree), [3, 1, 7, 0, 2, 5, 8, 4, 6, 9]);

    let tree = tree_of(&[6, 7, 4, 5, 3, 2]);
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.height(), 3);
    assert_eq!(level_keys(&tree), [4, 3, 6, 2, 5, 7]);
}

#[test]
fn remove_splices_adjacent_predecessor() {
    let mut tree = tree_of(&[2, 1, 3]);
    let pred = tree.get_raw(&1).unwrap();

    assert_eq!(tree.remove(&2).map(|node| node.key), Some(2));

    // The predecessor node itself now sits at the root.
    assert_eq!(tree.root, Some(pred));
    assert_eq!(level_keys(&tree), [1, 3]);
    tree.assert_invariants();
}

#[test]
fn remove_splices_deep_predecessor() {
    //          3                      3
    //        /   \                  /   \
    //       1     7                1     6
    //      / \   / \      =>      / \   / \
    //     0   2 5   8            0   2 5   8
    //          / \   \                /     \
    //         4   6   9              4       9
    let mut tree = tree_of(&(0..10).collect::<Vec<_>>());
    let pred = tree.get_raw(&6).unwrap();

    assert_eq!(tree.remove(&7).map(|node| node.key), Some(7));

    assert_eq!(tree.get_raw(&6), Some(pred));
    assert_eq!(level_keys(&tree), [3, 1, 6, 0, 2, 5, 8, 4, 9]);
    tree.assert_invariants();
}

#[test]
fn remove_single_child_node() {
    // 3 has only a right child, 4.
    let mut tree = tree_of(&[2, 1, 3, 4]);

    assert_eq!(tree.remove(&3).map(|node| node.key), Some(3));
    assert_eq!(level_keys(&tree), [2, 1, 4]);
    tree.assert_invariants();
}

#[test]
fn remove_rotates_on_the_way_up() {
    // Removing 1 leaves 2 right-heavy with a zig-zag below it.
    let mut tree = tree_of(&[2, 1, 4, 3]);

    tree.remove(&1);
    assert_eq!(level_keys(&tree), [3, 2, 4]);
    tree.assert_invariants();
}

#[test]
fn get_mut_reaches_the_stored_node() {
    let mut tree = tree_of(&[4, 2, 6]);
    let raw = tree.get_raw(&6).unwrap();

    let node = unsafe { tree.get_mut(&6) }.expect("6 is present");
    assert_eq!(node.key, 6);
    assert!(core::ptr::addr_eq(&*node as *const TestNode, raw.as_ptr()));

    assert!(unsafe { tree.get_mut(&5) }.is_none());
    tree.assert_invariants();
}

#[test]
fn first_last_and_pops() {
    let mut tree = tree_of(&[5, 2, 8, 1, 9]);

    assert_eq!(tree.first().map(|n| n.key), Some(1));
    assert_eq!(tree.last().map(|n| n.key), Some(9));

    assert_eq!(tree.pop_first().map(|n| n.key), Some(1));
    assert_eq!(tree.pop_last().map(|n| n.key), Some(9));
    tree.assert_invariants();

    let mut empty: AvlTree<TestNode> = AvlTree::new();
    assert!(empty.first().is_none());
    assert!(empty.pop_last().is_none());
}

#[test]
fn clear_then_reuse() {
    let mut tree = tree_of(&(0..50).collect::<Vec<_>>());

    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.height(), 0);
    tree.assert_invariants();

    assert!(tree.insert(TestNode::new(1)).is_none());
    assert_eq!(tree.len(), 1);
}

#[test]
fn iterator_is_exact_and_fused() {
    let tree = tree_of(&[4, 2, 6, 1]);
    let mut iter = tree.iter();

    assert_eq!(iter.len(), 4);
    assert_eq!(iter.by_ref().map(|n| n.key).collect::<Vec<_>>(), [1, 2, 4, 6]);
    assert_eq!(iter.len(), 0);
    assert!(iter.next().is_none());
    assert!(iter.next().is_none());
}

#[test]
fn model_covers_selections_walks_and_clear() {
    use model::{ItemValue, Op};

    let mut ops: Vec<Op> = (0..12)
        .map(|key| Op::Add(ItemValue::Random(key * 7 % 12), key))
        .collect();
    ops.extend([
        Op::Walks,
        Op::SelectKeysBelow(ItemValue::Random(6)),
        Op::SelectValue(3),
        Op::Remove(ItemValue::Index(4)),
        Op::Walks,
        Op::Clear,
        Op::Walks,
        Op::SelectKeysBelow(ItemValue::Random(6)),
        Op::Add(ItemValue::Random(1), 1),
        Op::Walks,
    ]);

    model::run_btree_equivalence(ops);
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn height_stays_logarithmic(keys in proptest::collection::hash_set(any::<u32>(), 0..500)) {
        let mut tree: AvlTree<TestNode> = AvlTree::new();
        let mut added = 0;

        for &key in &keys {
            added += usize::from(tree.insert(TestNode::new(key)).is_none());
            prop_assert!(tree.height() <= model::max_height(tree.len()));
        }

        prop_assert_eq!(added, keys.len());
        prop_assert_eq!(tree.len(), keys.len());
        tree.assert_invariants();

        let mut removed = 0;
        for key in keys.iter().step_by(2) {
            removed += usize::from(tree.remove(key).is_some());
            prop_assert!(tree.height() <= model::max_height(tree.len()));
        }

        prop_assert_eq!(tree.len(), added - removed);
        tree.assert_invariants();
    }
}
