extern crate std;

use std::{collections::BTreeMap, prelude::v1::*, ptr::NonNull};

use arbitrary::Arbitrary;
use cordyceps::Linked;
use proptest::strategy::{Just, Strategy};

use crate::{AvlMap, Error, Links, TreeNode};

#[derive(Debug)]
#[repr(C)]
pub struct TestNode {
    pub links: Links<TestNode>,
    pub key: u32,
}

impl TestNode {
    pub(crate) fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

/// Picks a key either by position among the keys currently present, or at random.
#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum ItemValue {
    Index(usize),
    Random(u32),
}

proptest::prop_compose! {
    fn index_strategy()(
        index in 0usize..1000,
    ) -> ItemValue {
        ItemValue::Index(index)
    }
}

proptest::prop_compose! {
    fn random_strategy()(
        random in 0u32..1000,
    ) -> ItemValue {
        ItemValue::Random(random)
    }
}

fn value_strategy() -> impl Strategy<Value = ItemValue> {
    proptest::prop_oneof![index_strategy(), random_strategy()]
}

// Stored values come from a small domain so that `key_of` regularly finds several candidates.
const VALUE_DOMAIN: u32 = 16;

#[derive(Copy, Clone, Debug, Arbitrary)]
pub enum Op {
    Add(ItemValue, u32),
    Remove(ItemValue),
    Contains(ItemValue),
    ValueOf(ItemValue),
    Apply(ItemValue),
    KeyOf(u32),
    SelectKeysBelow(ItemValue),
    SelectValue(u32),
    Walks,
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

impl Op {
    fn finalize(self, sorted: &[u32]) -> FinalOp {
        fn get_value(v: &[u32], i: ItemValue) -> u32 {
            match i {
                ItemValue::Index(idx) => {
                    if v.is_empty() {
                        idx as u32
                    } else {
                        v[idx % v.len()]
                    }
                }
                ItemValue::Random(v) => v,
            }
        }

        match self {
            Op::Add(item, value) => FinalOp::Add(get_value(sorted, item), value % VALUE_DOMAIN),
            Op::Remove(item) => FinalOp::Remove(get_value(sorted, item)),
            Op::Contains(item) => FinalOp::Contains(get_value(sorted, item)),
            Op::ValueOf(item) => FinalOp::ValueOf(get_value(sorted, item)),
            Op::Apply(item) => FinalOp::Apply(get_value(sorted, item)),
            Op::KeyOf(value) => FinalOp::KeyOf(value % VALUE_DOMAIN),
            Op::SelectKeysBelow(item) => FinalOp::SelectKeysBelow(get_value(sorted, item)),
            Op::SelectValue(value) => FinalOp::SelectValue(value % VALUE_DOMAIN),
            Op::Walks => FinalOp::Walks,
            Op::First => FinalOp::First,
            Op::PopFirst => FinalOp::PopFirst,
            Op::Last => FinalOp::Last,
            Op::PopLast => FinalOp::PopLast,
            Op::Clear => FinalOp::Clear,
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum FinalOp {
    Add(u32, u32),
    Remove(u32),
    Contains(u32),
    ValueOf(u32),
    Apply(u32),
    KeyOf(u32),
    SelectKeysBelow(u32),
    SelectValue(u32),
    Walks,
    First,
    PopFirst,
    Last,
    PopLast,
    Clear,
}

pub fn op_strategy() -> impl Strategy<Value = Op> {
    proptest::prop_oneof![
        4 => (value_strategy(), 0..VALUE_DOMAIN).prop_map(|(k, v)| Op::Add(k, v)),
        2 => value_strategy().prop_map(Op::Remove),
        1 => value_strategy().prop_map(Op::Contains),
        1 => value_strategy().prop_map(Op::ValueOf),
        1 => value_strategy().prop_map(Op::Apply),
        1 => (0..VALUE_DOMAIN).prop_map(Op::KeyOf),
        1 => value_strategy().prop_map(Op::SelectKeysBelow),
        1 => (0..VALUE_DOMAIN).prop_map(Op::SelectValue),
        1 => Just(Op::Walks),
        1 => Just(Op::First),
        1 => Just(Op::PopFirst),
        1 => Just(Op::Last),
        1 => Just(Op::PopLast),
        1 => Just(Op::Clear),
    ]
}

/// The AVL height bound: a tree of `len` nodes is at most `1.44 * log2(len + 2)` levels tall.
pub fn max_height(len: usize) -> usize {
    (1.44 * ((len + 2) as f64).log2()).floor() as usize
}

/// Runs `ops` against both an [`AvlMap`] and a [`BTreeMap`], asserting that they agree after every
/// step and that the AVL invariants hold throughout.
pub fn run_btree_equivalence(ops: Vec<Op>) {
    let mut sorted_keys = Vec::with_capacity(ops.len());
    let mut btree = BTreeMap::new();
    let mut avl: AvlMap<u32, u32> = AvlMap::new();

    fn insert_sorted(v: &mut Vec<u32>, value: u32) {
        if let Err(idx) = v.binary_search(&value) {
            v.insert(idx, value);
        }
    }

    fn remove_sorted(v: &mut Vec<u32>, value: u32) {
        if let Ok(idx) = v.binary_search(&value) {
            v.remove(idx);
        }
    }

    fn bump(v: &u32) -> u32 {
        (v + 1) % VALUE_DOMAIN
    }

    for (op_id, op) in ops.into_iter().enumerate() {
        let final_op = op.finalize(&sorted_keys);

        match final_op {
            FinalOp::Add(key, value) => {
                insert_sorted(&mut sorted_keys, key);

                // Duplicate keys are rejected without replacing the stored value.
                let from_btree = match btree.entry(key) {
                    std::collections::btree_map::Entry::Vacant(v) => {
                        v.insert(value);
                        true
                    }
                    std::collections::btree_map::Entry::Occupied(_) => false,
                };
                let from_avl = avl.add(key, value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Remove(key) => {
                remove_sorted(&mut sorted_keys, key);

                let from_btree = btree.remove(&key);
                let from_avl = avl.remove(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
                assert!(!avl.contains_key(&key), "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Contains(key) => {
                assert_eq!(
                    btree.contains_key(&key),
                    avl.contains_key(&key),
                    "FinalOp #{op_id}: {final_op:?}"
                );
            }

            FinalOp::ValueOf(key) => {
                let from_btree = btree.get(&key).ok_or(Error::KeyNotFound);
                let from_avl = avl.value_of(&key);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Apply(key) => {
                let from_btree = match btree.get_mut(&key) {
                    Some(v) => {
                        *v = bump(v);
                        Ok(*v)
                    }
                    None => Err(Error::KeyNotFound),
                };
                let from_avl = avl.apply(&key, bump).copied();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::KeyOf(value) => {
                let from_btree = btree.iter().find(|(_, v)| **v == value).map(|(k, _)| k);
                let from_avl = avl.key_of(&value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::SelectKeysBelow(bound) => {
                let from_btree: Vec<&u32> = btree.range(..bound).map(|(_, v)| v).collect();
                let from_avl = avl.select_by_key(|k| *k < bound);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::SelectValue(value) => {
                let from_btree: Vec<&u32> = btree.values().filter(|v| **v == value).collect();
                let from_avl = avl.select_by_value(|v| *v == value);

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Walks => {
                let expected: Vec<(u32, u32)> = btree.iter().map(|(k, v)| (*k, *v)).collect();

                let mut in_order = Vec::new();
                avl.in_order(|k, v| in_order.push((*k, *v)));
                assert_eq!(expected, in_order, "FinalOp #{op_id}: {final_op:?}");

                // The other walks visit every entry once, in some other order.
                let mut pre_order = Vec::new();
                avl.pre_order(|k, v| pre_order.push((*k, *v)));
                let mut post_order = Vec::new();
                avl.post_order(|k, v| post_order.push((*k, *v)));
                let mut level_order = Vec::new();
                avl.level_order(|k, v| level_order.push((*k, *v)));

                // Pre-order and level-order both start at the root; post-order ends there.
                assert_eq!(pre_order.first(), level_order.first());
                assert_eq!(pre_order.first(), post_order.last());

                for mut walk in [pre_order, post_order, level_order] {
                    walk.sort_unstable();
                    assert_eq!(expected, walk, "FinalOp #{op_id}: {final_op:?}");
                }
            }

            FinalOp::First => {
                let from_btree = btree.first_key_value();
                let from_avl = avl.first_key_value();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopFirst => {
                let from_btree = btree.pop_first();
                let from_avl = avl.pop_first();

                if let Some((key, _)) = from_btree {
                    remove_sorted(&mut sorted_keys, key);
                }

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Last => {
                let from_btree = btree.last_key_value();
                let from_avl = avl.last_key_value();

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::PopLast => {
                let from_btree = btree.pop_last();
                let from_avl = avl.pop_last();

                if let Some((key, _)) = from_btree {
                    remove_sorted(&mut sorted_keys, key);
                }

                assert_eq!(from_btree, from_avl, "FinalOp #{op_id}: {final_op:?}");
            }

            FinalOp::Clear => {
                sorted_keys.clear();
                btree.clear();
                avl.clear();

                assert!(avl.is_empty());
            }
        }

        avl.assert_invariants();
        assert_eq!(btree.len(), avl.len());
        assert!(avl.height() <= max_height(avl.len()));
        assert!(btree.iter().eq(avl.iter()));
    }
}
