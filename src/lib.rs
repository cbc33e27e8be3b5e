//! An intrusive AVL tree, and an ordered map built on it.
//!
//! Every node embeds a [`Links`] value: two owning child edges and a non-owning parent
//! back-link. Subtree heights are not stored; a node's balance factor is recomputed from its
//! children each time the rebalancing walk passes it.
//!
//! The fundamental invariants of an AVL tree are:
//! 1. In-order traversal yields strictly ascending keys.
//! 2. For every node, the heights of its two subtrees differ by at most one.
//!
// Corollary: a tree holding `n` nodes is at most `1.44 * log2(n + 2)` levels tall, so descents
// are logarithmic. The parent links exist only so rebalancing can walk back up a modified path
// and so rotations can find the branch a subtree hangs from; they must always agree with the
// child edge pointing down at the node.

use core::{borrow::Borrow, cmp::Ordering, fmt, pin::Pin, ptr::NonNull};

use cordyceps::Linked;

mod debug;
pub mod entry;
mod error;
pub mod iter;
mod links;
pub mod map;
mod rotate;
pub mod traverse;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use entry::Entry;
pub use error::Error;
pub use links::Links;
pub use map::AvlMap;

use error::{corrupted, Corruption};
use links::{Dir, Link, Slot};

pub trait TreeNode<L>: Linked<L> {
    type Key: Ord + fmt::Debug;

    fn key(&self) -> &Self::Key;
}

/// An intrusive, height-balanced binary search tree.
///
/// Keys are unique: inserting an item whose key is already present leaves the tree untouched.
pub struct AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    root: Link<T>,
    len: usize,
}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None, len: 0 }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.root.is_none());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the number of levels in the tree: 0 when empty, 1 for a lone root.
    ///
    /// Heights are not cached, so this visits every node.
    pub fn height(&self) -> usize {
        unsafe { links::height(self.root) }
    }

    /// Returns `true` if every node has either zero or two children.
    ///
    /// The empty tree is full.
    pub fn is_full(&self) -> bool {
        let mut stack: Vec<NonNull<T>> = self.root.into_iter().collect();

        while let Some(node) = stack.pop() {
            let links = unsafe { self.links(node) };
            if links.is_leaf() {
                continue;
            }

            match (links.left(), links.right()) {
                (Some(left), Some(right)) => {
                    stack.push(left);
                    stack.push(right);
                }
                _ => return false,
            }
        }

        true
    }

    /// Returns `true` if the tree is perfect: a tree of height `h` holding `2^h - 1` nodes.
    ///
    /// The empty tree is complete.
    pub fn is_complete(&self) -> bool {
        u32::try_from(self.height())
            .ok()
            .and_then(|height| 1_usize.checked_shl(height))
            .is_some_and(|capacity| capacity - 1 == self.len)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        let Some(root) = self.root else {
            assert_eq!(self.len, 0, "empty tree must have len 0");
            return;
        };

        unsafe {
            assert_eq!(self.links(root).parent(), None, "root must not have a parent");

            let (count, _) = self.assert_invariants_at(root);
            assert_eq!(count, self.len, "len must match the number of reachable nodes");
        }

        let mut prev: Option<&T::Key> = None;
        for node in self.iter() {
            if let Some(prev) = prev {
                assert!(
                    prev < node.key(),
                    "keys out of order: {prev:?} precedes {:?}",
                    node.key()
                );
            }
            prev = Some(node.key());
        }
    }

    // Returns the node count and height of the subtree rooted at `node`.
    unsafe fn assert_invariants_at(&self, node: NonNull<T>) -> (usize, usize) {
        unsafe {
            let mut count = 1;
            let mut heights = [0; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = self.links(node).child(dir) {
                    // Ensure child's parent link points to this node.
                    let parent = self
                        .links(child)
                        .parent()
                        .expect("child parent pointer not set");
                    assert!(links::links_to(Some(parent), node), "bad parent link");

                    let (child_count, child_height) = self.assert_invariants_at(child);
                    count += child_count;
                    heights[dir as usize] = child_height;
                }
            }

            assert!(
                links::is_balanced(node),
                "node {:?} is unbalanced: left height {}, right height {}",
                node.as_ref().key(),
                heights[Dir::Left as usize],
                heights[Dir::Right as usize],
            );

            (count, 1 + heights[0].max(heights[1]))
        }
    }

    /// Returns `true` if the tree contains an item with the given key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the node corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the node corresponding to `key`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the returned item are
    /// modified, as doing so breaks the ordering of the tree.
    pub unsafe fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut opt_cur = self.root;

        loop {
            let cur = opt_cur?;

            unsafe {
                match key.cmp(cur.as_ref().key().borrow()) {
                    Ordering::Less => opt_cur = self.links(cur).left(),
                    Ordering::Equal => return Some(cur),
                    Ordering::Greater => opt_cur = self.links(cur).right(),
                }
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let first = unsafe { self.extreme_in_subtree(self.root?, Dir::Left) };
        unsafe { Some(Pin::new_unchecked(first.as_ref())) }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let last = unsafe { self.extreme_in_subtree(self.root?, Dir::Right) };
        unsafe { Some(Pin::new_unchecked(last.as_ref())) }
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let first = unsafe { self.extreme_in_subtree(self.root?, Dir::Left) };
        unsafe { Some(self.remove_at(first)) }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let last = unsafe { self.extreme_in_subtree(self.root?, Dir::Right) };
        unsafe { Some(self.remove_at(last)) }
    }

    // Follows `dir` children from `root` as far as they go.
    #[inline]
    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(next) = unsafe { self.links(cur).child(dir) } {
            cur = next;
        }

        cur
    }

    /// Returns the entry for `key`, found by a single descent from the root.
    pub fn entry<Q>(&mut self, key: &Q) -> Entry<'_, T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.root else {
            return Entry::vacant(self, Slot::Root);
        };

        // An equal key stops the descent here, before it can fall into either subtree.
        loop {
            let dir = match key.cmp(unsafe { cur.as_ref() }.key().borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Entry::occupied(self, cur),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { self.links(cur).child(dir) } {
                Some(child) => cur = child,
                None => return Entry::vacant(self, Slot::child(cur, dir)),
            }
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If an item with an equal key is already present, the tree is left untouched and `item` is
    /// handed back.
    ///
    /// This operation completes in _O(log(n))_ comparisons.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        // SAFETY: `ptr` comes from a live handle that is not linked into any tree.
        let key = unsafe { ptr.as_ref() }.key();

        match self.entry(key) {
            Entry::Occupied(_) => {
                log::debug!("rejected duplicate key {key:?}");
                Some(unsafe { T::from_ptr(ptr) })
            }
            Entry::Vacant(vacant) => {
                unsafe { vacant.insert_ptr(ptr) };
                None
            }
        }
    }

    // Links `node` as a leaf into the empty `slot` and rebalances above it.
    unsafe fn link_leaf(&mut self, slot: Slot<T>, node: NonNull<T>) {
        unsafe {
            self.links_mut(node).clear();
            self.attach(slot, node);
            self.len += 1;

            log::debug!("inserted {:?} as {slot:?}", node.as_ref().key());

            if let Err(err) = self.rebalance(slot.parent()) {
                corrupted(err);
            }
        }
    }

    /// Removes the item corresponding to `key` from the tree, returning it.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        unsafe { Some(self.remove_at(node)) }
    }

    /// Removes `node` from the tree and returns ownership of it.
    ///
    /// # Safety
    ///
    /// `node` must be an element of `self`, and not of any other tree.
    pub(crate) unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        unsafe {
            let rebalanced = self
                .unlink(node)
                .and_then(|start| self.rebalance(start));

            if let Err(err) = rebalanced {
                corrupted(err);
            }

            self.len -= 1;
            self.links_mut(node).clear();

            log::debug!("removed {:?}", node.as_ref().key());

            T::from_ptr(node)
        }
    }

    // Takes `node` out of the tree, returning the node the rebalancing walk starts from.
    //
    // There are three cases:
    //
    // 1. `node` is a leaf. Its slot is emptied; rebalancing starts at its parent.
    //
    // 2. `node` has one child. The child is spliced into `node`'s slot; rebalancing starts at
    //    `node`'s parent.
    //
    // 3. `node` has two children. Its in-order predecessor (the right-most node of its left
    //    subtree) is unlinked, with the predecessor's own left subtree moved up into the vacated
    //    slot, and then spliced into `node`'s slot, adopting both of `node`'s subtrees. The
    //    predecessor node itself moves; keys and values are never copied between nodes.
    //    Rebalancing starts at the predecessor's old parent, or at the predecessor itself when
    //    that parent was `node`.
    unsafe fn unlink(&mut self, node: NonNull<T>) -> Result<Link<T>, Corruption> {
        unsafe {
            let slot = self.slot_of(node)?;
            let (left, right) = {
                let links = self.links(node);
                (links.left(), links.right())
            };

            match (left, right) {
                (None, None) => {
                    self.detach(slot);
                    Ok(slot.parent())
                }

                (Some(_), None) | (None, Some(_)) => {
                    let dir = if left.is_some() { Dir::Left } else { Dir::Right };

                    self.detach(slot);
                    if let Some(child) = self.detach(Slot::child(node, dir)) {
                        self.attach(slot, child);
                    }

                    Ok(slot.parent())
                }

                (Some(left), Some(_)) => {
                    let pred = self.extreme_in_subtree(left, Dir::Right);

                    let start = if links::links_to(Some(left), pred) {
                        self.detach(Slot::child(node, Dir::Left));
                        pred
                    } else {
                        let pred_slot = self.slot_of(pred)?;
                        let pred_parent = pred_slot.parent().ok_or(Corruption::ParentMismatch)?;

                        // The predecessor has no right child; its left subtree takes its place.
                        self.detach(pred_slot);
                        if let Some(pred_left) = self.detach(Slot::child(pred, Dir::Left)) {
                            self.attach(pred_slot, pred_left);
                        }

                        if let Some(left) = self.detach(Slot::child(node, Dir::Left)) {
                            self.attach(Slot::child(pred, Dir::Left), left);
                        }

                        pred_parent
                    };

                    if let Some(right) = self.detach(Slot::child(node, Dir::Right)) {
                        self.attach(Slot::child(pred, Dir::Right), right);
                    }

                    self.detach(slot);
                    self.attach(slot, pred);

                    Ok(Some(start))
                }
            }
        }
    }

    /// Clears the tree, removing all elements.
    pub fn clear(&mut self) {
        let mut opt_cur = self.root;

        while let Some(cur) = opt_cur {
            unsafe {
                // Descend to the minimum node, which has no left child.
                let cur = self.extreme_in_subtree(cur, Dir::Left);
                let slot = self.slot_of(cur).unwrap_or_else(|err| corrupted(err));

                // Elevate the node's right child (which may be None) into its slot.
                let right = self.detach(Slot::child(cur, Dir::Right));
                self.detach(slot);
                if let Some(right) = right {
                    self.attach(slot, right);
                }

                // Drop the node.
                self.links_mut(cur).clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(slot.parent());
            }
        }

        debug_assert!(self.root.is_none());
        debug_assert_eq!(self.len(), 0);
    }

    // Support methods ========================================================

    #[inline]
    unsafe fn links<'a>(&self, node: NonNull<T>) -> &'a Links<T> {
        unsafe { T::links(node).as_ref() }
    }

    #[inline]
    unsafe fn links_mut<'a>(&mut self, node: NonNull<T>) -> &'a mut Links<T> {
        unsafe { T::links(node).as_mut() }
    }

    unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        if links::links_to(unsafe { self.links(parent).left() }, child) {
            Dir::Left
        } else {
            Dir::Right
        }
    }
}

impl<T> Default for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}
