use core::{pin::Pin, ptr::NonNull};

use crate::{links::Slot, AvlTree, Links, TreeNode};

/// A view into a single position of an [`AvlTree`], which may be either vacant or occupied.
pub enum Entry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    Vacant(VacantEntry<'tree, T>),
    Occupied(OccupiedEntry<'tree, T>),
}

impl<'tree, T> Entry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) fn vacant(tree: &'tree mut AvlTree<T>, slot: Slot<T>) -> Self {
        Entry::Vacant(VacantEntry { tree, slot })
    }

    pub(crate) fn occupied(tree: &'tree mut AvlTree<T>, node: NonNull<T>) -> Self {
        Entry::Occupied(OccupiedEntry { tree, node })
    }

    /// Returns `true` if an item with the searched key is present.
    pub fn is_occupied(&self) -> bool {
        matches!(self, Entry::Occupied(_))
    }
}

pub struct VacantEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) slot: Slot<T>,
}

impl<'tree, T> VacantEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Inserts `item` at the position associated with this entry and rebalances the tree.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key returned by `item.key()` is equal to the key used to
    /// retrieve this entry.
    pub unsafe fn insert(self, item: T::Handle) -> Pin<&'tree mut T> {
        unsafe { self.insert_ptr(T::into_ptr(item)) }
    }

    pub(crate) unsafe fn insert_ptr(self, mut ptr: NonNull<T>) -> Pin<&'tree mut T> {
        unsafe {
            self.tree.link_leaf(self.slot, ptr);
            Pin::new_unchecked(ptr.as_mut())
        }
    }
}

pub struct OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) tree: &'tree mut AvlTree<T>,
    pub(crate) node: NonNull<T>,
}

impl<'tree, T> OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a reference to the item in the entry.
    ///
    /// The reference borrows the entry, so it cannot outlive a [`remove`](Self::remove):
    ///
    /// ```compile_fail
    /// use core::ptr::NonNull;
    ///
    /// use cordyceps::Linked;
    /// use cordyceps_avl::{AvlTree, Entry, Links, TreeNode};
    ///
    /// #[repr(C)]
    /// struct Node {
    ///     links: Links<Node>,
    ///     key: u32,
    /// }
    ///
    /// unsafe impl Linked<Links<Node>> for Node {
    ///     type Handle = Box<Node>;
    ///
    ///     fn into_ptr(r: Box<Node>) -> NonNull<Node> {
    ///         NonNull::from(Box::leak(r))
    ///     }
    ///
    ///     unsafe fn from_ptr(ptr: NonNull<Node>) -> Box<Node> {
    ///         unsafe { Box::from_raw(ptr.as_ptr()) }
    ///     }
    ///
    ///     unsafe fn links(ptr: NonNull<Node>) -> NonNull<Links<Node>> {
    ///         ptr.cast()
    ///     }
    /// }
    ///
    /// impl TreeNode<Links<Node>> for Node {
    ///     type Key = u32;
    ///
    ///     fn key(&self) -> &u32 {
    ///         &self.key
    ///     }
    /// }
    ///
    /// let mut tree = AvlTree::new();
    /// tree.insert(Box::new(Node { links: Links::new(), key: 1 }));
    ///
    /// if let Entry::Occupied(occupied) = tree.entry(&1u32) {
    ///     let node = occupied.get();
    ///     drop(occupied.remove());
    ///     assert_eq!(node.key, 1);
    /// }
    /// ```
    pub fn get(&self) -> &T {
        // SAFETY: the node stays linked for as long as the entry is alive.
        unsafe { self.node.as_ref() }
    }

    /// Converts the entry into a reference to its item, borrowed for as long as the tree is.
    pub fn into_ref(self) -> &'tree T {
        // SAFETY: the entry is consumed, so it can no longer remove the node, and `self.tree`
        // stays mutably borrowed for `'tree`.
        unsafe { self.node.as_ref() }
    }

    /// Returns a pinned mutable reference to the item in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the mutably borrowed item are
    /// modified, as doing so may result in undefined behavior.
    pub unsafe fn get_mut(&mut self) -> Pin<&mut T> {
        // SAFETY: `self.node` is guaranteed pinned by contract with `Linked`.
        unsafe { Pin::new_unchecked(self.node.as_mut()) }
    }

    /// Removes and returns the item pointed to by this entry.
    pub fn remove(self) -> T::Handle {
        unsafe { self.tree.remove_at(self.node) }
    }
}
