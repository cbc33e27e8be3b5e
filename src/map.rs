use core::{borrow::Borrow, fmt, iter::FusedIterator, marker::PhantomPinned, ptr::NonNull};

use cordyceps::Linked;

use crate::{iter, AvlTree, Error, Links, TreeNode};

/// An ordered map based on an [AVL tree].
///
/// Keys are unique. [`add`](AvlMap::add) refuses to overwrite an existing key; the stored value
/// can instead be replaced in place with [`apply`](AvlMap::apply).
///
/// [AVL tree]: https://en.wikipedia.org/wiki/AVL_tree
pub struct AvlMap<K: Ord + fmt::Debug, V> {
    tree: AvlTree<MapNode<K, V>>,
}

struct MapNode<K, V> {
    links: Links<MapNode<K, V>>,
    key: K,
    value: V,
    _unpin: PhantomPinned,
}

impl<K, V> MapNode<K, V> {
    fn new(key: K, value: V) -> Box<Self> {
        Box::new(MapNode {
            links: Links::new(),
            key,
            value,
            _unpin: PhantomPinned,
        })
    }
}

unsafe impl<K, V> Linked<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Handle = Box<Self>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        Box::leak(r).into()
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<MapNode<K, V>>> {
        let ptr = ptr.as_ptr();
        unsafe { NonNull::new_unchecked(core::ptr::addr_of_mut!((*ptr).links)) }
    }
}

impl<K: Ord + fmt::Debug, V> TreeNode<Links<MapNode<K, V>>> for MapNode<K, V> {
    type Key = K;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

// SAFETY: the map exclusively owns every node reachable from its root, and the raw links never
// escape it, so moving or sharing the map is as safe as moving or sharing its keys and values.
unsafe impl<K: Ord + fmt::Debug + Send, V: Send> Send for AvlMap<K, V> {}
unsafe impl<K: Ord + fmt::Debug + Sync, V: Sync> Sync for AvlMap<K, V> {}

impl<K: Ord + fmt::Debug, V> AvlMap<K, V> {
    /// Creates a new, empty `AvlMap`.
    pub const fn new() -> Self {
        Self {
            tree: AvlTree::new(),
        }
    }

    /// Returns `true` if the map contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Returns the number of elements in the map.
    pub const fn len(&self) -> usize {
        self.tree.len()
    }

    /// Returns the height of the underlying tree; 0 for an empty map.
    pub fn height(&self) -> usize {
        self.tree.height()
    }

    /// Returns `true` if every node of the underlying tree has zero or two children.
    pub fn is_full(&self) -> bool {
        self.tree.is_full()
    }

    /// Returns `true` if the underlying tree is perfect, i.e. `len == 2^height - 1`.
    pub fn is_complete(&self) -> bool {
        self.tree.is_complete()
    }

    /// Inserts `value` under `key`.
    ///
    /// Returns `false`, leaving the map unchanged, if `key` is already present.
    pub fn add(&mut self, key: K, value: V) -> bool {
        self.tree.insert(MapNode::new(key, value)).is_none()
    }

    /// Removes `key` from the map, returning the value that was stored under it.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.remove(key).map(|node| node.value)
    }

    /// Returns `true` if the map contains a value associated with `key`.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.contains_key(key)
    }

    /// Returns a reference to the value associated with `key`.
    #[inline]
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.tree.get(key).map(|node| &node.get_ref().value)
    }

    /// Returns a mutable reference to the value associated with `key`.
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        // SAFETY: only the value is handed out, so the key and links stay untouched. Pinning is
        // not structural for `node.value`.
        unsafe {
            self.tree
                .get_mut(key)
                .map(|node| &mut node.get_unchecked_mut().value)
        }
    }

    /// Returns the value associated with `key`, or [`Error::KeyNotFound`].
    pub fn value_of<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Replaces the value under `key` with `f(&old_value)` and returns the new value.
    ///
    /// The shape of the tree is not affected.
    pub fn apply<Q, F>(&mut self, key: &Q, f: F) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce(&V) -> V,
    {
        let value = self.get_mut(key).ok_or(Error::KeyNotFound)?;
        *value = f(value);
        Ok(&*value)
    }

    /// Returns the smallest key whose value equals `value`.
    ///
    /// This scans the whole map in key order.
    pub fn key_of(&self, value: &V) -> Option<&K>
    where
        V: PartialEq,
    {
        self.iter().find(|(_, v)| *v == value).map(|(k, _)| k)
    }

    /// Returns, in ascending key order, the values whose key satisfies `predicate`.
    pub fn select_by_key<P>(&self, mut predicate: P) -> Vec<&V>
    where
        P: FnMut(&K) -> bool,
    {
        self.iter()
            .filter(|(k, _)| predicate(*k))
            .map(|(_, v)| v)
            .collect()
    }

    /// Returns, in ascending key order, the values satisfying `predicate`.
    pub fn select_by_value<P>(&self, mut predicate: P) -> Vec<&V>
    where
        P: FnMut(&V) -> bool,
    {
        self.iter().map(|(_, v)| v).filter(|v| predicate(*v)).collect()
    }

    /// Calls `visit` for each entry: node, then left subtree, then right subtree.
    pub fn pre_order<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        self.tree
            .pre_order()
            .for_each(|node| visit(&node.key, &node.value));
    }

    /// Calls `visit` for each entry in ascending key order.
    pub fn in_order<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        self.iter().for_each(|(k, v)| visit(k, v));
    }

    /// Calls `visit` for each entry: left subtree, then right subtree, then the node.
    pub fn post_order<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        self.tree
            .post_order()
            .for_each(|node| visit(&node.key, &node.value));
    }

    /// Calls `visit` for each entry breadth-first, starting from the root.
    pub fn level_order<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V),
    {
        self.tree
            .level_order()
            .for_each(|node| visit(&node.key, &node.value));
    }

    /// Returns an iterator over the entries of the map, in ascending key order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.tree.iter(),
        }
    }

    /// Returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn first_key_value(&self) -> Option<(&K, &V)> {
        self.tree
            .first()
            .map(|node| (&node.get_ref().key, &node.get_ref().value))
    }

    /// Removes and returns the first key-value pair in the map.
    ///
    /// The returned key is the minimum key in the map.
    #[inline]
    pub fn pop_first(&mut self) -> Option<(K, V)> {
        self.tree.pop_first().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn last_key_value(&self) -> Option<(&K, &V)> {
        self.tree
            .last()
            .map(|node| (&node.get_ref().key, &node.get_ref().value))
    }

    /// Removes and returns the last key-value pair in the map.
    ///
    /// The returned key is the maximum key in the map.
    #[inline]
    pub fn pop_last(&mut self) -> Option<(K, V)> {
        self.tree.pop_last().map(|node| {
            let MapNode { key, value, .. } = *node;
            (key, value)
        })
    }

    /// Clears the map, removing all elements.
    #[inline]
    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Writes the shape of the map's tree as a Graphviz `digraph`.
    pub fn dotgraph<W>(&self, name: &str, w: W) -> fmt::Result
    where
        K: fmt::Display,
        W: fmt::Write,
    {
        self.tree.dotgraph(name, w)
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) {
        self.tree.assert_invariants();
    }
}

impl<K: Ord + fmt::Debug, V> Default for AvlMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + fmt::Debug, V: fmt::Debug> fmt::Debug for AvlMap<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// An iterator over the entries of an [`AvlMap`], in ascending key order.
pub struct Iter<'a, K: Ord + fmt::Debug, V> {
    inner: iter::Iter<'a, MapNode<K, V>>,
}

impl<'a, K: Ord + fmt::Debug, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|node| (&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K: Ord + fmt::Debug, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K: Ord + fmt::Debug, V> FusedIterator for Iter<'_, K, V> {}

impl<'a, K: Ord + fmt::Debug, V> IntoIterator for &'a AvlMap<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
