use core::{cell::UnsafeCell, fmt, marker::PhantomPinned, mem, ops::Not, ptr::NonNull};

use crate::TreeNode;

pub(crate) type Link<T> = Option<NonNull<T>>;

/// Returns `true` if `link` points at `node`. Only addresses are compared, never metadata.
#[inline]
pub(crate) fn links_to<T: ?Sized>(link: Link<T>, node: NonNull<T>) -> bool {
    link.is_some_and(|ptr| core::ptr::addr_eq(ptr.as_ptr(), node.as_ptr()))
}

/// Intrusive links embedded in every tree node.
///
/// The two child edges own their subtrees; the parent edge is a back-reference used to resolve
/// which branch a node hangs from and to walk upward while rebalancing.
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    _unpin: PhantomPinned,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// The position a node occupies: the tree root, or one branch of a parent.
pub(crate) enum Slot<T: ?Sized> {
    Root,
    Child { parent: NonNull<T>, dir: Dir },
}

impl<T: ?Sized> Slot<T> {
    pub(crate) fn child(parent: NonNull<T>, dir: Dir) -> Slot<T> {
        Slot::Child { parent, dir }
    }

    /// Returns the node owning this slot, or `None` for the root slot.
    pub(crate) fn parent(&self) -> Link<T> {
        match *self {
            Slot::Root => None,
            Slot::Child { parent, .. } => Some(parent),
        }
    }
}

impl<T: ?Sized> Clone for Slot<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: ?Sized> Copy for Slot<T> {}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Root => f.write_str("Root"),
            Slot::Child { parent, dir } => f
                .debug_struct("Child")
                .field("parent", parent)
                .field("dir", dir)
                .finish(),
        }
    }
}

impl<T: ?Sized> Links<T> {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                _unpin: PhantomPinned,
            }),
        }
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn parent(&self) -> Link<T> {
        unsafe { (*self.inner.get()).parent }
    }

    #[inline]
    pub(crate) fn child(&self, dir: Dir) -> Link<T> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    pub(crate) fn left(&self) -> Link<T> {
        self.child(Dir::Left)
    }

    #[inline]
    pub(crate) fn right(&self) -> Link<T> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn set_parent(&mut self, parent: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    /// Resets all three links, leaving the node free to be linked into a tree again.
    #[inline]
    pub(crate) fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .finish()
    }
}

/// Returns the height of the subtree rooted at `node`.
///
/// An absent node has height 0 and a leaf has height 1. Nothing is cached, so this visits every
/// node of the subtree.
///
/// # Safety
///
/// `node` and all of its descendants must be live, correctly linked nodes.
pub(crate) unsafe fn height<T>(node: Link<T>) -> usize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    let Some(node) = node else {
        return 0;
    };

    unsafe {
        let links = T::links(node).as_ref();
        1 + height(links.left()).max(height(links.right()))
    }
}

/// Returns `height(left) - height(right)` for `node`.
///
/// # Safety
///
/// See [`height`].
pub(crate) unsafe fn balance_factor<T>(node: NonNull<T>) -> isize
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe {
        let links = T::links(node).as_ref();
        height(links.left()) as isize - height(links.right()) as isize
    }
}

/// Returns `true` if the subtrees of `node` differ in height by at most one.
///
/// # Safety
///
/// See [`height`].
pub(crate) unsafe fn is_balanced<T>(node: NonNull<T>) -> bool
where
    T: TreeNode<Links<T>> + ?Sized,
{
    unsafe { balance_factor(node).abs() <= 1 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TestNode;
    use cordyceps::Linked;

    // Hand-links `child` under `parent` without any balancing.
    unsafe fn link(parent: NonNull<TestNode>, dir: Dir, child: NonNull<TestNode>) {
        unsafe {
            TestNode::links(parent).as_mut().set_child(dir, Some(child));
            TestNode::links(child).as_mut().set_parent(Some(parent));
        }
    }

    fn nodes(n: u32) -> Vec<NonNull<TestNode>> {
        (0..n).map(|key| TestNode::into_ptr(TestNode::new(key))).collect()
    }

    fn free(nodes: Vec<NonNull<TestNode>>) {
        for node in nodes {
            drop(unsafe { TestNode::from_ptr(node) });
        }
    }

    #[test]
    fn height_of_hand_built_chain() {
        let n = nodes(5);
        let (a, b, c, d, e) = (n[0], n[1], n[2], n[3], n[4]);

        unsafe {
            assert_eq!(height::<TestNode>(None), 0);
            assert_eq!(height(Some(a)), 1);

            link(a, Dir::Left, b);
            assert_eq!(height(Some(a)), 2);

            link(a, Dir::Right, c);
            assert_eq!(height(Some(a)), 2);

            link(b, Dir::Left, d);
            assert_eq!(height(Some(a)), 3);

            link(d, Dir::Right, e);
            assert_eq!(height(Some(a)), 4);
        }

        free(n);
    }

    #[test]
    fn balance_factor_tracks_heavier_side() {
        let n = nodes(5);
        let (a, b, c, d, e) = (n[0], n[1], n[2], n[3], n[4]);

        unsafe {
            assert_eq!(balance_factor(a), 0);
            assert!(is_balanced(a));

            link(a, Dir::Left, b);
            assert_eq!(balance_factor(a), 1);
            assert!(is_balanced(a));

            link(b, Dir::Right, c);
            assert_eq!(balance_factor(a), 2);
            assert!(!is_balanced(a));

            link(a, Dir::Right, d);
            assert_eq!(balance_factor(a), 1);
            assert!(is_balanced(a));

            link(d, Dir::Left, e);
            assert_eq!(balance_factor(a), 0);
            assert_eq!(balance_factor(d), 1);
        }

        free(n);
    }

    #[test]
    fn links_to_compares_addresses() {
        let n = nodes(2);

        assert!(links_to(Some(n[0]), n[0]));
        assert!(!links_to(Some(n[1]), n[0]));
        assert!(!links_to(None, n[0]));

        free(n);
    }

    #[test]
    fn clear_resets_links() {
        let n = nodes(2);

        unsafe {
            link(n[0], Dir::Right, n[1]);
            assert!(!TestNode::links(n[0]).as_ref().is_leaf());

            TestNode::links(n[0]).as_mut().clear();
            TestNode::links(n[1]).as_mut().clear();

            assert!(TestNode::links(n[0]).as_ref().is_leaf());
            assert_eq!(TestNode::links(n[1]).as_ref().parent(), None);
        }

        free(n);
    }
}
