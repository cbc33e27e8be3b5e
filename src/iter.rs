use core::{iter::FusedIterator, ptr::NonNull};

use crate::{
    links::{Dir, Link},
    AvlTree, Links, TreeNode,
};

/// An iterator over the items of an [`AvlTree`] in ascending key order.
///
/// The iterator only borrows the tree, so the tree cannot be modified (and no item can be removed)
/// while it is alive.
pub struct Iter<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    next: Link<T>,
    len: usize,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iter<'tree, T> {
    pub(crate) fn new(tree: &'tree AvlTree<T>) -> Self {
        Iter {
            tree,
            next: tree
                .root
                .map(|root| unsafe { tree.extreme_in_subtree(root, Dir::Left) }),
            len: tree.len(),
        }
    }

    // The in-order successor of `node`: the minimum of its right subtree if it has one, otherwise
    // the nearest ancestor reached from a left child.
    unsafe fn successor(&self, node: NonNull<T>) -> Link<T> {
        unsafe {
            if let Some(right) = self.tree.links(node).right() {
                return Some(self.tree.extreme_in_subtree(right, Dir::Left));
            }

            let mut cur = node;
            while let Some(parent) = self.tree.links(cur).parent() {
                if self.tree.which_child(parent, cur) == Dir::Left {
                    return Some(parent);
                }
                cur = parent;
            }

            None
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for Iter<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        unsafe {
            self.next = self.successor(cur);
            self.len -= 1;

            Some(cur.as_ref())
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.len, Some(self.len))
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> ExactSizeIterator for Iter<'_, T> {}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for Iter<'_, T> {}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns an iterator over the items of the tree, in ascending key order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }
}

impl<'tree, T> IntoIterator for &'tree AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    type Item = &'tree T;
    type IntoIter = Iter<'tree, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
