//! Pre-order, post-order and level-order walks over an [`AvlTree`].
//!
//! In-order iteration lives in [`iter`](crate::iter). All walks are lazy, only borrow the tree,
//! and visit each item exactly once.

use core::{iter::FusedIterator, ptr::NonNull};
use std::collections::VecDeque;

use crate::{
    links::{Dir, Link},
    AvlTree, Links, TreeNode,
};

/// Visits each node before its left subtree, then its right subtree.
pub struct PreOrder<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    stack: Vec<NonNull<T>>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for PreOrder<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.stack.pop()?;

        unsafe {
            let links = self.tree.links(cur);

            // Right goes on first so that the left subtree is walked first.
            self.stack.extend(links.right());
            self.stack.extend(links.left());

            Some(cur.as_ref())
        }
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for PreOrder<'_, T> {}

/// Visits both subtrees of a node, left first, before the node itself.
pub struct PostOrder<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    next: Link<T>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> PostOrder<'tree, T> {
    // The first node visited in the subtree at `cur`: keep descending, preferring the left child,
    // until a leaf is reached.
    unsafe fn first_in_subtree(&self, mut cur: NonNull<T>) -> NonNull<T> {
        loop {
            let links = unsafe { self.tree.links(cur) };

            match links.left().or(links.right()) {
                Some(child) => cur = child,
                None => return cur,
            }
        }
    }
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for PostOrder<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.next?;

        unsafe {
            // After a left child comes its right sibling's subtree, if any. Otherwise the parent.
            self.next = match self.tree.links(cur).parent() {
                None => None,
                Some(parent) => match (
                    self.tree.which_child(parent, cur),
                    self.tree.links(parent).right(),
                ) {
                    (Dir::Left, Some(sibling)) => Some(self.first_in_subtree(sibling)),
                    _ => Some(parent),
                },
            };

            Some(cur.as_ref())
        }
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for PostOrder<'_, T> {}

/// Visits nodes breadth-first: level by level from the root, left to right within a level.
pub struct LevelOrder<'tree, T: TreeNode<Links<T>> + ?Sized> {
    tree: &'tree AvlTree<T>,
    queue: VecDeque<NonNull<T>>,
}

impl<'tree, T: TreeNode<Links<T>> + ?Sized> Iterator for LevelOrder<'tree, T> {
    type Item = &'tree T;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.queue.pop_front()?;

        unsafe {
            let links = self.tree.links(cur);

            self.queue.extend(links.left());
            self.queue.extend(links.right());

            Some(cur.as_ref())
        }
    }
}

impl<T: TreeNode<Links<T>> + ?Sized> FusedIterator for LevelOrder<'_, T> {}

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a pre-order iterator: each node, then its left subtree, then its right subtree.
    pub fn pre_order(&self) -> PreOrder<'_, T> {
        PreOrder {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    /// Returns a post-order iterator: left subtree, right subtree, then the node.
    pub fn post_order(&self) -> PostOrder<'_, T> {
        let mut iter = PostOrder {
            tree: self,
            next: None,
        };

        iter.next = self.root.map(|root| unsafe { iter.first_in_subtree(root) });
        iter
    }

    /// Returns a breadth-first iterator, seeded with the root.
    pub fn level_order(&self) -> LevelOrder<'_, T> {
        LevelOrder {
            tree: self,
            queue: self.root.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{model::TestNode, AvlTree};

    fn keys<'a>(iter: impl Iterator<Item = &'a TestNode>) -> Vec<u32> {
        iter.map(|node| node.key).collect()
    }

    fn tree_of(keys: impl IntoIterator<Item = u32>) -> AvlTree<TestNode> {
        let mut tree = AvlTree::new();
        for key in keys {
            tree.insert(TestNode::new(key));
        }
        tree
    }

    #[test]
    fn empty_tree_walks_are_empty() {
        let tree: AvlTree<TestNode> = AvlTree::new();

        assert_eq!(tree.pre_order().count(), 0);
        assert_eq!(tree.iter().count(), 0);
        assert_eq!(tree.post_order().count(), 0);
        assert_eq!(tree.level_order().count(), 0);
    }

    #[test]
    fn single_node_walks() {
        let tree = tree_of([5]);

        assert_eq!(keys(tree.pre_order()), [5]);
        assert_eq!(keys(tree.iter()), [5]);
        assert_eq!(keys(tree.post_order()), [5]);
        assert_eq!(keys(tree.level_order()), [5]);
    }

    #[test]
    fn ten_ascending_keys() {
        // Shape:
        //
        //          3
        //        /   \
        //       1     7
        //      / \   / \
        //     0   2 5   8
        //          / \   \
        //         4   6   9
        let tree = tree_of(0..10);

        assert_eq!(keys(tree.pre_order()), [3, 1, 0, 2, 7, 5, 4, 6, 8, 9]);
        assert_eq!(keys(tree.iter()), [0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(keys(tree.post_order()), [0, 2, 1, 4, 6, 5, 9, 8, 7, 3]);
        assert_eq!(keys(tree.level_order()), [3, 1, 7, 0, 2, 5, 8, 4, 6, 9]);
    }

    #[test]
    fn post_order_with_lone_right_children() {
        // 2 is the root with children 1 and 3; 3 has only a right child 4.
        let tree = tree_of([2, 1, 3, 4]);

        assert_eq!(keys(tree.post_order()), [1, 4, 3, 2]);
        assert_eq!(keys(tree.pre_order()), [2, 1, 3, 4]);
    }
}
