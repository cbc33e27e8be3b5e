use core::ptr::NonNull;

use crate::{
    error::Corruption,
    links::{self, Dir, Link, Slot},
    AvlTree, Links, TreeNode,
};

// All relinking goes through `detach` and `attach`, so a rotation reads the same whether the
// subtree it restructures hangs from the tree root or from an inner node.
impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns the node currently occupying `slot`.
    pub(crate) unsafe fn child_at(&self, slot: Slot<T>) -> Link<T> {
        match slot {
            Slot::Root => self.root,
            Slot::Child { parent, dir } => unsafe { self.links(parent).child(dir) },
        }
    }

    /// Resolves the slot `node` occupies by comparing it against its parent's children.
    pub(crate) unsafe fn slot_of(&self, node: NonNull<T>) -> Result<Slot<T>, Corruption> {
        unsafe {
            match self.links(node).parent() {
                None if links::links_to(self.root, node) => Ok(Slot::Root),
                None => Err(Corruption::ParentMismatch),
                Some(parent) => {
                    let parent_links = self.links(parent);

                    if links::links_to(parent_links.left(), node) {
                        Ok(Slot::child(parent, Dir::Left))
                    } else if links::links_to(parent_links.right(), node) {
                        Ok(Slot::child(parent, Dir::Right))
                    } else {
                        Err(Corruption::ParentMismatch)
                    }
                }
            }
        }
    }

    /// Empties `slot` and returns the node that occupied it, with its parent link cleared.
    ///
    /// An empty slot yields `None`.
    pub(crate) unsafe fn detach(&mut self, slot: Slot<T>) -> Link<T> {
        unsafe {
            let node = match slot {
                Slot::Root => self.root.take(),
                Slot::Child { parent, dir } => self.links_mut(parent).set_child(dir, None),
            }?;

            self.links_mut(node).set_parent(None);
            Some(node)
        }
    }

    /// Installs `node` into `slot`, pointing its parent link at the slot's owner.
    ///
    /// The slot must be empty and `node` must not currently be linked under another parent.
    pub(crate) unsafe fn attach(&mut self, slot: Slot<T>, node: NonNull<T>) -> NonNull<T> {
        unsafe {
            debug_assert!(self.child_at(slot).is_none(), "attaching into occupied {slot:?}");

            match slot {
                Slot::Root => self.root = Some(node),
                Slot::Child { parent, dir } => {
                    self.links_mut(parent).set_child(dir, Some(node));
                }
            }

            self.links_mut(node).set_parent(slot.parent());
            node
        }
    }

    // Rotates the subtree hanging from `slot` in direction `dir`. For a right rotation:
    //
    //          down               up
    //          /  \              /  \
    //        up    c    =>      a   down
    //       /  \                    /  \
    //      a   across           across  c
    //
    // Returns the owner of `slot`, which is where the rebalancing walk resumes.
    unsafe fn rotate(&mut self, slot: Slot<T>, dir: Dir) -> Result<Link<T>, Corruption> {
        unsafe {
            let down = self.child_at(slot).ok_or(Corruption::MissingSubtree)?;
            let up = self
                .detach(Slot::child(down, !dir))
                .ok_or(Corruption::MissingPivot)?;

            self.detach(slot);

            if let Some(across) = self.detach(Slot::child(up, dir)) {
                self.attach(Slot::child(down, !dir), across);
            }

            self.attach(Slot::child(up, dir), down);
            self.attach(slot, up);

            log::trace!(
                "rotated {dir:?} at {:?}: {:?} is the new subtree root",
                down.as_ref().key(),
                up.as_ref().key()
            );

            Ok(slot.parent())
        }
    }

    /// Single right rotation of the left-heavy subtree in `slot`.
    pub(crate) unsafe fn rotate_right(&mut self, slot: Slot<T>) -> Result<Link<T>, Corruption> {
        unsafe { self.rotate(slot, Dir::Right) }
    }

    /// Single left rotation of the right-heavy subtree in `slot`.
    pub(crate) unsafe fn rotate_left(&mut self, slot: Slot<T>) -> Result<Link<T>, Corruption> {
        unsafe { self.rotate(slot, Dir::Left) }
    }

    /// Left rotation of the left child, then right rotation at `slot`.
    pub(crate) unsafe fn rotate_left_right(
        &mut self,
        slot: Slot<T>,
    ) -> Result<Link<T>, Corruption> {
        unsafe {
            let down = self.child_at(slot).ok_or(Corruption::MissingSubtree)?;
            self.rotate_left(Slot::child(down, Dir::Left))?;
            self.rotate_right(slot)
        }
    }

    /// Right rotation of the right child, then left rotation at `slot`.
    pub(crate) unsafe fn rotate_right_left(
        &mut self,
        slot: Slot<T>,
    ) -> Result<Link<T>, Corruption> {
        unsafe {
            let down = self.child_at(slot).ok_or(Corruption::MissingSubtree)?;
            self.rotate_right(Slot::child(down, Dir::Right))?;
            self.rotate_left(slot)
        }
    }

    /// Walks from `start` up to the root, rotating at every node whose subtrees differ in height
    /// by more than one.
    ///
    /// Every ancestor is visited, even after a rotation lower down, since a rotation changes the
    /// height seen by the levels above it.
    pub(crate) unsafe fn rebalance(&mut self, start: Link<T>) -> Result<(), Corruption> {
        let mut opt_cur = start;

        while let Some(cur) = opt_cur {
            unsafe {
                let factor = links::balance_factor(cur);

                opt_cur = if factor > 1 {
                    let slot = self.slot_of(cur)?;
                    let left = self.links(cur).left().ok_or(Corruption::MissingPivot)?;

                    if links::balance_factor(left) >= 0 {
                        self.rotate_right(slot)?
                    } else {
                        self.rotate_left_right(slot)?
                    }
                } else if factor < -1 {
                    let slot = self.slot_of(cur)?;
                    let right = self.links(cur).right().ok_or(Corruption::MissingPivot)?;

                    if links::balance_factor(right) <= 0 {
                        self.rotate_left(slot)?
                    } else {
                        self.rotate_right_left(slot)?
                    }
                } else {
                    self.links(cur).parent()
                };
            }
        }

        Ok(())
    }
}
