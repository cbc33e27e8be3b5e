use core::{fmt, ptr::NonNull};
use std::collections::VecDeque;

use crate::{links, AvlTree, Links, TreeNode};

impl<T> AvlTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Writes the shape of the tree as a Graphviz `digraph`, one `rank=same` group per level.
    ///
    /// Each node is labelled `key:balance`. Missing children are drawn as points so left and
    /// right edges stay distinguishable.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item<T: ?Sized> {
            Node(NonNull<T>),
            Missing(u32),
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            use fmt::Write;

            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => node,
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let key = unsafe { node.as_ref().key() };
                let balance = unsafe { links::balance_factor(node) };
                write!(w, "\"graph{name}-{key}\" [label=\"{key}:{balance}\"]; ")?;

                let node_links = unsafe { self.links(node) };
                for child in [node_links.left(), node_links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref().key() };

                            queue.push_back(Item::Node(child));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-{child_key}\";"
                            )?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(
                                edges,
                                "\"graph{name}-{key}\" -> \"graph{name}-missing{missing}\";"
                            )?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}

#[cfg(test)]
mod tests {
    use crate::{model::TestNode, AvlTree};

    #[test]
    fn empty_graph() {
        let tree: AvlTree<TestNode> = AvlTree::new();
        let mut out = String::new();

        tree.dotgraph("empty", &mut out).unwrap();
        assert_eq!(out, "digraph \"graph-empty\" {}");
    }

    #[test]
    fn graph_lists_every_node_and_edge() {
        let mut tree: AvlTree<TestNode> = AvlTree::new();
        for key in [2, 1, 3, 4] {
            tree.insert(TestNode::new(key));
        }

        let mut out = String::new();
        tree.dotgraph("t", &mut out).unwrap();

        assert!(out.starts_with("digraph \"graph-t\" {"));
        assert!(out.contains("\"grapht-2\" [label=\"2:-1\"];"));
        assert!(out.contains("\"grapht-3\" [label=\"3:-1\"];"));
        assert!(out.contains("\"grapht-4\" [label=\"4:0\"];"));
        assert!(out.contains("\"grapht-2\" -> \"grapht-1\";"));
        assert!(out.contains("\"grapht-3\" -> \"grapht-4\";"));
        assert!(out.ends_with(" }\n}"));
    }
}
