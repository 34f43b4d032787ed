//! Parent/child structure rebuilt from a flat pre-order node list.

use super::node::SceneNode;
use crate::error::DecodeError;

/// Arena view of a decoded node list. Indices are flat node indices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SceneTree {
    parents: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    roots: Vec<usize>,
}

impl SceneTree {
    /// Rebuilds the tree from `child_count`s.
    ///
    /// Iterative: a stack of open parents with their remaining child slots,
    /// so a 100k-deep chain costs heap, not call stack.
    ///
    /// # Errors
    ///
    /// [`DecodeError::MalformedTree`] if a record falls outside the root's
    /// subtrees, or the list ends while child slots are still open.
    pub fn build(nodes: &[SceneNode], root_child_count: u32) -> Result<Self, DecodeError> {
        let mut parents = Vec::with_capacity(nodes.len());
        let mut children = vec![Vec::new(); nodes.len()];
        let mut roots = Vec::new();

        // (parent, open slots); `None` is the implicit scene root.
        let mut stack: Vec<(Option<usize>, u32)> = vec![(None, root_child_count)];

        for (index, node) in nodes.iter().enumerate() {
            while matches!(stack.last(), Some((_, 0))) {
                stack.pop();
            }
            let Some(top) = stack.last_mut() else {
                return Err(DecodeError::MalformedTree {
                    node: index,
                    reason: "record outside the root's subtrees",
                });
            };
            top.1 -= 1;
            let parent = top.0;

            parents.push(parent);
            match parent {
                Some(p) => children[p].push(index),
                None => roots.push(index),
            }
            stack.push((Some(index), node.child_count));
        }

        if stack.iter().any(|&(_, open)| open > 0) {
            return Err(DecodeError::MalformedTree {
                node: nodes.len(),
                reason: "child counts exceed the node list",
            });
        }

        Ok(Self { parents, children, roots })
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// True for an empty scene.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Direct children of the implicit root.
    #[must_use]
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    /// Parent of `index`; `None` for top-level nodes and unknown indices.
    #[must_use]
    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parents.get(index).copied().flatten()
    }

    /// Direct children of `index`.
    #[must_use]
    pub fn children(&self, index: usize) -> &[usize] {
        self.children.get(index).map_or(&[], Vec::as_slice)
    }

    /// Number of ancestors below the implicit root.
    #[must_use]
    pub fn depth(&self, index: usize) -> usize {
        let mut depth = 0;
        let mut current = self.parent(index);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nodes(child_counts: &[u32]) -> Vec<SceneNode> {
        child_counts
            .iter()
            .map(|&c| {
                let mut n = SceneNode::group("n");
                n.child_count = c;
                n
            })
            .collect()
    }

    #[test]
    fn test_build_simple() {
        // a(b(d), c), e
        let tree = SceneTree::build(&nodes(&[2, 1, 0, 0, 0]), 2).unwrap();
        assert_eq!(tree.roots(), &[0, 4]);
        assert_eq!(tree.children(0), &[1, 3]);
        assert_eq!(tree.children(1), &[2]);
        assert_eq!(tree.parent(2), Some(1));
        assert_eq!(tree.parent(4), None);
        assert_eq!(tree.depth(2), 2);
    }

    #[test]
    fn test_overrun() {
        let err = SceneTree::build(&nodes(&[3, 0]), 1).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTree { node: 2, .. }));
    }

    #[test]
    fn test_forest_beyond_root_count() {
        let err = SceneTree::build(&nodes(&[0, 0]), 1).unwrap_err();
        assert!(matches!(err, DecodeError::MalformedTree { node: 1, .. }));
    }

    #[test]
    fn test_empty() {
        assert!(SceneTree::build(&[], 0).unwrap().is_empty());
        assert!(SceneTree::build(&[], 1).is_err());
    }

    #[test]
    fn test_deep_chain() {
        let mut counts = vec![1u32; 100_000];
        counts.push(0);
        let tree = SceneTree::build(&nodes(&counts), 1).unwrap();
        assert_eq!(tree.len(), 100_001);
        assert_eq!(tree.parent(100_000), Some(99_999));
    }
}
