//! Tree model with partial materialization.
//!
//! The model exclusively owns the navigation hierarchy. Nodes are addressed
//! by index paths from the root (`[]` is the root, `[2, 0]` is the first child
//! of the root's third child), never by references, so materializing a
//! deferred node keeps every outstanding path valid.

use navtree_source::TreeNode;

/// Index path from the root to a node.
pub type TreePath = Vec<usize>;

/// Error returned by [`TreeModel`] lookups and mutations.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Some index of the path is out of range (or descends into a node
    /// without materialized children).
    #[error("No node at path {path:?}")]
    PathNotFound {
        /// Requested path.
        path: TreePath,
    },
    /// Materialization target is a leaf or already materialized.
    #[error("Node at path {path:?} is not deferred")]
    NotDeferred {
        /// Requested path.
        path: TreePath,
    },
}

/// In-memory navigation hierarchy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeModel {
    root: TreeNode,
}

impl TreeModel {
    /// Create a model owning `root`.
    #[must_use]
    pub fn new(root: TreeNode) -> Self {
        Self { root }
    }

    /// Root node.
    #[must_use]
    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    /// Node at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PathNotFound`] if any index is out of range at any step.
    pub fn child_at(&self, path: &[usize]) -> Result<&TreeNode, TreeError> {
        let mut node = &self.root;
        for &idx in path {
            node = node.child(idx).ok_or_else(|| TreeError::PathNotFound {
                path: path.to_vec(),
            })?;
        }
        Ok(node)
    }

    fn child_at_mut(&mut self, path: &[usize]) -> Result<&mut TreeNode, TreeError> {
        let mut node = &mut self.root;
        for &idx in path {
            node = node.child_mut(idx).ok_or_else(|| TreeError::PathNotFound {
                path: path.to_vec(),
            })?;
        }
        Ok(node)
    }

    /// True if the node at `path` still has deferred children.
    pub fn is_deferred(&self, path: &[usize]) -> Result<bool, TreeError> {
        Ok(self.child_at(path)?.is_deferred())
    }

    /// Replace the deferred node at `path` with an inline node holding `children`.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PathNotFound`] for an invalid path and
    /// [`TreeError::NotDeferred`] if the node is a leaf or already
    /// materialized; callers check [`is_deferred`](Self::is_deferred) first.
    pub fn materialize(
        &mut self,
        path: &[usize],
        children: Vec<TreeNode>,
    ) -> Result<(), TreeError> {
        let node = self.child_at_mut(path)?;
        if !node.materialize(children) {
            return Err(TreeError::NotDeferred {
                path: path.to_vec(),
            });
        }
        tracing::debug!(path = ?path, label = node.label(), "Materialized subtree");
        Ok(())
    }

    /// Number of deferred nodes left in the tree.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        self.root.deferred_count()
    }

    /// Labels from the root down to the node at `path`.
    pub fn labels(&self, path: &[usize]) -> Result<Vec<&str>, TreeError> {
        let mut labels = vec![self.root.label()];
        for end in 1..=path.len() {
            labels.push(self.child_at(&path[..end])?.label());
        }
        Ok(labels)
    }
}
