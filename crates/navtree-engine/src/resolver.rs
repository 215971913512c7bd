//! Anchor resolution.
//!
//! [`Resolver::plan`] turns a [`PageRef`] into the index path of its node:
//! it walks the anchor's ancestor chain from the root and, at every step,
//! finds the child whose link matches the next ancestor. Deferred nodes met
//! along the way are loaded through the [`LazyLoader`].
//!
//! # Materialization
//!
//! Fragments loaded during a plan are staged, not spliced in immediately.
//! They are committed to the tree (parents before children) only when the
//! whole chain resolved, so a failing plan leaves the tree exactly as it was.
//! Loaded fragments stay in the loader cache either way.
//!
//! The tree is never borrowed across an await point: other plans may run
//! while a fetch is in flight and may materialize the same node first, in
//! which case the staged copy is dropped at commit time.

use std::cell::RefCell;
use std::rc::Rc;

use navtree_source::{PageRef, TreeNode};

use crate::anchor_index::{AnchorEntry, AnchorIndex, UnknownAnchor};
use crate::loader::{LazyLoader, LoadError};
use crate::tree::{TreeError, TreeModel, TreePath};

/// Error returned when an anchor cannot be resolved to a tree path.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// Anchor has no index entry.
    #[error(transparent)]
    UnknownAnchor(#[from] UnknownAnchor),
    /// Index and tree disagree: no child matches the next ancestor.
    #[error("Cannot resolve {anchor}: no child linking to {ancestor} under {path:?}")]
    UnresolvedAncestor {
        /// Anchor being resolved.
        anchor: PageRef,
        /// Ancestor that was not found.
        ancestor: PageRef,
        /// Path of the node whose children were scanned.
        path: TreePath,
    },
    /// Path lookup failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
    /// Fragment could not be loaded.
    #[error(transparent)]
    Load(#[from] LoadError),
}

type Fragment = Rc<[TreeNode]>;

/// Resolves anchors against the tree, loading deferred subtrees on the way.
pub struct Resolver<'a> {
    tree: &'a RefCell<TreeModel>,
    index: &'a AnchorIndex,
    loader: &'a LazyLoader,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over the given components.
    #[must_use]
    pub fn new(tree: &'a RefCell<TreeModel>, index: &'a AnchorIndex, loader: &'a LazyLoader) -> Self {
        Self {
            tree,
            index,
            loader,
        }
    }

    /// Path of the node for `anchor`.
    ///
    /// # Errors
    ///
    /// - [`ResolveError::UnknownAnchor`] if the anchor is not indexed
    /// - [`ResolveError::UnresolvedAncestor`] if the tree lacks an ancestor
    /// - [`ResolveError::Load`] if a fragment on the way cannot be loaded
    ///
    /// The tree is unchanged on error.
    pub async fn plan(&self, anchor: &PageRef) -> Result<TreePath, ResolveError> {
        let entry = self.index.resolve(anchor)?;
        self.plan_entry(anchor, entry).await
    }

    /// Like [`plan`](Self::plan), but an unindexed fragment falls back to its page.
    pub async fn plan_page(&self, anchor: &PageRef) -> Result<TreePath, ResolveError> {
        let entry = self.index.resolve_page(anchor)?;
        self.plan_entry(anchor, entry).await
    }

    /// Load and splice in the children of the node at `path` if it is deferred.
    pub async fn materialize_at(&self, path: &[usize]) -> Result<(), ResolveError> {
        let handle = self.tree.borrow().child_at(path)?.deferred_handle().cloned();
        let Some(handle) = handle else {
            return Ok(());
        };

        let fragment = self.loader.load(&handle).await?;
        self.commit(vec![(path.to_vec(), fragment)])?;
        Ok(())
    }

    async fn plan_entry(
        &self,
        anchor: &PageRef,
        entry: &AnchorEntry,
    ) -> Result<TreePath, ResolveError> {
        let steps = self.steps(entry);
        let mut path = TreePath::with_capacity(steps.len());
        let mut staged: Vec<(TreePath, Fragment)> = Vec::new();
        // Current node when it lives in a staged fragment rather than the tree.
        let mut detached: Option<TreeNode> = None;

        for ancestor in steps {
            let handle = match &detached {
                Some(node) => node.deferred_handle().cloned(),
                None => self.tree.borrow().child_at(&path)?.deferred_handle().cloned(),
            };
            let fragment = match handle {
                Some(handle) => {
                    let fragment = self.loader.load(&handle).await?;
                    staged.push((path.clone(), Rc::clone(&fragment)));
                    Some(fragment)
                }
                None => None,
            };

            let (idx, next) = {
                let tree = self.tree.borrow();
                let children: &[TreeNode] = match (&fragment, &detached) {
                    (Some(fragment), _) => &fragment[..],
                    (None, Some(node)) => node.inline_children().unwrap_or_default(),
                    (None, None) => tree.child_at(&path)?.inline_children().unwrap_or_default(),
                };
                let idx = find_child(children, ancestor).ok_or_else(|| {
                    ResolveError::UnresolvedAncestor {
                        anchor: anchor.clone(),
                        ancestor: ancestor.clone(),
                        path: path.clone(),
                    }
                })?;
                let next =
                    (fragment.is_some() || detached.is_some()).then(|| children[idx].clone());
                (idx, next)
            };

            path.push(idx);
            detached = next;
        }

        self.commit(staged)?;
        tracing::debug!(anchor = %anchor, path = ?path, "Resolved anchor");
        Ok(path)
    }

    /// Chain steps below the root.
    ///
    /// A leading element naming the root itself is skipped: the walk starts there.
    fn steps<'e>(&self, entry: &'e AnchorEntry) -> &'e [PageRef] {
        let chain = entry.chain();
        let tree = self.tree.borrow();
        match (chain.split_first(), tree.root().link()) {
            (Some((first, rest)), Some(root)) if first == root => rest,
            _ => chain,
        }
    }

    /// Splice staged fragments into the tree, skipping nodes already materialized.
    fn commit(&self, staged: Vec<(TreePath, Fragment)>) -> Result<(), TreeError> {
        if staged.is_empty() {
            return Ok(());
        }

        let mut tree = self.tree.borrow_mut();
        for (path, fragment) in staged {
            if tree.is_deferred(&path)? {
                tree.materialize(&path, fragment.to_vec())
                    .expect("node was just observed as deferred");
            }
        }
        Ok(())
    }
}

/// Index of the child matching `ancestor`.
///
/// Exact link match first. A fragment-qualified ref otherwise matches the
/// node of its page, since in-page anchors are not tree nodes. Duplicates
/// resolve to the first child in document order.
fn find_child(children: &[TreeNode], ancestor: &PageRef) -> Option<usize> {
    children
        .iter()
        .position(|child| child.link() == Some(ancestor))
        .or_else(|| {
            ancestor.fragment()?;
            let page = ancestor.page();
            children.iter().position(|child| {
                child
                    .link()
                    .is_some_and(|link| link.fragment().is_none() && link.page() == page)
            })
        })
}
