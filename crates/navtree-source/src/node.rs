//! Navigation tree node types.
//!
//! A [`TreeNode`] is one entry of the navigation hierarchy. Its children are a
//! tagged variant: a leaf, an already materialized list, or a deferred
//! reference to a fragment that has not been loaded yet. Only the deferred
//! variant carries a [`SubtreeHandle`], and only nodes with a link can be
//! deferred.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of a documentation page or in-page anchor.
///
/// The value is a page name optionally followed by `#fragment`
/// (e.g. `"files.html"`, `"trackle_8cpp.html#ae3a1180a59c8f32f493ad0dc22106245"`).
/// Equality is exact-string: refs that differ only by fragment are distinct.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRef(String);

impl PageRef {
    /// Create a page ref from its string form.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Full string form, fragment included.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Page part (everything before `#`).
    #[must_use]
    pub fn page(&self) -> &str {
        self.0.split_once('#').map_or(self.0.as_str(), |(page, _)| page)
    }

    /// In-page fragment, if any.
    #[must_use]
    pub fn fragment(&self) -> Option<&str> {
        self.0.split_once('#').map(|(_, fragment)| fragment)
    }

    /// Same ref without its fragment.
    #[must_use]
    pub fn without_fragment(&self) -> Self {
        Self(self.page().to_owned())
    }
}

impl fmt::Display for PageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PageRef {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Opaque key of an unloaded subtree fragment.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtreeHandle(String);

impl SubtreeHandle {
    /// Create a handle from an explicit key.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Derive a handle from a node link: page part without the `.html` extension.
    ///
    /// `files.html` becomes `files`, `a_8h.html#details` becomes `a_8h`.
    #[must_use]
    pub fn from_link(link: &PageRef) -> Self {
        let page = link.page();
        Self(page.strip_suffix(".html").unwrap_or(page).to_owned())
    }

    /// Key as string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubtreeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Children of a [`TreeNode`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeChildren {
    /// Leaf node.
    None,
    /// Materialized children in display order.
    Inline(Vec<TreeNode>),
    /// Fragment not loaded yet.
    Deferred(SubtreeHandle),
}

/// Entry of the navigation tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeNode {
    label: String,
    link: Option<PageRef>,
    children: NodeChildren,
}

impl TreeNode {
    /// Create a leaf node.
    #[must_use]
    pub fn leaf(label: impl Into<String>, link: Option<PageRef>) -> Self {
        Self {
            label: label.into(),
            link,
            children: NodeChildren::None,
        }
    }

    /// Create a node with materialized children.
    #[must_use]
    pub fn inline(label: impl Into<String>, link: Option<PageRef>, children: Vec<TreeNode>) -> Self {
        Self {
            label: label.into(),
            link,
            children: NodeChildren::Inline(children),
        }
    }

    /// Create a deferred node.
    ///
    /// A deferred node always has a link; the handle is usually derived from
    /// it (see [`SubtreeHandle::from_link`]) but generators may name it
    /// explicitly.
    #[must_use]
    pub fn deferred(label: impl Into<String>, link: PageRef, handle: SubtreeHandle) -> Self {
        Self {
            label: label.into(),
            link: Some(link),
            children: NodeChildren::Deferred(handle),
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Target page, if the node is linked.
    #[must_use]
    pub fn link(&self) -> Option<&PageRef> {
        self.link.as_ref()
    }

    /// Children variant.
    #[must_use]
    pub fn children(&self) -> &NodeChildren {
        &self.children
    }

    /// Materialized children, `None` for leaves and deferred nodes.
    #[must_use]
    pub fn inline_children(&self) -> Option<&[TreeNode]> {
        match &self.children {
            NodeChildren::Inline(children) => Some(children),
            NodeChildren::None | NodeChildren::Deferred(_) => None,
        }
    }

    pub(crate) fn inline_children_mut(&mut self) -> Option<&mut Vec<TreeNode>> {
        match &mut self.children {
            NodeChildren::Inline(children) => Some(children),
            NodeChildren::None | NodeChildren::Deferred(_) => None,
        }
    }

    /// Handle of the unloaded fragment, if the node is deferred.
    #[must_use]
    pub fn deferred_handle(&self) -> Option<&SubtreeHandle> {
        match &self.children {
            NodeChildren::Deferred(handle) => Some(handle),
            NodeChildren::None | NodeChildren::Inline(_) => None,
        }
    }

    /// True if the children have not been loaded yet.
    #[must_use]
    pub fn is_deferred(&self) -> bool {
        matches!(self.children, NodeChildren::Deferred(_))
    }

    /// Child at `index` among materialized children.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&TreeNode> {
        self.inline_children()?.get(index)
    }

    /// Mutable child at `index` among materialized children.
    #[must_use]
    pub fn child_mut(&mut self, index: usize) -> Option<&mut TreeNode> {
        self.inline_children_mut()?.get_mut(index)
    }

    /// Replace deferred children with materialized ones.
    ///
    /// Returns `false` and leaves the node untouched if it is not deferred.
    pub fn materialize(&mut self, children: Vec<TreeNode>) -> bool {
        if !self.is_deferred() {
            return false;
        }
        self.children = NodeChildren::Inline(children);
        true
    }

    /// Number of deferred nodes in this subtree, the node itself included.
    #[must_use]
    pub fn deferred_count(&self) -> usize {
        match &self.children {
            NodeChildren::None => 0,
            NodeChildren::Deferred(_) => 1,
            NodeChildren::Inline(children) => children.iter().map(Self::deferred_count).sum(),
        }
    }
}
