//! Anchor index for deep links.
//!
//! Maps every known [`PageRef`] to the chain of refs leading to it from the
//! tree root. Chains are expressed in refs, not node references, so the
//! index stays valid while the tree materializes deferred subtrees.
//!
//! The index is built once and never mutated. Entries come from two places:
//! - the explicit anchor table shipped with the navigation data
//! - the already-inline portion of the tree (every linked node reachable
//!   through linked ancestors)
//!
//! Explicit entries win over derived ones; among duplicates the first in
//! document order wins.

use std::collections::{HashMap, HashSet};

use navtree_source::{AnchorTable, PageRef, TreeNode};

/// Error returned when a ref has no index entry.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Cannot locate page in navigation: {0}")]
pub struct UnknownAnchor(pub PageRef);

/// Chain of refs from the root to an anchor; the last element is the anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnchorEntry {
    chain: Vec<PageRef>,
}

impl AnchorEntry {
    fn new(chain: Vec<PageRef>) -> Self {
        debug_assert!(!chain.is_empty(), "anchor entries are never empty");
        Self { chain }
    }

    /// Whole chain, anchor included.
    #[must_use]
    pub fn chain(&self) -> &[PageRef] {
        &self.chain
    }

    /// The anchor itself.
    #[must_use]
    pub fn target(&self) -> &PageRef {
        &self.chain[self.chain.len() - 1]
    }
}

/// Read-only mapping from [`PageRef`] to [`AnchorEntry`].
#[derive(Debug, Default)]
pub struct AnchorIndex {
    entries: HashMap<PageRef, AnchorEntry>,
    bootstrap: Vec<PageRef>,
}

impl AnchorIndex {
    /// Build the index from an explicit table, the inline tree and the
    /// bootstrap list.
    #[must_use]
    pub fn build(root: &TreeNode, table: &AnchorTable, bootstrap: Vec<PageRef>) -> Self {
        let mut entries = HashMap::with_capacity(table.len());

        for (anchor, chain) in table.iter() {
            entries
                .entry(anchor.clone())
                .or_insert_with(|| AnchorEntry::new(chain.to_vec()));
        }

        let mut chain = Vec::new();
        match root.link() {
            Some(link) => {
                chain.push(link.clone());
                entries
                    .entry(link.clone())
                    .or_insert_with(|| AnchorEntry::new(chain.clone()));
                derive_entries(root, &mut chain, &mut entries);
            }
            None => derive_entries(root, &mut chain, &mut entries),
        }

        tracing::debug!(
            anchors = entries.len(),
            explicit = table.len(),
            "Built anchor index"
        );

        Self { entries, bootstrap }
    }

    /// Build an index from the inline tree only.
    #[must_use]
    pub fn from_tree(root: &TreeNode) -> Self {
        Self::build(root, &AnchorTable::new(), Vec::new())
    }

    /// Entry for `anchor`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownAnchor`] if `anchor` was not present when the index was built.
    pub fn resolve(&self, anchor: &PageRef) -> Result<&AnchorEntry, UnknownAnchor> {
        self.entries
            .get(anchor)
            .ok_or_else(|| UnknownAnchor(anchor.clone()))
    }

    /// Entry for `anchor`, falling back to its page when the fragment is unknown.
    ///
    /// Content panes report in-page anchors the generator never indexed;
    /// those still locate their page.
    pub fn resolve_page(&self, anchor: &PageRef) -> Result<&AnchorEntry, UnknownAnchor> {
        if let Some(entry) = self.entries.get(anchor) {
            return Ok(entry);
        }
        if anchor.fragment().is_some()
            && let Some(entry) = self.entries.get(&anchor.without_fragment())
        {
            return Ok(entry);
        }
        Err(UnknownAnchor(anchor.clone()))
    }

    /// True if `anchor` has an entry.
    #[must_use]
    pub fn contains(&self, anchor: &PageRef) -> bool {
        self.entries.contains_key(anchor)
    }

    /// All indexed anchors, in no particular order.
    pub fn anchors(&self) -> impl Iterator<Item = &PageRef> {
        self.entries.keys()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the index has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bootstrap order of deep links.
    #[must_use]
    pub fn bootstrap(&self) -> &[PageRef] {
        &self.bootstrap
    }

    /// First and last bootstrap refs, used as smoke-test anchors.
    #[must_use]
    pub fn smoke_anchors(&self) -> Option<(&PageRef, &PageRef)> {
        Some((self.bootstrap.first()?, self.bootstrap.last()?))
    }
}

/// Pre-order walk over inline children; linkless nodes end their branch.
///
/// A sibling repeating an earlier sibling's link is skipped with its
/// subtree: a chain through it would resolve to the first one.
fn derive_entries(
    node: &TreeNode,
    chain: &mut Vec<PageRef>,
    entries: &mut HashMap<PageRef, AnchorEntry>,
) {
    let Some(children) = node.inline_children() else {
        return;
    };

    let mut siblings: HashSet<&PageRef> = HashSet::new();
    for child in children {
        let Some(link) = child.link() else {
            continue;
        };
        if !siblings.insert(link) {
            tracing::debug!(link = %link, "Skipping duplicate sibling link");
            continue;
        }
        chain.push(link.clone());
        entries
            .entry(link.clone())
            .or_insert_with(|| AnchorEntry::new(chain.clone()));
        derive_entries(child, chain, entries);
        chain.pop();
    }
}
