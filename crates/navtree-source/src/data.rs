//! Navigation data loading.
//!
//! Generators describe the navigation tree as nested `[label, link, children]`
//! records, the shape Doxygen emits in `navtreedata.js`:
//!
//! ```json
//! ["Files", "files.html", [
//!     ["File List", "files.html", "files_dup"],
//!     ["Globals", "globals.html", null]
//! ]]
//! ```
//!
//! The third element is `null` for a leaf, an array for materialized children,
//! or a string naming the fragment to load later. An empty string asks for the
//! handle to be derived from the link.
//!
//! Two container formats are accepted: a JSON document (see [`NavData::from_json`])
//! and Doxygen's JavaScript output (see [`NavData::from_doxygen_js`]).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{self, MapAccess};
use serde::{Deserialize, Deserializer};

use crate::doxygen;
use crate::node::{PageRef, SubtreeHandle, TreeNode};

/// Error returned when navigation data cannot be read or violates its invariants.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// File could not be read.
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Malformed JSON (or JSON embedded in JavaScript).
    #[error("Invalid navigation data: {0}")]
    Json(#[from] serde_json::Error),
    /// Doxygen script lacks a required variable.
    #[error("Variable `{0}` not found in navigation script")]
    MissingVariable(String),
    /// File extension is neither `.json` nor `.js`.
    #[error("Unsupported navigation data format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
    /// Tree array has no root record.
    #[error("Navigation tree is empty")]
    EmptyRoot,
    /// Deferred node without a link to derive its handle from.
    #[error("Deferred node '{label}' at {path:?} has no link")]
    DeferredWithoutLink {
        /// Node label.
        label: String,
        /// Index path of the node within its tree or fragment.
        path: Vec<usize>,
    },
    /// Anchor entry with no elements.
    #[error("Anchor entry for {0} is empty")]
    EmptyAnchorEntry(PageRef),
    /// Anchor entry whose last element is not the anchor itself.
    #[error("Anchor entry for {anchor} ends with {last}")]
    AnchorMismatch {
        /// Anchor key.
        anchor: PageRef,
        /// Actual last element of its chain.
        last: PageRef,
    },
}

/// A `[label, link, children]` record as written by the generator.
#[derive(Debug, Deserialize)]
pub(crate) struct RawRecord(String, Option<String>, Option<RawChildren>);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawChildren {
    Inline(Vec<RawRecord>),
    Deferred(String),
}

impl RawRecord {
    /// Convert into a [`TreeNode`], validating deferred links.
    ///
    /// `path` is the index path of this record, used in error messages.
    fn into_node(self, path: &mut Vec<usize>) -> Result<TreeNode, DataError> {
        let Self(label, link, children) = self;
        let link = link.map(PageRef::new);

        match children {
            None => Ok(TreeNode::leaf(label, link)),
            Some(RawChildren::Inline(records)) => {
                let nodes = records_into_nodes(records, path)?;
                Ok(TreeNode::inline(label, link, nodes))
            }
            Some(RawChildren::Deferred(key)) => {
                let Some(link) = link else {
                    return Err(DataError::DeferredWithoutLink {
                        label,
                        path: path.clone(),
                    });
                };
                let handle = if key.is_empty() {
                    SubtreeHandle::from_link(&link)
                } else {
                    SubtreeHandle::new(key)
                };
                Ok(TreeNode::deferred(label, link, handle))
            }
        }
    }
}

fn records_into_nodes(
    records: Vec<RawRecord>,
    path: &mut Vec<usize>,
) -> Result<Vec<TreeNode>, DataError> {
    let mut nodes = Vec::with_capacity(records.len());
    for (idx, record) in records.into_iter().enumerate() {
        path.push(idx);
        let node = record.into_node(path);
        path.pop();
        nodes.push(node?);
    }
    Ok(nodes)
}

/// Parse a fragment: a JSON array of child records.
pub(crate) fn fragment_from_json(json: &str) -> Result<Vec<TreeNode>, DataError> {
    let records: Vec<RawRecord> = serde_json::from_str(json)?;
    records_into_nodes(records, &mut Vec::new())
}

/// Explicit anchor table: anchor → chain of refs from the root to the anchor.
///
/// Entries keep insertion order; lookups are the engine's concern.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnchorTable {
    entries: Vec<(PageRef, Vec<PageRef>)>,
}

impl AnchorTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry after validating its chain.
    ///
    /// The chain must be non-empty and end with the anchor itself.
    pub fn insert(&mut self, anchor: PageRef, chain: Vec<PageRef>) -> Result<(), DataError> {
        let Some(last) = chain.last() else {
            return Err(DataError::EmptyAnchorEntry(anchor));
        };
        if *last != anchor {
            return Err(DataError::AnchorMismatch {
                last: last.clone(),
                anchor,
            });
        }
        self.entries.push((anchor, chain));
        Ok(())
    }

    /// Parse a `{ "anchor": ["ancestor", ..., "anchor"] }` JSON object.
    ///
    /// Entries keep document order, repeated keys included.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let raw: RawAnchors = serde_json::from_str(json)?;
        Self::from_raw(raw)
    }

    /// Load a sidecar anchor table file.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        Self::from_json(&read(path)?)
    }

    fn from_raw(raw: RawAnchors) -> Result<Self, DataError> {
        let mut table = Self::new();
        for (anchor, chain) in raw.0 {
            table.insert(
                PageRef::new(anchor),
                chain.into_iter().map(PageRef::new).collect(),
            )?;
        }
        Ok(table)
    }

    /// Iterate entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&PageRef, &[PageRef])> {
        self.entries
            .iter()
            .map(|(anchor, chain)| (anchor, chain.as_slice()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Anchor object as written, in document order.
#[derive(Default)]
struct RawAnchors(Vec<(String, Vec<String>)>);

impl<'de> Deserialize<'de> for RawAnchors {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct AnchorsVisitor;

        impl<'de> de::Visitor<'de> for AnchorsVisitor {
            type Value = RawAnchors;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object mapping anchors to ancestor chains")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, Vec<String>>()? {
                    entries.push(entry);
                }
                Ok(RawAnchors(entries))
            }
        }

        deserializer.deserialize_map(AnchorsVisitor)
    }
}

/// Navigation data handed to the engine at start.
#[derive(Clone, Debug)]
pub struct NavData {
    /// Root of the navigation tree (possibly with deferred subtrees).
    pub root: TreeNode,
    /// Flat ordered list of refs used to bootstrap deep links.
    ///
    /// The first and last entries are the smoke-test anchors.
    pub bootstrap: Vec<PageRef>,
    /// Explicit anchor table. Anchors of the inline tree are derived by the
    /// engine and need not be listed.
    pub anchors: AnchorTable,
    /// Label of the "disable synchronisation" action, if the generator set one.
    pub sync_on_message: Option<String>,
    /// Label of the "enable synchronisation" action, if the generator set one.
    pub sync_off_message: Option<String>,
}

#[derive(Deserialize)]
struct RawNavData {
    tree: RawRecord,
    #[serde(default)]
    index: Vec<String>,
    #[serde(default)]
    anchors: RawAnchors,
    sync_on_message: Option<String>,
    sync_off_message: Option<String>,
}

impl NavData {
    /// Parse the JSON format.
    ///
    /// ```json
    /// {
    ///     "tree": ["Manual", "index.html", [...]],
    ///     "index": ["annotated.html", "trackle_8cpp.html#ae3a..."],
    ///     "anchors": { "a_h": ["files.html", "a_h"] },
    ///     "sync_on_message": "click to disable panel synchronisation",
    ///     "sync_off_message": "click to enable panel synchronisation"
    /// }
    /// ```
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        let raw: RawNavData = serde_json::from_str(json)?;

        Ok(Self {
            root: raw.tree.into_node(&mut Vec::new())?,
            bootstrap: raw.index.into_iter().map(PageRef::new).collect(),
            anchors: AnchorTable::from_raw(raw.anchors)?,
            sync_on_message: raw.sync_on_message,
            sync_off_message: raw.sync_off_message,
        })
    }

    /// Parse a Doxygen `navtreedata.js` script.
    ///
    /// Reads `NAVTREE` (a single root record), `NAVTREEINDEX` and the optional
    /// `SYNCONMSG` / `SYNCOFFMSG` labels. Doxygen does not emit an anchor
    /// table in this file.
    pub fn from_doxygen_js(script: &str) -> Result<Self, DataError> {
        let tree = doxygen::array_literal(script, "NAVTREE")
            .ok_or_else(|| DataError::MissingVariable("NAVTREE".to_owned()))?;
        let records: Vec<RawRecord> = serde_json::from_str(tree)?;
        let root = records
            .into_iter()
            .next()
            .ok_or(DataError::EmptyRoot)?
            .into_node(&mut Vec::new())?;

        let bootstrap = match doxygen::array_literal(script, "NAVTREEINDEX") {
            Some(index) => serde_json::from_str::<Vec<String>>(index)?
                .into_iter()
                .map(PageRef::new)
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            root,
            bootstrap,
            anchors: AnchorTable::new(),
            sync_on_message: doxygen::string_literal(script, "SYNCONMSG"),
            sync_off_message: doxygen::string_literal(script, "SYNCOFFMSG"),
        })
    }

    /// Load navigation data, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self, DataError> {
        let content = read(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            Some("js") => Self::from_doxygen_js(&content),
            _ => Err(DataError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Append entries of a sidecar anchor table.
    #[must_use]
    pub fn with_anchors(mut self, table: AnchorTable) -> Self {
        self.anchors.entries.extend(table.entries);
        self
    }
}

fn read(path: &Path) -> Result<String, DataError> {
    std::fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })
}
