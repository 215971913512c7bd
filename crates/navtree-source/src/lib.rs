//! Navigation data formats and subtree fragment sources for navtree.
//!
//! This crate owns everything the navigation engine reads from the outside
//! world:
//!
//! - **Node types**: [`TreeNode`], [`NodeChildren`], [`PageRef`], [`SubtreeHandle`]
//! - **Navigation data**: [`NavData`], parsed from the JSON format or from a
//!   Doxygen-generated `navtreedata.js`
//! - **Fragment sources**: the [`FragmentSource`] trait, answered lazily when
//!   the engine needs the children of a deferred node
//!
//! # Architecture
//!
//! The crate provides:
//! - [`FsFragmentSource`] reading `<dir>/<handle>.json` or `<dir>/<handle>.js`
//! - [`MockFragmentSource`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```
//! use navtree_source::NavData;
//!
//! let data = NavData::from_json(r#"{
//!     "tree": ["Manual", "index.html", [["Files", "files.html", "files_dup"]]],
//!     "index": ["index.html"]
//! }"#).unwrap();
//!
//! assert_eq!(data.root.label(), "Manual");
//! assert!(data.root.inline_children().unwrap()[0].is_deferred());
//! ```

mod data;
mod doxygen;
mod fs;
#[cfg(feature = "mock")]
mod mock;
mod node;
mod source;

pub use data::{AnchorTable, DataError, NavData};
pub use fs::FsFragmentSource;
#[cfg(feature = "mock")]
pub use mock::MockFragmentSource;
pub use node::{NodeChildren, PageRef, SubtreeHandle, TreeNode};
pub use source::{ErrorStatus, FragmentSource, SourceError, SourceErrorKind};
