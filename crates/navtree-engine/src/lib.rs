//! Navigation tree resolution and pane synchronization.
//!
//! The engine keeps a documentation viewer's navigation tree in step with the
//! page shown next to it:
//!
//! - [`TreeModel`]: the hierarchy, with deferred subtrees spliced in on demand
//! - [`AnchorIndex`]: page ref → chain of ancestor refs, built once at start
//! - [`LazyLoader`]: fetches and caches subtree fragments, sharing in-flight fetches
//! - [`Resolver`]: turns a page ref into a tree path, loading what it needs
//! - [`Synchronizer`]: selection, expansion and the link toggle between the panes
//! - [`Engine`]: owns all of the above
//!
//! # Concurrency
//!
//! Everything runs on a single-threaded event loop. Futures are `!Send`;
//! state lives in `RefCell`s that are never borrowed across an await point.
//!
//! # Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use navtree_engine::{Engine, EngineConfig, NullSyncStore, PaneCommand};
//! use navtree_source::{FsFragmentSource, NavData};
//!
//! # tokio_test(async {
//! let data = NavData::from_json(r#"{
//!     "tree": ["Manual", "index.html", [["Deprecated List", "deprecated.html", null]]]
//! }"#).unwrap();
//! let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
//! let engine = Engine::new(
//!     data,
//!     Rc::new(FsFragmentSource::new("html".into())),
//!     EngineConfig::default(),
//!     Box::new(NullSyncStore),
//!     tx,
//! );
//!
//! let path = engine.plan(&"deprecated.html".into()).await.unwrap();
//! assert_eq!(path, vec![0]);
//!
//! engine.select(&path).unwrap();
//! assert_eq!(rx.try_recv().unwrap(), PaneCommand::Display("deprecated.html".into()));
//! # });
//! # fn tokio_test(fut: impl std::future::Future<Output = ()>) {
//! #     tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(fut);
//! # }
//! ```

mod anchor_index;
mod engine;
mod loader;
mod resolver;
mod sync;
mod sync_store;
mod tree;

pub use anchor_index::{AnchorEntry, AnchorIndex, UnknownAnchor};
pub use engine::{Engine, EngineConfig};
pub use loader::{LazyLoader, LoadError};
pub use resolver::{ResolveError, Resolver};
pub use sync::{
    DEFAULT_SYNC_OFF_MESSAGE, DEFAULT_SYNC_ON_MESSAGE, Generation, InboundOutcome, PaneCommand,
    SyncMode, Synchronizer, ToggleLabels,
};
pub use sync_store::{FileSyncStore, NullSyncStore, SyncStore};
pub use tree::{TreeError, TreeModel, TreePath};
