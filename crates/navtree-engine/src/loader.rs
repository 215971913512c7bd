//! Lazy loading of subtree fragments.
//!
//! [`LazyLoader`] fetches the children of deferred nodes from a
//! [`FragmentSource`] and caches them by [`SubtreeHandle`] for the lifetime of
//! the engine. The cache entry is created when the fetch starts, not when it
//! finishes, so every caller asking for the same handle while the fetch is in
//! flight awaits the same shared future and the source sees a single request.
//!
//! Failed fetches are evicted: nothing is retried automatically, but the next
//! navigation through the same node fetches again.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures_util::FutureExt;
use futures_util::future::{LocalBoxFuture, Shared};
use navtree_source::{ErrorStatus, FragmentSource, SourceErrorKind, SubtreeHandle, TreeNode};

/// Error returned when a fragment cannot be loaded.
///
/// Cloneable so that every caller sharing a fetch receives it.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("Failed to load subtree {handle}: {message}")]
pub struct LoadError {
    /// Handle that failed.
    pub handle: SubtreeHandle,
    /// Category reported by the source.
    pub kind: SourceErrorKind,
    /// Retry guidance reported by the source.
    pub status: ErrorStatus,
    /// Source error message.
    pub message: String,
}

type Fragment = Rc<[TreeNode]>;
type FetchFuture = Shared<LocalBoxFuture<'static, Result<Fragment, LoadError>>>;

/// Caching loader for subtree fragments.
pub struct LazyLoader {
    source: Rc<dyn FragmentSource>,
    fetches: RefCell<HashMap<SubtreeHandle, FetchFuture>>,
    started: Cell<usize>,
}

impl LazyLoader {
    /// Create a loader backed by `source`.
    #[must_use]
    pub fn new(source: Rc<dyn FragmentSource>) -> Self {
        Self {
            source,
            fetches: RefCell::new(HashMap::new()),
            started: Cell::new(0),
        }
    }

    /// Children stored under `handle`.
    ///
    /// Fetches at most once per handle; concurrent callers share the fetch in
    /// flight.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the source has no fragment for `handle` or
    /// cannot read it.
    pub async fn load(&self, handle: &SubtreeHandle) -> Result<Fragment, LoadError> {
        let fetch = self.fetch_for(handle);
        let result = fetch.clone().await;

        if let Err(err) = &result {
            let mut fetches = self.fetches.borrow_mut();
            if fetches.get(handle).is_some_and(|cached| cached.ptr_eq(&fetch)) {
                fetches.remove(handle);
                tracing::debug!(handle = %handle, error = %err, "Evicted failed fragment fetch");
            }
        }

        result
    }

    /// Cached or in-flight fetch for `handle`, starting one if needed.
    fn fetch_for(&self, handle: &SubtreeHandle) -> FetchFuture {
        let mut fetches = self.fetches.borrow_mut();
        if let Some(fetch) = fetches.get(handle) {
            tracing::debug!(handle = %handle, "Fragment cache hit");
            return fetch.clone();
        }

        tracing::debug!(handle = %handle, "Fetching fragment");
        self.started.set(self.started.get() + 1);

        let source = Rc::clone(&self.source);
        let key = handle.clone();
        let fetch = async move {
            source
                .fetch(&key)
                .await
                .map(Fragment::from)
                .map_err(|err| LoadError {
                    message: err.to_string(),
                    kind: err.kind,
                    status: err.status,
                    handle: key.clone(),
                })
        }
        .boxed_local()
        .shared();

        fetches.insert(handle.clone(), fetch.clone());
        fetch
    }

    /// True if `handle` has a cached or in-flight fetch.
    #[must_use]
    pub fn is_cached(&self, handle: &SubtreeHandle) -> bool {
        self.fetches.borrow().contains_key(handle)
    }

    /// Number of fetches started since creation.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.started.get()
    }
}

impl std::fmt::Debug for LazyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoader")
            .field("cached", &self.fetches.borrow().len())
            .field("started", &self.started.get())
            .finish_non_exhaustive()
    }
}
