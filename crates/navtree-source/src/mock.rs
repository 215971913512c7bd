//! Mock fragment source for testing.
//!
//! Provides [`MockFragmentSource`] for unit testing without filesystem access.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::node::{SubtreeHandle, TreeNode};
use crate::source::{ErrorStatus, FragmentSource, SourceError, SourceErrorKind};

const BACKEND: &str = "Mock";

/// Mock fragment source for testing.
///
/// Stores fragments in memory and records every fetch. Use the builder
/// methods to configure the mock with test data.
///
/// # Example
///
/// ```
/// use navtree_source::{MockFragmentSource, SubtreeHandle, TreeNode};
///
/// let source = MockFragmentSource::new()
///     .with_fragment("F1", vec![TreeNode::leaf("a.h", Some("a_h".into()))]);
///
/// assert_eq!(source.fetch_count(&SubtreeHandle::new("F1")), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockFragmentSource {
    fragments: HashMap<SubtreeHandle, Vec<TreeNode>>,
    failing: HashSet<SubtreeHandle>,
    yields: usize,
    calls: RefCell<Vec<SubtreeHandle>>,
    in_flight: Cell<usize>,
}

impl MockFragmentSource {
    /// Create a new empty mock source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fragment for `handle`.
    #[must_use]
    pub fn with_fragment(mut self, handle: impl Into<String>, children: Vec<TreeNode>) -> Self {
        self.fragments.insert(SubtreeHandle::new(handle), children);
        self
    }

    /// Make fetches of `handle` fail as unavailable.
    #[must_use]
    pub fn with_failure(mut self, handle: impl Into<String>) -> Self {
        self.failing.insert(SubtreeHandle::new(handle));
        self
    }

    /// Yield to the event loop `yields` times before answering.
    ///
    /// Keeps a fetch in flight long enough for concurrent callers to
    /// observe it.
    #[must_use]
    pub fn with_latency(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    /// Handles fetched so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<SubtreeHandle> {
        self.calls.borrow().clone()
    }

    /// Number of fetches of `handle`.
    #[must_use]
    pub fn fetch_count(&self, handle: &SubtreeHandle) -> usize {
        self.calls.borrow().iter().filter(|h| *h == handle).count()
    }

    /// Number of fetches started but not finished.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.get()
    }
}

#[async_trait(?Send)]
impl FragmentSource for MockFragmentSource {
    async fn fetch(&self, handle: &SubtreeHandle) -> Result<Vec<TreeNode>, SourceError> {
        self.calls.borrow_mut().push(handle.clone());
        self.in_flight.set(self.in_flight.get() + 1);

        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }

        self.in_flight.set(self.in_flight.get() - 1);

        if self.failing.contains(handle) {
            return Err(SourceError::new(SourceErrorKind::Unavailable)
                .with_status(ErrorStatus::Persistent)
                .with_handle(handle)
                .with_backend(BACKEND));
        }

        self.fragments
            .get(handle)
            .cloned()
            .ok_or_else(|| SourceError::not_found(handle).with_backend(BACKEND))
    }
}
