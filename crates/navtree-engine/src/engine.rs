//! Engine facade.
//!
//! [`Engine`] owns the tree, the anchor index, the loader and the
//! synchronizer, and exposes the operations the panes and the toggle control
//! call. All state sits behind `RefCell`s borrowed only between await points,
//! so several navigations may be in flight on one event loop.

use std::cell::{Ref, RefCell};
use std::collections::BTreeSet;
use std::rc::Rc;

use navtree_source::{FragmentSource, NavData, NodeChildren, PageRef};
use tokio::sync::mpsc::UnboundedSender;

use crate::anchor_index::AnchorIndex;
use crate::loader::LazyLoader;
use crate::resolver::{ResolveError, Resolver};
use crate::sync::{InboundOutcome, PaneCommand, SyncMode, Synchronizer, ToggleLabels};
use crate::sync_store::SyncStore;
use crate::tree::{TreeError, TreeModel, TreePath};

/// Engine settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Initial sync state when the store holds none.
    pub sync_enabled: bool,
    /// Overrides the "disable synchronisation" label.
    pub on_message: Option<String>,
    /// Overrides the "enable synchronisation" label.
    pub off_message: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_enabled: true,
            on_message: None,
            off_message: None,
        }
    }
}

/// Navigation tree resolution and synchronization engine.
pub struct Engine {
    tree: RefCell<TreeModel>,
    index: AnchorIndex,
    loader: LazyLoader,
    sync: RefCell<Synchronizer>,
    store: Box<dyn SyncStore>,
}

impl Engine {
    /// Create an engine for `data`, loading fragments from `source`.
    ///
    /// The initial sync state comes from `store`, falling back to the config.
    /// Toggle labels come from the config, then `data`, then the defaults.
    #[must_use]
    pub fn new(
        data: NavData,
        source: Rc<dyn FragmentSource>,
        config: EngineConfig,
        store: Box<dyn SyncStore>,
        commands: UnboundedSender<PaneCommand>,
    ) -> Self {
        let NavData {
            root,
            bootstrap,
            anchors,
            sync_on_message,
            sync_off_message,
        } = data;

        let defaults = ToggleLabels::default();
        let labels = ToggleLabels {
            on_message: config
                .on_message
                .or(sync_on_message)
                .unwrap_or(defaults.on_message),
            off_message: config
                .off_message
                .or(sync_off_message)
                .unwrap_or(defaults.off_message),
        };
        let mode = SyncMode::from_enabled(store.get().unwrap_or(config.sync_enabled));

        let index = AnchorIndex::build(&root, &anchors, bootstrap);
        tracing::debug!(
            anchors = index.len(),
            deferred = root.deferred_count(),
            mode = %mode,
            "Created navigation engine"
        );

        Self {
            tree: RefCell::new(TreeModel::new(root)),
            index,
            loader: LazyLoader::new(source),
            sync: RefCell::new(Synchronizer::new(mode, labels, commands)),
            store,
        }
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.tree, &self.index, &self.loader)
    }

    /// Path of the node for `anchor`, loading deferred subtrees as needed.
    ///
    /// Leaves selection and expansion alone.
    ///
    /// # Errors
    ///
    /// See [`Resolver::plan`].
    pub async fn plan(&self, anchor: &PageRef) -> Result<TreePath, ResolveError> {
        self.resolver().plan(anchor).await
    }

    /// Like [`plan`](Self::plan), but an unindexed in-page anchor locates its page.
    pub async fn plan_page(&self, anchor: &PageRef) -> Result<TreePath, ResolveError> {
        self.resolver().plan_page(anchor).await
    }

    /// Open a deep link: reveal the node in any mode and, when linked, display the page.
    pub async fn navigate_to(&self, anchor: &PageRef) -> Result<InboundOutcome, ResolveError> {
        let generation = self.sync.borrow_mut().begin_navigation();
        let path = self.resolver().plan(anchor).await?;
        Ok(self
            .sync
            .borrow_mut()
            .complete_deep_link(generation, anchor, path))
    }

    /// The content pane navigated to `anchor`.
    ///
    /// Ignored while unlinked. Otherwise the node is located and revealed,
    /// unless a newer navigation started meanwhile.
    ///
    /// # Errors
    ///
    /// Returns the resolution error after logging it; selection and
    /// expansion are unchanged.
    pub async fn on_content_navigated(
        &self,
        anchor: &PageRef,
    ) -> Result<InboundOutcome, ResolveError> {
        let generation = {
            let mut sync = self.sync.borrow_mut();
            if !sync.mode().is_linked() {
                tracing::debug!(anchor = %anchor, "Ignoring content navigation, sync disabled");
                return Ok(InboundOutcome::Ignored);
            }
            sync.begin_navigation()
        };

        let path = match self.resolver().plan_page(anchor).await {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(anchor = %anchor, error = %err, "Dropped content navigation");
                return Err(err);
            }
        };

        let outcome = self.sync.borrow_mut().complete_inbound(generation, path);
        if outcome == InboundOutcome::Superseded {
            tracing::debug!(anchor = %anchor, "Content navigation superseded");
        }
        Ok(outcome)
    }

    /// The user selected the node at `path` in the tree pane.
    ///
    /// # Errors
    ///
    /// Returns [`TreeError::PathNotFound`] if there is no node at `path`.
    pub fn select(&self, path: &[usize]) -> Result<(), TreeError> {
        let link = self.tree.borrow().child_at(path)?.link().cloned();
        self.sync
            .borrow_mut()
            .on_tree_selected(path.to_vec(), link.as_ref());
        Ok(())
    }

    /// The user expanded the node at `path`; deferred children are loaded first.
    ///
    /// Expanding a leaf changes nothing.
    pub async fn expand(&self, path: &[usize]) -> Result<(), ResolveError> {
        self.resolver().materialize_at(path).await?;
        if matches!(self.tree.borrow().child_at(path)?.children(), NodeChildren::None) {
            tracing::debug!(path = ?path, "Ignoring expansion of leaf node");
            return Ok(());
        }
        self.sync.borrow_mut().expand(path.to_vec());
        Ok(())
    }

    /// The user collapsed the node at `path`.
    pub fn collapse(&self, path: &[usize]) -> bool {
        self.sync.borrow_mut().collapse(path)
    }

    /// Flip the sync toggle and persist the new state.
    pub fn toggle_sync(&self) -> SyncMode {
        let mode = self.sync.borrow_mut().toggle();
        self.store.set(mode.is_linked());
        tracing::info!(mode = %mode, "Toggled panel synchronisation");
        mode
    }

    /// Current sync state.
    #[must_use]
    pub fn sync_state(&self) -> SyncMode {
        self.sync.borrow().mode()
    }

    /// Label of the toggle control in the current state.
    #[must_use]
    pub fn toggle_label(&self) -> String {
        self.sync.borrow().toggle_label().to_owned()
    }

    /// Selected node.
    #[must_use]
    pub fn selection(&self) -> Option<TreePath> {
        self.sync.borrow().selection().map(<[usize]>::to_vec)
    }

    /// Expanded nodes.
    #[must_use]
    pub fn expanded(&self) -> BTreeSet<TreePath> {
        self.sync.borrow().expanded().clone()
    }

    /// Borrow the tree.
    ///
    /// Do not hold the guard across an await point.
    pub fn tree(&self) -> Ref<'_, TreeModel> {
        self.tree.borrow()
    }

    /// Copy of the tree in its current state.
    #[must_use]
    pub fn tree_snapshot(&self) -> TreeModel {
        self.tree.borrow().clone()
    }

    /// Labels from the root down to the node at `path`.
    pub fn labels(&self, path: &[usize]) -> Result<Vec<String>, TreeError> {
        let tree = self.tree.borrow();
        Ok(tree
            .labels(path)?
            .into_iter()
            .map(str::to_owned)
            .collect())
    }

    /// Anchor index.
    #[must_use]
    pub fn anchor_index(&self) -> &AnchorIndex {
        &self.index
    }

    /// Fragment loader.
    #[must_use]
    pub fn loader(&self) -> &LazyLoader {
        &self.loader
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("anchors", &self.index.len())
            .field("loader", &self.loader)
            .field("sync", &self.sync.borrow().mode())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use navtree_source::{AnchorTable, MockFragmentSource, SubtreeHandle, TreeNode};
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    use super::*;
    use crate::anchor_index::UnknownAnchor;
    use crate::sync::{DEFAULT_SYNC_OFF_MESSAGE, DEFAULT_SYNC_ON_MESSAGE};
    use crate::sync_store::NullSyncStore;

    /// Store recording writes, seeded with an optional value.
    struct MemorySyncStore {
        value: Cell<Option<bool>>,
    }

    impl SyncStore for MemorySyncStore {
        fn get(&self) -> Option<bool> {
            self.value.get()
        }

        fn set(&self, enabled: bool) {
            self.value.set(Some(enabled));
        }
    }

    fn nav_data() -> NavData {
        let mut anchors = AnchorTable::new();
        anchors
            .insert(
                "a_h".into(),
                vec!["index.html".into(), "files.html".into(), "a_h".into()],
            )
            .unwrap();
        anchors
            .insert(
                "ghost".into(),
                vec!["index.html".into(), "files.html".into(), "ghost".into()],
            )
            .unwrap();

        NavData {
            root: TreeNode::inline(
                "Manual",
                Some("index.html".into()),
                vec![
                    TreeNode::deferred("Files", "files.html".into(), SubtreeHandle::new("F1")),
                    TreeNode::leaf("Deprecated List", Some("deprecated.html".into())),
                ],
            ),
            bootstrap: vec!["index.html".into(), "a_h".into()],
            anchors,
            sync_on_message: None,
            sync_off_message: None,
        }
    }

    fn source() -> MockFragmentSource {
        MockFragmentSource::new()
            .with_fragment("F1", vec![TreeNode::leaf("a.h", Some("a_h".into()))])
    }

    fn engine_with(
        source: MockFragmentSource,
        config: EngineConfig,
        store: Box<dyn SyncStore>,
    ) -> (Engine, Rc<MockFragmentSource>, UnboundedReceiver<PaneCommand>) {
        let source = Rc::new(source);
        let (tx, rx) = mpsc::unbounded_channel();
        let engine = Engine::new(
            nav_data(),
            Rc::clone(&source) as Rc<dyn FragmentSource>,
            config,
            store,
            tx,
        );
        (engine, source, rx)
    }

    fn engine() -> (Engine, Rc<MockFragmentSource>, UnboundedReceiver<PaneCommand>) {
        engine_with(source(), EngineConfig::default(), Box::new(NullSyncStore))
    }

    fn drain(rx: &mut UnboundedReceiver<PaneCommand>) -> Vec<PaneCommand> {
        let mut commands = Vec::new();
        while let Ok(command) = rx.try_recv() {
            commands.push(command);
        }
        commands
    }

    #[tokio::test]
    async fn test_content_navigation_reveals_node() {
        let (engine, source, mut rx) = engine();

        let outcome = engine.on_content_navigated(&"a_h".into()).await.unwrap();

        assert_eq!(outcome, InboundOutcome::Revealed(vec![0, 0]));
        assert_eq!(source.fetch_count(&SubtreeHandle::new("F1")), 1);
        {
            let tree = engine.tree();
            let files = tree.child_at(&[0]).unwrap();
            assert!(!files.is_deferred());
            assert_eq!(files.inline_children().unwrap().len(), 1);
            assert_eq!(tree.child_at(&[0, 0]).unwrap().label(), "a.h");
        }
        assert_eq!(engine.selection(), Some(vec![0, 0]));
        assert!(engine.expanded().contains(&vec![0]));
        assert_eq!(engine.sync_state(), SyncMode::Linked);
        assert_eq!(drain(&mut rx), vec![PaneCommand::Reveal(vec![0, 0])]);
    }

    #[tokio::test]
    async fn test_content_navigation_ignored_when_unlinked() {
        let (engine, source, mut rx) = engine();
        engine.toggle_sync();
        let before = engine.tree_snapshot();

        let outcome = engine.on_content_navigated(&"a_h".into()).await.unwrap();

        assert_eq!(outcome, InboundOutcome::Ignored);
        assert_eq!(engine.selection(), None);
        assert!(engine.expanded().is_empty());
        assert_eq!(engine.tree_snapshot(), before);
        assert!(source.calls().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_content_navigation_error_keeps_selection() {
        let (engine, _source, mut rx) = engine();
        engine.select(&[1]).unwrap();
        drain(&mut rx);

        let err = engine.on_content_navigated(&"nowhere.html".into()).await.unwrap_err();

        assert_eq!(err, ResolveError::UnknownAnchor(UnknownAnchor("nowhere.html".into())));
        assert_eq!(engine.selection(), Some(vec![1]));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_content_navigation_unresolved_ancestor() {
        let (engine, _source, _rx) = engine();
        let before = engine.tree_snapshot();

        let err = engine.on_content_navigated(&"ghost".into()).await.unwrap_err();

        assert!(matches!(err, ResolveError::UnresolvedAncestor { .. }));
        assert_eq!(engine.tree_snapshot(), before);
        assert!(engine.loader().is_cached(&SubtreeHandle::new("F1")));
    }

    #[tokio::test]
    async fn test_content_navigation_with_unknown_fragment_reveals_page() {
        let (engine, _source, _rx) = engine();

        let outcome = engine
            .on_content_navigated(&"deprecated.html#details".into())
            .await
            .unwrap();

        assert_eq!(outcome, InboundOutcome::Revealed(vec![1]));
    }

    #[tokio::test]
    async fn test_last_navigation_wins() {
        let (engine, _source, _rx) = engine_with(
            source().with_latency(3),
            EngineConfig::default(),
            Box::new(NullSyncStore),
        );

        let slow_ref = PageRef::new("a_h");
        let fast_ref = PageRef::new("deprecated.html");

        let (slow, fast) = tokio::join!(
            engine.on_content_navigated(&slow_ref),
            engine.on_content_navigated(&fast_ref)
        );

        assert_eq!(slow.unwrap(), InboundOutcome::Superseded);
        assert_eq!(fast.unwrap(), InboundOutcome::Revealed(vec![1]));
        assert_eq!(engine.selection(), Some(vec![1]));
        // Superseded plans still commit their fragments.
        assert!(!engine.tree().is_deferred(&[0]).unwrap());
    }

    #[tokio::test]
    async fn test_tree_selection_supersedes_content_navigation() {
        let (engine, _source, _rx) = engine_with(
            source().with_latency(3),
            EngineConfig::default(),
            Box::new(NullSyncStore),
        );

        let anchor = PageRef::new("a_h");

        let (navigated, ()) = tokio::join!(engine.on_content_navigated(&anchor), async {
            tokio::task::yield_now().await;
            engine.select(&[1]).unwrap();
        });

        assert_eq!(navigated.unwrap(), InboundOutcome::Superseded);
        assert_eq!(engine.selection(), Some(vec![1]));
    }

    #[tokio::test]
    async fn test_navigate_to_reveals_and_displays() {
        let (engine, _source, mut rx) = engine();

        let outcome = engine.navigate_to(&"a_h".into()).await.unwrap();

        assert_eq!(outcome, InboundOutcome::Revealed(vec![0, 0]));
        assert_eq!(
            drain(&mut rx),
            vec![
                PaneCommand::Reveal(vec![0, 0]),
                PaneCommand::Display("a_h".into())
            ]
        );
    }

    #[tokio::test]
    async fn test_navigate_to_reveals_when_unlinked() {
        let (engine, _source, mut rx) = engine();
        engine.toggle_sync();

        engine.navigate_to(&"a_h".into()).await.unwrap();

        assert_eq!(engine.selection(), Some(vec![0, 0]));
        assert_eq!(drain(&mut rx), vec![PaneCommand::Reveal(vec![0, 0])]);
    }

    #[tokio::test]
    async fn test_plan_leaves_view_state_alone() {
        let (engine, _source, mut rx) = engine();

        let path = engine.plan(&"a_h".into()).await.unwrap();

        assert_eq!(path, vec![0, 0]);
        assert_eq!(engine.labels(&path).unwrap(), vec!["Manual", "Files", "a.h"]);
        assert_eq!(engine.selection(), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_select_displays_link() {
        let (engine, _source, mut rx) = engine();

        engine.select(&[1]).unwrap();

        assert_eq!(drain(&mut rx), vec![PaneCommand::Display("deprecated.html".into())]);
    }

    #[test]
    fn test_select_invalid_path() {
        let (engine, _source, _rx) = engine();

        assert_eq!(
            engine.select(&[7]).unwrap_err(),
            TreeError::PathNotFound { path: vec![7] }
        );
        assert_eq!(engine.selection(), None);
    }

    #[tokio::test]
    async fn test_expand_materializes_deferred_node() {
        let (engine, source, mut rx) = engine();

        engine.expand(&[0]).await.unwrap();

        assert!(!engine.tree().is_deferred(&[0]).unwrap());
        assert_eq!(source.fetch_count(&SubtreeHandle::new("F1")), 1);
        assert_eq!(drain(&mut rx), vec![PaneCommand::Expand(vec![0])]);
        assert!(engine.collapse(&[0]));
        assert!(engine.expanded().is_empty());
    }

    #[tokio::test]
    async fn test_expand_leaf_is_noop() {
        let (engine, source, mut rx) = engine();

        engine.expand(&[1]).await.unwrap();

        assert!(engine.expanded().is_empty());
        assert!(drain(&mut rx).is_empty());
        assert!(source.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expand_failure_keeps_node_collapsed() {
        let (engine, _source, mut rx) = engine_with(
            MockFragmentSource::new().with_failure("F1"),
            EngineConfig::default(),
            Box::new(NullSyncStore),
        );

        assert!(matches!(engine.expand(&[0]).await, Err(ResolveError::Load(_))));
        assert!(engine.expanded().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_toggle_persists_state() {
        let (engine, _source, _rx) = engine_with(
            source(),
            EngineConfig::default(),
            Box::new(MemorySyncStore {
                value: Cell::new(None),
            }),
        );

        assert_eq!(engine.toggle_sync(), SyncMode::Unlinked);
        assert_eq!(engine.store.get(), Some(false));
        assert_eq!(engine.toggle_label(), DEFAULT_SYNC_OFF_MESSAGE);
    }

    #[test]
    fn test_stored_state_overrides_config() {
        let (engine, _source, _rx) = engine_with(
            source(),
            EngineConfig::default(),
            Box::new(MemorySyncStore {
                value: Cell::new(Some(false)),
            }),
        );

        assert_eq!(engine.sync_state(), SyncMode::Unlinked);
    }

    #[test]
    fn test_config_sets_initial_state_and_labels() {
        let config = EngineConfig {
            sync_enabled: false,
            on_message: Some("unlink".to_owned()),
            off_message: None,
        };
        let (engine, _source, _rx) = engine_with(source(), config, Box::new(NullSyncStore));

        assert_eq!(engine.sync_state(), SyncMode::Unlinked);
        assert_eq!(engine.toggle_label(), DEFAULT_SYNC_OFF_MESSAGE);
        engine.toggle_sync();
        assert_eq!(engine.toggle_label(), "unlink");
    }

    #[test]
    fn test_labels_from_navigation_data() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut data = nav_data();
        data.sync_on_message = Some("stop following".to_owned());

        let engine = Engine::new(
            data,
            Rc::new(source()),
            EngineConfig::default(),
            Box::new(NullSyncStore),
            tx,
        );

        assert_eq!(engine.toggle_label(), "stop following");
        assert_ne!(engine.toggle_label(), DEFAULT_SYNC_ON_MESSAGE);
    }
}
