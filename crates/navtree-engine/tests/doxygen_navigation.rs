//! Integration tests over Doxygen-generated navigation data.
//!
//! The fixtures mirror the layout Doxygen writes into `html/`:
//! - `navtreedata.js` with the root tree, the bootstrap index and the toggle labels
//! - `files_dup.js` and `trackle__interface_8h.js` loaded on demand
//! - `anchors.json`, the sidecar anchor table for deferred content

use std::path::{Path, PathBuf};
use std::rc::Rc;

use navtree_engine::{
    Engine, EngineConfig, FileSyncStore, InboundOutcome, NullSyncStore, PaneCommand, SyncMode,
    SyncStore,
};
use navtree_source::{AnchorTable, FsFragmentSource, NavData, PageRef};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc::{self, UnboundedReceiver};

const NEW_TRACKLE: &str = "trackle__interface_8h.html#a96dfff146ace7bca4fee1abb29fb2898";
const TRACKLE_CONNECT: &str = "trackle__interface_8h.html#ac061d145bf0e1ff4acadc07fbecfd644";

fn fixtures() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/html")
}

fn load_data() -> NavData {
    let dir = fixtures();
    let anchors = AnchorTable::load(&dir.join("anchors.json")).unwrap();
    NavData::load(&dir.join("navtreedata.js"))
        .unwrap()
        .with_anchors(anchors)
}

fn engine_with_store(store: Box<dyn SyncStore>) -> (Engine, UnboundedReceiver<PaneCommand>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let engine = Engine::new(
        load_data(),
        Rc::new(FsFragmentSource::new(fixtures())),
        EngineConfig::default(),
        store,
        tx,
    );
    (engine, rx)
}

fn engine() -> (Engine, UnboundedReceiver<PaneCommand>) {
    engine_with_store(Box::new(NullSyncStore))
}

#[tokio::test]
async fn test_smoke_anchors_resolve() {
    let (engine, _rx) = engine();
    let (first, last) = engine.anchor_index().smoke_anchors().unwrap();
    let (first, last) = (first.clone(), last.clone());

    let first_path = engine.plan(&first).await.unwrap();
    let last_path = engine.plan(&last).await.unwrap();

    assert_eq!(first_path, vec![1]);
    assert_eq!(last_path, vec![2, 0, 1, 4]);
    assert_eq!(
        engine.labels(&last_path).unwrap(),
        vec![
            "Trackle library v4",
            "Files",
            "File List",
            "trackle_interface.h",
            "newTrackle"
        ]
    );
}

#[tokio::test]
async fn test_every_anchor_reaches_its_node() {
    let (engine, _rx) = engine();
    let mut anchors: Vec<PageRef> = engine.anchor_index().anchors().cloned().collect();
    anchors.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    for anchor in anchors {
        let path = engine.plan(&anchor).await.unwrap();
        let tree = engine.tree();
        assert_eq!(tree.child_at(&path).unwrap().link(), Some(&anchor), "{anchor}");
    }
}

#[tokio::test]
async fn test_shared_deferred_ancestors_load_once() {
    let (engine, _rx) = engine();

    engine.plan(&NEW_TRACKLE.into()).await.unwrap();
    assert_eq!(engine.loader().fetch_count(), 2);

    engine.plan(&"trackle_8h.html".into()).await.unwrap();
    engine.plan(&TRACKLE_CONNECT.into()).await.unwrap();

    assert_eq!(engine.loader().fetch_count(), 2);
    assert_eq!(engine.tree().deferred_count(), 1);
}

#[tokio::test]
async fn test_concurrent_plans_share_fetches() {
    let (engine, _rx) = engine();

    let new_trackle = PageRef::new(NEW_TRACKLE);
    let trackle_connect = PageRef::new(TRACKLE_CONNECT);

    let (first, second) = tokio::join!(engine.plan(&new_trackle), engine.plan(&trackle_connect));

    assert_eq!(first.unwrap(), vec![2, 0, 1, 4]);
    assert_eq!(second.unwrap(), vec![2, 0, 1, 5]);
    assert_eq!(engine.loader().fetch_count(), 2);
}

#[tokio::test]
async fn test_content_navigation_to_unindexed_member_reveals_file() {
    let (engine, mut rx) = engine();

    let outcome = engine
        .on_content_navigated(&"trackle__interface_8h.html#details".into())
        .await
        .unwrap();

    assert_eq!(outcome, InboundOutcome::Revealed(vec![2, 0, 1]));
    let expanded: Vec<_> = engine.expanded().into_iter().collect();
    assert_eq!(expanded, vec![vec![], vec![2], vec![2, 0]]);
    assert_eq!(rx.try_recv().unwrap(), PaneCommand::Reveal(vec![2, 0, 1]));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_unknown_page_leaves_tree_unchanged() {
    let (engine, _rx) = engine();
    let before = engine.tree_snapshot();

    let err = engine
        .on_content_navigated(&"trackle_8cpp.html".into())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Cannot locate page in navigation: trackle_8cpp.html"
    );
    assert_eq!(engine.tree_snapshot(), before);
}

#[tokio::test]
async fn test_expand_missing_fragment_reports_handle() {
    let (engine, _rx) = engine();

    let err = engine.expand(&[1, 0]).await.unwrap_err();

    assert!(err.to_string().contains("annotated_dup"), "{err}");
    assert!(engine.tree().is_deferred(&[1, 0]).unwrap());
}

#[test]
fn test_toggle_labels_come_from_navtreedata() {
    let (engine, _rx) = engine();

    assert_eq!(engine.toggle_label(), "click to disable panel synchronisation");
    engine.toggle_sync();
    assert_eq!(engine.toggle_label(), "click to enable panel synchronisation");
}

#[test]
fn test_sync_state_survives_restart() {
    let temp_dir = tempfile::tempdir().unwrap();
    let state_dir = temp_dir.path().join(".navtree");

    let (engine, _rx) = engine_with_store(Box::new(FileSyncStore::new(&state_dir)));
    assert_eq!(engine.toggle_sync(), SyncMode::Unlinked);
    drop(engine);

    let (engine, _rx) = engine_with_store(Box::new(FileSyncStore::new(&state_dir)));
    assert_eq!(engine.sync_state(), SyncMode::Unlinked);
}
