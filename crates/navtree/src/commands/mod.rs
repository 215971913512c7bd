//! CLI command implementations.

pub(crate) mod check;
pub(crate) mod resolve;
pub(crate) mod sync;
pub(crate) mod tree;

use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::Args;
use navtree_config::{CliSettings, Config};
use navtree_engine::{Engine, EngineConfig, FileSyncStore, NullSyncStore, SyncStore};
use navtree_source::{AnchorTable, FsFragmentSource, NavData};
use tokio::sync::mpsc;

use crate::error::CliError;

pub(crate) use check::CheckArgs;
pub(crate) use resolve::ResolveArgs;
pub(crate) use sync::SyncArgs;
pub(crate) use tree::TreeArgs;

/// Arguments shared by every command.
#[derive(Args)]
pub(crate) struct GlobalArgs {
    /// Path to configuration file (default: auto-discover navtree.toml).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Navigation data file, JSON or Doxygen navtreedata.js (overrides config).
    #[arg(short, long, global = true)]
    pub source: Option<PathBuf>,

    /// Enable verbose output (fragment loads and sync changes).
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Load configuration and navigation data, and start an engine.
///
/// Pane commands are discarded: the CLI has no panes to drive.
pub(crate) fn open_engine(args: &GlobalArgs) -> Result<Engine, CliError> {
    let cli_settings = CliSettings {
        source: args.source.clone(),
    };
    let config = Config::load(args.config.as_deref(), Some(&cli_settings))?;
    let data_config = &config.data_resolved;

    let mut data = NavData::load(&data_config.source)?;
    if let Some(anchors) = &data_config.anchors {
        data = data.with_anchors(AnchorTable::load(anchors)?);
    }

    let store: Box<dyn SyncStore> = if config.sync.persist {
        ensure_project_dir(&data_config.project_dir)?;
        Box::new(FileSyncStore::new(&data_config.project_dir))
    } else {
        Box::new(NullSyncStore)
    };

    let engine_config = EngineConfig {
        sync_enabled: config.sync.enabled,
        on_message: config.sync.on_message.clone(),
        off_message: config.sync.off_message.clone(),
    };

    tracing::info!(
        source = %data_config.source.display(),
        fragments = %data_config.fragments_dir.display(),
        "Loaded navigation data"
    );

    let (tx, _rx) = mpsc::unbounded_channel();
    Ok(Engine::new(
        data,
        Rc::new(FsFragmentSource::new(data_config.fragments_dir.clone())),
        engine_config,
        store,
        tx,
    ))
}

/// Ensure the `.navtree/` project directory exists with a `.gitignore`.
fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by navtree\n*\n");
    }

    Ok(())
}

/// Format a tree path as `[2, 0, 1]`.
pub(crate) fn format_path(path: &[usize]) -> String {
    let parts: Vec<String> = path.iter().map(ToString::to_string).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_format_path() {
        assert_eq!(format_path(&[]), "[]");
        assert_eq!(format_path(&[2, 0, 1]), "[2, 0, 1]");
    }

    #[test]
    fn test_ensure_project_dir_writes_gitignore_once() {
        let temp_dir = tempfile::tempdir().unwrap();
        let project_dir = temp_dir.path().join(".navtree");

        ensure_project_dir(&project_dir).unwrap();
        std::fs::write(project_dir.join(".gitignore"), "custom\n").unwrap();
        ensure_project_dir(&project_dir).unwrap();

        let content = std::fs::read_to_string(project_dir.join(".gitignore")).unwrap();
        assert_eq!(content, "custom\n");
    }

    #[test]
    fn test_open_engine_with_explicit_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let html = temp_dir.path().join("html");
        std::fs::create_dir_all(&html).unwrap();
        std::fs::write(
            html.join("navtreedata.js"),
            r#"var NAVTREE = [ [ "Manual", "index.html", [ [ "Files", "files.html", "files_dup" ] ] ] ];"#,
        )
        .unwrap();
        let config_path = temp_dir.path().join("navtree.toml");
        std::fs::write(&config_path, "[sync]\npersist = false\n").unwrap();
        let args = GlobalArgs {
            config: Some(config_path),
            source: None,
            verbose: false,
        };

        let engine = open_engine(&args).unwrap();

        assert_eq!(engine.tree().deferred_count(), 1);
        assert!(!temp_dir.path().join(".navtree").exists());
    }
}
