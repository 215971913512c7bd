//! Configuration management for navtree.
//!
//! Parses `navtree.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ```toml
//! [data]
//! source = "html/navtreedata.js"
//! fragments_dir = "html"
//! anchors = "html/anchors.json"
//!
//! [sync]
//! enabled = true
//! persist = true
//! ```
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `data.source`
//! - `data.fragments_dir`
//! - `data.anchors`
//! - `sync.on_message`
//! - `sync.off_message`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override navigation data file.
    ///
    /// Fragments are then read next to it unless `data.fragments_dir` is set.
    pub source: Option<PathBuf>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "navtree.toml";

/// Default navigation data file, relative to the config directory.
const DEFAULT_SOURCE: &str = "html/navtreedata.js";

/// Project state directory, relative to the config directory.
const PROJECT_DIR: &str = ".navtree";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Navigation data configuration (paths are relative strings from TOML).
    data: DataConfigRaw,
    /// Panel synchronisation configuration.
    pub sync: SyncConfig,

    /// Resolved data configuration (set after loading).
    #[serde(skip)]
    pub data_resolved: DataConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Raw data configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct DataConfigRaw {
    source: Option<String>,
    fragments_dir: Option<String>,
    anchors: Option<String>,
}

/// Resolved navigation data configuration with absolute paths.
#[derive(Debug, Default)]
pub struct DataConfig {
    /// Navigation data file (`.json` or Doxygen `.js`).
    pub source: PathBuf,
    /// Directory holding subtree fragments.
    pub fragments_dir: PathBuf,
    /// Sidecar anchor table.
    pub anchors: Option<PathBuf>,
    /// Project directory for navtree state (.navtree/).
    pub project_dir: PathBuf,
}

/// Panel synchronisation configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Initial state when none was persisted.
    pub enabled: bool,
    /// Remember the toggle in the project directory.
    pub persist: bool,
    /// Label of the action that disables synchronisation.
    pub on_message: Option<String>,
    /// Label of the action that enables synchronisation.
    pub off_message: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            on_message: None,
            off_message: None,
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`data.source`").
        field: String,
        /// Error message (e.g., "${`DOCS_DIR`} not set").
        message: String,
    },
}

/// Require an optional string field to be non-empty when set.
fn require_non_empty(value: Option<&str>, field: &str) -> Result<(), ConfigError> {
    if value.is_some_and(str::is_empty) {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Directory containing `path`, `.` for a bare file name.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `navtree.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist or parsing fails.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(source) = &settings.source {
            self.data_resolved.source.clone_from(source);
            if self.data.fragments_dir.is_none() {
                self.data_resolved.fragments_dir = parent_dir(source);
            }
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        let source = base.join(DEFAULT_SOURCE);
        Self {
            data: DataConfigRaw::default(),
            sync: SyncConfig::default(),
            data_resolved: DataConfig {
                fragments_dir: parent_dir(&source),
                source,
                anchors: None,
                project_dir: base.join(PROJECT_DIR),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_data()?;
        self.validate_sync()?;
        Ok(())
    }

    /// Validate data configuration.
    fn validate_data(&self) -> Result<(), ConfigError> {
        require_non_empty(self.data.source.as_deref(), "data.source")?;
        require_non_empty(self.data.fragments_dir.as_deref(), "data.fragments_dir")?;
        require_non_empty(self.data.anchors.as_deref(), "data.anchors")?;

        let extension = self
            .data_resolved
            .source
            .extension()
            .and_then(|ext| ext.to_str());
        if !matches!(extension, Some("json" | "js")) {
            return Err(ConfigError::Validation(format!(
                "data.source must be a .json or .js file, got {}",
                self.data_resolved.source.display()
            )));
        }

        Ok(())
    }

    /// Validate sync configuration.
    fn validate_sync(&self) -> Result<(), ConfigError> {
        require_non_empty(self.sync.on_message.as_deref(), "sync.on_message")?;
        require_non_empty(self.sync.off_message.as_deref(), "sync.off_message")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        expand::expand_opt(&mut self.data.source, "data.source")?;
        expand::expand_opt(&mut self.data.fragments_dir, "data.fragments_dir")?;
        expand::expand_opt(&mut self.data.anchors, "data.anchors")?;
        expand::expand_opt(&mut self.sync.on_message, "sync.on_message")?;
        expand::expand_opt(&mut self.sync.off_message, "sync.off_message")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let source = config_dir.join(self.data.source.as_deref().unwrap_or(DEFAULT_SOURCE));
        let fragments_dir = match self.data.fragments_dir.as_deref() {
            Some(dir) => config_dir.join(dir),
            None => parent_dir(&source),
        };

        self.data_resolved = DataConfig {
            source,
            fragments_dir,
            anchors: self.data.anchors.as_deref().map(|a| config_dir.join(a)),
            project_dir: config_dir.join(PROJECT_DIR),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));

        assert_eq!(
            config.data_resolved.source,
            PathBuf::from("/test/html/navtreedata.js")
        );
        assert_eq!(config.data_resolved.fragments_dir, PathBuf::from("/test/html"));
        assert_eq!(config.data_resolved.anchors, None);
        assert_eq!(config.data_resolved.project_dir, PathBuf::from("/test/.navtree"));
        assert!(config.sync.enabled);
        assert!(config.sync.persist);
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();

        assert!(config.sync.enabled);
        assert_eq!(config.sync.on_message, None);
    }

    #[test]
    fn test_parse_sync_config() {
        let toml = r#"
[sync]
enabled = false
persist = false
on_message = "unlink panes"
off_message = "link panes"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert!(!config.sync.enabled);
        assert!(!config.sync.persist);
        assert_eq!(config.sync.on_message.as_deref(), Some("unlink panes"));
        assert_eq!(config.sync.off_message.as_deref(), Some("link panes"));
    }

    #[test]
    fn test_parse_unknown_field_is_ignored() {
        let toml = r#"
[data]
source = "docs/nav.json"
theme = "dark"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.data.source.as_deref(), Some("docs/nav.json"));
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[data]
source = "build/html/navtreedata.js"
fragments_dir = "build/fragments"
anchors = "build/anchors.json"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.data_resolved.source,
            PathBuf::from("/project/build/html/navtreedata.js")
        );
        assert_eq!(
            config.data_resolved.fragments_dir,
            PathBuf::from("/project/build/fragments")
        );
        assert_eq!(
            config.data_resolved.anchors,
            Some(PathBuf::from("/project/build/anchors.json"))
        );
        assert_eq!(
            config.data_resolved.project_dir,
            PathBuf::from("/project/.navtree")
        );
    }

    #[test]
    fn test_fragments_dir_defaults_to_source_dir() {
        let toml = r#"
[data]
source = "out/nav.json"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.data_resolved.fragments_dir, PathBuf::from("/project/out"));
    }

    #[test]
    fn test_apply_cli_settings_source() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            source: Some(PathBuf::from("/custom/html/navtreedata.js")),
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(
            config.data_resolved.source,
            PathBuf::from("/custom/html/navtreedata.js")
        );
        assert_eq!(config.data_resolved.fragments_dir, PathBuf::from("/custom/html"));
    }

    #[test]
    fn test_apply_cli_settings_source_keeps_explicit_fragments_dir() {
        let toml = r#"
[data]
fragments_dir = "fragments"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));
        let overrides = CliSettings {
            source: Some(PathBuf::from("nav.json")),
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.data_resolved.source, PathBuf::from("nav.json"));
        assert_eq!(
            config.data_resolved.fragments_dir,
            PathBuf::from("/project/fragments")
        );
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));

        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(
            config.data_resolved.source,
            PathBuf::from("/test/html/navtreedata.js")
        );
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("NAVTREE_TEST_BUILD", "/srv/docs");
        }

        let toml = r#"
[data]
source = "${NAVTREE_TEST_BUILD}/navtreedata.js"
anchors = "${NAVTREE_TEST_ANCHORS:-anchors.json}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.data.source.as_deref(), Some("/srv/docs/navtreedata.js"));
        assert_eq!(config.data.anchors.as_deref(), Some("anchors.json"));

        unsafe {
            std::env::remove_var("NAVTREE_TEST_BUILD");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::remove_var("NAVTREE_TEST_MISSING_LABEL");
        }

        let toml = r#"
[sync]
on_message = "${NAVTREE_TEST_MISSING_LABEL}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("sync.on_message"));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[data]
source = "html/navtreedata.js"

[sync]
enabled = false
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.config_path.as_deref(), Some(path.as_path()));
        assert_eq!(
            config.data_resolved.source,
            temp_dir.path().join("html/navtreedata.js")
        );
        assert!(!config.sync.enabled);
    }

    #[test]
    fn test_load_missing_explicit_file() {
        let err = Config::load(Some(Path::new("/nonexistent/navtree.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[data\nsource = ").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(msg.contains(s), "Expected error to contain '{s}', got: {msg}");
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_source_extension() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.data_resolved.source = PathBuf::from("/test/html/navtree.yaml");
        assert_validation_error(&config, &["data.source", ".json or .js"]);
    }

    #[test]
    fn test_validate_empty_source() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.data.source = Some(String::new());
        assert_validation_error(&config, &["data.source", "empty"]);
    }

    #[test]
    fn test_validate_empty_sync_message() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.sync.off_message = Some(String::new());
        assert_validation_error(&config, &["sync.off_message", "empty"]);
    }
}
