//! CLI error types.

use navtree_config::ConfigError;
use navtree_engine::{ResolveError, TreeError};
use navtree_source::DataError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Data(#[from] DataError),

    #[error("{0}")]
    Resolve(#[from] ResolveError),

    #[error("{0}")]
    Tree(#[from] TreeError),

    #[error("{0}")]
    Validation(String),
}
