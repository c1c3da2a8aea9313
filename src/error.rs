use std::path::PathBuf;

use camino::Utf8PathBuf;
use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum MigrateError {
    #[error("missing config file asset-migrate.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("duplicate mapping for category: {0}")]
    DuplicateMapping(String),

    #[error("source root does not exist: {0}")]
    #[diagnostic(help("run the extraction step first so the ripped tree is present"))]
    MissingSourceRoot(Utf8PathBuf),

    #[error("asset root does not exist: {0}")]
    MissingAssetRoot(Utf8PathBuf),

    #[error("file {file} collides case-insensitively with directory {directory}")]
    CaseCollision {
        file: Utf8PathBuf,
        directory: Utf8PathBuf,
    },

    #[error("failed to move asset {from} to {to}: {message}")]
    MoveAsset {
        from: Utf8PathBuf,
        to: Utf8PathBuf,
        message: String,
    },

    #[error("failed to delete asset {path}: {message}")]
    DeleteAsset { path: Utf8PathBuf, message: String },

    #[error("failed to create folder {name} in {parent}: {message}")]
    CreateFolder {
        parent: Utf8PathBuf,
        name: String,
        message: String,
    },

    #[error("asset not found in store: {0}")]
    UnknownAsset(String),

    #[error("unknown type referenced by manifest: {0}")]
    UnknownType(String),

    #[error("failed to parse asset manifest: {0}")]
    ManifestParse(String),

    #[error("non UTF-8 path: {0}")]
    NonUtf8Path(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

/// One item a batch operation could not process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemFailure {
    pub path: String,
    pub message: String,
}

impl ItemFailure {
    pub fn new(path: impl ToString, error: impl ToString) -> Self {
        Self {
            path: path.to_string(),
            message: error.to_string(),
        }
    }
}
