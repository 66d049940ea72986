//! Error types for strata operations.
//!
//! Parse failures and corrupted ledger lines are not errors: they surface as
//! findings and as `invalid` counts respectively. What remains here is what a
//! caller genuinely has to handle.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StrataError {
    #[error("config error in {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error("ledger key missing: set the {var} environment variable")]
    MissingKey { var: String },

    #[error("parser setup failed: {0}")]
    Parser(String),

    #[error("snapshot not found: {id}")]
    SnapshotNotFound { id: String },

    #[error("snapshot already recorded: {id}")]
    SnapshotExists { id: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StrataError>;
