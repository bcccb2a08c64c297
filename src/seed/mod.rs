//! Seed loaders: the content catalog (JSON) and the user/session
//! snapshots (CSV), parsed into batches of typed rows for the store.

use std::path::PathBuf;
use thiserror::Error;

use crate::store::SqlValue;

pub mod content;
pub mod snapshots;

pub use content::{load_catalog, normalize_catalog};
pub use snapshots::{load_sessions, load_users, SESSIONS_FILE, USERS_FILE};

/// Rows destined for one relation.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedBatch {
    pub relation: &'static str,
    pub columns: &'static [&'static str],
    pub rows: Vec<Vec<SqlValue>>,
}

/// Error type for seed loading.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("seed file not found: {0}")]
    Missing(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },
}
