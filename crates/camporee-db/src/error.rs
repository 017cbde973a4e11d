//! Error types for the storage layer.
//!
//! All errors are propagated via [`DbError`], which records the file that
//! failed alongside the underlying cause. At the engine boundary they are
//! converted into [`StoreError`].

use std::path::PathBuf;

use camporee_bracket::StoreError;

/// Errors that can occur in the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Reading or writing a file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A game id that cannot be used as a file name.
    #[error("Invalid game id: {0:?}")]
    InvalidGameId(String),
}

impl DbError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Serialization(source) => Self::Serialization(source),
            other @ (DbError::Io { .. } | DbError::InvalidGameId(_)) => Self::Backend {
                message: other.to_string(),
            },
        }
    }
}
