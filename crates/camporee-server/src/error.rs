//! Error types for the station binary.
//!
//! [`StationError`] wraps every failure mode during startup and serving
//! so `main` can propagate with `?`.

/// Top-level error for the station binary.
#[derive(Debug, thiserror::Error)]
pub enum StationError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: camporee_bracket::config::ConfigError,
    },

    /// Opening the data directory, queue or roster failed.
    #[error("storage error: {source}")]
    Storage {
        /// The underlying storage error.
        #[from]
        source: camporee_db::DbError,
    },

    /// The HTTP server failed to bind or serve.
    #[error("server error: {source}")]
    Server {
        /// The underlying server error.
        #[from]
        source: camporee_observer::ServerError,
    },
}
