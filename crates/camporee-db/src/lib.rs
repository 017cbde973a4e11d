//! On-disk storage for a Camporee scoring station.
//!
//! Everything lives under one data directory:
//!
//! ```text
//! <data_dir>/
//!     brackets/<game_id>.json   one bracket document per game
//!     queue.json                local score queue with synced flags
//! ```
//!
//! Writes go through a temp file and a rename, so a crash never leaves a
//! half-written document behind.
//!
//! # Modules
//!
//! - [`bracket_store`] -- [`FileBracketStore`], the per-game documents
//! - [`score_queue`] -- [`FileScoreQueue`], the local submission queue
//! - [`roster`] -- Roster file loading
//! - [`fs`] -- Atomic write helpers
//! - [`error`] -- Shared error types

pub mod bracket_store;
pub mod error;
pub mod fs;
pub mod roster;
pub mod score_queue;

// Re-export primary types for convenience.
pub use bracket_store::FileBracketStore;
pub use error::DbError;
pub use roster::load_roster;
pub use score_queue::FileScoreQueue;
