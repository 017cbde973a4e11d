//! HTTP and `WebSocket` surface for a Camporee bracket station.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for every bracket operation (start, heats, byes,
//!   scratches, results, advancement, challenge match, podium review)
//! - **Read endpoints** for the bracket snapshot, the roster and the local
//!   score queue
//! - **`WebSocket` endpoint** (`/ws/brackets`) pushing a change notice
//!   after every successful mutation, so renderers can refetch
//!
//! # Architecture
//!
//! All operations go through one [`DynBracketService`] behind a mutex in
//! [`AppState`]. Bracket mutations are short and synchronous, and a
//! single active editor per bracket is assumed, so one lock is enough.
//! Change notices go out on a [`tokio::sync::broadcast`] channel with
//! lag handling in the `WebSocket` loop.
//!
//! [`DynBracketService`]: camporee_bracket::service::DynBracketService

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, BracketChange, ChangeKind};
