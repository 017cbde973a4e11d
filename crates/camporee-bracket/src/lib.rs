//! Elimination bracket engine for Camporee game stations.
//!
//! Teams move pool -> heat -> round along a main line; main-line losers
//! feed a consolation line; an optional challenge match settles 2nd and
//! 3rd; the podium merges everything into tie-aware standings that become
//! the game's authoritative scores.
//!
//! # Modules
//!
//! - [`rounds`] -- Pool and heat mutations within a round.
//! - [`advancement`] -- Winner/loser partition and next-round creation.
//! - [`challenge`] -- The runner-up vs consolation-winner match.
//! - [`podium`] -- Standard-ranked standings and operator overrides.
//! - [`submission`] -- Score packets for the external queue.
//! - [`store`] -- [`BracketRepository`] and [`ScoreQueue`] seams.
//! - [`roster`] -- Read-only roster lookup and search.
//! - [`service`] -- [`BracketService`], one entry point per operator action.
//! - [`config`] -- Configuration loading from `camporee-config.yaml`.
//! - [`error`] -- Engine error types.
//!
//! [`BracketRepository`]: store::BracketRepository
//! [`ScoreQueue`]: store::ScoreQueue
//! [`BracketService`]: service::BracketService

pub mod advancement;
pub mod challenge;
pub mod config;
pub mod error;
pub mod podium;
pub mod roster;
pub mod rounds;
pub mod service;
pub mod store;
pub mod submission;

pub use error::{BracketError, StoreError};
