//! Shared type definitions for the Camporee bracket engine.
//!
//! This crate is the single source of truth for the bracket document and
//! the records exchanged with the roster, the local store and the scoring
//! queue. Types flow to `TypeScript` via `ts-rs` for the judge screens.
//!
//! # Modules
//!
//! - [`ids`] -- Typed identifiers (UUID-backed and external string keys)
//! - [`enums`] -- Entity kinds and bracket lines
//! - [`structs`] -- Roster entity, score packet, judge identity
//! - [`bracket`] -- The per-game bracket document and podium standings

pub mod bracket;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use bracket::{
    BYES_HEAT_NAME, BracketState, CHALLENGE_ROUND_NAME, Heat, ResultOutcome, ResultRecord, Round,
    RoundRef, SCRATCHED_HEAT_NAME, Standing,
};
pub use enums::{BracketLine, EntityType};
pub use ids::{EntityId, GameId, HeatId, SubmissionId};
pub use structs::{Entity, JudgeInfo, ScorePacket};
