//! Enumeration types shared by the bracket engine and its collaborators.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The kind of roster entity competing in a game.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EntityType {
    /// A patrol (small unit within a troop).
    #[default]
    Patrol,
    /// A whole troop.
    Troop,
}

/// The two elimination lines a bracket may hold.
///
/// Every game has a main line. The consolation line is fed automatically
/// with main-line losers and settles third and fourth place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum BracketLine {
    /// The main elimination line.
    Main,
    /// The consolation line fed by main-line losers.
    Consolation,
}

impl BracketLine {
    /// Display name for round `index` (zero-based) of this line.
    pub fn round_name(self, index: usize) -> String {
        let number = index.saturating_add(1);
        match self {
            Self::Main => format!("Round {number}"),
            Self::Consolation => format!("Consolation Round {number}"),
        }
    }
}

impl core::fmt::Display for BracketLine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::Consolation => f.write_str("consolation"),
        }
    }
}
