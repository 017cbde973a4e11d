//! The per-game bracket document.
//!
//! A [`BracketState`] is the whole persisted state of one elimination game:
//! the main line of rounds and the optional consolation line. It is stored
//! as a single JSON document and rewritten in full after every mutation.
//!
//! # Invariants
//!
//! - Within a round, an entity appears at most once across `pool` and all
//!   `heat.teams`.
//! - A heat with `complete == true` has a [`ResultRecord`] for every team.
//! - Round `i + 1` of a line only exists after round `i` has been advanced.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::BracketLine;
use crate::ids::{EntityId, HeatId, SubmissionId};

/// Name of the synthetic heat holding teams granted a bye.
pub const BYES_HEAT_NAME: &str = "Byes";

/// Name of the synthetic heat holding scratched teams.
pub const SCRATCHED_HEAT_NAME: &str = "Scratched";

/// Fixed name identifying the challenge-match round on the main line.
pub const CHALLENGE_ROUND_NAME: &str = "Challenge Match";

/// Address of one round: which line, and its zero-based position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct RoundRef {
    /// The line the round belongs to.
    pub line: BracketLine,
    /// Zero-based round index within the line.
    pub index: usize,
}

impl RoundRef {
    /// Reference round `index` of the main line.
    pub const fn main(index: usize) -> Self {
        Self {
            line: BracketLine::Main,
            index,
        }
    }

    /// Reference round `index` of the consolation line.
    pub const fn consolation(index: usize) -> Self {
        Self {
            line: BracketLine::Consolation,
            index,
        }
    }
}

impl core::fmt::Display for RoundRef {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}[{}]", self.line, self.index)
    }
}

/// Full tournament structure for one elimination game.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BracketState {
    /// Main-line rounds in play order.
    #[serde(default)]
    pub rounds: Vec<Round>,
    /// Consolation-line rounds in play order.
    #[serde(default)]
    pub consolation_rounds: Vec<Round>,
}

impl BracketState {
    /// Whether no round has been created yet.
    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty() && self.consolation_rounds.is_empty()
    }

    /// All rounds of a line.
    pub fn line(&self, line: BracketLine) -> &[Round] {
        match line {
            BracketLine::Main => &self.rounds,
            BracketLine::Consolation => &self.consolation_rounds,
        }
    }

    /// Mutable access to the rounds of a line.
    pub const fn line_mut(&mut self, line: BracketLine) -> &mut Vec<Round> {
        match line {
            BracketLine::Main => &mut self.rounds,
            BracketLine::Consolation => &mut self.consolation_rounds,
        }
    }

    /// Look up a round by reference.
    pub fn round(&self, at: RoundRef) -> Option<&Round> {
        self.line(at.line).get(at.index)
    }

    /// Mutable lookup of a round by reference.
    pub fn round_mut(&mut self, at: RoundRef) -> Option<&mut Round> {
        self.line_mut(at.line).get_mut(at.index)
    }

    /// Position of the challenge-match round on the main line, if created.
    pub fn challenge_index(&self) -> Option<usize> {
        self.rounds.iter().position(Round::is_challenge)
    }

    /// Ids that appear more than once within any single round.
    ///
    /// An empty result means the pool/heat exclusivity invariant holds.
    pub fn duplicate_entities(&self) -> Vec<(RoundRef, EntityId)> {
        let mut dupes = Vec::new();
        for line in [BracketLine::Main, BracketLine::Consolation] {
            for (index, round) in self.line(line).iter().enumerate() {
                let mut seen = BTreeSet::new();
                for id in round.participants() {
                    if !seen.insert(id) {
                        dupes.push((RoundRef { line, index }, id.clone()));
                    }
                }
            }
        }
        dupes
    }
}

/// One stage of a bracket line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Round {
    /// Display name (`Round 2`, `Consolation Round 1`, `Challenge Match`).
    pub name: String,
    /// Teams waiting to be placed in a heat.
    #[serde(default)]
    pub pool: Vec<EntityId>,
    /// Heats run in this round, including the synthetic `Byes`/`Scratched`.
    #[serde(default)]
    pub heats: Vec<Heat>,
    /// Operator's final-round switch; unset means "decide by winner count".
    #[serde(
        rename = "isFinalRound",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub is_final_round: Option<bool>,
}

impl Round {
    /// Create a round with the given waiting pool and no heats.
    pub const fn new(name: String, pool: Vec<EntityId>) -> Self {
        Self {
            name,
            pool,
            heats: Vec::new(),
            is_final_round: None,
        }
    }

    /// Whether this is the challenge-match round.
    pub fn is_challenge(&self) -> bool {
        self.name == CHALLENGE_ROUND_NAME
    }

    /// Every entity in the round: pool first, then heats in order.
    pub fn participants(&self) -> impl Iterator<Item = &EntityId> {
        self.pool
            .iter()
            .chain(self.heats.iter().flat_map(|h| h.teams.iter()))
    }

    /// Whether the entity is anywhere in this round.
    pub fn contains(&self, id: &EntityId) -> bool {
        self.participants().any(|p| p == id)
    }

    /// Find a heat by id.
    pub fn heat(&self, id: HeatId) -> Option<&Heat> {
        self.heats.iter().find(|h| h.id == id)
    }

    /// Mutable lookup of a heat by id.
    pub fn heat_mut(&mut self, id: HeatId) -> Option<&mut Heat> {
        self.heats.iter_mut().find(|h| h.id == id)
    }

    /// The heat an entity has been placed in, if any.
    pub fn heat_of(&self, id: &EntityId) -> Option<&Heat> {
        self.heats.iter().find(|h| h.teams.contains(id))
    }

    /// Number of regular (non-synthetic) heats.
    pub fn regular_heat_count(&self) -> usize {
        self.heats.iter().filter(|h| !h.is_synthetic()).count()
    }
}

/// A grouped contest among teams within a round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Heat {
    /// Heat identifier.
    pub id: HeatId,
    /// Display name (`Heat 3`, `Byes`, `Scratched`).
    pub name: String,
    /// Teams competing in the heat.
    pub teams: Vec<EntityId>,
    /// Whether results have been saved.
    #[serde(default)]
    pub complete: bool,
    /// Result per team.
    #[serde(default)]
    pub results: BTreeMap<EntityId, ResultRecord>,
}

impl Heat {
    /// Create an empty, incomplete heat.
    pub fn new(name: String, teams: Vec<EntityId>) -> Self {
        Self {
            id: HeatId::new(),
            name,
            teams,
            complete: false,
            results: BTreeMap::new(),
        }
    }

    /// Whether this is the `Byes` or `Scratched` bookkeeping heat.
    pub fn is_synthetic(&self) -> bool {
        self.name == BYES_HEAT_NAME || self.name == SCRATCHED_HEAT_NAME
    }

    /// Whether the team finished this heat with an advancing result.
    pub fn advances(&self, id: &EntityId) -> bool {
        self.complete
            && self
                .results
                .get(id)
                .is_some_and(|r| r.outcome.advances())
    }
}

/// A team's result in one heat.
///
/// The outcome variant is chosen by the round's scoring mode; notes and the
/// idempotency key are shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ResultRecord {
    /// What the team achieved.
    pub outcome: ResultOutcome,
    /// Free-text remark (`Bye`, `Scratched`, judge comments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Stable idempotency key, reused across repeated saves.
    pub uuid: SubmissionId,
}

impl ResultRecord {
    /// Create a record with a fresh idempotency key.
    pub fn new(outcome: ResultOutcome) -> Self {
        Self {
            outcome,
            notes: None,
            uuid: SubmissionId::new(),
        }
    }

    /// Attach a note.
    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// The scoring-mode-specific part of a [`ResultRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ResultOutcome {
    /// Normal rounds: the operator marked the team to advance or not.
    Advance {
        /// Whether the team moves on.
        advance: bool,
    },
    /// Final round: the operator assigned a finishing place.
    Rank {
        /// Finishing place, 1 being the winner.
        rank: u32,
    },
    /// Richly-scored heats: the judge entered field values.
    Fields {
        /// Field id to entered value.
        values: BTreeMap<String, serde_json::Value>,
        /// Whether the team moves on.
        advance: bool,
    },
}

impl ResultOutcome {
    /// Whether this outcome promotes the team. A rank of 1 counts as advancing.
    pub const fn advances(&self) -> bool {
        match self {
            Self::Advance { advance } | Self::Fields { advance, .. } => *advance,
            Self::Rank { rank } => *rank == 1,
        }
    }

    /// The operator-assigned place, for `Rank` outcomes.
    pub const fn rank(&self) -> Option<u32> {
        match self {
            Self::Rank { rank } => Some(*rank),
            Self::Advance { .. } | Self::Fields { .. } => None,
        }
    }
}

/// One row of the podium review. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Standing {
    /// The ranked entity.
    pub entity_id: EntityId,
    /// How the place was earned (`Champion`, `Eliminated in Round 2`).
    pub note: String,
    /// Competition rank; ties share a value.
    pub rank: u32,
    /// Deepest round index reached on either line, if known.
    pub deepest_round_idx: Option<usize>,
    /// Whether the operator overwrote the computed rank.
    #[serde(default)]
    pub manual: bool,
}
