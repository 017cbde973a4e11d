//! Round advancement: partition a round and move its winners on.
//!
//! Advancing never blocks on unfinished work. Teams still in the pool or
//! in an incomplete heat are reported as pending and left where they are;
//! advancing the same round again later picks up whoever has since won.

use camporee_types::{BracketLine, BracketState, EntityId, Round, RoundRef};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::BracketError;
use crate::rounds::{ensure_consolation, round_mut};

/// A round's participants split by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Partition {
    /// Teams in a complete heat with an advancing result.
    pub winners: Vec<EntityId>,
    /// Teams in a complete heat without an advancing result.
    pub losers: Vec<EntityId>,
    /// Teams still in the pool or in an incomplete heat.
    pub pending: Vec<EntityId>,
}

/// Split a round's participants into winners, losers and pending.
pub fn partition(round: &Round) -> Partition {
    let mut split = Partition::default();
    for heat in &round.heats {
        if !heat.complete {
            split.pending.extend(heat.teams.iter().cloned());
            continue;
        }
        for team in &heat.teams {
            if heat.advances(team) {
                split.winners.push(team.clone());
            } else {
                split.losers.push(team.clone());
            }
        }
    }
    split.pending.extend(round.pool.iter().cloned());
    split
}

/// What advancing a round did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AdvanceStep {
    /// Winners were merged into the next round of the same line.
    NextRound {
        /// The round that received the winners.
        next: RoundRef,
        /// Winners newly added to its pool.
        promoted: Vec<EntityId>,
        /// The consolation round fed with main-line losers, if any.
        consolation: Option<RoundRef>,
        /// Losers newly added to the consolation pool.
        recruited: Vec<EntityId>,
    },
    /// The round was a final; the caller should compute the podium.
    Finalize {
        /// Winners of the final.
        winners: Vec<EntityId>,
    },
}

/// Result of [`advance_round`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvanceOutcome {
    /// The round that was advanced.
    pub round: RoundRef,
    /// What happened.
    pub step: AdvanceStep,
    /// Teams left behind for later resolution.
    pub pending: Vec<EntityId>,
}

impl AdvanceOutcome {
    /// The `pending-count: N` warning, when anyone was left behind.
    pub fn warning(&self) -> Option<String> {
        (!self.pending.is_empty()).then(|| format!("pending-count: {}", self.pending.len()))
    }

    /// Whether the advance ended in the finalize path.
    pub const fn is_final(&self) -> bool {
        matches!(self.step, AdvanceStep::Finalize { .. })
    }
}

/// Whether advancing this round should finalize rather than spawn a round.
fn finalizes(state: &BracketState, at: RoundRef, round: &Round, winners: usize) -> bool {
    if at.line == BracketLine::Main
        && state
            .rounds
            .get(at.index.saturating_add(1))
            .is_some_and(Round::is_challenge)
    {
        return true;
    }
    final_by_flag(round, winners)
}

/// The operator's final-round switch, or a single winner when it is unset.
const fn final_by_flag(round: &Round, winners: usize) -> bool {
    match round.is_final_round {
        Some(explicit) => explicit,
        None => winners == 1,
    }
}

/// Whether `round` is a played-out final: nothing pending, at least one
/// winner, and final by its switch or by having a single winner.
pub const fn is_decided_final(round: &Round, split: &Partition) -> bool {
    split.pending.is_empty()
        && !split.winners.is_empty()
        && final_by_flag(round, split.winners.len())
}

/// Merge ids into a round's pool, skipping anyone already in the round.
fn recruit(round: &mut Round, ids: &[EntityId]) -> Vec<EntityId> {
    let added: Vec<EntityId> = ids.iter().filter(|id| !round.contains(id)).cloned().collect();
    round.pool.extend(added.iter().cloned());
    added
}

/// Advance a round.
///
/// With no winners this fails with [`BracketError::NoWinners`] and leaves
/// the document untouched. A final round (explicitly flagged, or unflagged
/// with a single winner) returns [`AdvanceStep::Finalize`] and changes
/// nothing. Otherwise main-line losers, scratched teams included, feed the
/// active consolation round, and winners join round `i + 1` of the same
/// line, which is created if missing.
pub fn advance_round(state: &mut BracketState, at: RoundRef) -> Result<AdvanceOutcome, BracketError> {
    let round = state.round(at).ok_or(BracketError::RoundNotFound(at))?;
    let split = partition(round);
    if split.winners.is_empty() {
        return Err(BracketError::NoWinners(at));
    }

    if !split.pending.is_empty() {
        warn!(round = %at, pending = split.pending.len(), "Advancing with teams still pending");
    }

    if finalizes(state, at, round, split.winners.len()) {
        info!(round = %at, winners = split.winners.len(), "Final round reached");
        return Ok(AdvanceOutcome {
            round: at,
            step: AdvanceStep::Finalize {
                winners: split.winners,
            },
            pending: split.pending,
        });
    }

    let (consolation, recruited) = if at.line == BracketLine::Main {
        if split.losers.is_empty() {
            (None, Vec::new())
        } else {
            let index = ensure_consolation(state);
            let cons_ref = RoundRef::consolation(index);
            let added = recruit(round_mut(state, cons_ref)?, &split.losers);
            (Some(cons_ref), added)
        }
    } else {
        (None, Vec::new())
    };

    let next = RoundRef {
        line: at.line,
        index: at.index.saturating_add(1),
    };
    let promoted = match state.round_mut(next) {
        Some(existing) => recruit(existing, &split.winners),
        None => {
            let rounds = state.line_mut(at.line);
            rounds.push(Round::new(at.line.round_name(next.index), split.winners.clone()));
            split.winners.clone()
        }
    };

    info!(
        round = %at,
        next = %next,
        promoted = promoted.len(),
        recruited = recruited.len(),
        pending = split.pending.len(),
        "Round advanced"
    );

    Ok(AdvanceOutcome {
        round: at,
        step: AdvanceStep::NextRound {
            next,
            promoted,
            consolation,
            recruited,
        },
        pending: split.pending,
    })
}
