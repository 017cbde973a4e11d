//! The challenge match between the main runner-up and the consolation winner.
//!
//! Single elimination with a consolation line leaves 2nd and 3rd place
//! ambiguous: the main runner-up lost only to the champion, but never met
//! the consolation winner. The challenge match is one extra main-line round
//! settling that pair.

use camporee_types::{
    BracketLine, BracketState, CHALLENGE_ROUND_NAME, EntityId, Heat, Round, RoundRef,
};
use serde::Serialize;
use tracing::info;

use crate::advancement::{is_decided_final, partition};
use crate::error::BracketError;

/// What [`create_challenge`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChallengeOutcome {
    /// The challenge round was appended to the main line.
    Created {
        /// Where the new round lives.
        round: RoundRef,
        /// Main-line runner-up.
        runner_up: EntityId,
        /// Consolation-line winner.
        consolation_winner: EntityId,
    },
    /// A challenge round already existed; nothing changed.
    Existing {
        /// Where the existing round lives.
        round: RoundRef,
    },
}

/// Index of the last main round that is not the challenge match.
pub fn main_final_index(state: &BracketState) -> Option<usize> {
    state.rounds.iter().rposition(|r| !r.is_challenge())
}

/// The team a round ranked first among `candidates`, else the first one.
fn best_ranked(round: &Round, candidates: &[EntityId]) -> Option<EntityId> {
    candidates
        .iter()
        .filter_map(|id| {
            round
                .heat_of(id)
                .and_then(|h| h.results.get(id))
                .and_then(|r| r.outcome.rank())
                .map(|rank| (rank, id))
        })
        .min_by_key(|(rank, _)| *rank)
        .map(|(_, id)| id.clone())
        .or_else(|| candidates.first().cloned())
}

/// The main final's runner-up, once the final is fully decided.
pub fn main_runner_up(state: &BracketState) -> Result<EntityId, BracketError> {
    let final_round = main_final_index(state)
        .and_then(|i| state.rounds.get(i))
        .ok_or_else(|| BracketError::MainFinalIncomplete {
            reason: String::from("no main round exists"),
        })?;
    let split = partition(final_round);
    if !split.pending.is_empty() {
        return Err(BracketError::MainFinalIncomplete {
            reason: format!("{} team(s) still pending", split.pending.len()),
        });
    }
    if split.winners.is_empty() {
        return Err(BracketError::MainFinalIncomplete {
            reason: String::from("no winner recorded"),
        });
    }
    if !is_decided_final(final_round, &split) {
        return Err(BracketError::MainFinalIncomplete {
            reason: String::from("last main round is not a final"),
        });
    }
    best_ranked(final_round, &split.losers).ok_or_else(|| BracketError::MainFinalIncomplete {
        reason: String::from("no runner-up recorded"),
    })
}

/// The consolation final's winner, if the consolation line is decided here.
pub fn consolation_winner(state: &BracketState) -> Option<EntityId> {
    let last = state.consolation_rounds.last()?;
    let split = partition(last);
    if !is_decided_final(last, &split) {
        return None;
    }
    best_ranked(last, &split.winners)
}

/// Append the challenge match to the main line.
///
/// `fallback` is the operator's manual pick for the consolation winner,
/// used only when this device has no decided consolation final (typically
/// because another device ran it). The caller is expected to have checked
/// it against the roster. A second call is a no-op.
pub fn create_challenge(
    state: &mut BracketState,
    fallback: Option<&EntityId>,
) -> Result<ChallengeOutcome, BracketError> {
    if let Some(index) = state.challenge_index() {
        return Ok(ChallengeOutcome::Existing {
            round: RoundRef::main(index),
        });
    }

    let runner_up = main_runner_up(state)?;
    let consolation_winner = consolation_winner(state)
        .or_else(|| fallback.cloned())
        .ok_or(BracketError::ConsolationWinnerUnknown)?;
    if runner_up == consolation_winner {
        return Err(BracketError::ChallengeSameTeam(runner_up));
    }

    let mut round = Round::new(CHALLENGE_ROUND_NAME.to_owned(), Vec::new());
    round.is_final_round = Some(true);
    round.heats.push(Heat::new(
        String::from("Heat 1"),
        vec![runner_up.clone(), consolation_winner.clone()],
    ));
    state.line_mut(BracketLine::Main).push(round);
    let at = RoundRef::main(state.rounds.len().saturating_sub(1));

    info!(round = %at, runner_up = %runner_up, consolation_winner = %consolation_winner, "Challenge match created");
    Ok(ChallengeOutcome::Created {
        round: at,
        runner_up,
        consolation_winner,
    })
}
