//! Final standings for a bracket.
//!
//! Placement is decided in precedence groups: the champion, the challenge
//! pair (when played), the remaining main finalists, the consolation
//! final, then everyone else by how deep they got. Ranks use standard
//! competition ranking: members of a group tie, and the next group's rank
//! skips ahead by the size of the group before it (1, 1, 3, 4).

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use camporee_types::{BracketLine, BracketState, EntityId, Round, Standing};
use tracing::debug;

use crate::advancement::{is_decided_final, partition};
use crate::challenge::main_final_index;
use crate::error::BracketError;

/// Deepest round reached by an entity: index and that round's name.
type Depth = (usize, String);

/// Ordered placement groups under construction.
#[derive(Default)]
struct Placement {
    groups: Vec<Vec<(EntityId, String)>>,
    placed: BTreeSet<EntityId>,
}

impl Placement {
    /// Add a tied group, skipping anyone already placed.
    fn push_group(&mut self, ids: &[EntityId], note: &str) {
        let group: Vec<(EntityId, String)> = ids
            .iter()
            .filter(|id| !self.placed.contains(*id))
            .map(|id| (id.clone(), note.to_owned()))
            .collect();
        self.push_noted(group);
    }

    fn push_noted(&mut self, group: Vec<(EntityId, String)>) {
        let mut fresh = Vec::with_capacity(group.len());
        for (id, note) in group {
            if self.placed.insert(id.clone()) {
                fresh.push((id, note));
            }
        }
        if !fresh.is_empty() {
            self.groups.push(fresh);
        }
    }
}

/// Record where every entity got to, plus first-appearance order.
fn depths(state: &BracketState) -> (BTreeMap<EntityId, Depth>, Vec<EntityId>) {
    let mut deepest: BTreeMap<EntityId, Depth> = BTreeMap::new();
    let mut order = Vec::new();
    for line in [BracketLine::Main, BracketLine::Consolation] {
        for (index, round) in state.line(line).iter().enumerate() {
            for id in round.participants() {
                match deepest.get_mut(id) {
                    Some(depth) => {
                        if index > depth.0 {
                            *depth = (index, round.name.clone());
                        }
                    }
                    None => {
                        deepest.insert(id.clone(), (index, round.name.clone()));
                        order.push(id.clone());
                    }
                }
            }
        }
    }
    (deepest, order)
}

/// Rank value recorded for `id` in its heat of `round`, if any.
fn recorded_rank(round: &Round, id: &EntityId) -> Option<u32> {
    round
        .heat_of(id)
        .and_then(|h| h.results.get(id))
        .and_then(|r| r.outcome.rank())
}

/// Split main-final losers into tied groups by their recorded rank.
///
/// Ranked losers come first in rank order; unranked losers form one
/// trailing group.
fn loser_groups(round: &Round, losers: &[EntityId]) -> Vec<Vec<EntityId>> {
    let mut ranked: Vec<(u32, EntityId)> = losers
        .iter()
        .filter_map(|id| recorded_rank(round, id).map(|rank| (rank, id.clone())))
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);

    let mut groups: Vec<Vec<EntityId>> = Vec::new();
    let mut last_rank = None;
    for (rank, id) in ranked {
        match groups.last_mut() {
            Some(group) if last_rank == Some(rank) => group.push(id),
            _ => groups.push(vec![id]),
        }
        last_rank = Some(rank);
    }

    let unranked: Vec<EntityId> = losers
        .iter()
        .filter(|id| recorded_rank(round, id).is_none())
        .cloned()
        .collect();
    if !unranked.is_empty() {
        groups.push(unranked);
    }
    groups
}

/// Compute the podium for a bracket.
///
/// Every entity that appears anywhere in either line gets exactly one
/// standing. The result is deterministic for a given document.
pub fn compute_standings(state: &BracketState) -> Vec<Standing> {
    let mut placement = Placement::default();

    if let Some(final_round) = main_final_index(state).and_then(|i| state.rounds.get(i)) {
        let split = partition(final_round);
        placement.push_group(&split.winners, "Champion");

        let mut challenge_played = false;
        if let Some(challenge) = state.challenge_index().and_then(|i| state.rounds.get(i)) {
            let played = partition(challenge);
            if played.pending.is_empty() && !played.winners.is_empty() {
                placement.push_group(&played.winners, "Challenge Winner");
                placement.push_group(&played.losers, "Challenge Runner-up");
                challenge_played = true;
            }
        }

        for (i, group) in loser_groups(final_round, &split.losers).iter().enumerate() {
            let note = if i == 0 && !challenge_played {
                "Runner-up"
            } else {
                "Finalist"
            };
            placement.push_group(group, note);
        }
    }

    if let Some(last) = state.consolation_rounds.last() {
        let split = partition(last);
        if is_decided_final(last, &split) {
            placement.push_group(&split.winners, "Consolation Winner");
            placement.push_group(&split.losers, "Consolation Runner-up");
        }
    }

    let (deepest, order) = depths(state);
    let mut rest: Vec<(EntityId, Depth)> = order
        .into_iter()
        .filter(|id| !placement.placed.contains(id))
        .filter_map(|id| deepest.get(&id).cloned().map(|d| (id, d)))
        .collect();
    rest.sort_by_key(|(_, (index, _))| Reverse(*index));

    let mut current: Option<usize> = None;
    let mut group: Vec<(EntityId, String)> = Vec::new();
    for (id, (index, name)) in rest {
        if current.is_some_and(|c| c != index) {
            placement.push_noted(std::mem::take(&mut group));
        }
        current = Some(index);
        group.push((id, format!("Eliminated in {name}")));
    }
    placement.push_noted(group);

    let mut standings = Vec::with_capacity(placement.placed.len());
    let mut ahead: u32 = 0;
    for group in placement.groups {
        let rank = ahead.saturating_add(1);
        let size = u32::try_from(group.len()).unwrap_or(u32::MAX);
        for (entity_id, note) in group {
            let deepest_round_idx = deepest.get(&entity_id).map(|d| d.0);
            standings.push(Standing {
                entity_id,
                note,
                rank,
                deepest_round_idx,
                manual: false,
            });
        }
        ahead = ahead.saturating_add(size);
    }
    debug!(standings = standings.len(), "Standings computed");
    standings
}

fn position(standings: &[Standing], id: &EntityId) -> Result<usize, BracketError> {
    standings
        .iter()
        .position(|s| &s.entity_id == id)
        .ok_or_else(|| BracketError::NotInStandings(id.clone()))
}

/// Move `upper` directly above its neighbour `lower`.
///
/// The two rows trade places and rank values, and any manual marks on
/// them are cleared. If `upper` already sits directly above `lower` this
/// does nothing. Returns whether anything moved.
pub fn place_above(
    standings: &mut [Standing],
    upper: &EntityId,
    lower: &EntityId,
) -> Result<bool, BracketError> {
    let up = position(standings, upper)?;
    let low = position(standings, lower)?;
    if up.checked_add(1) == Some(low) {
        return Ok(false);
    }
    if low.checked_add(1) != Some(up) {
        return Err(BracketError::NotAdjacent {
            upper: upper.clone(),
            lower: lower.clone(),
        });
    }

    let low_rank = standings.get(low).map(|s| s.rank);
    let up_rank = standings.get(up).map(|s| s.rank);
    standings.swap(low, up);
    for (at, rank) in [(low, low_rank), (up, up_rank)] {
        if let (Some(standing), Some(rank)) = (standings.get_mut(at), rank) {
            standing.rank = rank;
            standing.manual = false;
        }
    }
    Ok(true)
}

/// Overwrite one standing's rank. Repeating the same value is harmless.
pub fn override_rank(
    standings: &mut [Standing],
    entity: &EntityId,
    rank: u32,
) -> Result<(), BracketError> {
    if rank == 0 {
        return Err(BracketError::InvalidRank(rank));
    }
    let at = position(standings, entity)?;
    if let Some(standing) = standings.get_mut(at) {
        standing.rank = rank;
        standing.manual = true;
    }
    Ok(())
}
