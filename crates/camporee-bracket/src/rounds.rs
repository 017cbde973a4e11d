//! Round management: pool and heat mutations within a single round.
//!
//! Every function here is a pure transition on a borrowed
//! [`BracketState`]: it validates first, then mutates, and never touches
//! storage. Persistence is the caller's job (see
//! [`BracketService`](crate::service::BracketService)).

use std::collections::BTreeMap;

use camporee_types::{
    BYES_HEAT_NAME, BracketLine, BracketState, CHALLENGE_ROUND_NAME, EntityId, Heat, HeatId,
    ResultOutcome, ResultRecord, Round, RoundRef, SCRATCHED_HEAT_NAME,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::BracketError;

/// Minimum number of teams needed to start an event.
pub const MIN_STARTING_TEAMS: usize = 2;

/// What [`start_event`] did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartOutcome {
    /// Round 1 was created with these teams in its pool.
    Created {
        /// Teams placed in the pool.
        teams: Vec<EntityId>,
    },
    /// Round 1 already existed; these late arrivals joined its pool.
    Merged {
        /// Teams newly added (empty when everyone was already present).
        added: Vec<EntityId>,
    },
}

/// Field-scored result for one team, as entered on the heat screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeatEntry {
    /// The team scored.
    pub entity_id: EntityId,
    /// Field id to entered value.
    #[serde(default)]
    pub values: BTreeMap<String, serde_json::Value>,
    /// Whether the team moves on.
    #[serde(default)]
    pub advance: bool,
    /// Judge's remark.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Result of [`save_heat`]: the records now stored, ready for submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedHeat {
    /// Name of the round the heat belongs to.
    pub round_name: String,
    /// Name of the heat.
    pub heat_name: String,
    /// Stored record per team, in heat order.
    pub records: Vec<(EntityId, ResultRecord)>,
}

/// Which bookkeeping heat a team is moved into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Bye,
    Scratch,
}

impl Placement {
    const fn heat_name(self) -> &'static str {
        match self {
            Self::Bye => BYES_HEAT_NAME,
            Self::Scratch => SCRATCHED_HEAT_NAME,
        }
    }

    const fn opposite(self) -> Self {
        match self {
            Self::Bye => Self::Scratch,
            Self::Scratch => Self::Bye,
        }
    }

    const fn advance(self) -> bool {
        matches!(self, Self::Bye)
    }

    const fn note(self) -> &'static str {
        match self {
            Self::Bye => "Bye",
            Self::Scratch => "Scratched",
        }
    }
}

/// Remove duplicates while keeping first-seen order.
pub(crate) fn dedup_ordered(ids: &[EntityId]) -> Vec<EntityId> {
    let mut out: Vec<EntityId> = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(id.clone());
        }
    }
    out
}

pub(crate) fn round_mut(state: &mut BracketState, at: RoundRef) -> Result<&mut Round, BracketError> {
    state.round_mut(at).ok_or(BracketError::RoundNotFound(at))
}

fn heat_mut(round: &mut Round, at: RoundRef, heat: HeatId) -> Result<&mut Heat, BracketError> {
    round
        .heat_mut(heat)
        .ok_or(BracketError::HeatNotFound { round: at, heat })
}

/// Start the event, or register late arrivals into round 1.
///
/// Needs at least [`MIN_STARTING_TEAMS`] distinct ids. When round 1
/// already exists, ids not yet present anywhere in it are appended to its
/// pool; calling again with the same ids changes nothing.
pub fn start_event(
    state: &mut BracketState,
    team_ids: &[EntityId],
) -> Result<StartOutcome, BracketError> {
    let teams = dedup_ordered(team_ids);
    if teams.len() < MIN_STARTING_TEAMS {
        return Err(BracketError::NotEnoughTeams { count: teams.len() });
    }

    let Some(first) = state.rounds.first_mut() else {
        state
            .rounds
            .push(Round::new(BracketLine::Main.round_name(0), teams.clone()));
        debug!(teams = teams.len(), "Bracket created");
        return Ok(StartOutcome::Created { teams });
    };

    let added: Vec<EntityId> = teams.into_iter().filter(|id| !first.contains(id)).collect();
    first.pool.extend(added.iter().cloned());
    debug!(added = added.len(), round = %first.name, "Late teams merged");
    Ok(StartOutcome::Merged { added })
}

/// Move the selected pool teams into a new, incomplete heat.
pub fn create_heat(
    state: &mut BracketState,
    at: RoundRef,
    selected: &[EntityId],
) -> Result<HeatId, BracketError> {
    let teams = dedup_ordered(selected);
    if teams.is_empty() {
        return Err(BracketError::EmptyHeatSelection);
    }
    let round = round_mut(state, at)?;
    if let Some(missing) = teams.iter().find(|id| !round.pool.contains(id)) {
        return Err(BracketError::NotInPool {
            round: at,
            entity: missing.clone(),
        });
    }

    round.pool.retain(|id| !teams.contains(id));
    let name = format!("Heat {}", round.regular_heat_count().saturating_add(1));
    let heat = Heat::new(name, teams);
    let id = heat.id;
    debug!(round = %at, heat_id = %id, heat = %heat.name, teams = heat.teams.len(), "Heat created");
    round.heats.push(heat);
    Ok(id)
}

/// Promote a team without competing.
///
/// The team moves from the pool (or the `Scratched` heat) into the
/// always-complete `Byes` heat with an advancing result. Returns `false`
/// when the team already had a bye.
pub fn grant_bye(
    state: &mut BracketState,
    at: RoundRef,
    entity: &EntityId,
) -> Result<bool, BracketError> {
    place(state, at, entity, Placement::Bye)
}

/// Eliminate a team without competing.
///
/// Symmetric to [`grant_bye`]: the team lands in the `Scratched` heat with
/// a non-advancing result. Returns `false` when already scratched.
pub fn scratch_team(
    state: &mut BracketState,
    at: RoundRef,
    entity: &EntityId,
) -> Result<bool, BracketError> {
    place(state, at, entity, Placement::Scratch)
}

fn place(
    state: &mut BracketState,
    at: RoundRef,
    entity: &EntityId,
    placement: Placement,
) -> Result<bool, BracketError> {
    let round = round_mut(state, at)?;
    let current = round.heat_of(entity).map(|h| (h.id, h.name.clone()));

    match current {
        Some((_, name)) if name == placement.heat_name() => return Ok(false),
        Some((heat, name)) if name != placement.opposite().heat_name() => {
            return Err(BracketError::EntityInHeat {
                entity: entity.clone(),
                heat,
            });
        }
        Some((heat, _)) => {
            if let Some(from) = round.heat_mut(heat) {
                from.teams.retain(|t| t != entity);
                from.results.remove(entity);
            }
        }
        None => {
            if !round.pool.contains(entity) {
                return Err(BracketError::NotInPool {
                    round: at,
                    entity: entity.clone(),
                });
            }
            round.pool.retain(|t| t != entity);
        }
    }

    let index = match round.heats.iter().position(|h| h.name == placement.heat_name()) {
        Some(i) => i,
        None => {
            let mut heat = Heat::new(placement.heat_name().to_owned(), Vec::new());
            heat.complete = true;
            round.heats.push(heat);
            round.heats.len().saturating_sub(1)
        }
    };
    if let Some(heat) = round.heats.get_mut(index) {
        heat.teams.push(entity.clone());
        heat.results.insert(
            entity.clone(),
            ResultRecord::new(ResultOutcome::Advance {
                advance: placement.advance(),
            })
            .with_notes(placement.note()),
        );
        heat.complete = true;
    }
    debug!(round = %at, entity = %entity, placement = placement.note(), "Team placed");
    Ok(true)
}

/// Mark a heat complete, defaulting unmarked teams to not advancing.
pub fn quick_save(state: &mut BracketState, at: RoundRef, heat: HeatId) -> Result<(), BracketError> {
    let round = round_mut(state, at)?;
    let heat = heat_mut(round, at, heat)?;
    for team in &heat.teams {
        heat.results
            .entry(team.clone())
            .or_insert_with(|| ResultRecord::new(ResultOutcome::Advance { advance: false }));
    }
    heat.complete = true;
    debug!(round = %at, heat_id = %heat.id, "Heat quick-saved");
    Ok(())
}

/// Set a team's advance mark explicitly. Keeps any existing uuid and notes.
pub fn mark_advance(
    state: &mut BracketState,
    at: RoundRef,
    heat: HeatId,
    entity: &EntityId,
    advance: bool,
) -> Result<(), BracketError> {
    let round = round_mut(state, at)?;
    let heat = heat_mut(round, at, heat)?;
    set_outcome(heat, entity, ResultOutcome::Advance { advance })
}

/// Record (or clear) a finishing place for a final-round team.
///
/// A rank of 1 counts as advancing. Clearing a rank on a completed heat
/// reopens it, since a completed heat must hold a result for every team.
pub fn set_rank(
    state: &mut BracketState,
    at: RoundRef,
    heat: HeatId,
    entity: &EntityId,
    rank: Option<u32>,
) -> Result<(), BracketError> {
    if rank == Some(0) {
        return Err(BracketError::InvalidRank(0));
    }
    let round = round_mut(state, at)?;
    let heat = heat_mut(round, at, heat)?;
    match rank {
        Some(rank) => set_outcome(heat, entity, ResultOutcome::Rank { rank }),
        None => {
            if !heat.teams.contains(entity) {
                return Err(BracketError::NotInHeat {
                    heat: heat.id,
                    entity: entity.clone(),
                });
            }
            if heat.results.remove(entity).is_some() {
                heat.complete = false;
            }
            Ok(())
        }
    }
}

fn set_outcome(heat: &mut Heat, entity: &EntityId, outcome: ResultOutcome) -> Result<(), BracketError> {
    if !heat.teams.contains(entity) {
        return Err(BracketError::NotInHeat {
            heat: heat.id,
            entity: entity.clone(),
        });
    }
    match heat.results.get_mut(entity) {
        Some(record) => record.outcome = outcome,
        None => {
            heat.results.insert(entity.clone(), ResultRecord::new(outcome));
        }
    }
    Ok(())
}

/// Record full field results for a heat and mark it complete.
///
/// Each team's idempotency uuid is reused if one already exists, so saving
/// the same heat twice produces the same submission keys. Teams without an
/// entry keep their current result, or default to not advancing.
pub fn save_heat(
    state: &mut BracketState,
    at: RoundRef,
    heat: HeatId,
    entries: &[HeatEntry],
) -> Result<SavedHeat, BracketError> {
    let round = round_mut(state, at)?;
    let round_name = round.name.clone();
    let heat = heat_mut(round, at, heat)?;
    if let Some(stray) = entries.iter().find(|e| !heat.teams.contains(&e.entity_id)) {
        return Err(BracketError::NotInHeat {
            heat: heat.id,
            entity: stray.entity_id.clone(),
        });
    }

    let mut records = Vec::with_capacity(heat.teams.len());
    for team in &heat.teams {
        let existing = heat.results.get(team);
        let record = match entries.iter().find(|e| &e.entity_id == team) {
            Some(entry) => ResultRecord {
                outcome: ResultOutcome::Fields {
                    values: entry.values.clone(),
                    advance: entry.advance,
                },
                notes: entry.notes.clone(),
                uuid: existing.map_or_else(Default::default, |r| r.uuid),
            },
            None => existing.cloned().unwrap_or_else(|| {
                ResultRecord::new(ResultOutcome::Advance { advance: false })
            }),
        };
        heat.results.insert(team.clone(), record.clone());
        records.push((team.clone(), record));
    }
    heat.complete = true;
    debug!(round = %at, heat_id = %heat.id, teams = records.len(), "Heat saved");

    Ok(SavedHeat {
        round_name,
        heat_name: heat.name.clone(),
        records,
    })
}

/// Rename a round.
pub fn rename_round(state: &mut BracketState, at: RoundRef, name: &str) -> Result<(), BracketError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(BracketError::EmptyRoundName);
    }
    let round = round_mut(state, at)?;
    if name == CHALLENGE_ROUND_NAME || round.is_challenge() {
        return Err(BracketError::ReservedRoundName(CHALLENGE_ROUND_NAME.to_owned()));
    }
    round.name = name.to_owned();
    Ok(())
}

/// Set or clear the operator's final-round switch.
pub fn set_final_round(
    state: &mut BracketState,
    at: RoundRef,
    is_final: Option<bool>,
) -> Result<(), BracketError> {
    round_mut(state, at)?.is_final_round = is_final;
    Ok(())
}

/// Make sure the consolation line has an active round; returns its index.
pub fn ensure_consolation(state: &mut BracketState) -> usize {
    if state.consolation_rounds.is_empty() {
        state.consolation_rounds.push(Round::new(
            BracketLine::Consolation.round_name(0),
            Vec::new(),
        ));
        debug!("Consolation line opened");
    }
    state.consolation_rounds.len().saturating_sub(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<EntityId> {
        raw.iter().map(|s| EntityId::new(*s)).collect()
    }

    fn id(raw: &str) -> EntityId {
        EntityId::new(raw)
    }

    fn started(raw: &[&str]) -> BracketState {
        let mut state = BracketState::default();
        assert!(start_event(&mut state, &ids(raw)).is_ok());
        state
    }

    fn round(state: &BracketState) -> &Round {
        state.rounds.first().unwrap()
    }

    #[test]
    fn start_requires_two_distinct_teams() {
        let mut state = BracketState::default();
        let err = start_event(&mut state, &ids(&["a", "a"]));
        assert!(matches!(err, Err(BracketError::NotEnoughTeams { count: 1 })));
        assert!(state.is_empty());
    }

    #[test]
    fn start_twice_leaves_pool_unchanged() {
        let mut state = started(&["a", "b", "c"]);
        let before = round(&state).pool.clone();
        let again = start_event(&mut state, &ids(&["a", "b", "c"]));
        assert_eq!(again.ok(), Some(StartOutcome::Merged { added: Vec::new() }));
        assert_eq!(round(&state).pool, before);
    }

    #[test]
    fn late_registration_skips_teams_already_in_heats() {
        let mut state = started(&["a", "b", "c"]);
        assert!(create_heat(&mut state, RoundRef::main(0), &ids(&["a", "b"])).is_ok());
        let outcome = start_event(&mut state, &ids(&["a", "d"]));
        assert_eq!(outcome.ok(), Some(StartOutcome::Merged { added: ids(&["d"]) }));
        assert_eq!(round(&state).pool, ids(&["c", "d"]));
        assert!(state.duplicate_entities().is_empty());
    }

    #[test]
    fn create_heat_moves_teams_out_of_pool() {
        let mut state = started(&["a", "b", "c"]);
        let heat = create_heat(&mut state, RoundRef::main(0), &ids(&["a", "c"]));
        assert!(heat.is_ok());
        let r = round(&state);
        assert_eq!(r.pool, ids(&["b"]));
        assert_eq!(r.heats.len(), 1);
        assert_eq!(r.heats.first().map(|h| h.name.as_str()), Some("Heat 1"));
        assert_eq!(r.heats.first().map(|h| h.complete), Some(false));
    }

    #[test]
    fn create_heat_rejects_empty_and_foreign_selection() {
        let mut state = started(&["a", "b"]);
        assert!(matches!(
            create_heat(&mut state, RoundRef::main(0), &[]),
            Err(BracketError::EmptyHeatSelection)
        ));
        assert!(matches!(
            create_heat(&mut state, RoundRef::main(0), &ids(&["a", "z"])),
            Err(BracketError::NotInPool { .. })
        ));
        assert_eq!(round(&state).pool, ids(&["a", "b"]));
    }

    #[test]
    fn bye_moves_team_into_complete_advancing_heat() {
        let mut state = started(&["x", "y"]);
        assert_eq!(grant_bye(&mut state, RoundRef::main(0), &id("x")).ok(), Some(true));
        let r = round(&state);
        assert!(!r.pool.contains(&id("x")));
        let byes = r.heats.iter().find(|h| h.name == BYES_HEAT_NAME);
        assert!(byes.is_some_and(|h| h.complete && h.advances(&id("x"))));
        assert_eq!(
            byes.and_then(|h| h.results.get(&id("x"))).and_then(|r| r.notes.clone()),
            Some(String::from("Bye"))
        );
    }

    #[test]
    fn scratch_is_symmetric_to_bye() {
        let mut state = started(&["x", "y"]);
        assert_eq!(scratch_team(&mut state, RoundRef::main(0), &id("x")).ok(), Some(true));
        let r = round(&state);
        let scratched = r.heats.iter().find(|h| h.name == SCRATCHED_HEAT_NAME);
        assert!(scratched.is_some_and(|h| h.complete && !h.advances(&id("x"))));
        assert_eq!(
            scratched
                .and_then(|h| h.results.get(&id("x")))
                .map(|r| r.outcome.clone()),
            Some(ResultOutcome::Advance { advance: false })
        );
        assert!(!r.pool.contains(&id("x")));
    }

    #[test]
    fn repeated_bye_is_a_no_op_and_scratch_reverses_it() {
        let mut state = started(&["x", "y"]);
        assert_eq!(grant_bye(&mut state, RoundRef::main(0), &id("x")).ok(), Some(true));
        assert_eq!(grant_bye(&mut state, RoundRef::main(0), &id("x")).ok(), Some(false));
        assert_eq!(scratch_team(&mut state, RoundRef::main(0), &id("x")).ok(), Some(true));
        let r = round(&state);
        let byes = r.heats.iter().find(|h| h.name == BYES_HEAT_NAME);
        assert!(byes.is_some_and(|h| h.teams.is_empty()));
        assert!(state.duplicate_entities().is_empty());
    }

    #[test]
    fn team_in_regular_heat_cannot_take_a_bye() {
        let mut state = started(&["x", "y"]);
        assert!(create_heat(&mut state, RoundRef::main(0), &ids(&["x", "y"])).is_ok());
        assert!(matches!(
            grant_bye(&mut state, RoundRef::main(0), &id("x")),
            Err(BracketError::EntityInHeat { .. })
        ));
    }

    #[test]
    fn heat_numbering_ignores_synthetic_heats() {
        let mut state = started(&["a", "b", "c"]);
        assert!(grant_bye(&mut state, RoundRef::main(0), &id("a")).is_ok());
        assert!(create_heat(&mut state, RoundRef::main(0), &ids(&["b", "c"])).is_ok());
        assert_eq!(round(&state).heats.last().map(|h| h.name.as_str()), Some("Heat 1"));
    }

    #[test]
    fn quick_save_defaults_unmarked_teams_to_not_advancing() {
        let mut state = started(&["a", "b"]);
        let heat = create_heat(&mut state, RoundRef::main(0), &ids(&["a", "b"])).unwrap();
        assert!(mark_advance(&mut state, RoundRef::main(0), heat, &id("a"), true).is_ok());
        assert!(quick_save(&mut state, RoundRef::main(0), heat).is_ok());
        let h = round(&state).heat(heat);
        assert!(h.is_some_and(|h| h.complete && h.results.len() == 2));
        assert!(h.is_some_and(|h| h.advances(&id("a")) && !h.advances(&id("b"))));
    }

    #[test]
    fn save_heat_reuses_uuid_on_repeat() {
        let mut state = started(&["a", "b"]);
        let heat = create_heat(&mut state, RoundRef::main(0), &ids(&["a", "b"])).unwrap();
        let entries = vec![
            HeatEntry {
                entity_id: id("a"),
                values: BTreeMap::from([(String::from("time"), serde_json::json!("01:30"))]),
                advance: true,
                notes: None,
            },
            HeatEntry {
                entity_id: id("b"),
                values: BTreeMap::new(),
                advance: false,
                notes: Some(String::from("fell in")),
            },
        ];
        let first = save_heat(&mut state, RoundRef::main(0), heat, &entries).ok();
        let second = save_heat(&mut state, RoundRef::main(0), heat, &entries).ok();
        assert!(first.is_some());
        assert_eq!(first, second);
        assert!(round(&state).heat(heat).is_some_and(|h| h.complete && h.advances(&id("a"))));
    }

    #[test]
    fn save_heat_rejects_team_from_elsewhere() {
        let mut state = started(&["a", "b", "c"]);
        let heat = create_heat(&mut state, RoundRef::main(0), &ids(&["a", "b"])).unwrap();
        let entries = vec![HeatEntry {
            entity_id: id("c"),
            ..HeatEntry::default()
        }];
        assert!(matches!(
            save_heat(&mut state, RoundRef::main(0), heat, &entries),
            Err(BracketError::NotInHeat { .. })
        ));
        assert!(round(&state).heat(heat).is_some_and(|h| !h.complete));
    }

    #[test]
    fn rank_one_advances_and_clearing_reopens_heat() {
        let mut state = started(&["a", "b"]);
        let at = RoundRef::main(0);
        let heat = create_heat(&mut state, at, &ids(&["a", "b"])).unwrap();
        assert!(set_rank(&mut state, at, heat, &id("a"), Some(1)).is_ok());
        assert!(set_rank(&mut state, at, heat, &id("b"), Some(2)).is_ok());
        assert!(quick_save(&mut state, at, heat).is_ok());
        assert!(round(&state).heat(heat).is_some_and(|h| h.advances(&id("a"))));

        assert!(set_rank(&mut state, at, heat, &id("b"), None).is_ok());
        assert!(round(&state).heat(heat).is_some_and(|h| !h.complete));
        assert!(matches!(
            set_rank(&mut state, at, heat, &id("a"), Some(0)),
            Err(BracketError::InvalidRank(0))
        ));
    }

    #[test]
    fn rename_rejects_blank_names() {
        let mut state = started(&["a", "b"]);
        assert!(matches!(
            rename_round(&mut state, RoundRef::main(0), "  "),
            Err(BracketError::EmptyRoundName)
        ));
        assert!(rename_round(&mut state, RoundRef::main(0), "Qualifiers").is_ok());
        assert_eq!(round(&state).name, "Qualifiers");
    }

    #[test]
    fn challenge_name_cannot_be_given_or_removed() {
        let mut state = started(&["a", "b"]);
        assert!(matches!(
            rename_round(&mut state, RoundRef::main(0), CHALLENGE_ROUND_NAME),
            Err(BracketError::ReservedRoundName(_))
        ));
        assert_eq!(round(&state).name, "Round 1");

        state
            .rounds
            .push(Round::new(CHALLENGE_ROUND_NAME.to_owned(), Vec::new()));
        assert!(matches!(
            rename_round(&mut state, RoundRef::main(1), "Final"),
            Err(BracketError::ReservedRoundName(_))
        ));
        assert_eq!(
            state.rounds.get(1).map(|r| r.name.as_str()),
            Some(CHALLENGE_ROUND_NAME)
        );
    }

    #[test]
    fn unknown_round_is_reported() {
        let mut state = started(&["a", "b"]);
        assert!(matches!(
            create_heat(&mut state, RoundRef::consolation(0), &ids(&["a"])),
            Err(BracketError::RoundNotFound(_))
        ));
    }
}
