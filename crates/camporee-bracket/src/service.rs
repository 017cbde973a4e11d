//! The bracket service: one entry point per operator action.
//!
//! Every mutation follows the same shape: load the game's document (or an
//! empty one), apply a pure transition from the engine modules, persist the
//! whole document, then return the outcome. A failed transition returns
//! before the save, so the stored document is never partially updated.
//!
//! The service also holds the podium review for each game: standings are
//! computed once, adjusted by the operator, then submitted and dropped.

use std::collections::BTreeMap;

use camporee_types::{
    BracketLine, BracketState, EntityId, GameId, HeatId, JudgeInfo, RoundRef, ScorePacket,
    Standing, SubmissionId,
};
use tracing::{debug, info, warn};

use crate::advancement::{self, AdvanceOutcome};
use crate::challenge::{self, ChallengeOutcome};
use crate::error::BracketError;
use crate::podium;
use crate::rounds::{self, HeatEntry, SavedHeat, StartOutcome};
use crate::roster::Roster;
use crate::store::{BracketRepository, QueueCounts, ScoreQueue};
use crate::submission;

/// A service over type-erased stores, as used by the HTTP layer.
pub type DynBracketService = BracketService<
    Box<dyn BracketRepository + Send + Sync>,
    Box<dyn ScoreQueue + Send + Sync>,
>;

/// Outcome of [`BracketService::save_heat`].
#[derive(Debug, Clone, PartialEq)]
pub struct HeatSaved {
    /// The stored results.
    pub heat: SavedHeat,
    /// Packets handed to the queue.
    pub queued: usize,
}

/// Orchestrates bracket operations over a repository and a score queue.
#[derive(Debug)]
pub struct BracketService<R, Q> {
    repo: R,
    queue: Q,
    roster: Roster,
    judge: Option<JudgeInfo>,
    reviews: BTreeMap<GameId, Vec<Standing>>,
}

impl<R: BracketRepository, Q: ScoreQueue> BracketService<R, Q> {
    /// Create a service with no judge identity.
    pub const fn new(repo: R, queue: Q, roster: Roster) -> Self {
        Self {
            repo,
            queue,
            roster,
            judge: None,
            reviews: BTreeMap::new(),
        }
    }

    /// Stamp packets with this judge identity.
    #[must_use]
    pub fn with_judge(mut self, judge: Option<JudgeInfo>) -> Self {
        self.judge = judge.filter(|j| !j.is_empty());
        self
    }

    /// The roster used for validation and labels.
    pub const fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The underlying repository.
    pub const fn repository(&self) -> &R {
        &self.repo
    }

    /// The underlying score queue.
    pub const fn queue(&self) -> &Q {
        &self.queue
    }

    /// Mutable access to the score queue, for sync bookkeeping.
    pub const fn queue_mut(&mut self) -> &mut Q {
        &mut self.queue
    }

    /// Read-only snapshot of a game's bracket; empty if never started.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::Store`] if the document cannot be loaded.
    pub fn snapshot(&self, game: &GameId) -> Result<BracketState, BracketError> {
        let state = self.repo.load(game)?.unwrap_or_default();
        for (at, entity) in state.duplicate_entities() {
            warn!(game_id = %game, round = %at, entity = %entity, "Entity listed twice in one round");
        }
        Ok(state)
    }

    /// Load, transition, persist. The review for the game is discarded
    /// because the document it was computed from has changed.
    fn mutate<T>(
        &mut self,
        game: &GameId,
        transition: impl FnOnce(&mut BracketState) -> Result<T, BracketError>,
    ) -> Result<T, BracketError> {
        let mut state = self.snapshot(game)?;
        let outcome = transition(&mut state)?;
        self.repo.save(game, &state)?;
        if self.reviews.remove(game).is_some() {
            debug!(game_id = %game, "Podium review discarded after bracket change");
        }
        Ok(outcome)
    }

    /// Start the event or register late arrivals.
    ///
    /// # Errors
    ///
    /// [`BracketError::UnknownEntity`] for ids not on the roster, or any
    /// error from [`rounds::start_event`].
    pub fn start_event(
        &mut self,
        game: &GameId,
        team_ids: &[EntityId],
    ) -> Result<StartOutcome, BracketError> {
        self.roster.require_all(team_ids)?;
        let outcome = self.mutate(game, |state| rounds::start_event(state, team_ids))?;
        info!(game_id = %game, teams = team_ids.len(), "Event started");
        Ok(outcome)
    }

    /// Create a heat from pooled teams.
    ///
    /// # Errors
    ///
    /// See [`rounds::create_heat`].
    pub fn create_heat(
        &mut self,
        game: &GameId,
        at: RoundRef,
        selected: &[EntityId],
    ) -> Result<HeatId, BracketError> {
        self.mutate(game, |state| rounds::create_heat(state, at, selected))
    }

    /// Give a team a bye.
    ///
    /// # Errors
    ///
    /// See [`rounds::grant_bye`].
    pub fn grant_bye(&mut self, game: &GameId, at: RoundRef, entity: &EntityId) -> Result<bool, BracketError> {
        self.mutate(game, |state| rounds::grant_bye(state, at, entity))
    }

    /// Scratch a team.
    ///
    /// # Errors
    ///
    /// See [`rounds::scratch_team`].
    pub fn scratch_team(
        &mut self,
        game: &GameId,
        at: RoundRef,
        entity: &EntityId,
    ) -> Result<bool, BracketError> {
        self.mutate(game, |state| rounds::scratch_team(state, at, entity))
    }

    /// Complete a heat with default results for unmarked teams.
    ///
    /// # Errors
    ///
    /// See [`rounds::quick_save`].
    pub fn quick_save(&mut self, game: &GameId, at: RoundRef, heat: HeatId) -> Result<(), BracketError> {
        self.mutate(game, |state| rounds::quick_save(state, at, heat))
    }

    /// Record field results for a heat and queue one packet per team.
    ///
    /// The document is saved before anything is queued, so a queue
    /// failure never loses the recorded results.
    ///
    /// # Errors
    ///
    /// See [`rounds::save_heat`]; queue failures surface as
    /// [`BracketError::Store`].
    pub fn save_heat(
        &mut self,
        game: &GameId,
        at: RoundRef,
        heat: HeatId,
        entries: &[HeatEntry],
    ) -> Result<HeatSaved, BracketError> {
        let saved = self.mutate(game, |state| rounds::save_heat(state, at, heat, entries))?;
        let packets = submission::heat_packets(game, &saved, self.judge.as_ref());
        let queued = submission::submit(&mut self.queue, packets)?;
        info!(game_id = %game, round = %at, heat_id = %heat, queued, "Heat results saved");
        Ok(HeatSaved { heat: saved, queued })
    }

    /// Set a team's advance mark.
    ///
    /// # Errors
    ///
    /// See [`rounds::mark_advance`].
    pub fn mark_advance(
        &mut self,
        game: &GameId,
        at: RoundRef,
        heat: HeatId,
        entity: &EntityId,
        advance: bool,
    ) -> Result<(), BracketError> {
        self.mutate(game, |state| rounds::mark_advance(state, at, heat, entity, advance))
    }

    /// Set or clear a team's finishing place in a heat.
    ///
    /// # Errors
    ///
    /// See [`rounds::set_rank`].
    pub fn set_rank(
        &mut self,
        game: &GameId,
        at: RoundRef,
        heat: HeatId,
        entity: &EntityId,
        rank: Option<u32>,
    ) -> Result<(), BracketError> {
        self.mutate(game, |state| rounds::set_rank(state, at, heat, entity, rank))
    }

    /// Rename a round.
    ///
    /// # Errors
    ///
    /// See [`rounds::rename_round`].
    pub fn rename_round(&mut self, game: &GameId, at: RoundRef, name: &str) -> Result<(), BracketError> {
        self.mutate(game, |state| rounds::rename_round(state, at, name))
    }

    /// Set or clear a round's final-round switch.
    ///
    /// # Errors
    ///
    /// See [`rounds::set_final_round`].
    pub fn set_final_round(
        &mut self,
        game: &GameId,
        at: RoundRef,
        is_final: Option<bool>,
    ) -> Result<(), BracketError> {
        self.mutate(game, |state| rounds::set_final_round(state, at, is_final))
    }

    /// Open the consolation line, returning its active round.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::Store`] on persistence failure.
    pub fn open_consolation(&mut self, game: &GameId) -> Result<RoundRef, BracketError> {
        self.mutate(game, |state| Ok(RoundRef::consolation(rounds::ensure_consolation(state))))
    }

    /// Advance a round. Finalizing the main line opens the podium review.
    ///
    /// # Errors
    ///
    /// See [`advancement::advance_round`].
    pub fn advance_round(&mut self, game: &GameId, at: RoundRef) -> Result<AdvanceOutcome, BracketError> {
        let outcome = self.mutate(game, |state| advancement::advance_round(state, at))?;
        if let Some(warning) = outcome.warning() {
            warn!(game_id = %game, round = %at, warning = %warning, "Round advanced with pending teams");
        }
        if outcome.is_final() && at.line == BracketLine::Main {
            self.recompute_standings(game)?;
        }
        Ok(outcome)
    }

    /// Create the challenge match.
    ///
    /// # Errors
    ///
    /// [`BracketError::UnknownEntity`] if `fallback` is not on the roster,
    /// or any error from [`challenge::create_challenge`].
    pub fn create_challenge(
        &mut self,
        game: &GameId,
        fallback: Option<&EntityId>,
    ) -> Result<ChallengeOutcome, BracketError> {
        if let Some(id) = fallback {
            self.roster.require_all([id])?;
        }
        self.mutate(game, |state| challenge::create_challenge(state, fallback))
    }

    /// The standings under review, computing them if none are open.
    ///
    /// # Errors
    ///
    /// [`BracketError::NoStandings`] if the bracket has no participants.
    pub fn standings(&mut self, game: &GameId) -> Result<Vec<Standing>, BracketError> {
        Ok(self.review_mut(game)?.clone())
    }

    /// Discard any manual adjustments and recompute the standings.
    ///
    /// # Errors
    ///
    /// [`BracketError::NoStandings`] if the bracket has no participants.
    pub fn recompute_standings(&mut self, game: &GameId) -> Result<Vec<Standing>, BracketError> {
        self.reviews.remove(game);
        self.standings(game)
    }

    fn review_mut(&mut self, game: &GameId) -> Result<&mut Vec<Standing>, BracketError> {
        if !self.reviews.contains_key(game) {
            let standings = podium::compute_standings(&self.snapshot(game)?);
            if standings.is_empty() {
                return Err(BracketError::NoStandings(game.clone()));
            }
            info!(game_id = %game, standings = standings.len(), "Podium review opened");
            self.reviews.insert(game.clone(), standings);
        }
        self.reviews
            .get_mut(game)
            .ok_or_else(|| BracketError::NoStandings(game.clone()))
    }

    /// Move `upper` directly above `lower` in the review.
    ///
    /// # Errors
    ///
    /// See [`podium::place_above`].
    pub fn place_above(
        &mut self,
        game: &GameId,
        upper: &EntityId,
        lower: &EntityId,
    ) -> Result<Vec<Standing>, BracketError> {
        let review = self.review_mut(game)?;
        podium::place_above(review, upper, lower)?;
        Ok(review.clone())
    }

    /// Overwrite one entity's rank in the review.
    ///
    /// # Errors
    ///
    /// See [`podium::override_rank`].
    pub fn override_rank(
        &mut self,
        game: &GameId,
        entity: &EntityId,
        rank: u32,
    ) -> Result<Vec<Standing>, BracketError> {
        let review = self.review_mut(game)?;
        podium::override_rank(review, entity, rank)?;
        Ok(review.clone())
    }

    /// Queue one rank packet per standing and close the review.
    ///
    /// # Errors
    ///
    /// [`BracketError::NoStandings`] if there is nothing to submit, or
    /// [`BracketError::Store`] if the queue rejects a packet. The review
    /// stays open on failure so the submission can be retried.
    pub fn submit_standings(&mut self, game: &GameId) -> Result<usize, BracketError> {
        let judge = self.judge.clone();
        let review = self.review_mut(game)?;
        let packets = submission::standings_packets(game, review, judge.as_ref());
        let queued = submission::submit(&mut self.queue, packets)?;
        self.reviews.remove(game);
        info!(game_id = %game, queued, "Standings submitted");
        Ok(queued)
    }

    /// Queue bookkeeping counts.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::Store`] if the queue cannot be read.
    pub fn queue_counts(&self) -> Result<QueueCounts, BracketError> {
        Ok(self.queue.counts()?)
    }

    /// Packets still waiting for the remote store.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::Store`] if the queue cannot be read.
    pub fn pending_packets(&self) -> Result<Vec<ScorePacket>, BracketError> {
        Ok(self.queue.pending()?)
    }

    /// Record remote acknowledgement of packets.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::Store`] if the queue cannot be updated.
    pub fn mark_synced(&mut self, uuids: &[SubmissionId]) -> Result<usize, BracketError> {
        let changed = self.queue.mark_synced(uuids)?;
        debug!(changed, "Queue entries marked synced");
        Ok(changed)
    }
}
