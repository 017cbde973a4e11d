//! Error types for the bracket engine.
//!
//! Validation failures are reported before any mutation is applied, so a
//! returned error always means the bracket document is unchanged.

use camporee_types::{EntityId, GameId, HeatId, RoundRef};

/// Errors raised by bracket state transitions.
#[derive(Debug, thiserror::Error)]
pub enum BracketError {
    /// An event needs at least two teams to start.
    #[error("at least 2 teams are required to start, got {count}")]
    NotEnoughTeams {
        /// Number of distinct teams supplied.
        count: usize,
    },

    /// A heat was requested with no teams selected.
    #[error("select at least one team from the pool to create a heat")]
    EmptyHeatSelection,

    /// The addressed round does not exist.
    #[error("round {0} does not exist")]
    RoundNotFound(RoundRef),

    /// The addressed heat does not exist in the round.
    #[error("heat {heat} not found in round {round}")]
    HeatNotFound {
        /// Round searched.
        round: RoundRef,
        /// Heat requested.
        heat: HeatId,
    },

    /// The entity is not waiting in the round's pool.
    #[error("entity {entity} is not in the pool of round {round}")]
    NotInPool {
        /// Round searched.
        round: RoundRef,
        /// Entity requested.
        entity: EntityId,
    },

    /// The entity is not one of the heat's teams.
    #[error("entity {entity} is not competing in heat {heat}")]
    NotInHeat {
        /// Heat searched.
        heat: HeatId,
        /// Entity requested.
        entity: EntityId,
    },

    /// The entity is already placed in a regular heat and cannot be moved.
    #[error("entity {entity} is already competing in heat {heat}")]
    EntityInHeat {
        /// Entity requested.
        entity: EntityId,
        /// Heat the entity is in.
        heat: HeatId,
    },

    /// The entity is not on the roster.
    #[error("unknown entity: {0}")]
    UnknownEntity(EntityId),

    /// Advancement needs at least one team marked to advance.
    #[error("no teams marked to advance in round {0}")]
    NoWinners(RoundRef),

    /// Rank values start at 1.
    #[error("rank must be at least 1, got {0}")]
    InvalidRank(u32),

    /// Round names must not be blank.
    #[error("round name must not be empty")]
    EmptyRoundName,

    /// The challenge round's name marks it; it is neither given nor taken away.
    #[error("round name \"{0}\" is reserved for the challenge match")]
    ReservedRoundName(String),

    /// The challenge match needs a decided main final.
    #[error("main final is not complete: {reason}")]
    MainFinalIncomplete {
        /// What is missing.
        reason: String,
    },

    /// The consolation winner is not known on this device.
    #[error("consolation winner unknown; supply a roster lookup to continue")]
    ConsolationWinnerUnknown,

    /// The challenge match would pit a team against itself.
    #[error("challenge match needs two different teams, got {0} twice")]
    ChallengeSameTeam(EntityId),

    /// No podium review is open for the game.
    #[error("no standings under review for game {0}")]
    NoStandings(GameId),

    /// The entity is not listed in the standings under review.
    #[error("entity {0} is not in the standings")]
    NotInStandings(EntityId),

    /// Reordering only swaps neighbouring standings.
    #[error("standings for {upper} and {lower} are not adjacent")]
    NotAdjacent {
        /// Entity to be placed above.
        upper: EntityId,
        /// Entity to be placed below.
        lower: EntityId,
    },

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by a [`BracketRepository`](crate::store::BracketRepository)
/// or [`ScoreQueue`](crate::store::ScoreQueue) backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend failed to read or write.
    #[error("backend error: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}
