//! Error types for the API layer.
//!
//! [`ObserverError`] unifies all failure modes into a single enum that
//! can be converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use camporee_bracket::BracketError;
use tracing::error;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ObserverError {
    /// A bracket operation was rejected or failed.
    #[error(transparent)]
    Bracket(#[from] BracketError),
}

impl ObserverError {
    /// HTTP status for this error.
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Bracket(err) => match err {
                BracketError::RoundNotFound(_)
                | BracketError::HeatNotFound { .. }
                | BracketError::NoStandings(_)
                | BracketError::NotInStandings(_) => StatusCode::NOT_FOUND,
                BracketError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                BracketError::NotEnoughTeams { .. }
                | BracketError::EmptyHeatSelection
                | BracketError::NotInPool { .. }
                | BracketError::NotInHeat { .. }
                | BracketError::EntityInHeat { .. }
                | BracketError::UnknownEntity(_)
                | BracketError::NoWinners(_)
                | BracketError::InvalidRank(_)
                | BracketError::EmptyRoundName
                | BracketError::ReservedRoundName(_)
                | BracketError::MainFinalIncomplete { .. }
                | BracketError::ConsolationWinnerUnknown
                | BracketError::ChallengeSameTeam(_)
                | BracketError::NotAdjacent { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            },
        }
    }

    /// Short machine-readable code (`no-winners`, `not-in-pool`, ...).
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Bracket(err) => match err {
                BracketError::NotEnoughTeams { .. } => "not-enough-teams",
                BracketError::EmptyHeatSelection => "empty-heat-selection",
                BracketError::RoundNotFound(_) => "round-not-found",
                BracketError::HeatNotFound { .. } => "heat-not-found",
                BracketError::NotInPool { .. } => "not-in-pool",
                BracketError::NotInHeat { .. } => "not-in-heat",
                BracketError::EntityInHeat { .. } => "entity-in-heat",
                BracketError::UnknownEntity(_) => "unknown-entity",
                BracketError::NoWinners(_) => "no-winners",
                BracketError::InvalidRank(_) => "invalid-rank",
                BracketError::EmptyRoundName => "empty-round-name",
                BracketError::ReservedRoundName(_) => "reserved-round-name",
                BracketError::MainFinalIncomplete { .. } => "main-final-incomplete",
                BracketError::ConsolationWinnerUnknown => "consolation-winner-unknown",
                BracketError::ChallengeSameTeam(_) => "challenge-same-team",
                BracketError::NoStandings(_) => "no-standings",
                BracketError::NotInStandings(_) => "not-in-standings",
                BracketError::NotAdjacent { .. } => "not-adjacent",
                BracketError::Store(_) => "store",
            },
        }
    }
}

impl IntoResponse for ObserverError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "Request failed");
        }

        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
