//! Axum router construction for the bracket API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so judge screens on other origins can
//! call it.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the bracket station.
///
/// Rounds are addressed as `/api/brackets/{game}/{line}/rounds/{idx}`
/// with `line` one of `main` or `consolation`. Heats within a round are
/// addressed by their UUID.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/brackets", get(ws::ws_brackets))
        // Roster
        .route("/api/roster", get(handlers::roster))
        .route("/api/roster/search", get(handlers::roster_search))
        // Bracket
        .route("/api/brackets/{game}", get(handlers::get_bracket))
        .route("/api/brackets/{game}/start", post(handlers::start_event))
        .route(
            "/api/brackets/{game}/consolation",
            post(handlers::open_consolation),
        )
        .route(
            "/api/brackets/{game}/challenge",
            post(handlers::create_challenge),
        )
        // Rounds
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/heats",
            post(handlers::create_heat),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/byes",
            post(handlers::grant_bye),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/scratches",
            post(handlers::scratch_team),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/name",
            put(handlers::rename_round),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/final",
            put(handlers::set_final_round),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/advance",
            post(handlers::advance_round),
        )
        // Heats
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/quick-save",
            post(handlers::quick_save),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/results",
            put(handlers::save_heat),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/advance",
            put(handlers::mark_advance),
        )
        .route(
            "/api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/rank",
            put(handlers::set_rank),
        )
        // Podium review
        .route("/api/brackets/{game}/standings", get(handlers::standings))
        .route(
            "/api/brackets/{game}/standings/recompute",
            post(handlers::recompute_standings),
        )
        .route(
            "/api/brackets/{game}/standings/place-above",
            post(handlers::place_above),
        )
        .route(
            "/api/brackets/{game}/standings/rank",
            put(handlers::override_rank),
        )
        .route(
            "/api/brackets/{game}/standings/submit",
            post(handlers::submit_standings),
        )
        // Submission queue
        .route("/api/queue", get(handlers::queue_counts))
        .route("/api/queue/pending", get(handlers::pending_packets))
        .route("/api/queue/synced", post(handlers::mark_synced))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
