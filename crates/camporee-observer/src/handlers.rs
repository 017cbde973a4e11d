//! REST API handlers for the bracket station.
//!
//! Each handler locks the shared [`BracketService`], runs one operation,
//! and on success broadcasts a [`ChangeKind`] so renderers can refetch.
//! Rounds are addressed as `{line}/rounds/{idx}` where `line` is `main`
//! or `consolation`.
//!
//! [`BracketService`]: camporee_bracket::service::BracketService

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use camporee_bracket::rounds::HeatEntry;
use camporee_types::{
    BracketLine, BracketState, EntityId, GameId, HeatId, RoundRef, Standing, SubmissionId,
};
use serde::Serialize;

use crate::error::ObserverError;
use crate::state::{AppState, ChangeKind};

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Path of a round: game, line and zero-based index.
type RoundPath = Path<(String, BracketLine, usize)>;

/// Path of a heat within a round.
type HeatPath = Path<(String, BracketLine, usize, HeatId)>;

/// Request body listing teams, for starting the event or creating a heat.
#[derive(Debug, serde::Deserialize)]
pub struct TeamsRequest {
    /// Selected entity ids.
    pub team_ids: Vec<EntityId>,
}

/// Request body naming one team.
#[derive(Debug, serde::Deserialize)]
pub struct EntityRequest {
    /// The team acted on.
    pub entity_id: EntityId,
}

/// Request body for `PUT .../heats/{heat}/results`.
#[derive(Debug, serde::Deserialize)]
pub struct SaveHeatRequest {
    /// One entry per team in the heat.
    pub entries: Vec<HeatEntry>,
}

/// Request body for `PUT .../heats/{heat}/advance`.
#[derive(Debug, serde::Deserialize)]
pub struct AdvanceMarkRequest {
    /// The team marked.
    pub entity_id: EntityId,
    /// Whether it moves on.
    pub advance: bool,
}

/// Request body for `PUT .../heats/{heat}/rank`.
#[derive(Debug, serde::Deserialize)]
pub struct HeatRankRequest {
    /// The team ranked.
    pub entity_id: EntityId,
    /// Finishing place; `null` clears it.
    pub rank: Option<u32>,
}

/// Request body for `PUT .../rounds/{idx}/name`.
#[derive(Debug, serde::Deserialize)]
pub struct RenameRequest {
    /// New round name.
    pub name: String,
}

/// Request body for `PUT .../rounds/{idx}/final`.
#[derive(Debug, serde::Deserialize)]
pub struct FinalRoundRequest {
    /// `true`/`false` to force, `null` to let the winner count decide.
    pub is_final: Option<bool>,
}

/// Request body for `POST /api/brackets/{game}/challenge`.
#[derive(Debug, Default, serde::Deserialize)]
pub struct ChallengeRequest {
    /// Consolation winner picked by roster lookup when this device has
    /// no decided consolation final.
    #[serde(default)]
    pub fallback_entity_id: Option<EntityId>,
}

/// Request body for `POST /api/brackets/{game}/standings/place-above`.
#[derive(Debug, serde::Deserialize)]
pub struct PlaceAboveRequest {
    /// Entity moved up.
    pub upper: EntityId,
    /// Entity it is placed above.
    pub lower: EntityId,
}

/// Request body for `PUT /api/brackets/{game}/standings/rank`.
#[derive(Debug, serde::Deserialize)]
pub struct OverrideRankRequest {
    /// Entity whose rank is overwritten.
    pub entity_id: EntityId,
    /// New rank, at least 1.
    pub rank: u32,
}

/// Request body for `POST /api/queue/synced`.
#[derive(Debug, serde::Deserialize)]
pub struct SyncedRequest {
    /// Packets acknowledged by the remote store.
    pub uuids: Vec<SubmissionId>,
}

/// Query parameters for `GET /api/roster/search`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    /// Name, troop number or label fragment.
    #[serde(default)]
    pub q: String,
}

/// One roster row with its display label.
#[derive(Debug, Serialize)]
struct RosterRow<'a> {
    #[serde(flatten)]
    entity: &'a camporee_types::Entity,
    label: String,
}

/// Bracket snapshot with labels for every participant.
#[derive(Debug, Serialize)]
struct SnapshotResponse {
    game_id: GameId,
    bracket: BracketState,
    labels: BTreeMap<EntityId, String>,
}

/// Standings under review with labels.
#[derive(Debug, Serialize)]
struct StandingsResponse {
    game_id: GameId,
    standings: Vec<Standing>,
    labels: BTreeMap<EntityId, String>,
}

/// Generic success response.
#[derive(Debug, Serialize)]
struct OkResponse {
    ok: bool,
    changed: bool,
}

const fn round_ref(line: BracketLine, index: usize) -> RoundRef {
    RoundRef { line, index }
}

async fn standings_response(
    state: &AppState,
    game_id: GameId,
    standings: Vec<Standing>,
) -> StandingsResponse {
    let service = state.service.lock().await;
    let labels = standings
        .iter()
        .map(|s| (s.entity_id.clone(), service.roster().label(&s.entity_id)))
        .collect();
    drop(service);
    StandingsResponse {
        game_id,
        standings,
        labels,
    }
}

// ---------------------------------------------------------------------------
// GET /api/roster
// ---------------------------------------------------------------------------

/// List the roster with display labels.
pub async fn roster(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let body = {
        let service = state.service.lock().await;
        let rows: Vec<RosterRow<'_>> = service
            .roster()
            .entities()
            .iter()
            .map(|entity| RosterRow {
                entity,
                label: entity.label(),
            })
            .collect();
        serde_json::json!({ "count": rows.len(), "entities": rows })
    };
    Json(body)
}

// ---------------------------------------------------------------------------
// GET /api/roster/search
// ---------------------------------------------------------------------------

/// Manual roster lookup, used to pick a challenge-match fallback.
pub async fn roster_search(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SearchQuery>,
) -> impl IntoResponse {
    let body = {
        let service = state.service.lock().await;
        let rows: Vec<RosterRow<'_>> = service
            .roster()
            .search(&query.q)
            .into_iter()
            .map(|entity| RosterRow {
                entity,
                label: entity.label(),
            })
            .collect();
        serde_json::json!({ "query": query.q, "entities": rows })
    };
    Json(body)
}

// ---------------------------------------------------------------------------
// GET /api/brackets/{game}
// ---------------------------------------------------------------------------

/// Read-only bracket snapshot for rendering.
///
/// A game that was never started returns an empty bracket, not 404.
pub async fn get_bracket(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let service = state.service.lock().await;
    let bracket = service.snapshot(&game_id)?;
    let labels = bracket
        .rounds
        .iter()
        .chain(&bracket.consolation_rounds)
        .flat_map(|round| round.participants())
        .map(|id| (id.clone(), service.roster().label(id)))
        .collect();
    drop(service);

    Ok(Json(SnapshotResponse {
        game_id,
        bracket,
        labels,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/start
// ---------------------------------------------------------------------------

/// Start the event, or merge late registrations into round 1.
pub async fn start_event(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
    Json(body): Json<TeamsRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let outcome = state
        .service
        .lock()
        .await
        .start_event(&game_id, &body.team_ids)?;
    state.notify(&game_id, ChangeKind::Started);
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/{line}/rounds/{idx}/heats
// ---------------------------------------------------------------------------

/// Create a heat from pooled teams.
pub async fn create_heat(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
    Json(body): Json<TeamsRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let heat_id = state
        .service
        .lock()
        .await
        .create_heat(&game_id, round_ref(line, index), &body.team_ids)?;
    state.notify(&game_id, ChangeKind::HeatCreated);
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "heat_id": heat_id })),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/{line}/rounds/{idx}/byes
// ---------------------------------------------------------------------------

/// Grant a team a bye.
pub async fn grant_bye(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
    Json(body): Json<EntityRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let changed = state
        .service
        .lock()
        .await
        .grant_bye(&game_id, round_ref(line, index), &body.entity_id)?;
    if changed {
        state.notify(&game_id, ChangeKind::TeamPlaced);
    }
    Ok(Json(OkResponse { ok: true, changed }))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/{line}/rounds/{idx}/scratches
// ---------------------------------------------------------------------------

/// Scratch a team.
pub async fn scratch_team(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
    Json(body): Json<EntityRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let changed = state
        .service
        .lock()
        .await
        .scratch_team(&game_id, round_ref(line, index), &body.entity_id)?;
    if changed {
        state.notify(&game_id, ChangeKind::TeamPlaced);
    }
    Ok(Json(OkResponse { ok: true, changed }))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/quick-save
// ---------------------------------------------------------------------------

/// Complete a heat; unmarked teams do not advance.
pub async fn quick_save(
    State(state): State<Arc<AppState>>,
    Path((game, line, index, heat)): HeatPath,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    state
        .service
        .lock()
        .await
        .quick_save(&game_id, round_ref(line, index), heat)?;
    state.notify(&game_id, ChangeKind::ResultsSaved);
    Ok(Json(OkResponse {
        ok: true,
        changed: true,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/results
// ---------------------------------------------------------------------------

/// Record field results and queue one score packet per team.
pub async fn save_heat(
    State(state): State<Arc<AppState>>,
    Path((game, line, index, heat)): HeatPath,
    Json(body): Json<SaveHeatRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let saved = state.service.lock().await.save_heat(
        &game_id,
        round_ref(line, index),
        heat,
        &body.entries,
    )?;
    state.notify(&game_id, ChangeKind::ResultsSaved);

    let results: BTreeMap<_, _> = saved.heat.records.into_iter().collect();
    Ok(Json(serde_json::json!({
        "round": saved.heat.round_name,
        "heat": saved.heat.heat_name,
        "results": results,
        "queued": saved.queued,
    })))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/advance
// ---------------------------------------------------------------------------

/// Mark whether a team advances out of its heat.
pub async fn mark_advance(
    State(state): State<Arc<AppState>>,
    Path((game, line, index, heat)): HeatPath,
    Json(body): Json<AdvanceMarkRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    state.service.lock().await.mark_advance(
        &game_id,
        round_ref(line, index),
        heat,
        &body.entity_id,
        body.advance,
    )?;
    state.notify(&game_id, ChangeKind::ResultsSaved);
    Ok(Json(OkResponse {
        ok: true,
        changed: true,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/{line}/rounds/{idx}/heats/{heat}/rank
// ---------------------------------------------------------------------------

/// Record or clear a finishing place in a final-round heat.
pub async fn set_rank(
    State(state): State<Arc<AppState>>,
    Path((game, line, index, heat)): HeatPath,
    Json(body): Json<HeatRankRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    state.service.lock().await.set_rank(
        &game_id,
        round_ref(line, index),
        heat,
        &body.entity_id,
        body.rank,
    )?;
    state.notify(&game_id, ChangeKind::ResultsSaved);
    Ok(Json(OkResponse {
        ok: true,
        changed: true,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/{line}/rounds/{idx}/name
// ---------------------------------------------------------------------------

/// Rename a round.
pub async fn rename_round(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
    Json(body): Json<RenameRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    state
        .service
        .lock()
        .await
        .rename_round(&game_id, round_ref(line, index), &body.name)?;
    state.notify(&game_id, ChangeKind::RoundUpdated);
    Ok(Json(OkResponse {
        ok: true,
        changed: true,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/{line}/rounds/{idx}/final
// ---------------------------------------------------------------------------

/// Set or clear the final-round switch.
pub async fn set_final_round(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
    Json(body): Json<FinalRoundRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    state
        .service
        .lock()
        .await
        .set_final_round(&game_id, round_ref(line, index), body.is_final)?;
    state.notify(&game_id, ChangeKind::RoundUpdated);
    Ok(Json(OkResponse {
        ok: true,
        changed: true,
    }))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/{line}/rounds/{idx}/advance
// ---------------------------------------------------------------------------

/// Advance a round. The response carries `pending-count: N` in
/// `warnings` when teams were left behind.
pub async fn advance_round(
    State(state): State<Arc<AppState>>,
    Path((game, line, index)): RoundPath,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let outcome = state
        .service
        .lock()
        .await
        .advance_round(&game_id, round_ref(line, index))?;
    state.notify(&game_id, ChangeKind::Advanced);
    if outcome.is_final() && line == BracketLine::Main {
        state.notify(&game_id, ChangeKind::StandingsUpdated);
    }

    let warnings: Vec<String> = outcome.warning().into_iter().collect();
    Ok(Json(serde_json::json!({
        "outcome": outcome,
        "warnings": warnings,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/consolation
// ---------------------------------------------------------------------------

/// Open the consolation line without waiting for a main-line advance.
pub async fn open_consolation(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let round = state.service.lock().await.open_consolation(&game_id)?;
    state.notify(&game_id, ChangeKind::ConsolationOpened);
    Ok(Json(serde_json::json!({ "round": round })))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/challenge
// ---------------------------------------------------------------------------

/// Create the challenge match. Repeating the call is a no-op.
pub async fn create_challenge(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
    Json(body): Json<ChallengeRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let outcome = state
        .service
        .lock()
        .await
        .create_challenge(&game_id, body.fallback_entity_id.as_ref())?;
    state.notify(&game_id, ChangeKind::ChallengeCreated);
    Ok(Json(outcome))
}

// ---------------------------------------------------------------------------
// GET /api/brackets/{game}/standings
// ---------------------------------------------------------------------------

/// The standings under review, computed on first request.
pub async fn standings(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let standings = state.service.lock().await.standings(&game_id)?;
    Ok(Json(standings_response(&state, game_id, standings).await))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/standings/recompute
// ---------------------------------------------------------------------------

/// Drop manual adjustments and recompute from the bracket.
pub async fn recompute_standings(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let standings = state.service.lock().await.recompute_standings(&game_id)?;
    state.notify(&game_id, ChangeKind::StandingsUpdated);
    Ok(Json(standings_response(&state, game_id, standings).await))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/standings/place-above
// ---------------------------------------------------------------------------

/// Swap two adjacent standings.
pub async fn place_above(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
    Json(body): Json<PlaceAboveRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let standings = state
        .service
        .lock()
        .await
        .place_above(&game_id, &body.upper, &body.lower)?;
    state.notify(&game_id, ChangeKind::StandingsUpdated);
    Ok(Json(standings_response(&state, game_id, standings).await))
}

// ---------------------------------------------------------------------------
// PUT /api/brackets/{game}/standings/rank
// ---------------------------------------------------------------------------

/// Overwrite one rank number.
pub async fn override_rank(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
    Json(body): Json<OverrideRankRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let standings = state
        .service
        .lock()
        .await
        .override_rank(&game_id, &body.entity_id, body.rank)?;
    state.notify(&game_id, ChangeKind::StandingsUpdated);
    Ok(Json(standings_response(&state, game_id, standings).await))
}

// ---------------------------------------------------------------------------
// POST /api/brackets/{game}/standings/submit
// ---------------------------------------------------------------------------

/// Queue one rank packet per standing and close the review.
pub async fn submit_standings(
    State(state): State<Arc<AppState>>,
    Path(game): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let game_id = GameId::new(game);
    let queued = state.service.lock().await.submit_standings(&game_id)?;
    state.notify(&game_id, ChangeKind::StandingsSubmitted);
    Ok(Json(serde_json::json!({ "ok": true, "queued": queued })))
}

// ---------------------------------------------------------------------------
// GET /api/queue
// ---------------------------------------------------------------------------

/// Local queue counts: everything held and what is still unsent.
pub async fn queue_counts(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let counts = state.service.lock().await.queue_counts()?;
    Ok(Json(counts))
}

// ---------------------------------------------------------------------------
// GET /api/queue/pending
// ---------------------------------------------------------------------------

/// Packets not yet confirmed by the remote store.
pub async fn pending_packets(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ObserverError> {
    let packets = state.service.lock().await.pending_packets()?;
    Ok(Json(serde_json::json!({
        "count": packets.len(),
        "packets": packets,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/queue/synced
// ---------------------------------------------------------------------------

/// Record remote acknowledgement of packets.
pub async fn mark_synced(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SyncedRequest>,
) -> Result<impl IntoResponse, ObserverError> {
    let changed = state.service.lock().await.mark_synced(&body.uuids)?;
    Ok(Json(serde_json::json!({ "ok": true, "changed": changed })))
}
