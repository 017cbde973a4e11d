//! Integration tests for the bracket API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, backed by the in-memory repository and queue.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use camporee_bracket::roster::Roster;
use camporee_bracket::service::BracketService;
use camporee_bracket::store::{BracketRepository, MemoryQueue, MemoryRepository, ScoreQueue};
use camporee_observer::router::build_router;
use camporee_observer::state::{AppState, ChangeKind};
use camporee_types::{Entity, EntityId, EntityType, GameId};
use serde_json::{Value, json};
use tower::ServiceExt;

fn make_state() -> Arc<AppState> {
    let roster = Roster::new(
        ["101", "102", "103", "104"]
            .iter()
            .map(|raw| Entity {
                id: EntityId::new(*raw),
                name: format!("Patrol {raw}"),
                troop_number: String::from("13"),
                entity_type: EntityType::Patrol,
            })
            .collect(),
    );
    let repo: Box<dyn BracketRepository + Send + Sync> = Box::new(MemoryRepository::new());
    let queue: Box<dyn ScoreQueue + Send + Sync> = Box::new(MemoryQueue::new());
    Arc::new(AppState::new(BracketService::new(repo, queue, roster)))
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

/// Create a heat in `round`, mark `winner` to advance, and quick-save.
async fn decide(router: &Router, round: &str, teams: &[&str], winner: &str) -> String {
    let (status, body) = send(
        router,
        Method::POST,
        &format!("{round}/heats"),
        Some(json!({ "team_ids": teams })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let heat = body["heat_id"].as_str().unwrap().to_owned();

    let (status, _) = send(
        router,
        Method::PUT,
        &format!("{round}/heats/{heat}/advance"),
        Some(json!({ "entity_id": winner, "advance": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        router,
        Method::POST,
        &format!("{round}/heats/{heat}/quick-save"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    heat
}

#[tokio::test]
async fn unstarted_game_has_empty_snapshot() {
    let router = build_router(make_state());
    let (status, body) = send(&router, Method::GET, "/api/brackets/p1", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["game_id"], "p1");
    assert_eq!(body["bracket"]["rounds"], json!([]));
    assert_eq!(body["bracket"]["consolation_rounds"], json!([]));
}

#[tokio::test]
async fn start_event_creates_pool_with_labels() {
    let router = build_router(make_state());
    let (status, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": [101, "102", "103"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "created");

    let (_, snapshot) = send(&router, Method::GET, "/api/brackets/p1", None).await;
    let pool = snapshot["bracket"]["rounds"][0]["pool"].as_array().unwrap();
    assert_eq!(pool.len(), 3);
    assert_eq!(snapshot["labels"]["101"], "T13 Patrol 101");
}

#[tokio::test]
async fn validation_errors_are_unprocessable() {
    let router = build_router(make_state());

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "not-enough-teams");
    assert_eq!(body["status"], 422);

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "999"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "unknown-entity");

    // Nothing was stored by the rejected calls.
    let (_, snapshot) = send(&router, Method::GET, "/api/brackets/p1", None).await;
    assert_eq!(snapshot["bracket"]["rounds"], json!([]));
}

#[tokio::test]
async fn advancing_without_winners_reports_no_winners() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/main/rounds/0/advance",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "no-winners");
}

#[tokio::test]
async fn missing_round_and_heat_are_not_found() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/brackets/p1/main/rounds/4/name",
        Some(json!({ "name": "Semis" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "round-not-found");

    let (status, _) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/main/rounds/0/heats/0190a5a0-0000-7000-8000-000000000000/quick-save",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn challenge_round_name_is_reserved() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;

    let (status, body) = send(
        &router,
        Method::PUT,
        "/api/brackets/p1/main/rounds/0/name",
        Some(json!({ "name": "Challenge Match" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "reserved-round-name");
}

#[tokio::test]
async fn unknown_line_is_rejected() {
    let router = build_router(make_state());
    let (status, _) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/side/rounds/0/advance",
        None,
    )
    .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn full_flow_reaches_submitted_standings() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102", "103", "104"] })),
    )
    .await;

    let round_one = "/api/brackets/p1/main/rounds/0";
    decide(&router, round_one, &["101", "102"], "101").await;
    decide(&router, round_one, &["103", "104"], "103").await;

    let (status, body) = send(&router, Method::POST, &format!("{round_one}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["step"]["kind"], "next_round");
    assert_eq!(body["warnings"], json!([]));

    let (_, snapshot) = send(&router, Method::GET, "/api/brackets/p1", None).await;
    assert_eq!(
        snapshot["bracket"]["consolation_rounds"][0]["pool"],
        json!(["102", "104"])
    );

    let round_two = "/api/brackets/p1/main/rounds/1";
    decide(&router, round_two, &["101", "103"], "101").await;
    let (status, body) = send(&router, Method::POST, &format!("{round_two}/advance"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"]["step"]["kind"], "finalize");

    let (status, body) = send(&router, Method::GET, "/api/brackets/p1/standings", None).await;
    assert_eq!(status, StatusCode::OK);
    let ranks: Vec<(String, u64)> = body["standings"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| {
            (
                s["entity_id"].as_str().unwrap().to_owned(),
                s["rank"].as_u64().unwrap(),
            )
        })
        .collect();
    assert_eq!(ranks[0], (String::from("101"), 1));
    assert_eq!(ranks[1], (String::from("103"), 2));
    assert_eq!(ranks[2].1, 3);
    assert_eq!(ranks[3].1, 3);
    assert_eq!(body["labels"]["101"], "T13 Patrol 101");

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/standings/submit",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["queued"], 4);

    let (_, counts) = send(&router, Method::GET, "/api/queue", None).await;
    assert_eq!(counts, json!({ "total": 4, "unsynced": 4 }));

    let (_, pending) = send(&router, Method::GET, "/api/queue/pending", None).await;
    assert_eq!(pending["count"], 4);
    let first = pending["packets"][0]["uuid"].clone();
    assert_eq!(
        pending["packets"][0]["score_payload"]["notes"],
        "Tournament Place: 1st"
    );

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/queue/synced",
        Some(json!({ "uuids": [first] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], 1);

    let (_, counts) = send(&router, Method::GET, "/api/queue", None).await;
    assert_eq!(counts, json!({ "total": 4, "unsynced": 3 }));
}

#[tokio::test]
async fn saving_heat_twice_queues_one_packet_per_team() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;
    let (_, body) = send(
        &router,
        Method::POST,
        "/api/brackets/p1/main/rounds/0/heats",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;
    let heat = body["heat_id"].as_str().unwrap().to_owned();
    let uri = format!("/api/brackets/p1/main/rounds/0/heats/{heat}/results");
    let entries = json!({ "entries": [
        { "entity_id": "101", "values": { "time": 42 }, "advance": true },
        { "entity_id": "102", "values": { "time": 55 }, "notes": "false start" },
    ]});

    let (status, first) = send(&router, Method::PUT, &uri, Some(entries.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["queued"], 2);
    assert_eq!(first["heat"], "Heat 1");

    let (_, second) = send(&router, Method::PUT, &uri, Some(entries)).await;
    assert_eq!(first["results"]["101"]["uuid"], second["results"]["101"]["uuid"]);

    let (_, counts) = send(&router, Method::GET, "/api/queue", None).await;
    assert_eq!(counts["total"], 2);
}

#[tokio::test]
async fn bye_is_idempotent() {
    let router = build_router(make_state());
    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102", "103"] })),
    )
    .await;
    let uri = "/api/brackets/p1/main/rounds/0/byes";

    let (status, body) = send(&router, Method::POST, uri, Some(json!({ "entity_id": "103" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], true);

    let (status, body) = send(&router, Method::POST, uri, Some(json!({ "entity_id": "103" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], false);

    let (_, snapshot) = send(&router, Method::GET, "/api/brackets/p1", None).await;
    let heat = &snapshot["bracket"]["rounds"][0]["heats"][0];
    assert_eq!(heat["name"], "Byes");
    assert_eq!(heat["complete"], true);
}

#[tokio::test]
async fn standings_for_empty_bracket_are_not_found() {
    let router = build_router(make_state());
    let (status, body) = send(&router, Method::GET, "/api/brackets/p9/standings", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "no-standings");
}

#[tokio::test]
async fn roster_search_matches_troop_and_name() {
    let router = build_router(make_state());

    let (status, body) = send(&router, Method::GET, "/api/roster", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(body["entities"][0]["type"], "patrol");

    let (_, body) = send(&router, Method::GET, "/api/roster/search?q=patrol%20103", None).await;
    let hits = body["entities"].as_array().unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["label"], "T13 Patrol 103");
}

#[tokio::test]
async fn mutations_broadcast_change_notices() {
    let state = make_state();
    let mut rx = state.subscribe();
    let router = build_router(Arc::clone(&state));

    send(
        &router,
        Method::POST,
        "/api/brackets/p1/start",
        Some(json!({ "team_ids": ["101", "102"] })),
    )
    .await;

    let change = rx.recv().await.unwrap();
    assert_eq!(change.game_id, GameId::new("p1"));
    assert_eq!(change.change, ChangeKind::Started);

    // Reads do not broadcast.
    send(&router, Method::GET, "/api/brackets/p1", None).await;
    assert!(rx.try_recv().is_err());
}
