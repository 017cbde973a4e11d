//! Turning bracket results into score packets for the scoring queue.
//!
//! Two points in the bracket produce packets: saving a field-scored heat,
//! and submitting the final standings. Only the latter is authoritative.

use std::collections::BTreeMap;

use camporee_types::{EntityId, GameId, JudgeInfo, ResultOutcome, ScorePacket, Standing, SubmissionId};
use chrono::Utc;
use serde_json::Value;
use tracing::info;

use crate::error::StoreError;
use crate::rounds::SavedHeat;
use crate::store::ScoreQueue;

/// English ordinal for a place: `1st`, `2nd`, `3rd`, `4th`, `11th`, `22nd`.
pub fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn packet(
    game_id: &GameId,
    entity_id: &EntityId,
    uuid: SubmissionId,
    score_payload: BTreeMap<String, Value>,
    judge: Option<&JudgeInfo>,
) -> ScorePacket {
    ScorePacket {
        uuid,
        game_id: game_id.clone(),
        entity_id: entity_id.clone(),
        score_payload,
        timestamp: Utc::now(),
        judge_name: judge.and_then(|j| non_blank(&j.name)),
        judge_email: judge.and_then(|j| non_blank(&j.email)),
        judge_unit: judge.and_then(|j| non_blank(&j.unit)),
    }
}

/// One packet per team of a saved heat, keyed by the result's stable uuid.
///
/// The payload carries the entered field values plus the `heat` and
/// `round` names so the scores can be told apart downstream.
pub fn heat_packets(game_id: &GameId, saved: &SavedHeat, judge: Option<&JudgeInfo>) -> Vec<ScorePacket> {
    saved
        .records
        .iter()
        .map(|(entity_id, record)| {
            let mut payload = match &record.outcome {
                ResultOutcome::Fields { values, .. } => values.clone(),
                ResultOutcome::Advance { .. } | ResultOutcome::Rank { .. } => BTreeMap::new(),
            };
            if let Some(notes) = &record.notes {
                payload.insert(String::from("notes"), Value::from(notes.clone()));
            }
            payload.insert(String::from("heat"), Value::from(saved.heat_name.clone()));
            payload.insert(String::from("round"), Value::from(saved.round_name.clone()));
            packet(game_id, entity_id, record.uuid, payload, judge)
        })
        .collect()
}

/// One packet per standing: `{rank, notes: "Tournament Place: 1st"}`.
pub fn standings_packets(
    game_id: &GameId,
    standings: &[Standing],
    judge: Option<&JudgeInfo>,
) -> Vec<ScorePacket> {
    standings
        .iter()
        .map(|s| {
            let payload = BTreeMap::from([
                (String::from("rank"), Value::from(s.rank)),
                (
                    String::from("notes"),
                    Value::from(format!("Tournament Place: {}", ordinal(s.rank))),
                ),
            ]);
            packet(game_id, &s.entity_id, SubmissionId::new(), payload, judge)
        })
        .collect()
}

/// Hand packets to the queue. Returns how many were appended.
///
/// # Errors
///
/// Stops at the first packet the queue cannot record.
pub fn submit<Q: ScoreQueue + ?Sized>(
    queue: &mut Q,
    packets: Vec<ScorePacket>,
) -> Result<usize, StoreError> {
    let mut appended: usize = 0;
    for packet in packets {
        queue.append(packet)?;
        appended = appended.saturating_add(1);
    }
    info!(packets = appended, "Score packets queued");
    Ok(appended)
}
