//! Roster and submission structs exchanged with external collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::EntityType;
use crate::ids::{EntityId, GameId, SubmissionId};

/// A roster entry: one patrol or troop that can be entered into games.
///
/// The roster is owned by an external store; the engine only reads it for
/// label resolution and id validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entity {
    /// Roster identifier.
    pub id: EntityId,
    /// Patrol or troop name as registered.
    pub name: String,
    /// Troop number the entity belongs to.
    pub troop_number: String,
    /// Whether this is a patrol or a whole troop.
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
}

impl Entity {
    /// Human-readable label used on judge screens and standings.
    ///
    /// Patrols render as `T101 Flaming Flamingoes`, troops as
    /// `Troop 13 - The Avengers`. A name that merely repeats the troop
    /// number (`13`, `T13`, `Tr 13`, `Troop 13`) is dropped.
    pub fn label(&self) -> String {
        let troop = self.troop_number.trim();
        let name = self.name.trim();
        let base = match self.entity_type {
            EntityType::Troop => format!("Troop {troop}"),
            EntityType::Patrol => format!("T{troop}"),
        };
        if name.is_empty() || name_repeats_troop(name, troop) {
            return base;
        }
        match self.entity_type {
            EntityType::Troop => format!("{base} - {name}"),
            EntityType::Patrol => format!("{base} {name}"),
        }
    }
}

/// Whether `name` is only a restatement of the troop number.
fn name_repeats_troop(name: &str, troop: &str) -> bool {
    let name = name.to_lowercase();
    let troop = troop.to_lowercase();
    ["troop", "tr", "t", ""].iter().any(|prefix| {
        name.strip_prefix(prefix)
            .is_some_and(|rest| rest.trim_start() == troop)
    })
}

/// One score submission handed to the external scoring queue.
///
/// The queue deduplicates pending packets per `(game_id, entity_id)`; the
/// engine's only obligation is a stable `uuid` for repeated saves of the
/// same heat result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ScorePacket {
    /// Idempotency key.
    pub uuid: SubmissionId,
    /// Game the score belongs to.
    pub game_id: GameId,
    /// Entity being scored.
    pub entity_id: EntityId,
    /// Free-form score body (field values, or `rank` + `notes`).
    pub score_payload: BTreeMap<String, serde_json::Value>,
    /// Creation time, serialized as Unix milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    #[ts(type = "number")]
    pub timestamp: DateTime<Utc>,
    /// Name of the judge who recorded the score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_name: Option<String>,
    /// Contact email of the judge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_email: Option<String>,
    /// Unit the judge is affiliated with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judge_unit: Option<String>,
}

/// Identity of the judge operating this device, stamped on every packet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct JudgeInfo {
    /// Judge's display name.
    #[serde(default)]
    pub name: String,
    /// Judge's email.
    #[serde(default)]
    pub email: String,
    /// Judge's unit (troop or staff position).
    #[serde(default)]
    pub unit: String,
}

impl JudgeInfo {
    /// Whether no identity fields are filled in.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.email.trim().is_empty() && self.unit.trim().is_empty()
    }
}
