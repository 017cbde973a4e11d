//! Roster file loading.

use std::path::Path;

use camporee_types::Entity;
use tracing::{info, warn};

use crate::error::DbError;
use crate::fs::read_optional;

/// Load the roster: a JSON array of `{id, name, troop_number, type}`.
///
/// A missing file yields an empty roster, since a station may be brought
/// up before the roster has been exported to it.
pub fn load_roster(path: &Path) -> Result<Vec<Entity>, DbError> {
    let Some(doc) = read_optional(path)? else {
        warn!(path = %path.display(), "Roster file not found; starting with an empty roster");
        return Ok(Vec::new());
    };
    let entities: Vec<Entity> = serde_json::from_str(&doc)?;
    info!(path = %path.display(), entities = entities.len(), "Roster loaded");
    Ok(entities)
}
