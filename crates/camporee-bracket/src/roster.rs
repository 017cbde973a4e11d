//! Read-only roster lookup.
//!
//! The roster is owned elsewhere; the engine uses it to validate ids,
//! resolve labels, and back the manual lookup operators use when a
//! consolation result has not synced to this device yet.

use camporee_types::{Entity, EntityId};

use crate::error::BracketError;

/// The set of entities that may be entered into games.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entities: Vec<Entity>,
}

impl Roster {
    /// Wrap a roster listing, sorted by troop number then name.
    pub fn new(mut entities: Vec<Entity>) -> Self {
        entities.sort_by(|a, b| {
            a.troop_number
                .cmp(&b.troop_number)
                .then_with(|| a.name.cmp(&b.name))
        });
        Self { entities }
    }

    /// Every entity in display order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities.
    pub const fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the roster is empty.
    pub const fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Find an entity by id.
    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    /// Display label for an id, falling back to the raw id when unknown.
    pub fn label(&self, id: &EntityId) -> String {
        self.get(id).map_or_else(|| id.to_string(), Entity::label)
    }

    /// Fail on the first id that is not on the roster.
    pub fn require_all<'a>(
        &self,
        ids: impl IntoIterator<Item = &'a EntityId>,
    ) -> Result<(), BracketError> {
        for id in ids {
            if self.get(id).is_none() {
                return Err(BracketError::UnknownEntity(id.clone()));
            }
        }
        Ok(())
    }

    /// Case-insensitive search over name, troop number and label.
    ///
    /// A blank query matches nothing.
    pub fn search(&self, query: &str) -> Vec<&Entity> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.entities
            .iter()
            .filter(|e| {
                e.name.to_lowercase().contains(&needle)
                    || e.troop_number.trim().to_lowercase() == needle
                    || e.label().to_lowercase().contains(&needle)
            })
            .collect()
    }
}
