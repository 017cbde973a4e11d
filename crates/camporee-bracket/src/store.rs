//! Persistence seams: the bracket document store and the scoring queue.
//!
//! The engine never touches storage directly. Every operation receives a
//! [`BracketRepository`] (one JSON document per game, fully overwritten on
//! each mutation) and, where it emits scores, a [`ScoreQueue`]. The queue
//! owns retry and deduplication; the engine only appends.
//!
//! In-memory implementations live here for tests and embedding; the
//! on-disk implementations live in `camporee-db`.

use std::collections::BTreeMap;

use camporee_types::{BracketState, GameId, ScorePacket, SubmissionId};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Load/save primitive for per-game bracket documents.
pub trait BracketRepository {
    /// Load the document for a game, or `None` if no bracket exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend cannot be read or the stored
    /// document does not parse.
    fn load(&self, game_id: &GameId) -> Result<Option<BracketState>, StoreError>;

    /// Overwrite the document for a game with `state`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the document cannot be written.
    fn save(&mut self, game_id: &GameId, state: &BracketState) -> Result<(), StoreError>;
}

/// Append-only handoff to the external scoring submission queue.
pub trait ScoreQueue {
    /// Queue a packet for submission.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the packet cannot be recorded locally.
    fn append(&mut self, packet: ScorePacket) -> Result<(), StoreError>;

    /// Local bookkeeping counts.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the queue cannot be read.
    fn counts(&self) -> Result<QueueCounts, StoreError>;

    /// Packets not yet confirmed by the remote store, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the queue cannot be read.
    fn pending(&self) -> Result<Vec<ScorePacket>, StoreError>;

    /// Record that the remote store accepted these packets. Returns how
    /// many entries changed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the updated flags cannot be recorded.
    fn mark_synced(&mut self, uuids: &[SubmissionId]) -> Result<usize, StoreError>;
}

impl<T: BracketRepository + ?Sized> BracketRepository for Box<T> {
    fn load(&self, game_id: &GameId) -> Result<Option<BracketState>, StoreError> {
        (**self).load(game_id)
    }

    fn save(&mut self, game_id: &GameId, state: &BracketState) -> Result<(), StoreError> {
        (**self).save(game_id, state)
    }
}

impl<T: ScoreQueue + ?Sized> ScoreQueue for Box<T> {
    fn append(&mut self, packet: ScorePacket) -> Result<(), StoreError> {
        (**self).append(packet)
    }

    fn counts(&self) -> Result<QueueCounts, StoreError> {
        (**self).counts()
    }

    fn pending(&self) -> Result<Vec<ScorePacket>, StoreError> {
        (**self).pending()
    }

    fn mark_synced(&mut self, uuids: &[SubmissionId]) -> Result<usize, StoreError> {
        (**self).mark_synced(uuids)
    }
}

/// Totals reported by a queue: everything held, and what is still unsent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueCounts {
    /// Packets held locally, synced or not.
    pub total: usize,
    /// Packets not yet confirmed by the remote store.
    pub unsynced: usize,
}

/// A queued packet plus its "confirmed remotely" flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedPacket {
    /// The packet as it will be sent.
    #[serde(flatten)]
    pub packet: ScorePacket,
    /// Whether the remote store has acknowledged it.
    #[serde(rename = "_synced", default)]
    pub synced: bool,
}

/// Append `packet` to `entries`, replacing a pending packet it supersedes.
///
/// A pending (unsynced) entry is superseded when it has the same `uuid` or
/// targets the same `(game_id, entity_id)`. Synced entries are history and
/// are never replaced.
pub fn enqueue(entries: &mut Vec<QueuedPacket>, packet: ScorePacket) {
    let superseded = entries.iter().position(|e| {
        !e.synced
            && (e.packet.uuid == packet.uuid
                || (e.packet.game_id == packet.game_id && e.packet.entity_id == packet.entity_id))
    });
    let queued = QueuedPacket {
        packet,
        synced: false,
    };
    match superseded.and_then(|i| entries.get_mut(i)) {
        Some(slot) => *slot = queued,
        None => entries.push(queued),
    }
}

/// Unsynced packets in queue order.
pub fn pending(entries: &[QueuedPacket]) -> Vec<ScorePacket> {
    entries
        .iter()
        .filter(|e| !e.synced)
        .map(|e| e.packet.clone())
        .collect()
}

/// Count total and unsynced entries.
pub fn count(entries: &[QueuedPacket]) -> QueueCounts {
    QueueCounts {
        total: entries.len(),
        unsynced: entries.iter().filter(|e| !e.synced).count(),
    }
}

/// Flag every entry whose uuid is listed as synced. Returns how many changed.
pub fn mark_synced(entries: &mut [QueuedPacket], uuids: &[SubmissionId]) -> usize {
    let mut changed: usize = 0;
    for entry in entries.iter_mut() {
        if !entry.synced && uuids.contains(&entry.packet.uuid) {
            entry.synced = true;
            changed = changed.saturating_add(1);
        }
    }
    changed
}

/// In-memory repository holding each document as serialized JSON.
///
/// Documents are stored as text so loads go through the same
/// deserialization path as the on-disk store.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    documents: BTreeMap<GameId, String>,
    saves: usize,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub const fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            saves: 0,
        }
    }

    /// Number of `save` calls that succeeded.
    pub const fn save_count(&self) -> usize {
        self.saves
    }

    /// The raw stored document for a game.
    pub fn raw(&self, game_id: &GameId) -> Option<&str> {
        self.documents.get(game_id).map(String::as_str)
    }
}

impl BracketRepository for MemoryRepository {
    fn load(&self, game_id: &GameId) -> Result<Option<BracketState>, StoreError> {
        self.documents
            .get(game_id)
            .map(|doc| serde_json::from_str(doc))
            .transpose()
            .map_err(StoreError::from)
    }

    fn save(&mut self, game_id: &GameId, state: &BracketState) -> Result<(), StoreError> {
        let doc = serde_json::to_string(state)?;
        self.documents.insert(game_id.clone(), doc);
        self.saves = self.saves.saturating_add(1);
        Ok(())
    }
}

/// In-memory scoring queue with the same supersede rules as the disk queue.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    entries: Vec<QueuedPacket>,
    appended: usize,
}

impl MemoryQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            appended: 0,
        }
    }

    /// Entries currently held.
    pub fn entries(&self) -> &[QueuedPacket] {
        &self.entries
    }

    /// Number of `append` calls received, before deduplication.
    pub const fn appended(&self) -> usize {
        self.appended
    }
}

impl ScoreQueue for MemoryQueue {
    fn append(&mut self, packet: ScorePacket) -> Result<(), StoreError> {
        enqueue(&mut self.entries, packet);
        self.appended = self.appended.saturating_add(1);
        Ok(())
    }

    fn counts(&self) -> Result<QueueCounts, StoreError> {
        Ok(count(&self.entries))
    }

    fn pending(&self) -> Result<Vec<ScorePacket>, StoreError> {
        Ok(pending(&self.entries))
    }

    fn mark_synced(&mut self, uuids: &[SubmissionId]) -> Result<usize, StoreError> {
        Ok(mark_synced(&mut self.entries, uuids))
    }
}
