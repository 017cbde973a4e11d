//! The local score queue, kept as a JSON array in `<data_dir>/queue.json`.
//!
//! Entries are never dropped once synced; they stay as a record of what
//! this station sent. The file is rewritten after every change.

use std::path::{Path, PathBuf};

use camporee_bracket::StoreError;
use camporee_bracket::store::{self, QueueCounts, QueuedPacket, ScoreQueue};
use camporee_types::{ScorePacket, SubmissionId};
use tracing::{debug, info};

use crate::error::DbError;
use crate::fs::{read_optional, write_atomic};

/// File-backed [`ScoreQueue`].
#[derive(Debug)]
pub struct FileScoreQueue {
    path: PathBuf,
    entries: Vec<QueuedPacket>,
}

impl FileScoreQueue {
    /// Open the queue file, starting empty if it does not exist yet.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let entries: Vec<QueuedPacket> = match read_optional(path)? {
            Some(doc) => serde_json::from_str(&doc)?,
            None => Vec::new(),
        };
        let counts = store::count(&entries);
        info!(
            path = %path.display(),
            total = counts.total,
            unsynced = counts.unsynced,
            "Score queue opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// Entries currently held.
    pub fn entries(&self) -> &[QueuedPacket] {
        &self.entries
    }

    fn persist(&self) -> Result<(), DbError> {
        let doc = serde_json::to_vec(&self.entries)?;
        write_atomic(&self.path, &doc)
    }
}

impl ScoreQueue for FileScoreQueue {
    fn append(&mut self, packet: ScorePacket) -> Result<(), StoreError> {
        debug!(uuid = %packet.uuid, game_id = %packet.game_id, entity_id = %packet.entity_id, "Packet queued");
        store::enqueue(&mut self.entries, packet);
        Ok(self.persist()?)
    }

    fn counts(&self) -> Result<QueueCounts, StoreError> {
        Ok(store::count(&self.entries))
    }

    fn pending(&self) -> Result<Vec<ScorePacket>, StoreError> {
        Ok(store::pending(&self.entries))
    }

    fn mark_synced(&mut self, uuids: &[SubmissionId]) -> Result<usize, StoreError> {
        let changed = store::mark_synced(&mut self.entries, uuids);
        if changed > 0 {
            self.persist()?;
        }
        Ok(changed)
    }
}
