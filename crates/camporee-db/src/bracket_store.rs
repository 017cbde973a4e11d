//! One JSON document per game under `<data_dir>/brackets/`.
//!
//! Each save rewrites the whole document atomically. There is no merge:
//! when two devices edit the same game, the last write wins.

use std::path::{Path, PathBuf};

use camporee_bracket::StoreError;
use camporee_bracket::store::BracketRepository;
use camporee_types::{BracketState, GameId};
use tracing::debug;

use crate::error::DbError;
use crate::fs::{read_optional, write_atomic};

/// File-backed [`BracketRepository`].
#[derive(Debug, Clone)]
pub struct FileBracketStore {
    dir: PathBuf,
}

impl FileBracketStore {
    /// Open (creating if needed) the `brackets/` directory under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self, DbError> {
        let dir = data_dir.join("brackets");
        std::fs::create_dir_all(&dir).map_err(|e| DbError::io(&dir, e))?;
        Ok(Self { dir })
    }

    /// Directory holding the documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a game. Game ids become file names, so only ASCII
    /// letters, digits, `-` and `_` are accepted.
    pub fn path_for(&self, game_id: &GameId) -> Result<PathBuf, DbError> {
        let raw = game_id.as_str();
        let valid = !raw.is_empty()
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(DbError::InvalidGameId(raw.to_owned()));
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }

    /// Load a game's document.
    pub fn read(&self, game_id: &GameId) -> Result<Option<BracketState>, DbError> {
        let path = self.path_for(game_id)?;
        read_optional(&path)?
            .map(|doc| serde_json::from_str(&doc))
            .transpose()
            .map_err(DbError::from)
    }

    /// Overwrite a game's document.
    pub fn write(&self, game_id: &GameId, state: &BracketState) -> Result<(), DbError> {
        let path = self.path_for(game_id)?;
        let doc = serde_json::to_vec_pretty(state)?;
        write_atomic(&path, &doc)?;
        debug!(game_id = %game_id, bytes = doc.len(), "Bracket document written");
        Ok(())
    }
}

impl BracketRepository for FileBracketStore {
    fn load(&self, game_id: &GameId) -> Result<Option<BracketState>, StoreError> {
        Ok(self.read(game_id)?)
    }

    fn save(&mut self, game_id: &GameId, state: &BracketState) -> Result<(), StoreError> {
        Ok(self.write(game_id, state)?)
    }
}
