use crate::constants::TIMESTAMP_FORMAT;
use crate::error::Result;
use crate::files::write_atomic;
use crate::types::{FieldValue, PlayerRecord};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPlayer {
    pub record: PlayerRecord,
    pub last_updated: String,
}

/// Latest record per player, persisted as a JSON object keyed by player name.
///
/// Keeps a per-field index (field -> player -> value) so lookups by field
/// don't walk every stored record.
#[derive(Debug)]
pub struct PlayerStore {
    path: PathBuf,
    players: BTreeMap<String, StoredPlayer>,
    index: HashMap<String, BTreeMap<String, FieldValue>>,
}

impl PlayerStore {
    /// Loads the store if the file exists. A corrupt file is logged and
    /// replaced by an empty store on the next save.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let players = match Self::read(&path) {
            Ok(Some(players)) => {
                info!("Loaded {} players from {}", players.len(), path.display());
                players
            }
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                error!("Error loading player store {}: {}", path.display(), e);
                BTreeMap::new()
            }
        };

        let mut store = Self {
            path,
            players,
            index: HashMap::new(),
        };
        store.rebuild_index();
        store
    }

    fn read(path: &Path) -> Result<Option<BTreeMap<String, StoredPlayer>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (name, stored) in &self.players {
            for (field, value) in stored.record.fields.iter() {
                self.index
                    .entry(field.to_string())
                    .or_default()
                    .insert(name.clone(), value.clone());
            }
        }
    }

    pub fn upsert(&mut self, record: PlayerRecord) {
        let name = record.player.clone();

        if let Some(old) = self.players.get(&name) {
            for field in old.record.fields.names() {
                if let Some(entries) = self.index.get_mut(field) {
                    entries.remove(&name);
                }
            }
        }

        for (field, value) in record.fields.iter() {
            self.index
                .entry(field.to_string())
                .or_default()
                .insert(name.clone(), value.clone());
        }

        self.players.insert(
            name,
            StoredPlayer {
                record,
                last_updated: Local::now().format(TIMESTAMP_FORMAT).to_string(),
            },
        );
    }

    pub fn get(&self, player: &str) -> Option<&StoredPlayer> {
        self.players.get(player)
    }

    /// Players whose `field` equals `query`, sorted by name.
    pub fn find_by_field(&self, field: &str, query: &str) -> Vec<(&str, &FieldValue)> {
        self.index
            .get(field)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|(_, value)| value.matches(query))
                    .map(|(name, value)| (name.as_str(), value))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, |w| {
            serde_json::to_writer_pretty(w, &self.players)?;
            Ok(())
        })?;
        info!("Player store saved ({} players)", self.players.len());
        Ok(())
    }
}
