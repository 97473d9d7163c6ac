use crate::constants::TIMESTAMP_FORMAT;
use crate::error::{Result, ScraperError};
use crate::fetcher::Fetcher;
use crate::files::write_atomic;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

#[derive(Debug, Deserialize)]
struct OnlineResponse {
    #[serde(default)]
    users: Vec<OnlineUser>,
}

#[derive(Debug, Deserialize)]
struct OnlineUser {
    name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub last_online: String,
}

/// Every player ever seen online, with the last time they were seen
#[derive(Debug)]
pub struct Roster {
    path: PathBuf,
    entries: Vec<RosterEntry>,
}

impl Roster {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match Self::read(&path) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Ignoring unreadable roster {}: {}", path.display(), e);
                Vec::new()
            }
        };
        Self { path, entries }
    }

    fn read(path: &Path) -> Result<Vec<RosterEntry>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Marks `online` players as seen at `now`, adding new ones at the end.
    pub fn merge(&mut self, online: &[String], now: &str) {
        for name in online {
            match self.entries.iter_mut().find(|e| &e.name == name) {
                Some(entry) => entry.last_online = now.to_string(),
                None => self.entries.push(RosterEntry {
                    name: name.clone(),
                    last_online: now.to_string(),
                }),
            }
        }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn save(&self) -> Result<()> {
        write_atomic(&self.path, |w| {
            serde_json::to_writer_pretty(w, &self.entries)?;
            Ok(())
        })
    }
}

/// Parses the online endpoint payload: `{"users": [{"name": ...}, ...]}`.
pub fn parse_online(body: &str) -> Result<Vec<String>> {
    let response: OnlineResponse = serde_json::from_str(body)
        .map_err(|e| ScraperError::Parse(format!("unexpected online list payload: {e}")))?;
    Ok(response
        .users
        .into_iter()
        .map(|u| u.name.trim().to_string())
        .filter(|n| !n.is_empty())
        .collect())
}

/// Reads a newline-separated list of player names. Blank lines and lines
/// starting with `#` are ignored.
pub fn read_player_file(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

/// Fetches who is online, records them in the roster file and returns
/// every known player name.
#[instrument(skip(fetcher))]
pub async fn refresh(fetcher: &dyn Fetcher, online_url: &str, roster_path: &Path) -> Result<Vec<String>> {
    let body = fetcher.fetch(online_url).await?;
    let online = parse_online(&body)?;
    info!("Number of online players: {}", online.len());

    let mut roster = Roster::open(roster_path);
    roster.merge(&online, &Local::now().format(TIMESTAMP_FORMAT).to_string());
    roster.save()?;

    Ok(roster.names())
}
