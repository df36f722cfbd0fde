//! File-backed team store.
//!
//! Holds the team list, the selected team and the map display mode in one
//! JSON document. Each CLI invocation loads the document, applies one
//! change and saves it back with an atomic file replace.

use crate::ingest::{self, IngestError};
use crate::models::{AgentInventory, MapDisplayMode, Team};
use crate::sync::merge::MergeError;
use crate::sync::{reconcile, resolve_selection, ImportSummary, MergePolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize store: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to replace store file: {0}")]
    Persist(#[from] tempfile::PersistError),

    #[error("team not found: {0}")]
    TeamNotFound(String),

    #[error("agent {agent} not found in team {team}")]
    AgentNotFound { team: String, agent: String },

    #[error("team name must not be empty")]
    EmptyTeamName,

    #[error("none of the {0} file(s) could be imported")]
    NothingImported(usize),
}

/// What happened to one snapshot file of a batch import.
#[derive(Debug)]
pub enum FileOutcome {
    Imported { agent: String, replaced: bool },
    Skipped(IngestError),
}

/// Totals of a batch import.
#[derive(Debug, Default, PartialEq)]
pub struct BatchSummary {
    pub imported: usize,
    pub skipped: Vec<PathBuf>,
}

/// The persisted document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDocument {
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_team: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_display_mode: Option<MapDisplayMode>,
}

/// Team store bound to a file path.
#[derive(Debug)]
pub struct TeamStore {
    path: PathBuf,
    doc: StoreDocument,
}

impl TeamStore {
    /// Load the store, starting empty when the file is missing.
    ///
    /// A file that cannot be parsed is reported and treated as empty; it is
    /// only overwritten by the next save.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let doc = if path.exists() {
            let text = std::fs::read_to_string(path).map_err(|source| StoreError::Io {
                path: path.display().to_string(),
                source,
            })?;
            match serde_json::from_str(&text) {
                Ok(doc) => doc,
                Err(e) => {
                    warn!(
                        "Failed to parse store {}, starting empty: {}",
                        path.display(),
                        e
                    );
                    StoreDocument::default()
                }
            }
        } else {
            debug!("No store at {}, starting empty", path.display());
            StoreDocument::default()
        };

        Ok(Self {
            path: path.to_path_buf(),
            doc,
        })
    }

    /// Write the document back atomically.
    pub fn save(&self) -> Result<(), StoreError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.display().to_string(),
            source,
        };

        let json = serde_json::to_string_pretty(&self.doc)?;
        let mut tmp = NamedTempFile::new_in(&dir).map_err(io_err)?;
        tmp.write_all(json.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path)?;

        debug!("Saved {} team(s) to {}", self.doc.teams.len(), self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn teams(&self) -> &[Team] {
        &self.doc.teams
    }

    pub fn team(&self, id: &str) -> Option<&Team> {
        self.doc.teams.iter().find(|t| t.id == id)
    }

    fn team_mut(&mut self, id: &str) -> Result<&mut Team, StoreError> {
        self.doc
            .teams
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| StoreError::TeamNotFound(id.to_string()))
    }

    /// Id of the selected team, if any.
    pub fn selected_id(&self) -> Option<&str> {
        self.doc.selected_team.as_deref()
    }

    /// The selected team, if it still exists.
    pub fn selected_team(&self) -> Option<&Team> {
        self.selected_id().and_then(|id| self.team(id))
    }

    /// Stored marker label style, or `fallback` when none was ever set.
    pub fn map_display_mode(&self, fallback: MapDisplayMode) -> MapDisplayMode {
        self.doc.map_display_mode.unwrap_or(fallback)
    }

    pub fn set_map_display_mode(&mut self, mode: MapDisplayMode) {
        self.doc.map_display_mode = Some(mode);
    }

    /// Create a team with a fresh id and select it.
    pub fn create_team(&mut self, name: &str, now: DateTime<Utc>) -> Result<Team, StoreError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::EmptyTeamName);
        }

        let id = generate_team_id(&self.doc.teams, now);
        let team = Team::new(id.clone(), name.to_string());
        self.doc.teams.push(team.clone());
        self.doc.selected_team = Some(id);

        info!("Created team {} ({})", team.name, team.id);
        Ok(team)
    }

    /// Delete a team. Clears the selection when it pointed at that team.
    pub fn delete_team(&mut self, id: &str) -> Result<Team, StoreError> {
        let index = self
            .doc
            .teams
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| StoreError::TeamNotFound(id.to_string()))?;
        let removed = self.doc.teams.remove(index);

        if self.doc.selected_team.as_deref() == Some(id) {
            self.doc.selected_team = None;
        }

        info!("Deleted team {} ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Add an agent to a team, replacing one with the same name.
    ///
    /// Returns `true` when an existing agent was replaced.
    pub fn add_agent_to_team(&mut self, team_id: &str, agent: AgentInventory) -> Result<bool, StoreError> {
        let team = self.team_mut(team_id)?;
        let name = agent.name.clone();
        let replaced = team.upsert_agent(agent);
        debug!(
            "{} agent {} in team {}",
            if replaced { "Replaced" } else { "Added" },
            name,
            team_id
        );
        Ok(replaced)
    }

    pub fn remove_agent(&mut self, team_id: &str, agent_name: &str) -> Result<(), StoreError> {
        let team = self.team_mut(team_id)?;
        if !team.remove_agent(agent_name) {
            return Err(StoreError::AgentNotFound {
                team: team_id.to_string(),
                agent: agent_name.to_string(),
            });
        }
        Ok(())
    }

    /// Select a team by id, or clear the selection with `None`.
    pub fn select_team(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        if let Some(id) = id {
            if self.team(id).is_none() {
                return Err(StoreError::TeamNotFound(id.to_string()));
            }
        }
        self.doc.selected_team = id.map(str::to_string);
        Ok(())
    }

    /// Ingest snapshot files into one team.
    ///
    /// Each file stands alone: one that cannot be read, parsed or named is
    /// skipped and reported through `on_file`. Fails when the team is unknown
    /// or no file could be imported, leaving the store unchanged.
    pub fn import_snapshots<F>(
        &mut self,
        team_id: &str,
        files: &[PathBuf],
        name: Option<&str>,
        now: DateTime<Utc>,
        mut on_file: F,
    ) -> Result<BatchSummary, StoreError>
    where
        F: FnMut(&Path, &FileOutcome),
    {
        self.team_mut(team_id)?;
        let mut summary = BatchSummary::default();

        for file in files {
            let outcome = match ingest_snapshot(file, name, now) {
                Ok(agent) => {
                    let agent_name = agent.name.clone();
                    let replaced = self.add_agent_to_team(team_id, agent)?;
                    summary.imported += 1;
                    FileOutcome::Imported {
                        agent: agent_name,
                        replaced,
                    }
                }
                Err(e) => {
                    warn!("Skipping {}: {}", file.display(), e);
                    summary.skipped.push(file.clone());
                    FileOutcome::Skipped(e)
                }
            };
            on_file(file, &outcome);
        }

        if summary.imported == 0 {
            return Err(StoreError::NothingImported(files.len()));
        }
        Ok(summary)
    }

    /// Reconcile an incoming team list with the stored one and apply it.
    ///
    /// Nothing changes when the import is rejected.
    pub fn apply_import(
        &mut self,
        incoming: Vec<Team>,
        policy: Option<MergePolicy>,
    ) -> Result<ImportSummary, MergeError> {
        let summary = ImportSummary::of(&incoming);
        let merged = reconcile(&self.doc.teams, incoming, policy)?;
        self.replace_teams(merged);

        info!(
            "Imported {} team(s) with {} agent(s); {} team(s) stored",
            summary.teams,
            summary.agents,
            self.doc.teams.len()
        );
        Ok(summary)
    }

    /// Replace the whole team list, keeping the selection if it still
    /// resolves and falling back to the first team otherwise.
    pub fn replace_teams(&mut self, teams: Vec<Team>) {
        self.doc.selected_team = resolve_selection(&teams, self.doc.selected_team.as_deref());
        self.doc.teams = teams;
    }
}

fn ingest_snapshot(
    path: &Path,
    name: Option<&str>,
    now: DateTime<Utc>,
) -> Result<AgentInventory, IngestError> {
    let snapshot = ingest::read_snapshot(path)?;
    let agent_name = ingest::resolve_agent_name(&snapshot, name)?;
    Ok(ingest::create_agent(snapshot, agent_name, now))
}

/// Generate a team id of the form `team-<unix millis>-<5 chars>`.
///
/// Retries until the id is not used by any existing team.
pub fn generate_team_id(existing: &[Team], now: DateTime<Utc>) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

    loop {
        let suffix: String = Uuid::new_v4()
            .as_bytes()
            .iter()
            .take(5)
            .map(|b| ALPHABET[(*b as usize) % ALPHABET.len()] as char)
            .collect();
        let id = format!("team-{}-{}", now.timestamp_millis(), suffix);

        if !existing.iter().any(|t| t.id == id) {
            return id;
        }
    }
}

/// Default file name for a team export.
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("team-inventory-{}.json", now.format("%Y-%m-%d_%H%M%S"))
}

/// Write teams as a pretty-printed JSON array.
pub fn write_export(path: &Path, teams: &[Team]) -> Result<(), StoreError> {
    let json = serde_json::to_string_pretty(teams)?;
    std::fs::write(path, json).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })
}
