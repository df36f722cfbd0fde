//! Snapshot and team-file ingestion.
//!
//! Everything read from outside passes through here. Parsing is
//! all-or-nothing per file: a malformed document yields an error and
//! nothing partial reaches aggregation or merging.

pub mod scanner;

use crate::models::{AgentInventory, AgentSnapshot, Team};
use chrono::{DateTime, Utc};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

pub use scanner::{ScanConfig, SnapshotScanner};

/// Errors raised while reading external inventory data.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a valid inventory export: {0}")]
    InvalidSnapshot(#[source] serde_json::Error),

    #[error("not a valid team export: {0}")]
    InvalidTeams(#[source] serde_json::Error),

    #[error("expected an array of teams")]
    NotATeamArray,

    #[error("agent name is required (none found in file, pass --name)")]
    MissingAgentName,
}

/// Parse an agent snapshot from JSON text.
pub fn parse_snapshot(text: &str) -> Result<AgentSnapshot, IngestError> {
    serde_json::from_str(text).map_err(IngestError::InvalidSnapshot)
}

/// Read and parse an agent snapshot file.
pub fn read_snapshot(path: &Path) -> Result<AgentSnapshot, IngestError> {
    debug!("Reading snapshot: {}", path.display());
    let text = read_text(path)?;
    parse_snapshot(&text)
}

/// Parse a team export. The document must be a JSON array.
pub fn parse_teams(text: &str) -> Result<Vec<Team>, IngestError> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(IngestError::InvalidTeams)?;
    if !value.is_array() {
        return Err(IngestError::NotATeamArray);
    }
    serde_json::from_value(value).map_err(IngestError::InvalidTeams)
}

/// Read and parse a team export file.
pub fn read_teams_file(path: &Path) -> Result<Vec<Team>, IngestError> {
    debug!("Reading team export: {}", path.display());
    let text = read_text(path)?;
    parse_teams(&text)
}

/// Decide the agent name for a snapshot.
///
/// An explicit override wins; otherwise the snapshot's own `agent` field.
/// Both are trimmed and must not be empty.
pub fn resolve_agent_name(
    snapshot: &AgentSnapshot,
    override_name: Option<&str>,
) -> Result<String, IngestError> {
    override_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .or_else(|| {
            snapshot
                .agent
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
        })
        .map(str::to_string)
        .ok_or(IngestError::MissingAgentName)
}

/// Build a stored agent from a snapshot, filling absent categories.
pub fn create_agent(snapshot: AgentSnapshot, name: String, imported_at: DateTime<Utc>) -> AgentInventory {
    AgentInventory {
        name,
        imported_at,
        keys: snapshot.keys.unwrap_or_default(),
        resonators: snapshot.resonators.unwrap_or_default(),
        weapons: snapshot.weapons.unwrap_or_default(),
        mods: snapshot.mods.unwrap_or_default(),
        cubes: snapshot.cubes.unwrap_or_default(),
        boosts: snapshot.boosts.unwrap_or_default(),
    }
}

fn read_text(path: &Path) -> Result<String, IngestError> {
    std::fs::read_to_string(path).map_err(|source| IngestError::Read {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InventoryField;

    const SNAPSHOT: &str = r#"{
        "agent": "  Alice ",
        "keys": [{"guid": "g1", "title": "Fountain", "lat": 52.5, "lng": 13.4, "total": 3}],
        "resonators": {"RESONATOR-8": 2},
        "somethingElse": true
    }"#;

    #[test]
    fn test_parse_snapshot() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();
        assert_eq!(snapshot.agent.as_deref(), Some("  Alice "));
        assert_eq!(snapshot.keys.as_ref().map(|k| k.len()), Some(1));
        assert!(snapshot.weapons.is_none());
    }

    #[test]
    fn test_parse_snapshot_rejects_bad_input() {
        assert!(matches!(
            parse_snapshot("{not json"),
            Err(IngestError::InvalidSnapshot(_))
        ));
        assert!(parse_snapshot(r#"{"resonators": {"RESONATOR-8": -1}}"#).is_err());
        assert!(parse_snapshot(r#"{"keys": "nope"}"#).is_err());
    }

    #[test]
    fn test_create_agent_fills_defaults() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();
        let now = Utc::now();
        let agent = create_agent(snapshot, "Alice".to_string(), now);

        assert_eq!(agent.name, "Alice");
        assert_eq!(agent.imported_at, now);
        assert_eq!(agent.keys.len(), 1);
        assert_eq!(agent.resonators.get("RESONATOR-8"), Some(&2));
        for field in [InventoryField::Weapons, InventoryField::Mods, InventoryField::Cubes, InventoryField::Boosts] {
            assert!(agent.field(field).is_empty());
        }
    }

    #[test]
    fn test_resolve_agent_name() {
        let snapshot = parse_snapshot(SNAPSHOT).unwrap();
        assert_eq!(resolve_agent_name(&snapshot, None).unwrap(), "Alice");
        assert_eq!(resolve_agent_name(&snapshot, Some(" Bob ")).unwrap(), "Bob");
        assert_eq!(resolve_agent_name(&snapshot, Some("   ")).unwrap(), "Alice");

        let anonymous = AgentSnapshot::default();
        assert!(matches!(
            resolve_agent_name(&anonymous, None),
            Err(IngestError::MissingAgentName)
        ));
        assert!(resolve_agent_name(&anonymous, Some("")).is_err());
    }

    #[test]
    fn test_parse_teams() {
        let json = r#"[{"id": "team-1", "name": "Alpha", "agents": [
            {"name": "A", "importedAt": "2024-05-01T10:00:00.000Z", "resonators": {"RESONATOR-8": 1}}
        ]}]"#;
        let teams = parse_teams(json).unwrap();
        assert_eq!(teams.len(), 1);
        assert_eq!(teams[0].agents[0].resonators.get("RESONATOR-8"), Some(&1));
        assert!(teams[0].agents[0].keys.is_empty());
    }

    #[test]
    fn test_parse_teams_requires_array() {
        assert!(matches!(
            parse_teams(r#"{"id": "team-1", "name": "Alpha"}"#),
            Err(IngestError::NotATeamArray)
        ));
        assert!(matches!(parse_teams("[{\"id\": 1}]"), Err(IngestError::InvalidTeams(_))));
        assert_eq!(parse_teams("[]").unwrap().len(), 0);
    }

    #[test]
    fn test_read_snapshot_missing_file() {
        let err = read_snapshot(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, IngestError::Read { .. }));
    }
}
