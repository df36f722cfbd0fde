//! Team list reconciliation.
//!
//! Combines the stored team list with an imported or pulled one under a
//! policy the caller picks explicitly.

use crate::models::Team;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// How an incoming team list is combined with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergePolicy {
    /// Discard stored teams, keep the incoming list
    Replace,
    /// Update teams with matching ids in place, append new ones
    #[value(name = "merge")]
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("no teams found to import")]
    NothingToImport,

    #[error("team id {0} appears more than once in the import")]
    DuplicateTeamId(String),

    #[error(
        "{existing} team(s) already stored; choose --policy replace or --policy merge \
         to import {incoming} team(s) with {agents} agent(s)"
    )]
    PolicyRequired {
        existing: usize,
        incoming: usize,
        agents: usize,
    },
}

/// Size of an incoming team list, shown before it is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub teams: usize,
    pub agents: usize,
}

impl ImportSummary {
    pub fn of(teams: &[Team]) -> Self {
        Self {
            teams: teams.len(),
            agents: teams.iter().map(|t| t.agents.len()).sum(),
        }
    }
}

/// Merge two team lists. Whole teams are replaced; agents are not merged.
pub fn merge_teams(existing: &[Team], incoming: Vec<Team>, policy: MergePolicy) -> Vec<Team> {
    if existing.is_empty() {
        return incoming;
    }

    match policy {
        MergePolicy::Replace => incoming,
        MergePolicy::Union => {
            let mut merged = existing.to_vec();
            for team in incoming {
                match merged.iter().position(|t| t.id == team.id) {
                    Some(index) => merged[index] = team,
                    None => merged.push(team),
                }
            }
            merged
        }
    }
}

/// Validate an import and merge it.
///
/// An empty incoming list, or one that repeats a team id, is rejected before
/// anything is merged. When teams are already stored a policy must be given;
/// it is never inferred.
pub fn reconcile(
    existing: &[Team],
    incoming: Vec<Team>,
    policy: Option<MergePolicy>,
) -> Result<Vec<Team>, MergeError> {
    if incoming.is_empty() {
        return Err(MergeError::NothingToImport);
    }

    if let Some(id) = duplicate_id(&incoming) {
        return Err(MergeError::DuplicateTeamId(id));
    }

    if existing.is_empty() {
        return Ok(incoming);
    }

    let summary = ImportSummary::of(&incoming);
    let policy = policy.ok_or(MergeError::PolicyRequired {
        existing: existing.len(),
        incoming: summary.teams,
        agents: summary.agents,
    })?;

    Ok(merge_teams(existing, incoming, policy))
}

fn duplicate_id(teams: &[Team]) -> Option<String> {
    let mut seen = HashSet::new();
    teams
        .iter()
        .find(|t| !seen.insert(t.id.as_str()))
        .map(|t| t.id.clone())
}

/// Keep the selected team if it still exists, otherwise fall back to the
/// first team.
pub fn resolve_selection(teams: &[Team], previous: Option<&str>) -> Option<String> {
    previous
        .filter(|id| teams.iter().any(|t| t.id == *id))
        .map(str::to_string)
        .or_else(|| teams.first().map(|t| t.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, name: &str) -> Team {
        Team::new(id.to_string(), name.to_string())
    }

    fn ids(teams: &[Team]) -> Vec<(&str, &str)> {
        teams.iter().map(|t| (t.id.as_str(), t.name.as_str())).collect()
    }

    #[test]
    fn test_union_replaces_in_place_and_appends() {
        let existing = vec![team("1", "A"), team("2", "B")];
        let incoming = vec![team("2", "B'"), team("3", "C")];

        let merged = merge_teams(&existing, incoming, MergePolicy::Union);

        assert_eq!(ids(&merged), vec![("1", "A"), ("2", "B'"), ("3", "C")]);
    }

    #[test]
    fn test_replace_discards_existing() {
        let existing = vec![team("1", "A"), team("2", "B")];
        let incoming = vec![team("2", "B'"), team("3", "C")];

        let merged = merge_teams(&existing, incoming, MergePolicy::Replace);

        assert_eq!(ids(&merged), vec![("2", "B'"), ("3", "C")]);
    }

    #[test]
    fn test_empty_existing_takes_incoming() {
        for policy in [MergePolicy::Replace, MergePolicy::Union] {
            let merged = merge_teams(&[], vec![team("9", "X")], policy);
            assert_eq!(ids(&merged), vec![("9", "X")]);
        }
        let merged = reconcile(&[], vec![team("9", "X")], None).unwrap();
        assert_eq!(ids(&merged), vec![("9", "X")]);
    }

    #[test]
    fn test_union_replaces_whole_agent_list() {
        let mut stored = team("1", "A");
        stored.agents.push(crate::ingest::create_agent(
            Default::default(),
            "Alice".to_string(),
            chrono::Utc::now(),
        ));
        let merged = merge_teams(&[stored], vec![team("1", "A")], MergePolicy::Union);
        assert!(merged[0].agents.is_empty());
    }

    #[test]
    fn test_reconcile_rejects_empty_incoming() {
        let existing = vec![team("1", "A")];
        assert_eq!(
            reconcile(&existing, Vec::new(), Some(MergePolicy::Replace)),
            Err(MergeError::NothingToImport)
        );
        assert_eq!(ids(&existing), vec![("1", "A")]);
    }

    #[test]
    fn test_reconcile_rejects_duplicate_ids() {
        let incoming = vec![team("t", "A"), team("u", "B"), team("t", "C")];
        assert_eq!(
            reconcile(&[], incoming.clone(), None),
            Err(MergeError::DuplicateTeamId("t".to_string()))
        );

        let existing = vec![team("1", "A")];
        assert_eq!(
            reconcile(&existing, incoming, Some(MergePolicy::Union)),
            Err(MergeError::DuplicateTeamId("t".to_string()))
        );
    }

    #[test]
    fn test_reconcile_requires_policy() {
        let existing = vec![team("1", "A")];
        let err = reconcile(&existing, vec![team("2", "B")], None).unwrap_err();
        assert_eq!(
            err,
            MergeError::PolicyRequired {
                existing: 1,
                incoming: 1,
                agents: 0
            }
        );
    }

    #[test]
    fn test_resolve_selection() {
        let teams = vec![team("1", "A"), team("2", "B")];
        assert_eq!(resolve_selection(&teams, Some("2")), Some("2".to_string()));
        assert_eq!(resolve_selection(&teams, Some("gone")), Some("1".to_string()));
        assert_eq!(resolve_selection(&teams, None), Some("1".to_string()));
        assert_eq!(resolve_selection(&[], Some("1")), None);
    }

    #[test]
    fn test_import_summary() {
        let mut a = team("1", "A");
        a.agents.push(crate::ingest::create_agent(
            Default::default(),
            "Alice".to_string(),
            chrono::Utc::now(),
        ));
        let summary = ImportSummary::of(&[a, team("2", "B")]);
        assert_eq!(summary, ImportSummary { teams: 2, agents: 1 });
    }
}
