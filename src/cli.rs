//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::MapDisplayMode;
use crate::report::keys::{parse_distance, KeySort, LatLng};
use crate::sync::MergePolicy;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// TeamInv - pool agent inventories into team totals
///
/// Import the inventory exports of your agents, group them into teams and
/// see combined keys and equipment per team.
///
/// Examples:
///   teaminv team create "Night Shift"
///   teaminv agent import exports/alice.json
///   teaminv agent import exports/ --team team-1714557600000-k3x9a
///   teaminv keys --search fountain --center 52.52,13.405 --sort distance
///   teaminv import-teams shared.json --policy merge
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path of the team store
    ///
    /// Overrides the store path from .teaminv.toml.
    #[arg(short, long, value_name = "FILE", env = "TEAMINV_STORE", global = true)]
    pub store: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .teaminv.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Generate a default .teaminv.toml configuration file
    InitConfig,

    /// Manage teams
    #[command(subcommand)]
    Team(TeamCommand),

    /// Manage agents inside a team
    #[command(subcommand)]
    Agent(AgentCommand),

    /// Write the aggregated inventory report
    Report {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Output format (markdown, json)
        #[arg(long, value_name = "FORMAT")]
        format: Option<OutputFormat>,

        /// Output file path (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Map center for key distances, as LAT,LNG
        #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
        center: Option<LatLng>,
    },

    /// List aggregated keys
    Keys {
        #[command(flatten)]
        scope: ScopeArgs,

        /// Only portals whose title contains this text
        #[arg(long, value_name = "TEXT")]
        search: Option<String>,

        /// Map center for distances, as LAT,LNG
        #[arg(long, value_name = "LAT,LNG", allow_hyphen_values = true)]
        center: Option<LatLng>,

        /// Sort column
        #[arg(long, default_value = "title")]
        sort: KeySort,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Only portals within this distance of --center, e.g. "1.5 km"
        #[arg(long, value_name = "DISTANCE", requires = "center")]
        within: Option<String>,
    },

    /// Export all teams as a JSON file
    Export {
        /// Output file (defaults to team-inventory-<timestamp>.json)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Import a team export file
    ImportTeams {
        /// Team export JSON
        file: PathBuf,

        /// How to combine with stored teams (required when teams exist)
        #[arg(long, value_name = "POLICY")]
        policy: Option<MergePolicy>,
    },

    /// Spreadsheet payloads
    #[command(subcommand)]
    Sheets(SheetsCommand),

    /// Print key markers for the visible portals as JSON
    Markers {
        /// File listing visible portal guids, one per line
        #[arg(long, value_name = "FILE")]
        visible: PathBuf,

        /// File listing portals that left the view since, one per line
        #[arg(long, value_name = "FILE")]
        removed: Option<PathBuf>,

        /// Currently selected portal
        #[arg(long, value_name = "GUID")]
        selected: Option<String>,

        /// Label style for this call (defaults to the stored mode)
        #[arg(long, value_name = "MODE")]
        mode: Option<MapDisplayMode>,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Show team key details for one portal
    Portal {
        guid: String,

        #[command(flatten)]
        scope: ScopeArgs,
    },

    /// Set how key markers are labelled
    DisplayMode { mode: MapDisplayMode },
}

#[derive(Subcommand, Debug, Clone)]
pub enum TeamCommand {
    /// Create a team and select it
    Create { name: String },

    /// Delete a team and all of its agent data
    Delete { id: String },

    /// List teams
    List,

    /// Select the team used by default
    Select {
        /// Team id
        #[arg(required_unless_present = "none")]
        id: Option<String>,

        /// Clear the selection (show all teams)
        #[arg(long, conflicts_with = "id")]
        none: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum AgentCommand {
    /// Import inventory exports (files or directories)
    Import {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,

        /// Target team (defaults to the selected team)
        #[arg(long, value_name = "ID")]
        team: Option<String>,

        /// Agent name, overriding the one in the export
        #[arg(long, value_name = "NAME")]
        name: Option<String>,

        /// Name of the first team, when no team exists yet
        #[arg(long, value_name = "NAME")]
        new_team: Option<String>,
    },

    /// Remove an agent from a team
    Remove { team: String, name: String },

    /// List agents of a team
    List {
        /// Team id (defaults to the selected team)
        #[arg(long, value_name = "ID")]
        team: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum SheetsCommand {
    /// Write the values update body for the shared tab
    Push {
        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Apply a values read response pulled from the shared tab
    Pull {
        /// Saved read response JSON
        file: PathBuf,

        /// How to combine with stored teams (required when teams exist)
        #[arg(long, value_name = "POLICY")]
        policy: Option<MergePolicy>,
    },
}

/// Which agents a view covers.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScopeArgs {
    /// Team id (defaults to the selected team)
    #[arg(long, value_name = "ID", conflicts_with = "all")]
    pub team: Option<String>,

    /// All teams, ignoring the selection
    #[arg(long)]
    pub all: bool,
}

/// Output format for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Team(TeamCommand::Create { name }) if name.trim().is_empty() => {
                Err("Team name is required".to_string())
            }
            Command::Agent(AgentCommand::Import { name, new_team, .. }) => {
                if matches!(name, Some(n) if n.trim().is_empty()) {
                    return Err("Agent name must not be empty".to_string());
                }
                if matches!(new_team, Some(n) if n.trim().is_empty()) {
                    return Err("Team name is required".to_string());
                }
                Ok(())
            }
            Command::ImportTeams { file, .. } | Command::Sheets(SheetsCommand::Pull { file, .. }) => {
                if !file.is_file() {
                    return Err(format!("File does not exist: {}", file.display()));
                }
                Ok(())
            }
            Command::Markers {
                visible, removed, ..
            } => {
                for file in std::iter::once(visible).chain(removed) {
                    if !file.is_file() {
                        return Err(format!("File does not exist: {}", file.display()));
                    }
                }
                Ok(())
            }
            Command::Keys {
                within: Some(within),
                ..
            } if parse_distance(within) <= 0.0 => {
                Err(format!("Invalid distance: {} (use e.g. \"500 m\" or \"2 km\")", within))
            }
            _ => Ok(()),
        }
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("teaminv").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_keys_command() {
        let args = parse(&["keys", "--all", "--center", "-33.9,18.4", "--sort", "distance", "--desc"]);
        match args.command {
            Command::Keys {
                scope,
                center,
                sort,
                desc,
                ..
            } => {
                assert!(scope.all);
                assert_eq!(center, Some(LatLng { lat: -33.9, lng: 18.4 }));
                assert_eq!(sort, KeySort::Distance);
                assert!(desc);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_policy() {
        let args = parse(&["import-teams", "shared.json", "--policy", "merge"]);
        match args.command {
            Command::ImportTeams { policy, .. } => assert_eq!(policy, Some(MergePolicy::Union)),
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(Args::try_parse_from(["teaminv", "import-teams", "x.json", "--policy", "union"]).is_err());
    }

    #[test]
    fn test_scope_conflict() {
        assert!(Args::try_parse_from(["teaminv", "report", "--all", "--team", "t1"]).is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let args = parse(&["-v", "-q", "team", "list"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_empty_team_name() {
        let args = parse(&["team", "create", "  "]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_missing_import_file() {
        let args = parse(&["import-teams", "/no/such/file.json"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_within_distance() {
        let args = parse(&["keys", "--center", "52.5,13.4", "--within", "2 km"]);
        assert!(args.validate().is_ok());

        let args = parse(&["keys", "--center", "52.5,13.4", "--within", "near"]);
        assert!(args.validate().is_err());

        let args = parse(&["keys", "--center", "52.5,13.4", "--within", "1.5 km extra"]);
        assert!(args.validate().is_err());

        assert!(Args::try_parse_from(["teaminv", "keys", "--within", "2 km"]).is_err());
    }

    #[test]
    fn test_validation_missing_removed_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let visible = dir.path().join("visible.txt");
        std::fs::write(&visible, "g1\n").unwrap();
        let visible = visible.to_string_lossy().to_string();

        let args = parse(&["markers", "--visible", &visible]);
        assert!(args.validate().is_ok());

        let args = parse(&["markers", "--visible", &visible, "--removed", "/no/such/file.txt"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = parse(&["team", "list"]);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
