//! Data models for team inventories.
//!
//! This module contains the stored records (agents, teams), the derived
//! aggregate records, and the external snapshot format produced by the
//! game client's inventory export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Item code (or portal guid) to count.
pub type ItemCounts = BTreeMap<String, u64>;

/// A real-world location that keys unlock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portal {
    pub guid: String,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
}

/// Keys held by one agent for one portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyItem {
    pub guid: String,
    pub title: String,
    pub lat: f64,
    pub lng: f64,
    pub total: u64,
}

impl KeyItem {
    /// Returns the portal identity this key belongs to.
    pub fn portal(&self) -> Portal {
        Portal {
            guid: self.guid.clone(),
            title: self.title.clone(),
            lat: self.lat,
            lng: self.lng,
        }
    }
}

/// Inventory categories that hold plain item counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryField {
    Resonators,
    Weapons,
    Mods,
    Cubes,
    Boosts,
}

impl InventoryField {
    /// All categories in display order.
    pub const ALL: [InventoryField; 5] = [
        InventoryField::Resonators,
        InventoryField::Weapons,
        InventoryField::Mods,
        InventoryField::Cubes,
        InventoryField::Boosts,
    ];
}

impl fmt::Display for InventoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InventoryField::Resonators => write!(f, "Resonators"),
            InventoryField::Weapons => write!(f, "Weapons"),
            InventoryField::Mods => write!(f, "Mods"),
            InventoryField::Cubes => write!(f, "Cubes"),
            InventoryField::Boosts => write!(f, "Boosts"),
        }
    }
}

/// One agent's imported inventory.
///
/// Replaced wholesale when the same agent name is imported again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInventory {
    pub name: String,
    pub imported_at: DateTime<Utc>,
    #[serde(default)]
    pub keys: Vec<KeyItem>,
    #[serde(default)]
    pub resonators: ItemCounts,
    #[serde(default)]
    pub weapons: ItemCounts,
    #[serde(default)]
    pub mods: ItemCounts,
    #[serde(default)]
    pub cubes: ItemCounts,
    #[serde(default)]
    pub boosts: ItemCounts,
}

impl AgentInventory {
    /// Returns the counts for one category.
    pub fn field(&self, field: InventoryField) -> &ItemCounts {
        match field {
            InventoryField::Resonators => &self.resonators,
            InventoryField::Weapons => &self.weapons,
            InventoryField::Mods => &self.mods,
            InventoryField::Cubes => &self.cubes,
            InventoryField::Boosts => &self.boosts,
        }
    }

    /// Total number of keys across all portals.
    pub fn key_count(&self) -> u64 {
        self.keys.iter().fold(0u64, |sum, k| sum.saturating_add(k.total))
    }

    /// Number of distinct portals this agent holds keys for.
    pub fn key_portals(&self) -> usize {
        self.keys.len()
    }
}

/// A named group of agents whose inventories are pooled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub agents: Vec<AgentInventory>,
}

impl Team {
    /// Creates an empty team.
    pub fn new(id: String, name: String) -> Self {
        Self {
            id,
            name,
            agents: Vec::new(),
        }
    }

    /// Inserts an agent, replacing any agent with the same name.
    ///
    /// Returns `true` when an existing agent was replaced.
    pub fn upsert_agent(&mut self, agent: AgentInventory) -> bool {
        match self.agents.iter_mut().find(|a| a.name == agent.name) {
            Some(existing) => {
                *existing = agent;
                true
            }
            None => {
                self.agents.push(agent);
                false
            }
        }
    }

    /// Removes the agent with the given name. Returns `true` if one was removed.
    pub fn remove_agent(&mut self, name: &str) -> bool {
        let before = self.agents.len();
        self.agents.retain(|a| a.name != name);
        self.agents.len() != before
    }

    /// Label used in team listings, e.g. `Alpha (2 agents)`.
    pub fn label(&self) -> String {
        let n = self.agents.len();
        format!("{} ({} agent{})", self.name, n, if n == 1 { "" } else { "s" })
    }
}

/// Aggregated keys for one portal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyInfo {
    pub portal: Portal,
    pub total: u64,
    pub agent_counts: BTreeMap<String, u64>,
}

/// Aggregated count of one item code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemWithBreakdown {
    pub total: u64,
    pub agents: BTreeMap<String, u64>,
}

/// Inventory export as written by the game client companion.
///
/// Every field is optional; ingestion fills the gaps.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgentSnapshot {
    pub agent: Option<String>,
    pub keys: Option<Vec<KeyItem>>,
    pub resonators: Option<ItemCounts>,
    pub weapons: Option<ItemCounts>,
    pub mods: Option<ItemCounts>,
    pub cubes: Option<ItemCounts>,
    pub boosts: Option<ItemCounts>,
}

/// How key markers are labelled on the map.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum MapDisplayMode {
    /// Plain key count
    #[default]
    Count,
    /// Key glyph next to the count
    Icon,
}

impl fmt::Display for MapDisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MapDisplayMode::Count => write!(f, "count"),
            MapDisplayMode::Icon => write!(f, "icon"),
        }
    }
}
