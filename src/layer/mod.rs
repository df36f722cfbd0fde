//! Key marker layer.
//!
//! Decides which visible portals get a key marker and what the marker says.
//! Drawing is left to the map host.
//! Other layers that already mark a portal are consulted through a
//! [`MarkerRegistry`] passed in by the caller.

use crate::models::{KeyInfo, MapDisplayMode};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// Lets another collaborator claim portals so this layer leaves them alone.
pub trait MarkerRegistry {
    /// Returns `true` when the portal's marker is suppressed.
    fn is_claimed(&self, guid: &str) -> bool;
}

/// Registry that claims nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClaims;

impl MarkerRegistry for NoClaims {
    fn is_claimed(&self, _guid: &str) -> bool {
        false
    }
}

/// Registry backed by a fixed set of portal guids.
#[derive(Debug, Clone, Default)]
pub struct ClaimedPortals(HashSet<String>);

impl ClaimedPortals {
    pub fn new<I: IntoIterator<Item = String>>(guids: I) -> Self {
        Self(guids.into_iter().collect())
    }
}

impl MarkerRegistry for ClaimedPortals {
    fn is_claimed(&self, guid: &str) -> bool {
        self.0.contains(guid)
    }
}

/// A marker to draw at a portal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub guid: String,
    pub lat: f64,
    pub lng: f64,
    pub label: String,
    /// Per-agent lines, only filled while the portal is selected.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

/// Markers for the portals currently on the map.
#[derive(Debug, Default)]
pub struct KeyLayer {
    keys: BTreeMap<String, KeyInfo>,
    mode: MapDisplayMode,
    visible: BTreeSet<String>,
    selected: Option<String>,
    markers: BTreeMap<String, Marker>,
}

impl KeyLayer {
    pub fn new(mode: MapDisplayMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Replace the aggregated keys and rebuild every marker.
    pub fn set_keys(&mut self, keys: BTreeMap<String, KeyInfo>, registry: &dyn MarkerRegistry) {
        self.keys = keys;
        self.refresh(registry);
    }

    pub fn set_display_mode(&mut self, mode: MapDisplayMode, registry: &dyn MarkerRegistry) {
        self.mode = mode;
        self.refresh(registry);
    }

    /// A portal came into view.
    pub fn portal_added(&mut self, guid: &str, registry: &dyn MarkerRegistry) {
        self.visible.insert(guid.to_string());
        if self.markers.contains_key(guid) {
            return;
        }
        if let Some(marker) = self.build_marker(guid, registry) {
            self.markers.insert(guid.to_string(), marker);
        }
    }

    /// A portal left the view.
    pub fn portal_removed(&mut self, guid: &str) {
        self.visible.remove(guid);
        self.markers.remove(guid);
    }

    /// Selection moved from one portal to another; details follow it.
    pub fn portal_selected(
        &mut self,
        unselected: Option<&str>,
        selected: Option<&str>,
        registry: &dyn MarkerRegistry,
    ) {
        self.selected = selected.map(str::to_string);

        for guid in unselected.into_iter().chain(selected) {
            if self.markers.contains_key(guid) {
                if let Some(marker) = self.build_marker(guid, registry) {
                    self.markers.insert(guid.to_string(), marker);
                }
            }
        }
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.markers.values()
    }

    pub fn marker(&self, guid: &str) -> Option<&Marker> {
        self.markers.get(guid)
    }

    fn refresh(&mut self, registry: &dyn MarkerRegistry) {
        self.markers.clear();
        let visible: Vec<String> = self.visible.iter().cloned().collect();
        for guid in visible {
            if let Some(marker) = self.build_marker(&guid, registry) {
                self.markers.insert(guid, marker);
            }
        }
        debug!("Key layer shows {} marker(s)", self.markers.len());
    }

    fn build_marker(&self, guid: &str, registry: &dyn MarkerRegistry) -> Option<Marker> {
        let info = self.keys.get(guid)?;
        if registry.is_claimed(guid) {
            debug!("Portal {} claimed by another layer", guid);
            return None;
        }

        let label = match self.mode {
            MapDisplayMode::Count => info.total.to_string(),
            MapDisplayMode::Icon => format!("🔑 {}", info.total),
        };
        let details = if self.selected.as_deref() == Some(guid) {
            agent_lines(info)
        } else {
            Vec::new()
        };

        Some(Marker {
            guid: guid.to_string(),
            lat: info.portal.lat,
            lng: info.portal.lng,
            label,
            details,
        })
    }
}

fn agent_lines(info: &KeyInfo) -> Vec<String> {
    info.agent_counts
        .iter()
        .map(|(agent, count)| format!("{}: {}", agent, count))
        .collect()
}

/// Portal details text: team total followed by per-agent counts.
pub fn portal_details(keys: &BTreeMap<String, KeyInfo>, guid: &str) -> Option<String> {
    let info = keys.get(guid)?;
    let mut lines = vec![format!("Team: {}", info.total)];
    lines.extend(agent_lines(info).into_iter().map(|l| format!("  {}", l)));
    Some(lines.join("\n"))
}
