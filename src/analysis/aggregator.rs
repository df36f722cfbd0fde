//! Inventory aggregation.
//!
//! Folds per-agent inventories into per-item and per-portal totals with a
//! breakdown by agent name. Every function here is pure and never fails;
//! absent categories were already replaced by empty maps at ingestion.
//! Sums saturate at `u64::MAX` instead of overflowing.

use crate::models::{AgentInventory, InventoryField, ItemWithBreakdown, KeyInfo, Team};
use std::collections::BTreeMap;

/// Aggregate one item category across agents, keyed by item code.
pub fn aggregate_items(
    agents: &[AgentInventory],
    field: InventoryField,
) -> BTreeMap<String, ItemWithBreakdown> {
    let mut result: BTreeMap<String, ItemWithBreakdown> = BTreeMap::new();

    for agent in agents {
        for (code, count) in agent.field(field) {
            let entry = result.entry(code.clone()).or_default();
            entry.total = entry.total.saturating_add(*count);
            let per_agent = entry.agents.entry(agent.name.clone()).or_insert(0);
            *per_agent = per_agent.saturating_add(*count);
        }
    }

    result
}

/// Aggregate keys across agents, keyed by portal guid.
///
/// The portal identity (title, position) is taken from the first agent that
/// holds a key for the guid.
pub fn aggregate_keys(agents: &[AgentInventory]) -> BTreeMap<String, KeyInfo> {
    let mut result: BTreeMap<String, KeyInfo> = BTreeMap::new();

    for agent in agents {
        for key in &agent.keys {
            let info = result.entry(key.guid.clone()).or_insert_with(|| KeyInfo {
                portal: key.portal(),
                total: 0,
                agent_counts: BTreeMap::new(),
            });
            info.total = info.total.saturating_add(key.total);
            let per_agent = info.agent_counts.entry(agent.name.clone()).or_insert(0);
            *per_agent = per_agent.saturating_add(key.total);
        }
    }

    result
}

/// Select the agents whose inventories should be shown.
///
/// With a selected team, that team's agents. Without a selection, every
/// agent of every team, renamed `"<team> / <agent>"` so that agents sharing
/// a name across teams stay apart in breakdowns. A selection that no longer
/// resolves yields nothing.
pub fn agents_for_display(teams: &[Team], selected: Option<&str>) -> Vec<AgentInventory> {
    match selected {
        Some(id) => teams
            .iter()
            .find(|t| t.id == id)
            .map(|t| t.agents.clone())
            .unwrap_or_default(),
        None => teams
            .iter()
            .flat_map(|t| {
                t.agents.iter().map(move |a| AgentInventory {
                    name: format!("{} / {}", t.name, a.name),
                    ..a.clone()
                })
            })
            .collect(),
    }
}

/// Sum of totals in an aggregated category.
pub fn category_total(items: &BTreeMap<String, ItemWithBreakdown>) -> u64 {
    items.values().fold(0u64, |sum, i| sum.saturating_add(i.total))
}

/// Sum of totals in aggregated keys.
pub fn keys_total(keys: &BTreeMap<String, KeyInfo>) -> u64 {
    keys.values().fold(0u64, |sum, k| sum.saturating_add(k.total))
}

/// Every category of a set of agents, aggregated once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventorySummary {
    pub resonators: BTreeMap<String, ItemWithBreakdown>,
    pub weapons: BTreeMap<String, ItemWithBreakdown>,
    pub mods: BTreeMap<String, ItemWithBreakdown>,
    pub cubes: BTreeMap<String, ItemWithBreakdown>,
    pub boosts: BTreeMap<String, ItemWithBreakdown>,
    pub keys: BTreeMap<String, KeyInfo>,
}

impl InventorySummary {
    /// Aggregates all categories of the given agents.
    pub fn from_agents(agents: &[AgentInventory]) -> Self {
        Self {
            resonators: aggregate_items(agents, InventoryField::Resonators),
            weapons: aggregate_items(agents, InventoryField::Weapons),
            mods: aggregate_items(agents, InventoryField::Mods),
            cubes: aggregate_items(agents, InventoryField::Cubes),
            boosts: aggregate_items(agents, InventoryField::Boosts),
            keys: aggregate_keys(agents),
        }
    }

    /// Returns the aggregate of one category.
    pub fn items(&self, field: InventoryField) -> &BTreeMap<String, ItemWithBreakdown> {
        match field {
            InventoryField::Resonators => &self.resonators,
            InventoryField::Weapons => &self.weapons,
            InventoryField::Mods => &self.mods,
            InventoryField::Cubes => &self.cubes,
            InventoryField::Boosts => &self.boosts,
        }
    }

    /// Resonators, weapons and mods.
    pub fn equipment_total(&self) -> u64 {
        category_total(&self.resonators)
            .saturating_add(category_total(&self.weapons))
            .saturating_add(category_total(&self.mods))
    }

    /// Cubes and boosts.
    pub fn other_total(&self) -> u64 {
        category_total(&self.cubes).saturating_add(category_total(&self.boosts))
    }

    pub fn keys_total(&self) -> u64 {
        keys_total(&self.keys)
    }

    pub fn grand_total(&self) -> u64 {
        self.equipment_total()
            .saturating_add(self.keys_total())
            .saturating_add(self.other_total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemCounts, KeyItem};
    use chrono::Utc;
    use proptest::prelude::*;

    fn create_test_agent(name: &str) -> AgentInventory {
        AgentInventory {
            name: name.to_string(),
            imported_at: Utc::now(),
            keys: Vec::new(),
            resonators: ItemCounts::new(),
            weapons: ItemCounts::new(),
            mods: ItemCounts::new(),
            cubes: ItemCounts::new(),
            boosts: ItemCounts::new(),
        }
    }

    fn key(guid: &str, title: &str, total: u64) -> KeyItem {
        KeyItem {
            guid: guid.to_string(),
            title: title.to_string(),
            lat: 1.0,
            lng: 2.0,
            total,
        }
    }

    fn with_resonators(name: &str, items: &[(&str, u64)]) -> AgentInventory {
        let mut agent = create_test_agent(name);
        agent.resonators = items.iter().map(|(k, v)| (k.to_string(), *v)).collect();
        agent
    }

    #[test]
    fn test_aggregate_items_example() {
        let agents = vec![
            with_resonators("A", &[("RESONATOR-8", 2)]),
            with_resonators("B", &[("RESONATOR-8", 3)]),
        ];

        let result = aggregate_items(&agents, InventoryField::Resonators);

        assert_eq!(result.len(), 1);
        let r8 = &result["RESONATOR-8"];
        assert_eq!(r8.total, 5);
        assert_eq!(r8.agents.get("A"), Some(&2));
        assert_eq!(r8.agents.get("B"), Some(&3));
    }

    #[test]
    fn test_aggregate_items_selects_field() {
        let mut agent = with_resonators("A", &[("RESONATOR-8", 2)]);
        agent.cubes.insert("POWER_CUBE-8".to_string(), 7);

        let cubes = aggregate_items(&[agent], InventoryField::Cubes);
        assert_eq!(cubes.len(), 1);
        assert_eq!(cubes["POWER_CUBE-8"].total, 7);
    }

    #[test]
    fn test_zero_count_and_unknown_codes_pass_through() {
        let agents = vec![with_resonators("A", &[("SOMETHING_NEW", 0)])];
        let result = aggregate_items(&agents, InventoryField::Resonators);
        assert_eq!(result["SOMETHING_NEW"].total, 0);
        assert_eq!(category_total(&result), 0);
    }

    #[test]
    fn test_huge_counts_saturate() {
        let big = u64::MAX / 2 + 1;
        let mut a = with_resonators("A", &[("RESONATOR-8", big)]);
        a.keys = vec![key("g1", "Fountain", big)];
        let mut b = with_resonators("B", &[("RESONATOR-8", big)]);
        b.keys = vec![key("g1", "Fountain", big)];
        b.cubes.insert("POWER_CUBE-8".to_string(), big);

        let items = aggregate_items(&[a.clone(), b.clone()], InventoryField::Resonators);
        assert_eq!(items["RESONATOR-8"].total, u64::MAX);
        assert_eq!(items["RESONATOR-8"].agents["A"], big);
        assert_eq!(category_total(&items), u64::MAX);

        let keys = aggregate_keys(&[a.clone(), b.clone()]);
        assert_eq!(keys["g1"].total, u64::MAX);

        let summary = InventorySummary::from_agents(&[a, b]);
        assert_eq!(summary.grand_total(), u64::MAX);
    }

    #[test]
    fn test_aggregate_keys_first_portal_identity_wins() {
        let mut a = create_test_agent("A");
        a.keys = vec![key("g1", "Fountain", 2)];
        let mut b = create_test_agent("B");
        b.keys = vec![key("g1", "Fountain (renamed)", 4), key("g2", "Statue", 1)];

        let keys = aggregate_keys(&[a, b]);

        assert_eq!(keys.len(), 2);
        let g1 = &keys["g1"];
        assert_eq!(g1.portal.title, "Fountain");
        assert_eq!(g1.total, 6);
        assert_eq!(g1.agent_counts.get("A"), Some(&2));
        assert_eq!(g1.agent_counts.get("B"), Some(&4));
        assert_eq!(keys_total(&keys), 7);
    }

    #[test]
    fn test_aggregation_is_order_independent() {
        let mut a = with_resonators("A", &[("RESONATOR-8", 2), ("RESONATOR-7", 1)]);
        a.keys = vec![key("g1", "Fountain", 2)];
        let mut b = with_resonators("B", &[("RESONATOR-8", 3)]);
        b.keys = vec![key("g1", "Fountain", 1), key("g2", "Statue", 5)];
        let c = with_resonators("C", &[("RESONATOR-1", 9)]);

        let forward = vec![a.clone(), b.clone(), c.clone()];
        let backward = vec![c, b, a];

        assert_eq!(
            aggregate_items(&forward, InventoryField::Resonators),
            aggregate_items(&backward, InventoryField::Resonators)
        );
        assert_eq!(aggregate_keys(&forward), aggregate_keys(&backward));
    }

    #[test]
    fn test_agents_for_display() {
        let mut alpha = Team::new("t1".to_string(), "Alpha".to_string());
        alpha.upsert_agent(create_test_agent("A"));
        let mut beta = Team::new("t2".to_string(), "Beta".to_string());
        beta.upsert_agent(create_test_agent("A"));
        let teams = vec![alpha, beta];

        let selected = agents_for_display(&teams, Some("t2"));
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "A");

        let all = agents_for_display(&teams, None);
        let names: Vec<_> = all.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha / A", "Beta / A"]);

        assert!(agents_for_display(&teams, Some("missing")).is_empty());
    }

    #[test]
    fn test_inventory_summary_totals() {
        let mut a = with_resonators("A", &[("RESONATOR-8", 2)]);
        a.weapons.insert("EMP_BURSTER-8".to_string(), 4);
        a.mods.insert("RES_SHIELD-RARE".to_string(), 1);
        a.cubes.insert("POWER_CUBE-8".to_string(), 3);
        a.boosts.insert("APEX".to_string(), 1);
        a.keys = vec![key("g1", "Fountain", 6)];

        let summary = InventorySummary::from_agents(&[a]);
        assert_eq!(summary.equipment_total(), 7);
        assert_eq!(summary.other_total(), 4);
        assert_eq!(summary.keys_total(), 6);
        assert_eq!(summary.grand_total(), 17);
        assert_eq!(summary.items(InventoryField::Weapons).len(), 1);
    }

    fn arb_agents() -> impl Strategy<Value = Vec<AgentInventory>> {
        let codes = prop::sample::select(vec!["RESONATOR-8", "RESONATOR-7", "XMP-9", "MYSTERY"]);
        let guids = prop::sample::select(vec!["g1", "g2", "g3"]);
        let agent = (
            "[A-E]",
            prop::collection::btree_map(codes.prop_map(String::from), 0u64..50, 0..4),
            prop::collection::vec((guids, 0u64..20), 0..4),
        )
            .prop_map(|(name, resonators, keys)| {
                let mut agent = create_test_agent(&name);
                agent.resonators = resonators;
                agent.keys = keys
                    .into_iter()
                    .map(|(guid, total)| key(guid, "Portal", total))
                    .collect();
                agent
            });
        prop::collection::vec(agent, 0..6)
    }

    proptest! {
        #[test]
        fn prop_totals_equal_breakdown_sums(agents in arb_agents()) {
            for item in aggregate_items(&agents, InventoryField::Resonators).values() {
                prop_assert_eq!(item.total, item.agents.values().sum::<u64>());
            }
            for info in aggregate_keys(&agents).values() {
                prop_assert_eq!(info.total, info.agent_counts.values().sum::<u64>());
            }
        }

        #[test]
        fn prop_reversing_agents_keeps_results(agents in arb_agents()) {
            let mut reversed = agents.clone();
            reversed.reverse();
            prop_assert_eq!(
                aggregate_items(&agents, InventoryField::Resonators),
                aggregate_items(&reversed, InventoryField::Resonators)
            );
            prop_assert_eq!(aggregate_keys(&agents), aggregate_keys(&reversed));
        }
    }
}
