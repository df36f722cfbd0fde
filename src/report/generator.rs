//! Inventory report generation.
//!
//! Renders the aggregated inventory of a set of agents as Markdown or JSON.

use crate::analysis::catalog::{display_name, group_items};
use crate::analysis::InventorySummary;
use crate::models::{AgentInventory, InventoryField};
use crate::report::keys::{key_rows, KeyQuery, KeyRow, KeySort, LatLng};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Everything a report is rendered from.
#[derive(Debug, Clone)]
pub struct InventoryReport<'a> {
    /// What the report covers, e.g. `Team Alpha` or `All teams`.
    pub scope: String,
    pub generated_at: DateTime<Utc>,
    pub agents: &'a [AgentInventory],
    pub summary: InventorySummary,
    /// Reference point for key distances.
    pub center: Option<LatLng>,
}

impl<'a> InventoryReport<'a> {
    pub fn new(scope: String, agents: &'a [AgentInventory], center: Option<LatLng>) -> Self {
        Self {
            scope,
            generated_at: Utc::now(),
            agents,
            summary: InventorySummary::from_agents(agents),
            center,
        }
    }

    fn key_query(&self) -> KeyQuery {
        KeyQuery {
            search: None,
            center: self.center,
            sort: if self.center.is_some() {
                KeySort::Distance
            } else {
                KeySort::Title
            },
            descending: false,
            within_m: None,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &InventoryReport<'_>) -> String {
    let mut output = String::new();

    output.push_str("# Team Inventory\n\n");
    output.push_str(&generate_metadata_section(report));
    output.push_str(&generate_totals_section(&report.summary));

    for field in InventoryField::ALL {
        output.push_str(&generate_category_section(field, &report.summary));
    }

    let rows = key_rows(&report.summary.keys, &report.key_query());
    output.push_str(&generate_keys_section(&rows, report.center.is_some()));
    output.push_str(&generate_agents_section(report.agents));

    output
}

fn generate_metadata_section(report: &InventoryReport<'_>) -> String {
    let mut section = String::new();

    section.push_str(&format!("- **Scope:** {}\n", report.scope));
    section.push_str(&format!("- **Agents:** {}\n", report.agents.len()));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        report.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if let Some(center) = report.center {
        section.push_str(&format!("- **Center:** {:.6}, {:.6}\n", center.lat, center.lng));
    }
    section.push('\n');

    section
}

fn generate_totals_section(summary: &InventorySummary) -> String {
    let mut section = String::new();

    section.push_str("## Totals\n\n");
    section.push_str("| Equipment | Keys | Other | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | **{}** |\n\n",
        summary.equipment_total(),
        summary.keys_total(),
        summary.other_total(),
        summary.grand_total()
    ));

    section
}

fn generate_category_section(field: InventoryField, summary: &InventorySummary) -> String {
    let items = summary.items(field);
    let groups = group_items(field, items);
    let total = groups.iter().fold(0u64, |sum, g| sum.saturating_add(g.total()));

    let mut section = String::new();
    section.push_str(&format!("## {} ({})\n\n", field, total));

    if items.is_empty() {
        section.push_str("_None._\n\n");
        return section;
    }

    let show_titles = groups.len() > 1;
    for group in groups.iter().filter(|g| !g.is_empty()) {
        if show_titles {
            section.push_str(&format!("### {} ({})\n\n", group.title, group.total()));
        }
        section.push_str("| Item | Total | Agents |\n");
        section.push_str("|:---|:---:|:---|\n");
        for (code, item) in &group.items {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                display_name(code),
                item.total,
                format_breakdown(&item.agents)
            ));
        }
        section.push('\n');
    }

    section
}

fn generate_keys_section(rows: &[KeyRow<'_>], with_distance: bool) -> String {
    let mut section = String::new();
    let total = rows.iter().fold(0u64, |sum, r| sum.saturating_add(r.total));

    section.push_str(&format!("## Keys ({} keys, {} portals)\n\n", total, rows.len()));

    if rows.is_empty() {
        section.push_str("_None._\n\n");
        return section;
    }

    if with_distance {
        section.push_str("| Portal | Total | Agents | Distance |\n");
        section.push_str("|:---|:---:|:---|---:|\n");
    } else {
        section.push_str("| Portal | Total | Agents |\n");
        section.push_str("|:---|:---:|:---|\n");
    }

    for row in rows {
        let title = escape_cell(row.title);
        if with_distance {
            section.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                title,
                row.total,
                format_breakdown(row.agents),
                row.distance_label()
            ));
        } else {
            section.push_str(&format!(
                "| {} | {} | {} |\n",
                title,
                row.total,
                format_breakdown(row.agents)
            ));
        }
    }
    section.push('\n');

    section
}

fn generate_agents_section(agents: &[AgentInventory]) -> String {
    let mut section = String::new();

    section.push_str("## Agents\n\n");
    if agents.is_empty() {
        section.push_str("No agents yet. Import a JSON export to add data.\n\n");
        return section;
    }

    section.push_str("| Agent | Imported | Keys | Portals |\n");
    section.push_str("|:---|:---|:---:|:---:|\n");
    for agent in agents {
        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            escape_cell(&agent.name),
            agent.imported_at.format("%Y-%m-%d %H:%M"),
            agent.key_count(),
            agent.key_portals()
        ));
    }
    section.push('\n');

    section
}

/// `A: 2, B: 3`
pub fn format_breakdown(agents: &BTreeMap<String, u64>) -> String {
    agents
        .iter()
        .map(|(name, count)| format!("{}: {}", escape_cell(name), count))
        .collect::<Vec<_>>()
        .join(", ")
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[derive(Serialize)]
struct JsonReport<'a> {
    scope: &'a str,
    generated_at: DateTime<Utc>,
    agents: Vec<JsonAgent<'a>>,
    totals: JsonTotals,
    categories: Vec<JsonCategory<'a>>,
    keys: Vec<KeyRow<'a>>,
}

#[derive(Serialize)]
struct JsonAgent<'a> {
    name: &'a str,
    imported_at: DateTime<Utc>,
    key_count: u64,
    key_portals: usize,
}

#[derive(Serialize)]
struct JsonTotals {
    equipment: u64,
    keys: u64,
    other: u64,
    total: u64,
}

#[derive(Serialize)]
struct JsonCategory<'a> {
    category: InventoryField,
    total: u64,
    groups: Vec<JsonGroup<'a>>,
}

#[derive(Serialize)]
struct JsonGroup<'a> {
    title: &'static str,
    total: u64,
    items: Vec<JsonItem<'a>>,
}

#[derive(Serialize)]
struct JsonItem<'a> {
    code: &'a str,
    name: String,
    total: u64,
    agents: &'a BTreeMap<String, u64>,
}

/// Generate a JSON report.
pub fn generate_json_report(report: &InventoryReport<'_>) -> Result<String> {
    let summary = &report.summary;

    let categories = InventoryField::ALL
        .iter()
        .map(|&field| {
            let groups: Vec<JsonGroup<'_>> = group_items(field, summary.items(field))
                .into_iter()
                .map(|group| JsonGroup {
                    title: group.title,
                    total: group.total(),
                    items: group
                        .items
                        .into_iter()
                        .map(|(code, item)| JsonItem {
                            code,
                            name: display_name(code),
                            total: item.total,
                            agents: &item.agents,
                        })
                        .collect(),
                })
                .collect();
            JsonCategory {
                category: field,
                total: groups.iter().fold(0u64, |sum, g| sum.saturating_add(g.total)),
                groups,
            }
        })
        .collect();

    let json = JsonReport {
        scope: &report.scope,
        generated_at: report.generated_at,
        agents: report
            .agents
            .iter()
            .map(|a| JsonAgent {
                name: &a.name,
                imported_at: a.imported_at,
                key_count: a.key_count(),
                key_portals: a.key_portals(),
            })
            .collect(),
        totals: JsonTotals {
            equipment: summary.equipment_total(),
            keys: summary.keys_total(),
            other: summary.other_total(),
            total: summary.grand_total(),
        },
        categories,
        keys: key_rows(&summary.keys, &report.key_query()),
    };

    Ok(serde_json::to_string_pretty(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::{create_agent, parse_snapshot};

    fn agents() -> Vec<AgentInventory> {
        let a = parse_snapshot(
            r#"{
                "resonators": {"RESONATOR-8": 2},
                "weapons": {"EMP_BURSTER-8": 5, "ADA-0": 1},
                "keys": [{"guid": "g1", "title": "Fountain | Park", "lat": 52.52, "lng": 13.405, "total": 3}]
            }"#,
        )
        .unwrap();
        let b = parse_snapshot(r#"{"resonators": {"RESONATOR-8": 3}, "cubes": {"POWER_CUBE-8": 4}}"#)
            .unwrap();
        vec![
            create_agent(a, "A".to_string(), Utc::now()),
            create_agent(b, "B".to_string(), Utc::now()),
        ]
    }

    #[test]
    fn test_markdown_report_sections() {
        let agents = agents();
        let report = InventoryReport::new("Team Alpha".to_string(), &agents, None);
        let md = generate_markdown_report(&report);

        assert!(md.starts_with("# Team Inventory"));
        assert!(md.contains("- **Scope:** Team Alpha"));
        assert!(md.contains("| 11 | 3 | 4 | **18** |"));
        assert!(md.contains("| Resonator L8 | 5 | A: 2, B: 3 |"));
        assert!(md.contains("### Bursters (5)"));
        assert!(md.contains("| ADA Refactor | 1 | A: 1 |"));
        assert!(md.contains("## Boosts (0)"));
        assert!(md.contains("| Fountain \\| Park | 3 | A: 3 |"));
        assert!(!md.contains("Distance"));
    }

    #[test]
    fn test_markdown_report_with_center() {
        let agents = agents();
        let center = LatLng { lat: 52.53, lng: 13.405 };
        let report = InventoryReport::new("All teams".to_string(), &agents, Some(center));
        let md = generate_markdown_report(&report);

        assert!(md.contains("| Portal | Total | Agents | Distance |"));
        assert!(md.contains("1.1 km"));
    }

    #[test]
    fn test_empty_report() {
        let report = InventoryReport::new("All teams".to_string(), &[], None);
        let md = generate_markdown_report(&report);
        assert!(md.contains("No agents yet"));
        assert!(md.contains("## Keys (0 keys, 0 portals)"));
    }

    #[test]
    fn test_json_report() {
        let agents = agents();
        let report = InventoryReport::new("Team Alpha".to_string(), &agents, None);
        let json = generate_json_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["totals"]["total"], 18);
        assert_eq!(value["agents"].as_array().map(|a| a.len()), Some(2));
        assert_eq!(value["categories"][0]["category"], "resonators");
        assert_eq!(value["categories"][0]["groups"][0]["items"][0]["agents"]["B"], 3);
        assert_eq!(value["keys"][0]["guid"], "g1");
        assert!(value["keys"][0].get("distance_m").is_none());
    }
}
