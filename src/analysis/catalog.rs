//! Item catalog: display names, grouping and ordering.
//!
//! Classification happens after aggregation and only affects presentation.
//! Codes that are not recognized fall through to a catch-all group.

use crate::models::{InventoryField, ItemWithBreakdown};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::warn;

/// Codes with a fixed display name.
const NAMED_ITEMS: &[(&str, &str)] = &[
    ("ADA-0", "ADA Refactor"),
    ("JARVIS-0", "JARVIS Virus"),
    ("FRACK", "Fracker"),
    ("BB_BATTLE", "Battle Beacon"),
    ("FW_ENL", "Fireworks ENL"),
    ("FW_RES", "Fireworks RES"),
    ("APEX", "Apex"),
    ("MEET", "Meet-Up Beacon"),
    ("TOASTY", "Toasty"),
    ("NIA", "NIA Beacon"),
    ("BN_PEACE", "Beacon Neutral Peace"),
    ("BN_BLM", "Beacon BLM"),
    ("RES", "Resistance Beacon"),
    ("ENL", "Enlightened Beacon"),
    ("POWER_CUBE-9", "Hyper Cube"),
    ("RES_SHIELD-COMMON", "Shield Common"),
    ("RES_SHIELD-RARE", "Shield Rare"),
    ("RES_SHIELD-VERY_RARE", "Shield Very Rare"),
    ("EXTRA_SHIELD-VERY_RARE", "Aegis Shield"),
    ("HEATSINK-COMMON", "Heat Sink Common"),
    ("HEATSINK-RARE", "Heat Sink Rare"),
    ("HEATSINK-VERY_RARE", "Heat Sink Very Rare"),
    ("MULTIHACK-COMMON", "Multi-Hack Common"),
    ("MULTIHACK-RARE", "Multi-Hack Rare"),
    ("MULTIHACK-VERY_RARE", "Multi-Hack Very Rare"),
    ("FORCE_AMP-RARE", "Force Amp"),
    ("TURRET-RARE", "Turret"),
    ("LINK_AMPLIFIER-RARE", "Link Amp"),
    ("ULTRA_LINK_AMP-VERY_RARE", "SoftBank Ultra Link"),
    ("TRANSMUTER_ATTACK-VERY_RARE", "ITO EN- Transmuter"),
    ("TRANSMUTER_DEFENSE-VERY_RARE", "ITO EN+ Transmuter"),
];

/// Leveled item families, `<PREFIX>-<1..8>`.
const LEVELED_ITEMS: &[(&str, &str)] = &[
    ("RESONATOR", "Resonator"),
    ("EMP_BURSTER", "Burster"),
    ("ULTRA_STRIKE", "Ultra Strike"),
    ("POWER_CUBE", "Cube"),
];

const RARITY_ORDER: &[&str] = &["COMMON", "RARE", "VERY_RARE"];
const SHIELD_TYPES: &[&str] = &["RES_SHIELD", "EXTRA_SHIELD"];
const HACK_MOD_TYPES: &[&str] = &["HEATSINK", "MULTIHACK"];
const PLAY_BOOSTS: &[&str] = &["FRACK", "APEX", "BB_BATTLE", "FW_ENL", "FW_RES"];

/// Human-readable name for an item code. Unknown codes are returned as is.
pub fn display_name(code: &str) -> String {
    if let Some((prefix, level)) = code.rsplit_once('-') {
        if let Ok(level @ 1..=8) = level.parse::<u8>() {
            if let Some((_, label)) = LEVELED_ITEMS.iter().find(|(p, _)| *p == prefix) {
                return format!("{} L{}", label, level);
            }
        }
    }

    NAMED_ITEMS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| code.to_string())
}

/// Weapon sub-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeaponKind {
    Burster,
    Strike,
    Flip,
    Other,
}

pub fn classify_weapon(code: &str) -> WeaponKind {
    if code.starts_with("EMP_BURSTER") {
        WeaponKind::Burster
    } else if code.starts_with("ULTRA_STRIKE") {
        WeaponKind::Strike
    } else if code == "ADA-0" || code == "JARVIS-0" {
        WeaponKind::Flip
    } else {
        WeaponKind::Other
    }
}

/// Mod sub-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModKind {
    Shield,
    HackMod,
    Other,
}

pub fn classify_mod(code: &str) -> ModKind {
    if code.starts_with("RES_SHIELD") || code.starts_with("EXTRA_SHIELD") {
        ModKind::Shield
    } else if code.starts_with("HEATSINK") || code.starts_with("MULTIHACK") {
        ModKind::HackMod
    } else {
        ModKind::Other
    }
}

/// Boost sub-groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoostKind {
    Play,
    Beacon,
}

pub fn classify_boost(code: &str) -> BoostKind {
    if PLAY_BOOSTS.contains(&code) {
        BoostKind::Play
    } else {
        BoostKind::Beacon
    }
}

/// Trailing number of a code, `0` when there is none.
fn numeric_suffix(code: &str) -> u64 {
    let digits_start = code
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i);

    digits_start
        .and_then(|i| code[i..].parse().ok())
        .unwrap_or(0)
}

/// Order codes by their trailing number, then by code.
pub fn cmp_numeric_suffix(a: &str, b: &str) -> Ordering {
    numeric_suffix(a)
        .cmp(&numeric_suffix(b))
        .then_with(|| a.cmp(b))
}

/// Order `<TYPE>-<RARITY>` codes by type list position, then rarity.
///
/// Types or rarities missing from the lists sort after known ones.
pub fn cmp_compound_key(a: &str, b: &str, type_order: &[&str], rarity_order: &[&str]) -> Ordering {
    fn split(code: &str) -> (&str, &str) {
        code.rsplit_once('-').unwrap_or((code, ""))
    }
    fn rank(list: &[&str], value: &str) -> usize {
        list.iter().position(|v| *v == value).unwrap_or(list.len())
    }

    let (type_a, rarity_a) = split(a);
    let (type_b, rarity_b) = split(b);

    rank(type_order, type_a)
        .cmp(&rank(type_order, type_b))
        .then_with(|| rank(rarity_order, rarity_a).cmp(&rank(rarity_order, rarity_b)))
        .then_with(|| a.cmp(b))
}

/// A titled, ordered slice of one aggregated category.
#[derive(Debug, Clone)]
pub struct ItemGroup<'a> {
    pub title: &'static str,
    pub items: Vec<(&'a str, &'a ItemWithBreakdown)>,
}

impl<'a> ItemGroup<'a> {
    fn new(title: &'static str) -> Self {
        Self {
            title,
            items: Vec::new(),
        }
    }

    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |sum, (_, item)| sum.saturating_add(item.total))
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split an aggregated category into display groups.
///
/// Catch-all groups (`Other weapons`, `Other mods`) are only returned when
/// they hold something.
pub fn group_items(
    field: InventoryField,
    items: &BTreeMap<String, ItemWithBreakdown>,
) -> Vec<ItemGroup<'_>> {
    match field {
        InventoryField::Resonators => {
            let mut group = ItemGroup::new("Resonators");
            group.items = items.iter().map(|(k, v)| (k.as_str(), v)).collect();
            group.items.sort_by(|a, b| cmp_numeric_suffix(a.0, b.0));
            vec![group]
        }
        InventoryField::Cubes => {
            let mut group = ItemGroup::new("Power Cubes");
            group.items = items.iter().map(|(k, v)| (k.as_str(), v)).collect();
            group.items.sort_by(|a, b| cmp_numeric_suffix(a.0, b.0));
            vec![group]
        }
        InventoryField::Weapons => {
            let mut bursters = ItemGroup::new("Bursters");
            let mut strikes = ItemGroup::new("Ultra Strikes");
            let mut flips = ItemGroup::new("Flip Cards");
            let mut other = ItemGroup::new("Other Weapons");

            for (code, item) in items {
                match classify_weapon(code) {
                    WeaponKind::Burster => bursters.items.push((code.as_str(), item)),
                    WeaponKind::Strike => strikes.items.push((code.as_str(), item)),
                    WeaponKind::Flip => flips.items.push((code.as_str(), item)),
                    WeaponKind::Other => {
                        warn!("Unknown weapon: {}", code);
                        other.items.push((code.as_str(), item));
                    }
                }
            }

            bursters.items.sort_by(|a, b| cmp_numeric_suffix(a.0, b.0));
            strikes.items.sort_by(|a, b| cmp_numeric_suffix(a.0, b.0));

            let mut groups = vec![bursters, strikes, flips];
            if !other.is_empty() {
                groups.push(other);
            }
            groups
        }
        InventoryField::Mods => {
            let mut shields = ItemGroup::new("Shields");
            let mut hack_mods = ItemGroup::new("Hack Mods");
            let mut other = ItemGroup::new("Other Mods");

            for (code, item) in items {
                match classify_mod(code) {
                    ModKind::Shield => shields.items.push((code.as_str(), item)),
                    ModKind::HackMod => hack_mods.items.push((code.as_str(), item)),
                    ModKind::Other => other.items.push((code.as_str(), item)),
                }
            }

            shields
                .items
                .sort_by(|a, b| cmp_compound_key(a.0, b.0, SHIELD_TYPES, RARITY_ORDER));
            hack_mods
                .items
                .sort_by(|a, b| cmp_compound_key(a.0, b.0, HACK_MOD_TYPES, RARITY_ORDER));

            let mut groups = vec![shields, hack_mods];
            if !other.is_empty() {
                groups.push(other);
            }
            groups
        }
        InventoryField::Boosts => {
            let mut play = ItemGroup::new("Play");
            let mut beacons = ItemGroup::new("Beacons");

            for (code, item) in items {
                match classify_boost(code) {
                    BoostKind::Play => play.items.push((code.as_str(), item)),
                    BoostKind::Beacon => beacons.items.push((code.as_str(), item)),
                }
            }

            vec![play, beacons]
        }
    }
}
