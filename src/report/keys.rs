//! Keys table: search, distance and ordering of aggregated keys.

use crate::models::KeyInfo;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Mean earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A point on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl FromStr for LatLng {
    type Err = String;

    /// Parses `"<lat>,<lng>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| format!("expected LAT,LNG but got '{}'", s))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| format!("invalid longitude '{}'", lng.trim()))?;

        if !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude out of range: {}", lat));
        }
        if !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude out of range: {}", lng));
        }
        Ok(Self { lat, lng })
    }
}

impl LatLng {
    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &LatLng) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (other.lng - self.lng).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

/// Format a distance like the keys table shows it.
pub fn format_distance(meters: f64) -> String {
    if meters >= 10_000.0 {
        format!("{} km", (meters / 1000.0).round())
    } else if meters >= 1000.0 {
        format!("{} km", (meters / 100.0).round() / 10.0)
    } else {
        format!("{} m", meters.round())
    }
}

/// Parse a formatted distance back to meters. Unparseable text is `0`.
pub fn parse_distance(text: &str) -> f64 {
    let text = text.trim();
    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(split);
    let unit = unit.trim_start();
    if unit.is_empty() || !unit.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return 0.0;
    }

    match number.parse::<f64>() {
        Ok(value) if unit.eq_ignore_ascii_case("km") => value * 1000.0,
        Ok(value) => value,
        Err(_) => 0.0,
    }
}

/// Column to order keys by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum KeySort {
    /// Portal title
    #[default]
    Title,
    /// Team total
    Count,
    /// Distance from --center
    Distance,
}

/// One row of the keys table.
#[derive(Debug, Clone, Serialize)]
pub struct KeyRow<'a> {
    pub guid: &'a str,
    pub title: &'a str,
    pub lat: f64,
    pub lng: f64,
    pub total: u64,
    pub agents: &'a BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl KeyRow<'_> {
    pub fn distance_label(&self) -> String {
        self.distance_m.map(format_distance).unwrap_or_default()
    }
}

/// Filters and ordering for the keys table.
#[derive(Debug, Clone, Default)]
pub struct KeyQuery {
    pub search: Option<String>,
    pub center: Option<LatLng>,
    pub sort: KeySort,
    pub descending: bool,
    /// Keep only portals within this many meters of `center`.
    pub within_m: Option<f64>,
}

/// Build the keys table from aggregated keys.
///
/// `search` matches portal titles case-insensitively. Sorting by distance
/// without a center falls back to title order, and `within_m` is ignored
/// without a center.
pub fn key_rows<'a>(keys: &'a BTreeMap<String, KeyInfo>, query: &KeyQuery) -> Vec<KeyRow<'a>> {
    let needle = query
        .search
        .as_deref()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    let mut rows: Vec<KeyRow<'a>> = keys
        .values()
        .filter(|info| match &needle {
            Some(n) => info.portal.title.to_lowercase().contains(n),
            None => true,
        })
        .map(|info| KeyRow {
            guid: &info.portal.guid,
            title: &info.portal.title,
            lat: info.portal.lat,
            lng: info.portal.lng,
            total: info.total,
            agents: &info.agent_counts,
            distance_m: query.center.map(|c| {
                c.distance_to(&LatLng {
                    lat: info.portal.lat,
                    lng: info.portal.lng,
                })
            }),
        })
        .filter(|row: &KeyRow<'a>| match (row.distance_m, query.within_m) {
            (Some(d), Some(max)) => d <= max,
            _ => true,
        })
        .collect();

    rows.sort_by(|a, b| {
        let by_title = || a.title.to_lowercase().cmp(&b.title.to_lowercase()).then_with(|| a.guid.cmp(b.guid));
        let ordering = match query.sort {
            KeySort::Title => by_title(),
            KeySort::Count => a.total.cmp(&b.total).then_with(by_title),
            KeySort::Distance => match (a.distance_m, b.distance_m) {
                (Some(da), Some(db)) => da.partial_cmp(&db).unwrap_or(Ordering::Equal).then_with(by_title),
                _ => by_title(),
            },
        };
        if query.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Portal;

    fn info(guid: &str, title: &str, lat: f64, lng: f64, total: u64) -> (String, KeyInfo) {
        (
            guid.to_string(),
            KeyInfo {
                portal: Portal {
                    guid: guid.to_string(),
                    title: title.to_string(),
                    lat,
                    lng,
                },
                total,
                agent_counts: BTreeMap::from([("A".to_string(), total)]),
            },
        )
    }

    fn keys() -> BTreeMap<String, KeyInfo> {
        BTreeMap::from([
            info("g1", "Fountain", 52.5200, 13.4050, 3),
            info("g2", "old church", 52.5300, 13.4050, 10),
            info("g3", "Church Tower", 52.6000, 13.4050, 1),
        ])
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(12.4), "12 m");
        assert_eq!(format_distance(999.6), "1000 m");
        assert_eq!(format_distance(1234.0), "1.2 km");
        assert_eq!(format_distance(25_400.0), "25 km");
    }

    #[test]
    fn test_parse_distance() {
        assert_eq!(parse_distance("12 m"), 12.0);
        assert_eq!(parse_distance("1.2 km"), 1200.0);
        assert_eq!(parse_distance("25km"), 25_000.0);
        assert_eq!(parse_distance("far away"), 0.0);
        assert_eq!(parse_distance(""), 0.0);
        assert_eq!(parse_distance("12"), 0.0);
        assert_eq!(parse_distance("1.5 km extra"), 0.0);
        assert_eq!(parse_distance("3 m."), 0.0);
    }

    #[test]
    fn test_distance_to() {
        let a = LatLng { lat: 52.52, lng: 13.405 };
        let b = LatLng { lat: 52.53, lng: 13.405 };
        let d = a.distance_to(&b);
        assert!((d - 1112.0).abs() < 5.0, "distance was {}", d);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_parse_lat_lng() {
        let p: LatLng = "52.5, 13.4".parse().unwrap();
        assert_eq!(p, LatLng { lat: 52.5, lng: 13.4 });
        assert!("52.5".parse::<LatLng>().is_err());
        assert!("95,0".parse::<LatLng>().is_err());
        assert!("x,0".parse::<LatLng>().is_err());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let keys = keys();
        let query = KeyQuery {
            search: Some("CHURCH".to_string()),
            ..Default::default()
        };
        let rows = key_rows(&keys, &query);
        let titles: Vec<_> = rows.iter().map(|r| r.title).collect();
        assert_eq!(titles, vec!["Church Tower", "old church"]);
    }

    #[test]
    fn test_sort_by_count_descending() {
        let keys = keys();
        let query = KeyQuery {
            sort: KeySort::Count,
            descending: true,
            ..Default::default()
        };
        let rows = key_rows(&keys, &query);
        let totals: Vec<_> = rows.iter().map(|r| r.total).collect();
        assert_eq!(totals, vec![10, 3, 1]);
    }

    #[test]
    fn test_sort_by_distance() {
        let keys = keys();
        let query = KeyQuery {
            center: Some(LatLng { lat: 52.6, lng: 13.405 }),
            sort: KeySort::Distance,
            ..Default::default()
        };
        let rows = key_rows(&keys, &query);
        let guids: Vec<_> = rows.iter().map(|r| r.guid).collect();
        assert_eq!(guids, vec!["g3", "g2", "g1"]);
        assert_eq!(rows[0].distance_label(), "0 m");
    }

    #[test]
    fn test_within_filters_by_distance() {
        let keys = keys();
        let query = KeyQuery {
            center: Some(LatLng { lat: 52.52, lng: 13.405 }),
            within_m: Some(parse_distance("1.5 km")),
            ..Default::default()
        };
        let rows = key_rows(&keys, &query);
        let guids: Vec<_> = rows.iter().map(|r| r.guid).collect();
        assert_eq!(guids, vec!["g1", "g2"]);
    }

    #[test]
    fn test_distance_sort_without_center_uses_title() {
        let keys = keys();
        let query = KeyQuery {
            sort: KeySort::Distance,
            ..Default::default()
        };
        let rows = key_rows(&keys, &query);
        assert_eq!(rows[0].title, "Church Tower");
        assert!(rows[0].distance_m.is_none());
    }
}
