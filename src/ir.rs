use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::PlacesConfig;

static ADMIN_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new("[市町村]").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaceKind {
    Stayed,
    Visited,
}

impl PlaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PlaceKind::Stayed => "stayed",
            PlaceKind::Visited => "visited",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub name: String,
    pub kind: PlaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A place with a known position, ready for layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPlace {
    pub name: String,
    pub display_name: String,
    pub kind: PlaceKind,
    pub coordinates: Coordinates,
}

impl ResolvedPlace {
    pub fn new(place: &Place, coordinates: Coordinates) -> Self {
        Self {
            name: place.name.clone(),
            display_name: display_name(&place.name),
            kind: place.kind,
            coordinates,
        }
    }
}

/// Stayed places first, then visited places. A name repeated within one
/// list keeps its first occurrence. A name on both lists is kept twice, so a
/// stayed entry that fails to resolve still gets its visited attempt.
pub fn collect_places(config: &PlacesConfig) -> Vec<Place> {
    let mut places = Vec::new();
    for (names, kind) in [
        (&config.stayed, PlaceKind::Stayed),
        (&config.visited, PlaceKind::Visited),
    ] {
        let mut seen: HashSet<&str> = HashSet::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() || !seen.insert(name) {
                continue;
            }
            places.push(Place {
                name: name.to_string(),
                kind,
            });
        }
    }
    places
}

/// Label text for a place: the name without 市/町/村 characters.
pub fn display_name(name: &str) -> String {
    let stripped = ADMIN_SUFFIX_RE.replace_all(name, "");
    if stripped.trim().is_empty() {
        name.to_string()
    } else {
        stripped.into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn places_config(stayed: &[&str], visited: &[&str]) -> PlacesConfig {
        PlacesConfig {
            stayed: stayed.iter().map(|s| s.to_string()).collect(),
            visited: visited.iter().map(|s| s.to_string()).collect(),
            ..PlacesConfig::default()
        }
    }

    #[test]
    fn stayed_names_come_first() {
        let config = places_config(&["東京", "知床ウトロ"], &["京都", "知床ウトロ"]);
        let places = collect_places(&config);
        let kinds: Vec<(&str, PlaceKind)> =
            places.iter().map(|p| (p.name.as_str(), p.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("東京", PlaceKind::Stayed),
                ("知床ウトロ", PlaceKind::Stayed),
                ("京都", PlaceKind::Visited),
                ("知床ウトロ", PlaceKind::Visited),
            ]
        );
    }

    #[test]
    fn repeats_within_a_list_are_dropped() {
        let config = places_config(&["大阪", "大阪", " "], &["奈良", " 奈良", "大阪"]);
        let places = collect_places(&config);
        let names: Vec<&str> = places.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["大阪", "奈良", "大阪"]);
    }

    #[test]
    fn display_name_strips_admin_suffixes() {
        assert_eq!(display_name("下田市"), "下田");
        assert_eq!(display_name("豊郷町"), "豊郷");
        assert_eq!(display_name("さいたま市"), "さいたま");
        assert_eq!(display_name("東京"), "東京");
        assert_eq!(display_name("市"), "市");
    }

    #[test]
    fn default_lists_keep_both_kinds() {
        let places = collect_places(&PlacesConfig::default());
        assert_eq!(places.len(), 13 + 22);
    }
}
