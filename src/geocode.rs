// Place name resolution: location cache first, geocoding service second.

use crate::cache::LocationCache;
use crate::ir::{Coordinates, Place, ResolvedPlace};
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[cfg(feature = "net")]
    #[error("geocoding request failed")]
    Request(#[source] Box<ureq::Error>),
    #[error("invalid proxy url {0}")]
    Proxy(String),
    #[error("failed to decode geocoding response")]
    Decode(#[source] std::io::Error),
    #[error("service returned a non-numeric coordinate {0:?}")]
    InvalidCoordinate(String),
}

/// Something that turns a free-text query into a position.
pub trait Geocoder {
    /// `Ok(None)` when the service has no match for the query.
    fn locate(&mut self, query: &str) -> Result<Option<Coordinates>, GeocodeError>;
}

/// One entry of a Nominatim `format=json` search response.
#[derive(Debug, Deserialize)]
pub struct NominatimHit {
    pub lat: String,
    pub lon: String,
}

pub fn parse_hits(hits: &[NominatimHit]) -> Result<Option<Coordinates>, GeocodeError> {
    let Some(hit) = hits.first() else {
        return Ok(None);
    };
    let parse = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| GeocodeError::InvalidCoordinate(raw.to_string()))
    };
    Ok(Some(Coordinates::new(parse(&hit.lat)?, parse(&hit.lon)?)))
}

#[cfg(feature = "net")]
pub use nominatim::NominatimGeocoder;

#[cfg(feature = "net")]
mod nominatim {
    use super::{GeocodeError, Geocoder, NominatimHit, parse_hits};
    use crate::config::GeocoderConfig;
    use crate::ir::Coordinates;
    use std::time::{Duration, Instant};
    use tracing::debug;

    pub struct NominatimGeocoder {
        agent: ureq::Agent,
        endpoint: String,
        min_interval: Duration,
        last_request: Option<Instant>,
    }

    impl NominatimGeocoder {
        pub fn new(config: &GeocoderConfig) -> Result<Self, GeocodeError> {
            let mut builder = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(config.timeout_secs.max(1)))
                .user_agent(&config.user_agent);
            let proxy = if config.endpoint.starts_with("https://") {
                config.https_proxy.as_ref().or(config.http_proxy.as_ref())
            } else {
                config.http_proxy.as_ref()
            };
            if let Some(url) = proxy {
                let proxy = ureq::Proxy::new(url).map_err(|_| GeocodeError::Proxy(url.clone()))?;
                builder = builder.proxy(proxy);
            }
            Ok(Self {
                agent: builder.build(),
                endpoint: config.endpoint.clone(),
                min_interval: Duration::from_millis(config.min_interval_ms),
                last_request: None,
            })
        }

        fn wait_for_slot(&mut self) {
            if let Some(last) = self.last_request {
                let elapsed = last.elapsed();
                if elapsed < self.min_interval {
                    std::thread::sleep(self.min_interval - elapsed);
                }
            }
            self.last_request = Some(Instant::now());
        }
    }

    impl Geocoder for NominatimGeocoder {
        fn locate(&mut self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
            self.wait_for_slot();
            debug!(query, endpoint = %self.endpoint, "geocoding request");
            let response = self
                .agent
                .get(&self.endpoint)
                .query("q", query)
                .query("format", "json")
                .query("limit", "1")
                .call()
                .map_err(|err| GeocodeError::Request(Box::new(err)))?;
            let hits: Vec<NominatimHit> = response.into_json().map_err(GeocodeError::Decode)?;
            parse_hits(&hits)
        }
    }
}

/// Position for one place: cache hit, else a geocoder lookup whose hit is
/// stored in the cache. Misses and failures are `None`.
pub fn lookup(
    place: &Place,
    cache: &mut LocationCache,
    geocoder: Option<&mut dyn Geocoder>,
    query_suffix: &str,
) -> Option<Coordinates> {
    if let Some(coords) = cache.get(&place.name) {
        info!(place = %place.name, kind = place.kind.as_str(), "position from cache");
        return Some(coords);
    }
    let geocoder = geocoder?;
    let query = format!("{}{}", place.name, query_suffix);
    info!(query = %query, "geocoding");
    match geocoder.locate(&query) {
        Ok(Some(coords)) => {
            info!(
                place = %place.name,
                latitude = coords.latitude,
                longitude = coords.longitude,
                "geocoded"
            );
            cache.insert(place.name.clone(), coords);
            Some(coords)
        }
        Ok(None) => {
            warn!(place = %place.name, "geocoder found no match");
            None
        }
        Err(err) => {
            warn!(place = %place.name, error = %err, "geocoding failed");
            None
        }
    }
}

/// Resolve every place, dropping the ones without a position.
pub fn resolve_places(
    places: &[Place],
    cache: &mut LocationCache,
    mut geocoder: Option<&mut dyn Geocoder>,
    query_suffix: &str,
) -> Vec<ResolvedPlace> {
    let mut resolved: Vec<ResolvedPlace> = Vec::with_capacity(places.len());
    let mut located: HashSet<String> = HashSet::new();
    for place in places {
        if located.contains(&place.name) {
            info!(
                place = %place.name,
                kind = place.kind.as_str(),
                "already on the map, skipping"
            );
            continue;
        }
        let geocoder = geocoder.as_mut().map(|g| &mut **g as &mut dyn Geocoder);
        match lookup(place, cache, geocoder, query_suffix) {
            Some(coords) => {
                located.insert(place.name.clone());
                resolved.push(ResolvedPlace::new(place, coords));
            }
            None => warn!(
                place = %place.name,
                kind = place.kind.as_str(),
                "no position, leaving it off the map"
            ),
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PlaceKind;
    use std::collections::HashMap;

    struct FakeGeocoder {
        known: HashMap<String, Coordinates>,
        queries: Vec<String>,
    }

    impl Geocoder for FakeGeocoder {
        fn locate(&mut self, query: &str) -> Result<Option<Coordinates>, GeocodeError> {
            self.queries.push(query.to_string());
            if query.starts_with("壊") {
                return Err(GeocodeError::InvalidCoordinate("x".to_string()));
            }
            Ok(self.known.get(query).copied())
        }
    }

    fn place(name: &str, kind: PlaceKind) -> Place {
        Place {
            name: name.to_string(),
            kind,
        }
    }

    #[test]
    fn parses_string_coordinates() {
        let hits = vec![NominatimHit {
            lat: "35.6812996".to_string(),
            lon: " 139.7670658".to_string(),
        }];
        assert_eq!(
            parse_hits(&hits).unwrap(),
            Some(Coordinates::new(35.6812996, 139.7670658))
        );
        assert_eq!(parse_hits(&[]).unwrap(), None);
        let bad = vec![NominatimHit {
            lat: "north".to_string(),
            lon: "1".to_string(),
        }];
        assert!(parse_hits(&bad).is_err());
    }

    #[test]
    fn decodes_nominatim_json() {
        let body = r#"[{"place_id": 1, "lat": "34.6937", "lon": "135.5023", "display_name": "大阪市"}]"#;
        let hits: Vec<NominatimHit> = serde_json::from_str(body).unwrap();
        assert_eq!(
            parse_hits(&hits).unwrap(),
            Some(Coordinates::new(34.6937, 135.5023))
        );
    }

    #[test]
    fn name_on_both_lists_is_placed_once() {
        let mut cache = LocationCache::new();
        cache.insert("知床ウトロ", Coordinates::new(44.07, 144.99));
        let mut geocoder = FakeGeocoder {
            known: HashMap::from([("鎌倉, 日本".to_string(), Coordinates::new(35.32, 139.55))]),
            queries: Vec::new(),
        };
        let places = vec![
            place("知床ウトロ", PlaceKind::Stayed),
            place("鎌倉", PlaceKind::Stayed),
            place("知床ウトロ", PlaceKind::Visited),
            place("鎌倉", PlaceKind::Visited),
        ];
        let resolved = resolve_places(&places, &mut cache, Some(&mut geocoder), ", 日本");
        let kinds: Vec<(&str, PlaceKind)> =
            resolved.iter().map(|p| (p.name.as_str(), p.kind)).collect();
        assert_eq!(
            kinds,
            vec![("知床ウトロ", PlaceKind::Stayed), ("鎌倉", PlaceKind::Stayed)]
        );
        assert_eq!(geocoder.queries, vec!["鎌倉, 日本"]);
    }

    #[test]
    fn failed_stayed_name_is_retried_as_visited() {
        let mut cache = LocationCache::new();
        let mut geocoder = FakeGeocoder {
            known: HashMap::new(),
            queries: Vec::new(),
        };
        let places = vec![
            place("伊豆高原", PlaceKind::Stayed),
            place("伊豆高原", PlaceKind::Visited),
        ];
        assert!(resolve_places(&places, &mut cache, Some(&mut geocoder), ", 日本").is_empty());
        assert_eq!(geocoder.queries, vec!["伊豆高原, 日本", "伊豆高原, 日本"]);

        // The second attempt finds a position the first one missed.
        let mut flaky = FlakyGeocoder { calls: 0 };
        let mut empty = LocationCache::new();
        let resolved = resolve_places(&places, &mut empty, Some(&mut flaky), ", 日本");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].kind, PlaceKind::Visited);
        assert_eq!(flaky.calls, 2);
    }

    /// Fails its first request, then answers.
    struct FlakyGeocoder {
        calls: usize,
    }

    impl Geocoder for FlakyGeocoder {
        fn locate(&mut self, _query: &str) -> Result<Option<Coordinates>, GeocodeError> {
            self.calls += 1;
            if self.calls == 1 {
                return Err(GeocodeError::InvalidCoordinate("?".to_string()));
            }
            Ok(Some(Coordinates::new(34.92, 139.12)))
        }
    }

    #[test]
    fn cache_hits_skip_the_geocoder() {
        let mut cache = LocationCache::new();
        cache.insert("東京", Coordinates::new(35.68, 139.77));
        let mut geocoder = FakeGeocoder {
            known: HashMap::from([("大阪, 日本".to_string(), Coordinates::new(34.69, 135.50))]),
            queries: Vec::new(),
        };
        let places = vec![
            place("東京", PlaceKind::Stayed),
            place("大阪", PlaceKind::Stayed),
            place("どこか", PlaceKind::Visited),
            place("壊れた", PlaceKind::Visited),
        ];
        let resolved = resolve_places(&places, &mut cache, Some(&mut geocoder), ", 日本");
        let names: Vec<&str> = resolved.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["東京", "大阪"]);
        assert_eq!(
            geocoder.queries,
            vec!["大阪, 日本", "どこか, 日本", "壊れた, 日本"]
        );
        assert_eq!(cache.get("大阪"), Some(Coordinates::new(34.69, 135.50)));
        assert!(cache.get("どこか").is_none());
    }

    #[test]
    fn offline_uses_cache_only() {
        let mut cache = LocationCache::new();
        cache.insert("奈良", Coordinates::new(34.68, 135.80));
        let places = vec![place("奈良", PlaceKind::Visited), place("鎌倉", PlaceKind::Visited)];
        let resolved = resolve_places(&places, &mut cache, None, ", 日本");
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].display_name, "奈良");
    }
}
