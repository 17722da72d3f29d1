// Country and region boundaries from GeoJSON feature collections.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum BasemapError {
    #[error("failed to read boundary file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse boundary file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("no feature for country {0:?} in the boundary data")]
    CountryNotFound(String),
}

/// Outer ring first, then holes. Positions are (longitude, latitude).
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    pub rings: Vec<Vec<(f64, f64)>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Basemap {
    pub country: Vec<Polygon>,
    pub regions: Vec<Polygon>,
}

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Option<Map<String, Value>>,
    #[serde(default)]
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum Geometry {
    Polygon { coordinates: Vec<Vec<Vec<f64>>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Vec<f64>>>> },
    #[serde(other)]
    Unsupported,
}

impl Feature {
    fn property(&self, key: &str) -> Option<&str> {
        self.properties.as_ref()?.get(key)?.as_str()
    }

    fn has_property(&self, key: &str) -> bool {
        self.properties
            .as_ref()
            .is_some_and(|props| props.contains_key(key))
    }

    fn polygons(&self) -> Vec<Polygon> {
        match &self.geometry {
            Some(Geometry::Polygon { coordinates }) => vec![polygon(coordinates)],
            Some(Geometry::MultiPolygon { coordinates }) => {
                coordinates.iter().map(|p| polygon(p)).collect()
            }
            _ => Vec::new(),
        }
    }
}

fn polygon(rings: &[Vec<Vec<f64>>]) -> Polygon {
    Polygon {
        rings: rings
            .iter()
            .map(|ring| {
                ring.iter()
                    .filter(|pos| pos.len() >= 2)
                    .map(|pos| (pos[0], pos[1]))
                    .collect::<Vec<_>>()
            })
            .filter(|ring| ring.len() >= 3)
            .collect(),
    }
}

fn read_collection(path: &Path) -> Result<FeatureCollection, BasemapError> {
    let contents = std::fs::read_to_string(path).map_err(|source| BasemapError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_collection(&contents).map_err(|source| BasemapError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_collection(contents: &str) -> Result<FeatureCollection, serde_json::Error> {
    serde_json::from_str(contents)
}

fn select_country(collection: &FeatureCollection, country: &str) -> Vec<Polygon> {
    collection
        .features
        .iter()
        .filter(|f| {
            ["ADMIN", "admin", "NAME"]
                .iter()
                .any(|key| f.property(key) == Some(country))
        })
        .flat_map(Feature::polygons)
        .collect()
}

fn select_regions(collection: &FeatureCollection, country_code: &str) -> Vec<Polygon> {
    let features = &collection.features;
    let key = ["adm0_a3", "SOV_A3"]
        .into_iter()
        .find(|key| features.iter().any(|f| f.has_property(key)));
    match key {
        Some(key) => features
            .iter()
            .filter(|f| f.property(key) == Some(country_code))
            .flat_map(Feature::polygons)
            .collect(),
        None => {
            warn!("region data has no country code property, using every feature");
            features.iter().flat_map(Feature::polygons).collect()
        }
    }
}

impl Basemap {
    /// Load the country outline (required) and the region outlines
    /// (optional; failures are logged and the layer is left empty).
    pub fn load(
        countries: &Path,
        regions: Option<&Path>,
        country: &str,
        country_code: &str,
    ) -> Result<Self, BasemapError> {
        let collection = read_collection(countries)?;
        let country_polygons = select_country(&collection, country);
        if country_polygons.is_empty() {
            return Err(BasemapError::CountryNotFound(country.to_string()));
        }
        info!(
            path = %countries.display(),
            polygons = country_polygons.len(),
            "country outline loaded"
        );

        let regions = match regions {
            Some(path) => match read_collection(path) {
                Ok(collection) => {
                    let polygons = select_regions(&collection, country_code);
                    if polygons.is_empty() {
                        warn!(path = %path.display(), country_code, "no regions matched, skipping region outlines");
                    } else {
                        info!(path = %path.display(), polygons = polygons.len(), "region outlines loaded");
                    }
                    polygons
                }
                Err(err) => {
                    warn!(error = %err, "cannot load region outlines, skipping them");
                    Vec::new()
                }
            },
            None => {
                info!("no region data configured, skipping region outlines");
                Vec::new()
            }
        };

        Ok(Self {
            country: country_polygons,
            regions,
        })
    }
}
