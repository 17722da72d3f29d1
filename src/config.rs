use crate::layout::label_placement::Point;
use crate::theme::Theme;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

const STAYED_PLACES: [&str; 13] = [
    "東京",
    "大阪",
    "神戸",
    "札幌",
    "尾道",
    "金沢",
    "下田市",
    "小樽",
    "知床ウトロ",
    "横浜",
    "釧路",
    "江ノ島",
    "船橋",
];

const VISITED_PLACES: [&str; 22] = [
    "京都",
    "姫路",
    "太海",
    "網走",
    "紋別市",
    "知床ウトロ",
    "斜里",
    "野付",
    "阿寒湖",
    "旭川",
    "伊豆高原",
    "さいたま市",
    "豊郷町",
    "彦根",
    "大津",
    "奈良",
    "鎌倉",
    "岡山",
    "中標津空港",
    "関西空港",
    "熱川",
    "新千歳空港",
];

// Hand-tuned starting offsets in degrees (dx east, dy north).
const LABEL_OFFSETS: [(&str, f64, f64); 8] = [
    ("関西空港", 0.2, -0.5),
    ("神戸", -0.7, -0.5),
    ("京都", -0.3, 0.5),
    ("横浜", -0.3, 0.0),
    ("下田市", -0.5, -0.7),
    ("中標津空港", 0.0, -0.7),
    ("野付", 0.0, -0.7),
    ("釧路", 0.0, -0.7),
];

/// Axes a force kind may move labels along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axes {
    X,
    Y,
    Xy,
}

impl Axes {
    pub fn allows_x(self) -> bool {
        matches!(self, Axes::X | Axes::Xy)
    }

    pub fn allows_y(self) -> bool {
        matches!(self, Axes::Y | Axes::Xy)
    }

    pub fn mask(self, v: Point) -> Point {
        Point::new(
            if self.allows_x() { v.x } else { 0.0 },
            if self.allows_y() { v.y } else { 0.0 },
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnlyMove {
    pub text: Axes,
    #[serde(rename = "static")]
    pub static_: Axes,
    pub explode: Axes,
    pub pull: Axes,
}

impl Default for OnlyMove {
    fn default() -> Self {
        Self {
            text: Axes::Xy,
            static_: Axes::Xy,
            explode: Axes::Xy,
            pull: Axes::Xy,
        }
    }
}

/// Label relaxation settings. Distances are in layout units (canvas pixels
/// for the map).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AdjustConfig {
    /// Multiplicative inflation of label boxes before collision tests.
    pub expand: (f32, f32),
    /// Displacement beyond which a leader line is drawn.
    pub pull_threshold: f32,
    pub force_static: f32,
    pub force_text: f32,
    pub force_pull: f32,
    pub force_explode: f32,
    pub only_move: OnlyMove,
    pub iter_lim: usize,
    pub damping: f32,
    pub max_step: f32,
    /// Total per-iteration movement under which the layout counts as settled.
    pub tolerance: f32,
}

impl Default for AdjustConfig {
    fn default() -> Self {
        Self {
            expand: (1.3, 1.3),
            pull_threshold: 10.0,
            force_static: 5.0,
            force_text: 5.0,
            force_pull: 0.0,
            force_explode: 0.0,
            only_move: OnlyMove::default(),
            iter_lim: 5000,
            damping: 0.1,
            max_step: 10.0,
            tolerance: 1e-3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    pub view_lon: (f64, f64),
    pub view_lat: (f64, f64),
    pub width: f32,
    pub height: f32,
    pub padding: f32,
    /// Country layer filter (`ADMIN` property).
    pub country: String,
    /// Region layer filter (`adm0_a3` / `SOV_A3` property).
    pub country_code: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            view_lon: (127.0, 147.0),
            view_lat: (29.0, 46.0),
            width: 1300.0,
            height: 1500.0,
            padding: 12.0,
            country: "Japan".to_string(),
            country_code: "JPN".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacesConfig {
    pub stayed: Vec<String>,
    pub visited: Vec<String>,
    /// Initial label offsets per place name, `[dx, dy]` in degrees.
    pub offsets: BTreeMap<String, (f64, f64)>,
    pub query_suffix: String,
}

impl Default for PlacesConfig {
    fn default() -> Self {
        Self {
            stayed: STAYED_PLACES.iter().map(|s| s.to_string()).collect(),
            visited: VISITED_PLACES.iter().map(|s| s.to_string()).collect(),
            offsets: LABEL_OFFSETS
                .iter()
                .map(|(name, dx, dy)| (name.to_string(), (*dx, *dy)))
                .collect(),
            query_suffix: ", 日本".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub user_agent: String,
    pub http_proxy: Option<String>,
    pub https_proxy: Option<String>,
    pub timeout_secs: u64,
    /// Minimum delay between two requests.
    pub min_interval_ms: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            user_agent: concat!("tabi-map/", env!("CARGO_PKG_VERSION")).to_string(),
            http_proxy: None,
            https_proxy: None,
            timeout_secs: 15,
            min_interval_ms: 1100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataConfig {
    pub countries: PathBuf,
    pub regions: Option<PathBuf>,
    pub cache: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            countries: PathBuf::from("ne_10m_admin_0_countries.geojson"),
            regions: Some(PathBuf::from("ne_10m_admin_1_states_provinces.geojson")),
            cache: PathBuf::from("locations_cache.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LabelConfig {
    pub visited_enabled: bool,
    pub line_height: f32,
    pub legend: bool,
    pub legend_visited: String,
    pub legend_stayed: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            visited_enabled: true,
            line_height: 1.2,
            legend: true,
            legend_visited: "旅行した".to_string(),
            legend_stayed: "滞在した".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RenderConfig {
    /// Raster scale relative to the canvas size.
    pub scale: f32,
    pub output: PathBuf,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            scale: 2.0,
            output: PathBuf::from("japan_map_with_cities.png"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub map: MapConfig,
    pub places: PlacesConfig,
    pub geocoder: GeocoderConfig,
    pub data: DataConfig,
    pub labels: LabelConfig,
    pub adjust: AdjustConfig,
    pub render: RenderConfig,
    pub theme: Theme,
}

/// Load a JSON (or JSON5) config file over the defaults. Keys missing from
/// the file keep their default values.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid config {}", path.display()))
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = json5::from_str(contents)?;
    Ok(config)
}
