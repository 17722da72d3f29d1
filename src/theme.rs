use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MarkerStyle {
    pub fill: String,
    pub edge: String,
    pub edge_width: f32,
    pub radius: f32,
    pub label_color: String,
    pub label_font_size: f32,
    pub halo_color: String,
    pub halo_width: f32,
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Theme::classic().stayed
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Theme {
    pub font_family: String,
    pub background: String,
    pub land_fill: String,
    pub land_outline: String,
    pub land_outline_width: f32,
    pub region_outline: String,
    pub region_outline_width: f32,
    pub stayed: MarkerStyle,
    pub visited: MarkerStyle,
    pub leader_color: String,
    pub leader_width: f32,
    pub legend_font_size: f32,
    pub legend_text_color: String,
    pub legend_background: String,
    pub legend_border: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"MS Gothic\", \"Hiragino Sans\", \"Noto Sans CJK JP\", \"Noto Sans JP\", IPAGothic, sans-serif".to_string(),
            background: "#FFFFFF".to_string(),
            land_fill: "#F0F0F0".to_string(),
            land_outline: "#A0A0A0".to_string(),
            land_outline_width: 0.6,
            region_outline: "#B0B0B0".to_string(),
            region_outline_width: 0.4,
            stayed: MarkerStyle {
                fill: "#FFFFFF".to_string(),
                edge: "#000000".to_string(),
                edge_width: 1.0,
                radius: 4.4,
                label_color: "#000000".to_string(),
                label_font_size: 16.0,
                halo_color: "#FFFFFF".to_string(),
                halo_width: 2.0,
            },
            visited: MarkerStyle {
                fill: "#000000".to_string(),
                edge: "#000000".to_string(),
                edge_width: 1.0,
                radius: 2.7,
                label_color: "#333333".to_string(),
                label_font_size: 14.0,
                halo_color: "#FFFFFF".to_string(),
                halo_width: 1.0,
            },
            leader_color: "#808080".to_string(),
            leader_width: 1.0,
            legend_font_size: 20.0,
            legend_text_color: "#000000".to_string(),
            legend_background: "#FFFFFF".to_string(),
            legend_border: "#CCCCCC".to_string(),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::classic()
    }
}
