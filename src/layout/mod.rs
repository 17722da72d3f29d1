pub mod label_placement;
mod projection;
mod types;

pub use projection::Projection;
pub use types::*;

use crate::basemap::{Basemap, Polygon};
use crate::config::Config;
use crate::ir::{PlaceKind, ResolvedPlace};
use crate::text_metrics::{self, TextBlock};
use crate::theme::{MarkerStyle, Theme};
use label_placement::{BBox, LabelInput, Point, place_labels};
use tracing::debug;

// Legend metrics in multiples of the legend font size.
const LEGEND_BORDER_PAD: f32 = 0.4;
const LEGEND_HANDLE_LENGTH: f32 = 2.0;
const LEGEND_HANDLE_TEXT_PAD: f32 = 0.5;
const LEGEND_LABEL_SPACING: f32 = 0.8;
const LEGEND_MARKER_SCALE: f32 = 1.5;
// Lower-right corner of the legend as a fraction of the canvas.
const LEGEND_ANCHOR: (f32, f32) = (0.75, 0.8);

fn marker_style(theme: &Theme, kind: PlaceKind) -> &MarkerStyle {
    match kind {
        PlaceKind::Stayed => &theme.stayed,
        PlaceKind::Visited => &theme.visited,
    }
}

fn project_polygons(polygons: &[Polygon], projection: &Projection) -> Vec<PolygonLayout> {
    polygons
        .iter()
        .map(|polygon| PolygonLayout {
            rings: polygon
                .rings
                .iter()
                .map(|ring| {
                    ring.iter()
                        .map(|(lon, lat)| projection.project(*lon, *lat))
                        .collect()
                })
                .collect(),
        })
        .collect()
}

/// Project places and boundaries onto the canvas, then relax the labels
/// against each other, the markers and the legend.
pub fn compute_map_layout(places: &[ResolvedPlace], basemap: &Basemap, config: &Config) -> MapLayout {
    let theme = &config.theme;
    let projection = Projection::fit(&config.map);
    let width = config.map.width;
    let height = config.map.height;

    let markers: Vec<MarkerLayout> = places
        .iter()
        .map(|place| MarkerLayout {
            name: place.name.clone(),
            kind: place.kind,
            center: projection.project(place.coordinates.longitude, place.coordinates.latitude),
            radius: marker_style(theme, place.kind).radius,
        })
        .collect();

    let legend = if config.labels.legend {
        legend_layout(&markers, config)
    } else {
        None
    };

    let mut obstacles: Vec<BBox> = markers
        .iter()
        .map(|marker| marker.obstacle(marker_style(theme, marker.kind).edge_width))
        .collect();
    if let Some(legend) = &legend {
        obstacles.push(legend.bbox);
    }

    let line_height = config.labels.line_height;
    let mut labels: Vec<MapLabel> = Vec::new();
    let mut inputs: Vec<LabelInput> = Vec::new();
    for (place, marker) in places.iter().zip(&markers) {
        if place.kind == PlaceKind::Visited && !config.labels.visited_enabled {
            continue;
        }
        let style = marker_style(theme, place.kind);
        let block = text_metrics::measure_label(
            &place.display_name,
            style.label_font_size,
            &theme.font_family,
            line_height,
        );
        let (dx, dy) = config
            .places
            .offsets
            .get(&place.name)
            .copied()
            .unwrap_or((0.0, 0.0));
        // Text hangs up and to the right of `anchor + offset`.
        let offset = projection.offset(dx, dy) + Point::new(block.width / 2.0, -block.height / 2.0);
        inputs.push(LabelInput::new(marker.center, block.width, block.height).with_offset(offset));
        labels.push(MapLabel {
            name: place.name.clone(),
            lines: place.display_name.lines().map(str::to_string).collect(),
            kind: place.kind,
            anchor: marker.center,
            center: marker.center + offset,
            block,
            font_size: style.label_font_size,
            line_height,
            displacement: 0.0,
            leader: None,
        });
    }

    let area = BBox::from_origin(0.0, 0.0, width, height);
    let result = place_labels(&inputs, &obstacles, Some(area), &config.adjust);
    for (label, placed) in labels.iter_mut().zip(&result.labels) {
        label.center = placed.center;
        label.displacement = placed.displacement;
        label.leader = placed.leader;
    }
    debug!(
        markers = markers.len(),
        labels = labels.len(),
        leaders = labels.iter().filter(|l| l.leader.is_some()).count(),
        "map layout computed"
    );

    MapLayout {
        width,
        height,
        land: project_polygons(&basemap.country, &projection),
        regions: project_polygons(&basemap.regions, &projection),
        markers,
        labels,
        legend,
        placement: PlacementStats {
            iterations: result.iterations,
            status: result.status,
            residual_overlap: result.residual_overlap,
        },
    }
}

fn legend_layout(markers: &[MarkerLayout], config: &Config) -> Option<LegendLayout> {
    let theme = &config.theme;
    let font_size = theme.legend_font_size;
    let entries: Vec<(PlaceKind, &str)> = [
        (PlaceKind::Visited, config.labels.legend_visited.as_str()),
        (PlaceKind::Stayed, config.labels.legend_stayed.as_str()),
    ]
    .into_iter()
    .filter(|(kind, _)| markers.iter().any(|m| m.kind == *kind))
    .collect();
    if entries.is_empty() {
        return None;
    }

    let pad = LEGEND_BORDER_PAD * font_size;
    let handle = LEGEND_HANDLE_LENGTH * font_size;
    let handle_pad = LEGEND_HANDLE_TEXT_PAD * font_size;
    let spacing = LEGEND_LABEL_SPACING * font_size;
    let blocks: Vec<TextBlock> = entries
        .iter()
        .map(|(_, text)| text_metrics::measure_label(text, font_size, &theme.font_family, 1.0))
        .collect();
    let text_width = blocks.iter().map(|b| b.width).fold(0.0f32, f32::max);
    let row_height = blocks.iter().map(|b| b.height).fold(font_size, f32::max);
    let count = entries.len() as f32;
    let legend_width = 2.0 * pad + handle + handle_pad + text_width;
    let legend_height = 2.0 * pad + count * row_height + (count - 1.0) * spacing;

    let right = config.map.width * LEGEND_ANCHOR.0;
    let bottom = config.map.height * LEGEND_ANCHOR.1;
    let bbox = BBox::from_origin(right - legend_width, bottom - legend_height, legend_width, legend_height);

    let entries = entries
        .into_iter()
        .enumerate()
        .map(|(idx, (kind, text))| {
            let mid_y = bbox.min_y + pad + idx as f32 * (row_height + spacing) + row_height / 2.0;
            LegendEntry {
                kind,
                text: text.to_string(),
                marker: Point::new(bbox.min_x + pad + handle / 2.0, mid_y),
                marker_radius: marker_style(theme, kind).radius * LEGEND_MARKER_SCALE,
                text_position: Point::new(bbox.min_x + pad + handle + handle_pad, mid_y),
            }
        })
        .collect();

    Some(LegendLayout {
        bbox,
        font_size,
        entries,
    })
}
