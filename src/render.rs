use crate::config::RenderConfig;
use crate::ir::PlaceKind;
use crate::layout::label_placement::Point;
use crate::layout::{LegendLayout, MapLabel, MapLayout, PolygonLayout};
use crate::theme::{MarkerStyle, Theme};
use anyhow::{Context, Result};
use std::path::Path;

// Baseline of a text line below its top edge, in ems.
const ASCENT: f32 = 0.88;

fn marker_style(theme: &Theme, kind: PlaceKind) -> &MarkerStyle {
    match kind {
        PlaceKind::Stayed => &theme.stayed,
        PlaceKind::Visited => &theme.visited,
    }
}

pub fn render_svg(layout: &MapLayout, theme: &Theme) -> String {
    let mut svg = String::new();
    let width = layout.width.max(1.0);
    let height = layout.height.max(1.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<g id=\"land\">");
    for polygon in &layout.land {
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"{}\" fill-rule=\"evenodd\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\"/>",
            polygon_path(polygon),
            theme.land_fill,
            theme.land_outline,
            theme.land_outline_width
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g id=\"regions\">");
    for polygon in &layout.regions {
        svg.push_str(&format!(
            "<path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\"/>",
            polygon_path(polygon),
            theme.region_outline,
            theme.region_outline_width
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g id=\"leaders\">");
    for leader in layout.labels.iter().filter_map(|label| label.leader) {
        svg.push_str(&format!(
            "<line x1=\"{:.2}\" y1=\"{:.2}\" x2=\"{:.2}\" y2=\"{:.2}\" stroke=\"{}\" stroke-width=\"{}\"/>",
            leader.from.x,
            leader.from.y,
            leader.to.x,
            leader.to.y,
            theme.leader_color,
            theme.leader_width
        ));
    }
    svg.push_str("</g>");

    svg.push_str("<g id=\"markers\">");
    for kind in [PlaceKind::Visited, PlaceKind::Stayed] {
        let style = marker_style(theme, kind);
        for marker in layout.markers.iter().filter(|m| m.kind == kind) {
            svg.push_str(&circle_svg(marker.center, marker.radius, style));
        }
    }
    svg.push_str("</g>");

    svg.push_str("<g id=\"labels\">");
    for label in &layout.labels {
        svg.push_str(&label_svg(label, marker_style(theme, label.kind), theme));
    }
    svg.push_str("</g>");

    if let Some(legend) = &layout.legend {
        svg.push_str(&legend_svg(legend, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn polygon_path(polygon: &PolygonLayout) -> String {
    let mut d = String::new();
    for ring in &polygon.rings {
        for (idx, point) in ring.iter().enumerate() {
            let cmd = if idx == 0 { 'M' } else { 'L' };
            if !d.is_empty() {
                d.push(' ');
            }
            d.push_str(&format!("{cmd}{:.2},{:.2}", point.x, point.y));
        }
        if !ring.is_empty() {
            d.push_str(" Z");
        }
    }
    d
}

fn circle_svg(center: Point, radius: f32, style: &MarkerStyle) -> String {
    format!(
        "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\"/>",
        center.x, center.y, radius, style.fill, style.edge, style.edge_width
    )
}

fn label_svg(label: &MapLabel, style: &MarkerStyle, theme: &Theme) -> String {
    let bbox = label.bbox();
    let font_size = label.font_size;
    let line_step = font_size * label.line_height;
    let leading = (line_step - font_size).max(0.0) / 2.0;
    let mut svg = String::new();
    for (idx, line) in label.lines.iter().enumerate() {
        let y = bbox.min_y + idx as f32 * line_step + leading + font_size * ASCENT;
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{y:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\" stroke=\"{}\" stroke-width=\"{}\" stroke-linejoin=\"round\" paint-order=\"stroke\">{}</text>",
            bbox.min_x,
            escape_xml(&theme.font_family),
            font_size,
            style.label_color,
            style.halo_color,
            style.halo_width,
            escape_xml(line)
        ));
    }
    svg
}

fn legend_svg(legend: &LegendLayout, theme: &Theme) -> String {
    let mut svg = String::from("<g id=\"legend\">");
    svg.push_str(&format!(
        "<rect x=\"{:.2}\" y=\"{:.2}\" width=\"{:.2}\" height=\"{:.2}\" rx=\"4\" ry=\"4\" fill=\"{}\" fill-opacity=\"0.8\" stroke=\"{}\" stroke-width=\"1\"/>",
        legend.bbox.min_x,
        legend.bbox.min_y,
        legend.bbox.width(),
        legend.bbox.height(),
        theme.legend_background,
        theme.legend_border
    ));
    for entry in &legend.entries {
        svg.push_str(&circle_svg(
            entry.marker,
            entry.marker_radius,
            marker_style(theme, entry.kind),
        ));
        let baseline = entry.text_position.y + legend.font_size * (ASCENT - 0.5);
        svg.push_str(&format!(
            "<text x=\"{:.2}\" y=\"{baseline:.2}\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">{}</text>",
            entry.text_position.x,
            escape_xml(&theme.font_family),
            legend.font_size,
            theme.legend_text_color,
            escape_xml(&entry.text)
        ));
    }
    svg.push_str("</g>");
    svg
}

pub fn write_output_svg(svg: &str, output: &Path) -> Result<()> {
    std::fs::write(output, svg).with_context(|| format!("failed to write {}", output.display()))
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "sans-serif".to_string();
    opt.fontdb_mut().load_system_fonts();

    let tree = usvg::Tree::from_str(svg, &opt).context("failed to parse generated SVG")?;
    let scale = if render_cfg.scale > 0.0 {
        render_cfg.scale
    } else {
        1.0
    };
    let size = tree.size().to_int_size();
    let width = ((size.width() as f32) * scale).ceil().max(1.0) as u32;
    let height = ((size.height() as f32) * scale).ceil().max(1.0) as u32;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| anyhow::anyhow!("failed to allocate a {width}x{height} pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap_mut,
    );
    pixmap
        .save_png(output)
        .with_context(|| format!("failed to write {}", output.display()))?;
    Ok(())
}

#[cfg(not(feature = "png"))]
pub fn write_output_png(_svg: &str, _output: &Path, _render_cfg: &RenderConfig) -> Result<()> {
    anyhow::bail!("PNG output needs the `png` feature; write an .svg file instead")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::label_placement::{LeaderLine, SolverStatus};
    use crate::layout::{MarkerLayout, PlacementStats};
    use crate::text_metrics::TextBlock;

    fn label(name: &str, kind: PlaceKind, leader: Option<LeaderLine>) -> MapLabel {
        MapLabel {
            name: name.to_string(),
            lines: vec![name.to_string()],
            kind,
            anchor: Point::new(100.0, 100.0),
            center: Point::new(130.0, 90.0),
            block: TextBlock {
                width: 40.0,
                height: 19.2,
            },
            font_size: 16.0,
            line_height: 1.2,
            displacement: 0.0,
            leader,
        }
    }

    fn layout() -> MapLayout {
        let leader = LeaderLine {
            from: Point::new(100.0, 100.0),
            to: Point::new(110.0, 95.0),
        };
        MapLayout {
            width: 400.0,
            height: 300.0,
            land: vec![PolygonLayout {
                rings: vec![vec![
                    Point::new(10.0, 10.0),
                    Point::new(50.0, 10.0),
                    Point::new(50.0, 40.0),
                ]],
            }],
            regions: Vec::new(),
            markers: vec![
                MarkerLayout {
                    name: "東京".to_string(),
                    kind: PlaceKind::Stayed,
                    center: Point::new(100.0, 100.0),
                    radius: 4.4,
                },
                MarkerLayout {
                    name: "鎌倉".to_string(),
                    kind: PlaceKind::Visited,
                    center: Point::new(120.0, 140.0),
                    radius: 2.7,
                },
            ],
            labels: vec![
                label("東京", PlaceKind::Stayed, Some(leader)),
                label("R&D <lab>", PlaceKind::Visited, None),
            ],
            legend: None,
            placement: PlacementStats {
                iterations: 3,
                status: SolverStatus::Converged,
                residual_overlap: 0.0,
            },
        }
    }

    #[test]
    fn render_svg_basic() {
        let svg = render_svg(&layout(), &Theme::classic());
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains(">東京</text>"));
        assert!(svg.contains("R&amp;D &lt;lab&gt;"));
        assert!(svg.contains("paint-order=\"stroke\""));
        assert!(svg.contains("M10.00,10.00 L50.00,10.00 L50.00,40.00 Z"));
        assert_eq!(svg.matches("<line ").count(), 1);
        assert_eq!(svg.matches("<circle ").count(), 2);
    }

    #[test]
    fn visited_markers_are_drawn_below_stayed() {
        let svg = render_svg(&layout(), &Theme::classic());
        let visited = svg.find("r=\"2.70\"").unwrap();
        let stayed = svg.find("r=\"4.40\"").unwrap();
        assert!(visited < stayed);
    }

    #[test]
    fn writes_svg_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.svg");
        write_output_svg("<svg/>", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<svg/>");
        assert!(write_output_svg("<svg/>", &dir.path().join("missing/map.svg")).is_err());
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("a<b>&\"'"), "a&lt;b&gt;&amp;&quot;&apos;");
    }
}
