use crate::ir::PlaceKind;
use crate::layout::MapLayout;
use crate::layout::label_placement::{LeaderLine, SolverStatus};
use anyhow::Context;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub placement: PlacementDump,
    pub markers: Vec<MarkerDump>,
    pub labels: Vec<LabelDump>,
    pub legend: Option<[f32; 4]>,
}

#[derive(Debug, Serialize)]
pub struct PlacementDump {
    pub iterations: usize,
    pub status: SolverStatus,
    pub residual_overlap: f32,
}

#[derive(Debug, Serialize)]
pub struct MarkerDump {
    pub name: String,
    pub kind: PlaceKind,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Serialize)]
pub struct LabelDump {
    pub name: String,
    pub kind: PlaceKind,
    pub lines: Vec<String>,
    pub anchor: [f32; 2],
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub displacement: f32,
    pub leader: Option<LeaderLine>,
}

impl LayoutDump {
    pub fn from_layout(layout: &MapLayout) -> Self {
        let markers = layout
            .markers
            .iter()
            .map(|marker| MarkerDump {
                name: marker.name.clone(),
                kind: marker.kind,
                x: marker.center.x,
                y: marker.center.y,
                radius: marker.radius,
            })
            .collect();

        let labels = layout
            .labels
            .iter()
            .map(|label| LabelDump {
                name: label.name.clone(),
                kind: label.kind,
                lines: label.lines.clone(),
                anchor: [label.anchor.x, label.anchor.y],
                x: label.center.x,
                y: label.center.y,
                width: label.block.width,
                height: label.block.height,
                displacement: label.displacement,
                leader: label.leader,
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            placement: PlacementDump {
                iterations: layout.placement.iterations,
                status: layout.placement.status,
                residual_overlap: layout.placement.residual_overlap,
            },
            markers,
            labels,
            legend: layout
                .legend
                .as_ref()
                .map(|l| [l.bbox.min_x, l.bbox.min_y, l.bbox.width(), l.bbox.height()]),
        }
    }
}

pub fn write_layout_dump(path: &Path, layout: &MapLayout) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basemap::Basemap;
    use crate::config::Config;
    use crate::ir::{Coordinates, Place, ResolvedPlace};
    use crate::layout::compute_map_layout;

    #[test]
    fn dump_lists_labels_and_stats() {
        let places = vec![ResolvedPlace::new(
            &Place {
                name: "金沢".to_string(),
                kind: PlaceKind::Stayed,
            },
            Coordinates::new(36.56, 136.65),
        )];
        let layout = compute_map_layout(&places, &Basemap::default(), &Config::default());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        write_layout_dump(&path, &layout).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["labels"][0]["name"], "金沢");
        assert_eq!(value["labels"][0]["kind"], "stayed");
        assert_eq!(value["placement"]["status"], "converged");
        assert_eq!(value["markers"].as_array().unwrap().len(), 1);
    }
}
