use super::label_placement::{BBox, LeaderLine, Point, SolverStatus};
use crate::ir::PlaceKind;
use crate::text_metrics::TextBlock;

#[derive(Debug, Clone, PartialEq)]
pub struct PolygonLayout {
    pub rings: Vec<Vec<Point>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerLayout {
    pub name: String,
    pub kind: PlaceKind,
    pub center: Point,
    pub radius: f32,
}

impl MarkerLayout {
    /// Square covering the circle and its edge stroke.
    pub fn obstacle(&self, edge_width: f32) -> BBox {
        let side = 2.0 * (self.radius + edge_width.max(0.0));
        BBox::from_center(self.center, side, side)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLabel {
    pub name: String,
    pub lines: Vec<String>,
    pub kind: PlaceKind,
    pub anchor: Point,
    pub center: Point,
    pub block: TextBlock,
    pub font_size: f32,
    pub line_height: f32,
    pub displacement: f32,
    pub leader: Option<LeaderLine>,
}

impl MapLabel {
    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.center, self.block.width, self.block.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub kind: PlaceKind,
    pub text: String,
    pub marker: Point,
    pub marker_radius: f32,
    /// Left edge and vertical middle of the entry text.
    pub text_position: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendLayout {
    pub bbox: BBox,
    pub font_size: f32,
    pub entries: Vec<LegendEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementStats {
    pub iterations: usize,
    pub status: SolverStatus,
    pub residual_overlap: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    pub width: f32,
    pub height: f32,
    pub land: Vec<PolygonLayout>,
    pub regions: Vec<PolygonLayout>,
    pub markers: Vec<MarkerLayout>,
    pub labels: Vec<MapLabel>,
    pub legend: Option<LegendLayout>,
    pub placement: PlacementStats,
}
