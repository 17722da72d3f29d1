// Force-relaxed label placement.
//
// Labels start at `anchor + offset` and are pushed apart from each other and
// from static obstacles until the per-iteration movement dies down or the
// iteration budget runs out. All functions here work with pure geometry and
// perform no I/O.

mod forces;
pub mod geometry;
mod solver;

pub use geometry::{BBox, Point, overlap_area};
pub use solver::{SolverState, SolverStatus};

use crate::config::AdjustConfig;
use forces::ForceField;
use geometry::ObstacleGrid;
use serde::Serialize;
use solver::Solver;
use tracing::debug;

/// A label to place: its anchor, measured size and preferred offset of the
/// label center from the anchor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelInput {
    pub anchor: Point,
    pub width: f32,
    pub height: f32,
    pub offset: Point,
}

impl LabelInput {
    pub fn new(anchor: Point, width: f32, height: f32) -> Self {
        Self {
            anchor,
            width,
            height,
            offset: Point::default(),
        }
    }

    pub fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    pub fn initial_center(&self) -> Point {
        self.anchor.sanitized() + self.offset.sanitized()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeaderLine {
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLabel {
    pub center: Point,
    pub width: f32,
    pub height: f32,
    /// Distance between the final and the initial center.
    pub displacement: f32,
    pub leader: Option<LeaderLine>,
}

impl PlacedLabel {
    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.center, self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacementResult {
    /// One entry per input label, in input order.
    pub labels: Vec<PlacedLabel>,
    pub iterations: usize,
    pub status: SolverStatus,
    /// Remaining overlap area between unexpanded label boxes and obstacles.
    pub residual_overlap: f32,
}

/// Relax label positions against each other and the static obstacles.
///
/// When `area` is given, labels are kept inside it along every axis whose
/// bounds are finite. The result is a pure function of the inputs.
pub fn place_labels(
    labels: &[LabelInput],
    obstacles: &[BBox],
    area: Option<BBox>,
    config: &AdjustConfig,
) -> PlacementResult {
    let sizes: Vec<(f32, f32)> = labels
        .iter()
        .map(|label| {
            let bbox = BBox::from_center(Point::default(), label.width, label.height);
            (bbox.width(), bbox.height())
        })
        .collect();
    let initial: Vec<Point> = labels.iter().map(LabelInput::initial_center).collect();

    let cell = sizes
        .iter()
        .map(|(w, h)| w.max(*h) * config.expand.0.max(config.expand.1).max(1.0))
        .fold(0.0f32, f32::max)
        * 2.0;
    let grid = ObstacleGrid::new(cell, obstacles);
    let field = ForceField {
        config,
        sizes: &sizes,
        initial: &initial,
        obstacles,
        grid: &grid,
    };
    let relaxation = Solver::new(field, initial.clone(), area).run();

    let placed: Vec<PlacedLabel> = relaxation
        .centers
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(idx, (center, input))| {
            let (width, height) = sizes[idx];
            let displacement = center.distance(initial[idx]);
            let bbox = BBox::from_center(*center, width, height);
            let leader = leader_line(input.anchor.sanitized(), &bbox, displacement, config);
            PlacedLabel {
                center: *center,
                width,
                height,
                displacement,
                leader,
            }
        })
        .collect();
    let residual_overlap = residual_overlap(&placed, obstacles);

    debug!(
        labels = placed.len(),
        obstacles = obstacles.len(),
        iterations = relaxation.iterations,
        status = ?relaxation.status,
        last_displacement = relaxation.last_displacement,
        residual_overlap,
        "label relaxation finished"
    );

    PlacementResult {
        labels: placed,
        iterations: relaxation.iterations,
        status: relaxation.status,
        residual_overlap,
    }
}

fn leader_line(
    anchor: Point,
    bbox: &BBox,
    displacement: f32,
    config: &AdjustConfig,
) -> Option<LeaderLine> {
    if displacement <= config.pull_threshold {
        return None;
    }
    let to = bbox.closest_point(anchor);
    if to.distance(anchor) <= f32::EPSILON {
        return None;
    }
    Some(LeaderLine { from: anchor, to })
}

fn residual_overlap(labels: &[PlacedLabel], obstacles: &[BBox]) -> f32 {
    let boxes: Vec<BBox> = labels.iter().map(PlacedLabel::bbox).collect();
    let mut total = 0.0;
    for (i, a) in boxes.iter().enumerate() {
        for b in &boxes[i + 1..] {
            total += overlap_area(a, b);
        }
        for ob in obstacles {
            total += overlap_area(a, ob);
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Axes;

    fn no_pull() -> AdjustConfig {
        AdjustConfig {
            force_pull: 0.0,
            ..AdjustConfig::default()
        }
    }

    #[test]
    fn empty_input_returns_immediately() {
        let result = place_labels(&[], &[], None, &AdjustConfig::default());
        assert!(result.labels.is_empty());
        assert_eq!(result.iterations, 0);
        assert_eq!(result.status, SolverStatus::Converged);
        assert_eq!(result.residual_overlap, 0.0);
    }

    #[test]
    fn lone_label_stays_at_initial_offset() {
        let config = AdjustConfig {
            force_pull: 0.2,
            ..AdjustConfig::default()
        };
        let label = LabelInput::new(Point::new(100.0, 50.0), 40.0, 12.0)
            .with_offset(Point::new(20.0, -6.0));
        let result = place_labels(&[label], &[], None, &config);
        assert_eq!(result.status, SolverStatus::Converged);
        assert_eq!(result.labels[0].center, Point::new(120.0, 44.0));
        assert_eq!(result.labels[0].displacement, 0.0);
        assert!(result.labels[0].leader.is_none());
    }

    #[test]
    fn obstacle_overlap_is_resolved_along_allowed_axis() {
        let mut config = no_pull();
        config.only_move.static_ = Axes::X;
        let label = LabelInput::new(Point::new(50.0, 50.0), 30.0, 10.0);
        let obstacle = BBox::from_center(Point::new(50.0, 50.0), 20.0, 20.0);
        let result = place_labels(&[label], &[obstacle], None, &config);
        let placed = &result.labels[0];
        assert_eq!(placed.center.y, 50.0);
        assert!(placed.center.x != 50.0);
        let expanded = placed.bbox().expand(config.expand);
        assert!(
            overlap_area(&expanded, &obstacle) < 0.05,
            "expanded label still overlaps: {:?}",
            expanded
        );
        assert_eq!(overlap_area(&placed.bbox(), &obstacle), 0.0);
    }

    #[test]
    fn identical_anchors_separate_with_explosion() {
        let config = AdjustConfig {
            force_explode: 0.5,
            force_text: 0.0,
            ..no_pull()
        };
        let a = LabelInput::new(Point::new(10.0, 10.0), 20.0, 8.0);
        let result = place_labels(&[a, a], &[], None, &config);
        assert_ne!(result.labels[0].center, result.labels[1].center);
    }

    #[test]
    fn relocated_label_gets_leader_line() {
        let config = AdjustConfig {
            pull_threshold: 5.0,
            ..no_pull()
        };
        let label = LabelInput::new(Point::new(0.0, 0.0), 20.0, 10.0);
        let obstacle = BBox::from_center(Point::new(0.0, 0.0), 60.0, 6.0);
        let result = place_labels(&[label], &[obstacle], None, &config);
        let placed = &result.labels[0];
        assert!(placed.displacement > 5.0);
        let leader = placed.leader.expect("leader line");
        assert_eq!(leader.from, Point::new(0.0, 0.0));
        assert_eq!(leader.to, placed.bbox().closest_point(leader.from));
    }

    #[test]
    fn labels_stay_inside_area() {
        let label = LabelInput::new(Point::new(2.0, 2.0), 20.0, 10.0);
        let area = BBox::from_origin(0.0, 0.0, 100.0, 100.0);
        let result = place_labels(&[label], &[], Some(area), &no_pull());
        let bbox = result.labels[0].bbox();
        assert!(bbox.min_x >= 0.0 && bbox.min_y >= 0.0);
    }

    #[test]
    fn non_finite_area_bound_is_ignored() {
        let label = LabelInput::new(Point::new(-40.0, 120.0), 20.0, 10.0);
        let area = BBox {
            min_x: 0.0,
            min_y: 0.0,
            max_x: f32::NAN,
            max_y: 100.0,
        };
        let result = place_labels(&[label], &[], Some(area), &no_pull());
        let placed = &result.labels[0];
        assert!(placed.center.is_finite());
        assert_eq!(placed.center, Point::new(-40.0, 95.0));
        assert_eq!(result.status, SolverStatus::Converged);

        let unbounded = BBox {
            min_x: f32::NEG_INFINITY,
            min_y: f32::NAN,
            max_x: f32::INFINITY,
            max_y: f32::NAN,
        };
        let result = place_labels(&[label, label], &[], Some(unbounded), &no_pull());
        assert!(result.labels.iter().all(|l| l.center.is_finite()));
    }

    #[test]
    fn malformed_label_is_normalized() {
        let label = LabelInput::new(Point::new(f32::NAN, 4.0), -3.0, f32::INFINITY);
        let result = place_labels(&[label], &[], None, &AdjustConfig::default());
        let placed = &result.labels[0];
        assert_eq!(placed.center, Point::new(0.0, 4.0));
        assert_eq!((placed.width, placed.height), (0.0, 0.0));
    }
}
