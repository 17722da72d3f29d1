// Converts overlaps into displacement vectors: label-label and label-obstacle
// repulsion, pull towards the initial position, and the initial explosion of
// coincident labels.

use super::geometry::{BBox, ObstacleGrid, Point, separation};
use crate::config::{AdjustConfig, Axes};

/// Coincidence tolerance relative to the label size.
const COINCIDENT_EPS: f32 = 1e-6;

/// Net force below this share of the summed pushes counts as cancelled.
const CANCEL_RATIO: f32 = 0.05;

/// Static inputs shared by every iteration.
pub(super) struct ForceField<'a> {
    pub config: &'a AdjustConfig,
    pub sizes: &'a [(f32, f32)],
    pub initial: &'a [Point],
    pub obstacles: &'a [BBox],
    pub grid: &'a ObstacleGrid,
}

impl ForceField<'_> {
    /// Expanded collision box of label `idx` centered at `center`.
    pub fn collision_box(&self, idx: usize, center: Point) -> BBox {
        let (w, h) = self.sizes[idx];
        BBox::from_center(center, w, h).expand(self.config.expand)
    }

    /// Net displacement for every label at the given centers.
    ///
    /// A label whose repulsion cancels out while it still overlaps something
    /// is also pushed along the axes its shifts did not pick.
    pub fn accumulate(&self, centers: &[Point]) -> Vec<Point> {
        let cfg = self.config;
        let boxes: Vec<BBox> = centers
            .iter()
            .enumerate()
            .map(|(idx, c)| self.collision_box(idx, *c))
            .collect();
        let mut push = vec![Push::default(); centers.len()];

        if cfg.force_text != 0.0 {
            let weight = cfg.force_text * 0.5;
            for i in 0..boxes.len() {
                for j in (i + 1)..boxes.len() {
                    let Some(shift) = separation(&boxes[i], &boxes[j]) else {
                        continue;
                    };
                    let (picked, other) = split_shift(shift, cfg.only_move.text);
                    push[i].add(picked * weight, other * weight);
                    push[j].add(-picked * weight, -other * weight);
                }
            }
        }

        if cfg.force_static != 0.0 && !self.obstacles.is_empty() {
            for (idx, bbox) in boxes.iter().enumerate() {
                for ob_idx in self.grid.query(bbox) {
                    let Some(shift) = separation(bbox, &self.obstacles[ob_idx]) else {
                        continue;
                    };
                    let (picked, other) = split_shift(shift, cfg.only_move.static_);
                    push[idx].add(picked * cfg.force_static, other * cfg.force_static);
                }
            }
        }

        centers
            .iter()
            .enumerate()
            .map(|(idx, center)| {
                let mut force = push[idx].net;
                if cfg.force_pull != 0.0 {
                    let pull = (self.initial[idx] - *center) * cfg.force_pull;
                    force += cfg.only_move.pull.mask(pull);
                }
                if push[idx].deadlocked(force) {
                    force += push[idx].sideways;
                }
                force
            })
            .collect()
    }
}

/// Repulsion gathered for one label.
#[derive(Debug, Clone, Copy, Default)]
struct Push {
    net: Point,
    /// Components dropped by the cheaper-axis choice.
    sideways: Point,
    /// Sum of the lengths of every picked push.
    magnitude: f32,
}

impl Push {
    fn add(&mut self, picked: Point, other: Point) {
        self.net += picked;
        self.sideways += other;
        self.magnitude += picked.length();
    }

    fn deadlocked(&self, force: Point) -> bool {
        self.magnitude > 0.0 && force.length() <= CANCEL_RATIO * self.magnitude
    }
}

/// Restrict a separation shift to the allowed axes, keeping only the cheaper
/// axis when both are allowed. The second value is what that choice dropped.
fn split_shift(shift: Point, axes: Axes) -> (Point, Point) {
    let x = Point::new(shift.x, 0.0);
    let y = Point::new(0.0, shift.y);
    match axes {
        Axes::X => (x, Point::default()),
        Axes::Y => (y, Point::default()),
        Axes::Xy => {
            if shift.x.abs() <= shift.y.abs() {
                (x, y)
            } else {
                (y, x)
            }
        }
    }
}

/// One-shot offsets spreading labels that start at the same center.
///
/// Member `m` of a cluster of `k` coincident labels moves along angle
/// `2πm/k` by `force_explode` times its collision half-diagonal.
pub(super) fn explosion_offsets(field: &ForceField<'_>, centers: &[Point]) -> Vec<Point> {
    let cfg = field.config;
    let mut offsets = vec![Point::default(); centers.len()];
    if cfg.force_explode == 0.0 || centers.len() < 2 {
        return offsets;
    }

    let mut cluster_of: Vec<Option<usize>> = vec![None; centers.len()];
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..centers.len() {
        if cluster_of[i].is_some() {
            continue;
        }
        let mut members = vec![i];
        for j in (i + 1)..centers.len() {
            if cluster_of[j].is_none() && coincident(field, i, j, centers) {
                members.push(j);
            }
        }
        if members.len() > 1 {
            for &m in &members {
                cluster_of[m] = Some(clusters.len());
            }
            clusters.push(members);
        }
    }

    for members in clusters {
        let count = members.len() as f32;
        for (rank, &idx) in members.iter().enumerate() {
            let bbox = field.collision_box(idx, centers[idx]);
            let radius = Point::new(bbox.width(), bbox.height()).length() * 0.5;
            let angle = std::f32::consts::TAU * rank as f32 / count;
            let direction = Point::new(angle.cos(), angle.sin());
            offsets[idx] = cfg.only_move.explode.mask(direction * (radius * cfg.force_explode));
        }
    }
    offsets
}

fn coincident(field: &ForceField<'_>, i: usize, j: usize, centers: &[Point]) -> bool {
    let (wi, hi) = field.sizes[i];
    let (wj, hj) = field.sizes[j];
    let scale = wi.max(hi).max(wj).max(hj).max(1.0);
    centers[i].distance(centers[j]) <= COINCIDENT_EPS * scale
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field<'a>(
        config: &'a AdjustConfig,
        sizes: &'a [(f32, f32)],
        initial: &'a [Point],
        obstacles: &'a [BBox],
        grid: &'a ObstacleGrid,
    ) -> ForceField<'a> {
        ForceField {
            config,
            sizes,
            initial,
            obstacles,
            grid,
        }
    }

    #[test]
    fn split_shift_prefers_cheaper_axis() {
        let shift = Point::new(-2.0, 7.0);
        assert_eq!(
            split_shift(shift, Axes::Xy),
            (Point::new(-2.0, 0.0), Point::new(0.0, 7.0))
        );
        assert_eq!(split_shift(shift, Axes::Y), (Point::new(0.0, 7.0), Point::default()));
        assert_eq!(split_shift(shift, Axes::X), (Point::new(-2.0, 0.0), Point::default()));
    }

    #[test]
    fn overlapping_labels_push_apart_symmetrically() {
        let config = AdjustConfig {
            expand: (1.0, 1.0),
            ..AdjustConfig::default()
        };
        let sizes = [(10.0, 4.0), (10.0, 4.0)];
        let initial = [Point::new(0.0, 0.0), Point::new(0.0, 3.0)];
        let grid = ObstacleGrid::new(10.0, &[]);
        let f = field(&config, &sizes, &initial, &[], &grid);
        let forces = f.accumulate(&initial);
        assert_eq!(forces[0], -forces[1]);
        assert!(forces[0].y < 0.0, "upper label should move up");
        assert_eq!(forces[0].x, 0.0);
    }

    fn flanked_label(axes: Axes) -> Point {
        let mut config = AdjustConfig {
            expand: (1.0, 1.0),
            ..AdjustConfig::default()
        };
        config.only_move.static_ = axes;
        let sizes = [(20.0, 10.0)];
        let initial = [Point::new(0.0, 0.0)];
        let obstacles = [
            BBox::from_center(Point::new(-9.0, 0.0), 2.0, 2.0),
            BBox::from_center(Point::new(9.0, 0.0), 2.0, 2.0),
        ];
        let grid = ObstacleGrid::new(40.0, &obstacles);
        field(&config, &sizes, &initial, &obstacles, &grid).accumulate(&initial)[0]
    }

    #[test]
    fn cancelled_pushes_fall_back_to_the_other_axis() {
        // Both markers push 2 along x and cancel; the dropped y shifts (6 each) remain.
        let force_static = AdjustConfig::default().force_static;
        assert_eq!(flanked_label(Axes::Xy), Point::new(0.0, 12.0 * force_static));
        assert_eq!(flanked_label(Axes::X), Point::default());
    }

    #[test]
    fn zero_weights_disable_contributions() {
        let config = AdjustConfig {
            force_text: 0.0,
            force_static: 0.0,
            force_pull: 0.0,
            ..AdjustConfig::default()
        };
        let sizes = [(10.0, 4.0), (10.0, 4.0)];
        let initial = [Point::new(0.0, 0.0), Point::new(1.0, 1.0)];
        let obstacles = [BBox::point(Point::new(0.0, 0.0))];
        let grid = ObstacleGrid::new(10.0, &obstacles);
        let f = field(&config, &sizes, &initial, &obstacles, &grid);
        let moved = [Point::new(5.0, 5.0), Point::new(1.0, 1.0)];
        for force in f.accumulate(&moved) {
            assert_eq!(force, Point::default());
        }
    }

    #[test]
    fn pull_points_back_to_initial_position() {
        let config = AdjustConfig {
            force_pull: 0.5,
            ..AdjustConfig::default()
        };
        let sizes = [(2.0, 2.0)];
        let initial = [Point::new(0.0, 0.0)];
        let grid = ObstacleGrid::new(10.0, &[]);
        let f = field(&config, &sizes, &initial, &[], &grid);
        let forces = f.accumulate(&[Point::new(4.0, -2.0)]);
        assert_eq!(forces[0], Point::new(-2.0, 1.0));
    }

    #[test]
    fn static_obstacle_push_scales_with_depth() {
        let config = AdjustConfig {
            expand: (1.0, 1.0),
            ..AdjustConfig::default()
        };
        let sizes = [(10.0, 10.0)];
        let initial = [Point::new(0.0, 0.0)];
        let shallow = [BBox::from_origin(4.0, -20.0, 10.0, 40.0)];
        let deep = [BBox::from_origin(2.0, -20.0, 10.0, 40.0)];
        let grid_shallow = ObstacleGrid::new(10.0, &shallow);
        let grid_deep = ObstacleGrid::new(10.0, &deep);
        let a = field(&config, &sizes, &initial, &shallow, &grid_shallow).accumulate(&initial);
        let b = field(&config, &sizes, &initial, &deep, &grid_deep).accumulate(&initial);
        assert!(a[0].x < 0.0 && b[0].x < a[0].x);
    }

    #[test]
    fn explosion_spreads_coincident_labels() {
        let config = AdjustConfig {
            force_explode: 1.0,
            ..AdjustConfig::default()
        };
        let sizes = [(4.0, 2.0), (4.0, 2.0), (4.0, 2.0)];
        let initial = [Point::new(1.0, 1.0), Point::new(1.0, 1.0), Point::new(9.0, 9.0)];
        let grid = ObstacleGrid::new(10.0, &[]);
        let f = field(&config, &sizes, &initial, &[], &grid);
        let offsets = explosion_offsets(&f, &initial);
        assert!(offsets[0].x > 0.0);
        assert!(offsets[1].x < 0.0);
        assert_eq!(offsets[2], Point::default());
    }
}
