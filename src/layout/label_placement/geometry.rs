// Axis-aligned boxes, overlap tests and separation shifts for label placement.
// Everything here is pure geometry in a single planar coordinate space.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn dot(self, other: Point) -> f32 {
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Point) -> f32 {
        Point::new(self.x - other.x, self.y - other.y).length()
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Replace non-finite components with zero.
    pub fn sanitized(self) -> Self {
        Self {
            x: finite_or(self.x, 0.0),
            y: finite_or(self.y, 0.0),
        }
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::AddAssign for Point {
    fn add_assign(&mut self, rhs: Point) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl std::ops::Mul<f32> for Point {
    type Output = Point;

    fn mul(self, rhs: f32) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl std::ops::Neg for Point {
    type Output = Point;

    fn neg(self) -> Point {
        Point::new(-self.x, -self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BBox {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl BBox {
    /// Box of the given size centered on `center`. Invalid sizes collapse to zero.
    pub fn from_center(center: Point, width: f32, height: f32) -> Self {
        let center = center.sanitized();
        let hw = sanitize_extent(width) * 0.5;
        let hh = sanitize_extent(height) * 0.5;
        Self {
            min_x: center.x - hw,
            min_y: center.y - hh,
            max_x: center.x + hw,
            max_y: center.y + hh,
        }
    }

    /// Box from its top-left (minimum) corner and size.
    pub fn from_origin(x: f32, y: f32, width: f32, height: f32) -> Self {
        let min_x = finite_or(x, 0.0);
        let min_y = finite_or(y, 0.0);
        Self {
            min_x,
            min_y,
            max_x: min_x + sanitize_extent(width),
            max_y: min_y + sanitize_extent(height),
        }
    }

    /// Zero-size box at a point.
    pub fn point(at: Point) -> Self {
        Self::from_center(at, 0.0, 0.0)
    }

    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) * 0.5,
            (self.min_y + self.max_y) * 0.5,
        )
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Inflate by a multiplicative factor per axis, keeping the center.
    pub fn expand(&self, factor: (f32, f32)) -> Self {
        let fx = sanitize_factor(factor.0);
        let fy = sanitize_factor(factor.1);
        Self::from_center(self.center(), self.width() * fx, self.height() * fy)
    }

    /// Strict overlap: touching edges do not count. A zero-size box strictly
    /// inside another box overlaps it.
    pub fn overlaps(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }

    /// Point of this box closest to `point` (the point itself when inside).
    pub fn closest_point(&self, point: Point) -> Point {
        Point::new(
            point.x.clamp(self.min_x, self.max_x),
            point.y.clamp(self.min_y, self.max_y),
        )
    }
}

/// Per-axis shift that moves `a` clear of `b` through the nearer edge.
///
/// Returns `None` when the boxes do not overlap. On an exact tie the shift is
/// positive; callers resolving a pair hand the negated shift to the other box.
pub fn separation(a: &BBox, b: &BBox) -> Option<Point> {
    if !a.overlaps(b) {
        return None;
    }
    Some(Point::new(
        nearer_shift(b.max_x - a.min_x, a.max_x - b.min_x),
        nearer_shift(b.max_y - a.min_y, a.max_y - b.min_y),
    ))
}

fn nearer_shift(forward: f32, backward: f32) -> f32 {
    if forward <= backward {
        forward
    } else {
        -backward
    }
}

pub fn overlap_area(a: &BBox, b: &BBox) -> f32 {
    let w = (a.max_x.min(b.max_x) - a.min_x.max(b.min_x)).max(0.0);
    let h = (a.max_y.min(b.max_y) - a.min_y.max(b.min_y)).max(0.0);
    w * h
}

/// Clamp a box center so the box stays inside `area`. Boxes larger than the
/// area on an axis are centered on that axis. An axis with a non-finite bound
/// is left unclamped.
pub fn clamp_center_to_area(center: Point, width: f32, height: f32, area: &BBox) -> Point {
    Point::new(
        clamp_axis(center.x, width * 0.5, area.min_x, area.max_x),
        clamp_axis(center.y, height * 0.5, area.min_y, area.max_y),
    )
}

fn clamp_axis(value: f32, half: f32, lo: f32, hi: f32) -> f32 {
    if !(lo.is_finite() && hi.is_finite() && half.is_finite()) {
        return value;
    }
    let (min, max) = (lo + half, hi - half);
    if max < min {
        (lo + hi) * 0.5
    } else {
        value.clamp(min, max)
    }
}

fn finite_or(value: f32, fallback: f32) -> f32 {
    if value.is_finite() { value } else { fallback }
}

fn sanitize_extent(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}

fn sanitize_factor(value: f32) -> f32 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        1.0
    }
}

const MAX_CELLS_PER_BOX: i64 = 4096;

/// Spatial index for fast overlap queries against static obstacles.
pub(crate) struct ObstacleGrid {
    cell: f32,
    /// Maps grid cell (ix, iy) to indices into the obstacle list.
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// Boxes spanning too many cells; returned by every query.
    oversized: Vec<usize>,
}

impl ObstacleGrid {
    pub(crate) fn new(cell: f32, boxes: &[BBox]) -> Self {
        let cell = if cell.is_finite() && cell > 0.0 {
            cell
        } else {
            1.0
        };
        let mut grid = Self {
            cell,
            cells: HashMap::new(),
            oversized: Vec::new(),
        };
        for (idx, bbox) in boxes.iter().enumerate() {
            grid.insert(idx, bbox);
        }
        grid
    }

    pub(crate) fn insert(&mut self, idx: usize, bbox: &BBox) {
        let (x0, y0, x1, y1) = self.cell_span(bbox);
        let count = (i64::from(x1) - i64::from(x0) + 1) * (i64::from(y1) - i64::from(y0) + 1);
        if count > MAX_CELLS_PER_BOX {
            self.oversized.push(idx);
            return;
        }
        for ix in x0..=x1 {
            for iy in y0..=y1 {
                self.cells.entry((ix, iy)).or_default().push(idx);
            }
        }
    }

    /// Return indices of obstacles that could overlap with `bbox`.
    pub(crate) fn query(&self, bbox: &BBox) -> impl Iterator<Item = usize> + '_ {
        let (x0, y0, x1, y1) = self.cell_span(bbox);
        let mut seen = HashSet::new();
        let query_cells = (i64::from(x1) - i64::from(x0) + 1) * (i64::from(y1) - i64::from(y0) + 1);
        let in_grid: Box<dyn Iterator<Item = usize> + '_> = if query_cells > MAX_CELLS_PER_BOX {
            Box::new(self.cells.values().flatten().copied())
        } else {
            Box::new(
                (x0..=x1)
                    .flat_map(move |ix| (y0..=y1).map(move |iy| (ix, iy)))
                    .flat_map(move |key| {
                        self.cells
                            .get(&key)
                            .map(|v| v.as_slice())
                            .unwrap_or(&[])
                            .iter()
                            .copied()
                    }),
            )
        };
        self.oversized
            .iter()
            .copied()
            .chain(in_grid)
            .filter(move |idx| seen.insert(*idx))
    }

    fn cell_span(&self, bbox: &BBox) -> (i32, i32, i32, i32) {
        let to_cell = |v: f32| (v / self.cell).floor() as i32;
        (
            to_cell(bbox.min_x),
            to_cell(bbox.min_y),
            to_cell(bbox.max_x),
            to_cell(bbox.max_y),
        )
    }
}
