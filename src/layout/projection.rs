use super::label_placement::Point;
use crate::config::MapConfig;

/// Equirectangular projection of the configured view extent onto the canvas.
///
/// Longitude is scaled by the cosine of the middle latitude so distances
/// look right around the center of the view. North is up, so canvas y grows
/// as latitude falls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    lon_min: f64,
    lat_max: f64,
    px_per_lon: f64,
    px_per_lat: f64,
    offset_x: f64,
    offset_y: f64,
}

fn span(range: (f64, f64)) -> (f64, f64) {
    let (a, b) = range;
    let a = if a.is_finite() { a } else { 0.0 };
    let b = if b.is_finite() { b } else { 0.0 };
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    (lo, (hi - lo).max(1e-6))
}

impl Projection {
    pub fn fit(config: &MapConfig) -> Self {
        let (lon_min, lon_span) = span(config.view_lon);
        let (lat_min, lat_span) = span(config.view_lat);
        let mid_lat = (lat_min + lat_span / 2.0).to_radians();
        let lon_factor = mid_lat.cos().abs().max(1e-3);

        let padding = config.padding.max(0.0) as f64;
        let avail_w = (config.width as f64 - 2.0 * padding).max(1.0);
        let avail_h = (config.height as f64 - 2.0 * padding).max(1.0);
        let extent_w = lon_span * lon_factor;
        let extent_h = lat_span;
        let scale = (avail_w / extent_w).min(avail_h / extent_h);

        Self {
            lon_min,
            lat_max: lat_min + lat_span,
            px_per_lon: scale * lon_factor,
            px_per_lat: scale,
            offset_x: padding + (avail_w - extent_w * scale) / 2.0,
            offset_y: padding + (avail_h - extent_h * scale) / 2.0,
        }
    }

    pub fn project(&self, longitude: f64, latitude: f64) -> Point {
        let x = self.offset_x + (longitude - self.lon_min) * self.px_per_lon;
        let y = self.offset_y + (self.lat_max - latitude) * self.px_per_lat;
        Point::new(x as f32, y as f32).sanitized()
    }

    /// Canvas vector for an offset of `dx` degrees east and `dy` degrees north.
    pub fn offset(&self, dx: f64, dy: f64) -> Point {
        Point::new((dx * self.px_per_lon) as f32, (-dy * self.px_per_lat) as f32).sanitized()
    }

    pub fn pixels_per_degree(&self) -> (f64, f64) {
        (self.px_per_lon, self.px_per_lat)
    }
}
