use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Point {
        Point { x, y }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    // Chebyshev closeness: both axis deltas within the threshold.
    pub fn is_near(self, other: Point, threshold: f64) -> bool {
        (self.x - other.x).abs() <= threshold && (self.y - other.y).abs() <= threshold
    }

    pub fn distance(self, other: Point) -> f64 {
        libm::hypot(other.x - self.x, other.y - self.y)
    }

    pub fn rounded(self, precision: u32) -> Point {
        Point {
            x: round_to(self.x, precision),
            y: round_to(self.y, precision),
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Point { x, y }
    }
}

/// Opaque identifier of the drawing node a geometry was produced from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        SourceId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Layer a shape is processed for. Itinerary and furniture layers represent
/// closed outlines as explicitly closed polylines instead of polygons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerContext {
    #[default]
    Plain,
    Room,
    Itinerary,
    Furniture,
}

impl LayerContext {
    pub(crate) fn closed_as_polyline(self) -> bool {
        matches!(self, LayerContext::Itinerary | LayerContext::Furniture)
    }

    pub(crate) fn line_as_polyline(self) -> bool {
        matches!(self, LayerContext::Room | LayerContext::Itinerary)
    }

    pub(crate) fn drops_closing_point(self) -> bool {
        self != LayerContext::Itinerary
    }

    pub(crate) fn min_polygon_points(self) -> usize {
        if self == LayerContext::Itinerary { 2 } else { 3 }
    }

    pub(crate) fn filters_slivers(self) -> bool {
        matches!(self, LayerContext::Plain | LayerContext::Room)
    }
}

pub(crate) fn round_to(value: f64, precision: u32) -> f64 {
    let factor = 10f64.powi(precision as i32);
    let scaled = value * factor;
    // Too large to carry a fractional part at this precision.
    if !scaled.is_finite() {
        return value;
    }
    let rounded = scaled.round() / factor;
    // Avoid emitting "-0".
    if rounded == 0.0 { 0.0 } else { rounded }
}

pub(crate) fn format_number(value: f64, precision: u32) -> String {
    format!("{}", round_to(value, precision))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounding_leaves_huge_values_finite() {
        assert_eq!(round_to(1e306, 3), 1e306);
        assert_eq!(round_to(-f64::MAX, 2), -f64::MAX);
    }

    #[test]
    fn rounding_normalizes_negative_zero() {
        assert_eq!(format_number(-0.0001, 3), "0");
        assert_eq!(format_number(-1.23456, 3), "-1.235");
        assert_eq!(format_number(120.0, 3), "120");
    }

    #[test]
    fn nearness_is_per_axis() {
        let a = Point::new(0.0, 0.0);
        assert!(a.is_near(Point::new(0.4, 0.4), 0.4));
        assert!(!a.is_near(Point::new(0.41, 0.0), 0.4));
        assert!(!a.is_near(Point::new(0.0, -0.5), 0.4));
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(Point::new(1.0, 2.0).is_finite());
        assert!(!Point::new(f64::NAN, 2.0).is_finite());
        assert!(!Point::new(0.0, f64::INFINITY).is_finite());
    }
}
