use crate::error::RejectReason;
use crate::geometry::Shape;
use crate::types::{LayerContext, Point};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Per-axis distance under which consecutive points merge.
    pub merge_threshold: f64,
    /// Minimum area/perimeter ratio for a polygon to count as an area.
    pub min_area_ratio: f64,
    /// Tolerance for "no rotation/skew" and uniform-scale checks.
    pub epsilon: f64,
    /// Decimal places kept in emitted coordinates.
    pub precision: u32,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            merge_threshold: 0.4,
            min_area_ratio: 0.2,
            epsilon: 1e-9,
            precision: 3,
        }
    }
}

/// Drops non-finite points and every point within `threshold` (per axis)
/// of the last kept one. The first finite point is always kept.
pub fn reduce_points(points: &[Point], threshold: f64) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(points.len());
    for p in points.iter().copied().filter(|p| p.is_finite()) {
        match out.last() {
            Some(last) if p.is_near(*last, threshold) => {}
            _ => out.push(p),
        }
    }
    out
}

/// Removes the trailing point when it duplicates the start of a closed ring.
pub fn drop_closing_points(points: &mut Vec<Point>, threshold: f64) {
    if points.len() > 1 && points[points.len() - 1].is_near(points[0], threshold) {
        points.pop();
    }
}

/// Appends the first point unless the ring already ends on it.
pub fn ensure_closed(points: &mut Vec<Point>, threshold: f64) {
    let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) else {
        return;
    };
    if points.len() < 2 || !last.is_near(first, threshold) {
        points.push(first);
    }
}

// Includes the closing edge.
pub fn perimeter(points: &[Point]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let open: f64 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
    open + points[points.len() - 1].distance(points[0])
}

pub fn area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let p = points[i];
            let q = points[(i + 1) % n];
            p.x * q.y - q.x * p.y
        })
        .sum();
    twice.abs() / 2.0
}

/// Rejects rings with no extent or whose area is small relative to their
/// outline (slivers that render as lines).
pub fn check_area(points: &[Point], min_ratio: f64) -> Result<(), RejectReason> {
    let perimeter = perimeter(points);
    if perimeter <= 0.0 {
        return Err(RejectReason::ZeroPerimeter);
    }
    let ratio = area(points) / perimeter;
    if ratio < min_ratio {
        return Err(RejectReason::Sliver {
            ratio,
            min: min_ratio,
        });
    }
    Ok(())
}

fn require(points: &[Point], required: usize) -> Result<(), RejectReason> {
    if points.len() < required {
        return Err(RejectReason::TooFewPoints {
            found: points.len(),
            required,
        });
    }
    Ok(())
}

/// Reduces and validates a normalized shape for the given layer, possibly
/// changing its kind (polygons become closed polylines in itinerary and
/// furniture layers).
pub fn simplify(
    shape: Shape,
    context: LayerContext,
    tolerances: &Tolerances,
) -> Result<Shape, RejectReason> {
    let threshold = tolerances.merge_threshold;
    match shape {
        Shape::Polygon { points } => {
            let mut points = reduce_points(&points, threshold);
            if context.drops_closing_point() {
                drop_closing_points(&mut points, threshold);
            }
            require(&points, context.min_polygon_points())?;
            if context.filters_slivers() {
                check_area(&points, tolerances.min_area_ratio)?;
            }
            if context.closed_as_polyline() {
                ensure_closed(&mut points, threshold);
                Ok(Shape::Polyline { points })
            } else {
                Ok(Shape::Polygon { points })
            }
        }
        Shape::Polyline { points } => {
            let points = reduce_points(&points, threshold);
            require(&points, 2)?;
            Ok(Shape::Polyline { points })
        }
        Shape::Line { x1, y1, x2, y2 } => {
            let points = reduce_points(&[Point::new(x1, y1), Point::new(x2, y2)], threshold);
            require(&points, 2)?;
            Ok(Shape::Line { x1, y1, x2, y2 })
        }
        other => {
            if other.is_finite() {
                Ok(other)
            } else {
                Err(RejectReason::NonFinite)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(raw: &[(f64, f64)]) -> Vec<Point> {
        raw.iter().copied().map(Point::from).collect()
    }

    fn polygon(raw: &[(f64, f64)]) -> Shape {
        Shape::Polygon { points: pts(raw) }
    }

    #[test]
    fn merges_near_points_and_drops_closing_point() {
        let shape = polygon(&[
            (0.0, 0.0),
            (0.1, 0.1),
            (0.2, 0.2),
            (10.0, 0.0),
            (10.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.1),
        ]);
        let out = simplify(shape, LayerContext::Plain, &Tolerances::default()).expect("valid");
        assert_eq!(
            out,
            polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)])
        );
    }

    #[test]
    fn only_one_closing_point_is_dropped() {
        let shape = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.4, 0.4), (-0.3, 0.0)]);
        let out = simplify(shape, LayerContext::Plain, &Tolerances::default()).expect("valid");
        assert_eq!(
            out,
            polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.4, 0.4)])
        );
    }

    #[test]
    fn threshold_is_per_axis_not_euclidean() {
        // Euclidean distance 0.5 but neither axis moves more than 0.4.
        let reduced = reduce_points(&pts(&[(0.0, 0.0), (0.35, 0.35)]), 0.4);
        assert_eq!(reduced.len(), 1);
        let reduced = reduce_points(&pts(&[(0.0, 0.0), (0.41, 0.0)]), 0.4);
        assert_eq!(reduced.len(), 2);
    }

    #[test]
    fn reduction_compares_against_last_kept_point() {
        let reduced = reduce_points(&pts(&[(0.0, 0.0), (0.3, 0.0), (0.6, 0.0), (0.9, 0.0)]), 0.4);
        assert_eq!(reduced, pts(&[(0.0, 0.0), (0.6, 0.0)]));
    }

    #[test]
    fn reduction_is_idempotent() {
        let input = pts(&[
            (0.0, 0.0),
            (0.2, 0.1),
            (0.5, 0.5),
            (0.7, 0.6),
            (3.0, 3.0),
            (3.3, 3.3),
            (3.5, 2.0),
            (-1.0, 4.0),
            (-1.2, 4.3),
        ]);
        let once = reduce_points(&input, 0.4);
        let twice = reduce_points(&once, 0.4);
        assert_eq!(once, twice);
    }

    #[test]
    fn non_finite_points_are_dropped() {
        let reduced = reduce_points(
            &pts(&[(f64::NAN, 0.0), (1.0, 1.0), (f64::INFINITY, 2.0), (5.0, 5.0)]),
            0.4,
        );
        assert_eq!(reduced, pts(&[(1.0, 1.0), (5.0, 5.0)]));

        let shape = polygon(&[(f64::NAN, 0.0), (1.0, 1.0), (5.0, 5.0)]);
        assert_eq!(
            simplify(shape, LayerContext::Plain, &Tolerances::default()),
            Err(RejectReason::TooFewPoints {
                found: 2,
                required: 3
            })
        );
    }

    #[test]
    fn thin_rectangle_is_rejected() {
        let shape = polygon(&[(0.0, 0.0), (100.0, 0.0), (100.0, 0.1), (0.0, 0.1)]);
        assert!(simplify(shape, LayerContext::Plain, &Tolerances::default()).is_err());
    }

    #[test]
    fn sliver_triangle_fails_area_ratio() {
        let shape = polygon(&[(0.0, 0.0), (100.0, 0.0), (50.0, 0.5)]);
        let err = simplify(shape, LayerContext::Plain, &Tolerances::default()).unwrap_err();
        assert!(matches!(err, RejectReason::Sliver { ratio, .. } if ratio < 0.2));
    }

    #[test]
    fn perimeter_and_area_of_square() {
        let square = pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert_eq!(perimeter(&square), 40.0);
        assert_eq!(area(&square), 100.0);
        assert!(check_area(&square, 0.2).is_ok());
        assert_eq!(check_area(&pts(&[(1.0, 1.0)]), 0.2), Err(RejectReason::ZeroPerimeter));
    }

    #[test]
    fn itinerary_polygon_becomes_closed_polyline() {
        let shape = polygon(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]);
        let out = simplify(shape, LayerContext::Itinerary, &Tolerances::default()).expect("valid");
        assert_eq!(
            out,
            Shape::Polyline {
                points: pts(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 0.0)])
            }
        );
    }

    #[test]
    fn itinerary_keeps_existing_closing_point_and_accepts_two_points() {
        let shape = polygon(&[(0.0, 0.0), (10.0, 0.0), (0.1, 0.0)]);
        let out = simplify(shape, LayerContext::Itinerary, &Tolerances::default()).expect("valid");
        assert_eq!(
            out,
            Shape::Polyline {
                points: pts(&[(0.0, 0.0), (10.0, 0.0), (0.1, 0.0)])
            }
        );

        let shape = polygon(&[(0.0, 0.0), (10.0, 0.0)]);
        let out = simplify(shape, LayerContext::Itinerary, &Tolerances::default()).expect("valid");
        assert_eq!(out.points().map(|p| p.len()), Some(3));
    }

    #[test]
    fn furniture_skips_area_filter_but_needs_three_points() {
        let sliver = polygon(&[(0.0, 0.0), (100.0, 0.0), (50.0, 0.5)]);
        let out = simplify(sliver, LayerContext::Furniture, &Tolerances::default()).expect("valid");
        assert_eq!(out.kind(), "polyline");
        assert_eq!(out.points().map(|p| p.len()), Some(4));

        let pair = polygon(&[(0.0, 0.0), (10.0, 0.0)]);
        assert!(simplify(pair, LayerContext::Furniture, &Tolerances::default()).is_err());
    }

    #[test]
    fn polyline_needs_two_distinct_points() {
        let shape = Shape::Polyline {
            points: pts(&[(0.0, 0.0), (0.2, 0.2), (0.3, 0.0)]),
        };
        assert_eq!(
            simplify(shape, LayerContext::Plain, &Tolerances::default()),
            Err(RejectReason::TooFewPoints {
                found: 1,
                required: 2
            })
        );
    }

    #[test]
    fn degenerate_line_is_rejected() {
        let shape = Shape::Line {
            x1: 1.0,
            y1: 1.0,
            x2: 1.2,
            y2: 1.0,
        };
        assert!(simplify(shape, LayerContext::Plain, &Tolerances::default()).is_err());
    }

    #[test]
    fn ensure_closed_is_stable() {
        let mut ring = pts(&[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)]);
        ensure_closed(&mut ring, 0.4);
        ensure_closed(&mut ring, 0.4);
        assert_eq!(ring.len(), 4);
    }
}
