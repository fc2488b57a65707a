use crate::error::RejectReason;
use crate::geometry::Shape;
use crate::path::{absolutize, line_vertices, parse_path, transform_commands};
use crate::transform::Matrix;
use crate::types::{LayerContext, Point};

/// Drawable primitive in local coordinates, as read from a drawing node.
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Line {
        from: Point,
        to: Point,
    },
    Polygon(Vec<Point>),
    Polyline(Vec<Point>),
    Path(String),
    Circle {
        center: Point,
        r: f64,
    },
    Ellipse {
        center: Point,
        rx: f64,
        ry: f64,
    },
}

impl Primitive {
    pub fn kind(&self) -> &'static str {
        match self {
            Primitive::Rect { .. } => "rect",
            Primitive::Line { .. } => "line",
            Primitive::Polygon(_) => "polygon",
            Primitive::Polyline(_) => "polyline",
            Primitive::Path(_) => "path",
            Primitive::Circle { .. } => "circle",
            Primitive::Ellipse { .. } => "ellipse",
        }
    }
}

/// Maps a primitive through `m` and picks its output kind.
///
/// Polygon and polyline results are candidates: point reduction and
/// validity checks happen afterwards in `simplify`.
pub fn normalize(
    primitive: &Primitive,
    m: Matrix,
    context: LayerContext,
    epsilon: f64,
) -> Result<Shape, RejectReason> {
    let shape = match primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
        } => normalize_rect(*x, *y, *width, *height, m, epsilon)?,
        Primitive::Line { from, to } => {
            let from = m.apply(*from);
            let to = m.apply(*to);
            if context.line_as_polyline() {
                Shape::Polyline {
                    points: vec![from, to],
                }
            } else {
                Shape::Line {
                    x1: from.x,
                    y1: from.y,
                    x2: to.x,
                    y2: to.y,
                }
            }
        }
        Primitive::Polygon(points) => Shape::Polygon {
            points: points.iter().map(|p| m.apply(*p)).collect(),
        },
        Primitive::Polyline(points) => Shape::Polyline {
            points: points.iter().map(|p| m.apply(*p)).collect(),
        },
        Primitive::Path(d) => normalize_path(d, m, epsilon)?,
        Primitive::Circle { center, r } => {
            if *r <= 0.0 {
                return Err(RejectReason::NonPositiveSize);
            }
            let c = m.apply(*center);
            // Rotation or non-uniform scale cannot keep a circle; use the
            // area-preserving radius.
            let r = match m.uniform_scale(epsilon) {
                Some(s) => r * s,
                None => r * m.scale_factor(),
            };
            Shape::Circle {
                cx: c.x,
                cy: c.y,
                r,
            }
        }
        Primitive::Ellipse { center, rx, ry } => {
            if *rx <= 0.0 || *ry <= 0.0 {
                return Err(RejectReason::NonPositiveSize);
            }
            let c = m.apply(*center);
            let (sx, sy) = if m.is_axis_aligned(epsilon) {
                (m.a.abs(), m.d.abs())
            } else {
                m.axis_scales()
            };
            Shape::Ellipse {
                cx: c.x,
                cy: c.y,
                rx: rx * sx,
                ry: ry * sy,
            }
        }
    };

    match &shape {
        Shape::Rect { width, height, .. } if *width <= 0.0 || *height <= 0.0 => {
            Err(RejectReason::NonPositiveSize)
        }
        Shape::Circle { r, .. } if *r <= 0.0 => Err(RejectReason::NonPositiveSize),
        Shape::Ellipse { rx, ry, .. } if *rx <= 0.0 || *ry <= 0.0 => {
            Err(RejectReason::NonPositiveSize)
        }
        Shape::Rect { .. } | Shape::Circle { .. } | Shape::Ellipse { .. } | Shape::Path { .. }
            if !shape.is_finite() =>
        {
            Err(RejectReason::NonFinite)
        }
        _ => Ok(shape),
    }
}

fn normalize_rect(
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    m: Matrix,
    epsilon: f64,
) -> Result<Shape, RejectReason> {
    if width <= 0.0 || height <= 0.0 {
        return Err(RejectReason::NonPositiveSize);
    }
    let corners = [
        Point::new(x, y),
        Point::new(x + width, y),
        Point::new(x + width, y + height),
        Point::new(x, y + height),
    ];

    if m.is_axis_aligned(epsilon) {
        let p0 = m.apply(corners[0]);
        let p2 = m.apply(corners[2]);
        return Ok(Shape::Rect {
            x: p0.x.min(p2.x),
            y: p0.y.min(p2.y),
            width: (p2.x - p0.x).abs(),
            height: (p2.y - p0.y).abs(),
        });
    }

    Ok(Shape::Polygon {
        points: corners.iter().map(|p| m.apply(*p)).collect(),
    })
}

fn normalize_path(d: &str, m: Matrix, epsilon: f64) -> Result<Shape, RejectReason> {
    let commands = absolutize(&parse_path(d));
    if commands.is_empty() {
        return Err(RejectReason::EmptyPath);
    }
    let commands = transform_commands(&commands, m, epsilon);

    Ok(match line_vertices(&commands) {
        Some((points, true)) => Shape::Polygon { points },
        Some((points, false)) => Shape::Polyline { points },
        None => Shape::Path { commands },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathCommand;
    use crate::transform::parse_transform_list;

    const EPS: f64 = 1e-9;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> Primitive {
        Primitive::Rect {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn rotated_rect_becomes_polygon() {
        let shape = normalize(
            &rect(0.0, 0.0, 10.0, 10.0),
            parse_transform_list("rotate(45)"),
            LayerContext::Plain,
            EPS,
        )
        .expect("valid rect");
        let Shape::Polygon { points } = shape else {
            panic!("expected polygon, got {shape:?}");
        };
        assert_eq!(points.len(), 4);
        assert!((points[2].x - 0.0).abs() < 1e-9);
        assert!((points[2].y - 200f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn scaled_rect_under_translated_ancestor_stays_rect() {
        let m = parse_transform_list("translate(100,0)").multiply(parse_transform_list("scale(2)"));
        let shape = normalize(&rect(10.0, 10.0, 50.0, 50.0), m, LayerContext::Plain, EPS)
            .expect("valid rect");
        assert_eq!(
            shape,
            Shape::Rect {
                x: 120.0,
                y: 20.0,
                width: 100.0,
                height: 100.0
            }
        );
    }

    #[test]
    fn mirrored_rect_keeps_positive_extent() {
        let shape = normalize(
            &rect(0.0, 0.0, 10.0, 5.0),
            Matrix::scale(-1.0, 1.0),
            LayerContext::Plain,
            EPS,
        )
        .expect("valid rect");
        assert_eq!(
            shape,
            Shape::Rect {
                x: -10.0,
                y: 0.0,
                width: 10.0,
                height: 5.0
            }
        );
    }

    #[test]
    fn zero_sized_rect_is_rejected() {
        let err = normalize(&rect(0.0, 0.0, 0.0, 5.0), Matrix::identity(), LayerContext::Plain, EPS);
        assert_eq!(err, Err(RejectReason::NonPositiveSize));
        let err = normalize(
            &rect(0.0, 0.0, 5.0, 5.0),
            Matrix::scale(0.0, 1.0),
            LayerContext::Plain,
            EPS,
        );
        assert_eq!(err, Err(RejectReason::NonPositiveSize));
    }

    #[test]
    fn circle_radius_follows_uniform_scale() {
        let circle = Primitive::Circle {
            center: Point::new(1.0, 1.0),
            r: 2.0,
        };
        let shape = normalize(
            &circle,
            parse_transform_list("translate(5,5) scale(3)"),
            LayerContext::Plain,
            EPS,
        )
        .expect("valid circle");
        assert_eq!(
            shape,
            Shape::Circle {
                cx: 8.0,
                cy: 8.0,
                r: 6.0
            }
        );
    }

    #[test]
    fn circle_under_non_uniform_scale_approximates_radius() {
        let circle = Primitive::Circle {
            center: Point::ORIGIN,
            r: 1.0,
        };
        let shape = normalize(&circle, Matrix::scale(2.0, 8.0), LayerContext::Plain, EPS)
            .expect("valid circle");
        let Shape::Circle { r, .. } = shape else {
            panic!("expected circle");
        };
        assert!((r - 4.0).abs() < 1e-9);
    }

    #[test]
    fn ellipse_radii_scale_per_axis() {
        let ellipse = Primitive::Ellipse {
            center: Point::new(2.0, 2.0),
            rx: 4.0,
            ry: 1.0,
        };
        let shape = normalize(&ellipse, Matrix::scale(2.0, 3.0), LayerContext::Plain, EPS)
            .expect("valid ellipse");
        assert_eq!(
            shape,
            Shape::Ellipse {
                cx: 4.0,
                cy: 6.0,
                rx: 8.0,
                ry: 3.0
            }
        );

        let shape = normalize(&ellipse, Matrix::rotate(90.0), LayerContext::Plain, EPS)
            .expect("valid ellipse");
        let Shape::Ellipse { rx, ry, .. } = shape else {
            panic!("expected ellipse");
        };
        assert!((rx - 4.0).abs() < 1e-9 && (ry - 1.0).abs() < 1e-9);
    }

    #[test]
    fn line_becomes_polyline_in_room_and_itinerary_layers() {
        let line = Primitive::Line {
            from: Point::new(0.0, 0.0),
            to: Point::new(5.0, 0.0),
        };
        let plain = normalize(&line, Matrix::translate(1.0, 1.0), LayerContext::Plain, EPS);
        assert_eq!(
            plain,
            Ok(Shape::Line {
                x1: 1.0,
                y1: 1.0,
                x2: 6.0,
                y2: 1.0
            })
        );
        for context in [LayerContext::Room, LayerContext::Itinerary] {
            let shape = normalize(&line, Matrix::identity(), context, EPS).expect("line");
            assert_eq!(shape.points().map(|p| p.len()), Some(2));
            assert_eq!(shape.kind(), "polyline");
        }
    }

    #[test]
    fn polyline_points_keep_order_and_count() {
        let pts = vec![Point::new(0.0, 0.0), Point::new(0.1, 0.0), Point::new(5.0, 5.0)];
        let shape = normalize(
            &Primitive::Polyline(pts),
            Matrix::translate(1.0, 0.0),
            LayerContext::Plain,
            EPS,
        )
        .expect("polyline");
        assert_eq!(
            shape.points().expect("points"),
            &[Point::new(1.0, 0.0), Point::new(1.1, 0.0), Point::new(6.0, 5.0)]
        );
    }

    #[test]
    fn closed_line_path_is_polygon_candidate() {
        let shape = normalize(
            &Primitive::Path("M0,0 L10,0 L10,10 L0,10 Z".to_string()),
            Matrix::identity(),
            LayerContext::Plain,
            EPS,
        )
        .expect("path");
        assert_eq!(shape.kind(), "polygon");
        assert_eq!(shape.points().map(|p| p.len()), Some(4));

        let open = normalize(
            &Primitive::Path("M0,0 H10 V10".to_string()),
            Matrix::identity(),
            LayerContext::Plain,
            EPS,
        )
        .expect("path");
        assert_eq!(open.kind(), "polyline");
    }

    #[test]
    fn curved_path_stays_path_with_transformed_coordinates() {
        let shape = normalize(
            &Primitive::Path("M0,0 Q5,10 10,0".to_string()),
            Matrix::translate(0.5, 0.25),
            LayerContext::Plain,
            EPS,
        )
        .expect("path");
        let Shape::Path { commands } = &shape else {
            panic!("expected path");
        };
        assert_eq!(commands[0], PathCommand::MoveTo(Point::new(0.5, 0.25)));
        assert_eq!(shape.path_data(3).as_deref(), Some("M0.5,0.25 Q5.5,10.25 10.5,0.25"));
    }

    #[test]
    fn unparseable_path_is_rejected() {
        let err = normalize(
            &Primitive::Path("garbage".to_string()),
            Matrix::identity(),
            LayerContext::Plain,
            EPS,
        );
        assert_eq!(err, Err(RejectReason::EmptyPath));
    }

    #[test]
    fn non_finite_circle_is_rejected() {
        let circle = Primitive::Circle {
            center: Point::new(f64::NAN, 0.0),
            r: 1.0,
        };
        assert_eq!(
            normalize(&circle, Matrix::identity(), LayerContext::Plain, EPS),
            Err(RejectReason::NonFinite)
        );
    }
}
