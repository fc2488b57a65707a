use serde::Serialize;
use thiserror::Error;

use crate::error::RejectReason;
use crate::path::{PathCommand, encode_path};
use crate::types::{Point, SourceId, format_number, round_to};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
    Line {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
    },
    Polygon {
        points: Vec<Point>,
    },
    Polyline {
        points: Vec<Point>,
    },
    Path {
        commands: Vec<PathCommand>,
    },
    Circle {
        cx: f64,
        cy: f64,
        r: f64,
    },
    Ellipse {
        cx: f64,
        cy: f64,
        rx: f64,
        ry: f64,
    },
}

impl Shape {
    pub fn kind(&self) -> &'static str {
        match self {
            Shape::Rect { .. } => "rect",
            Shape::Line { .. } => "line",
            Shape::Polygon { .. } => "polygon",
            Shape::Polyline { .. } => "polyline",
            Shape::Path { .. } => "path",
            Shape::Circle { .. } => "circle",
            Shape::Ellipse { .. } => "ellipse",
        }
    }

    pub fn points(&self) -> Option<&[Point]> {
        match self {
            Shape::Polygon { points } | Shape::Polyline { points } => Some(points),
            _ => None,
        }
    }

    /// `points` attribute form: `"x,y x,y ..."`.
    pub fn points_attribute(&self, precision: u32) -> Option<String> {
        let points = self.points()?;
        Some(
            points
                .iter()
                .map(|p| {
                    format!(
                        "{},{}",
                        format_number(p.x, precision),
                        format_number(p.y, precision)
                    )
                })
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    pub fn path_data(&self, precision: u32) -> Option<String> {
        match self {
            Shape::Path { commands } => Some(encode_path(commands, precision)),
            _ => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => [x, y, width, height].iter().all(|v| v.is_finite()),
            Shape::Line { x1, y1, x2, y2 } => [x1, y1, x2, y2].iter().all(|v| v.is_finite()),
            Shape::Polygon { points } | Shape::Polyline { points } => {
                points.iter().all(|p| p.is_finite())
            }
            Shape::Path { commands } => commands.iter().all(|c| c.is_finite()),
            Shape::Circle { cx, cy, r } => [cx, cy, r].iter().all(|v| v.is_finite()),
            Shape::Ellipse { cx, cy, rx, ry } => [cx, cy, rx, ry].iter().all(|v| v.is_finite()),
        }
    }

    /// Checks that survive rounding: finite coordinates and a positive size
    /// for rects, circles and ellipses.
    pub(crate) fn check_emitted(&self) -> Result<(), RejectReason> {
        if !self.is_finite() {
            return Err(RejectReason::NonFinite);
        }
        let positive = match *self {
            Shape::Rect { width, height, .. } => width > 0.0 && height > 0.0,
            Shape::Circle { r, .. } => r > 0.0,
            Shape::Ellipse { rx, ry, .. } => rx > 0.0 && ry > 0.0,
            _ => true,
        };
        if positive {
            Ok(())
        } else {
            Err(RejectReason::NonPositiveSize)
        }
    }

    pub(crate) fn rounded(self, precision: u32) -> Shape {
        let r = |v: f64| round_to(v, precision);
        match self {
            Shape::Rect {
                x,
                y,
                width,
                height,
            } => Shape::Rect {
                x: r(x),
                y: r(y),
                width: r(width),
                height: r(height),
            },
            Shape::Line { x1, y1, x2, y2 } => Shape::Line {
                x1: r(x1),
                y1: r(y1),
                x2: r(x2),
                y2: r(y2),
            },
            Shape::Polygon { points } => Shape::Polygon {
                points: points.into_iter().map(|p| p.rounded(precision)).collect(),
            },
            Shape::Polyline { points } => Shape::Polyline {
                points: points.into_iter().map(|p| p.rounded(precision)).collect(),
            },
            Shape::Path { commands } => Shape::Path {
                commands: commands.into_iter().map(|c| c.rounded(precision)).collect(),
            },
            Shape::Circle { cx, cy, r: radius } => Shape::Circle {
                cx: r(cx),
                cy: r(cy),
                r: r(radius),
            },
            Shape::Ellipse { cx, cy, rx, ry } => Shape::Ellipse {
                cx: r(cx),
                cy: r(cy),
                rx: r(rx),
                ry: r(ry),
            },
        }
    }
}

/// A normalized, validated shape ready for downstream rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Geometry {
    pub source: SourceId,
    #[serde(flatten)]
    pub shape: Shape,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{id} ({kind}) rejected: {reason}")]
pub struct Rejection {
    pub id: SourceId,
    pub kind: &'static str,
    pub reason: RejectReason,
}

pub type Outcome = Result<Geometry, Rejection>;
