use tracing::warn;

use crate::document::ElementView;
use crate::types::Point;

// Affine matrix mapping (x, y) to (x*a + y*c + e, x*b + y*d + f).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::identity()
    }
}

impl Matrix {
    pub const fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub const fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub const fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    pub fn rotate(deg: f64) -> Self {
        let rad = deg.to_radians();
        let s = libm::sin(rad);
        let c = libm::cos(rad);
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    pub fn rotate_around(deg: f64, cx: f64, cy: f64) -> Self {
        Matrix::translate(cx, cy)
            .multiply(Matrix::rotate(deg))
            .multiply(Matrix::translate(-cx, -cy))
    }

    pub fn skew_x(deg: f64) -> Self {
        Self::new(1.0, 0.0, libm::tan(deg.to_radians()), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(deg: f64) -> Self {
        Self::new(1.0, libm::tan(deg.to_radians()), 0.0, 1.0, 0.0, 0.0)
    }

    /// `self ∘ other`: `other` is applied to a point first, then `self`.
    pub fn multiply(self, other: Self) -> Self {
        Self {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    pub fn apply(self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    // No rotation or skew component.
    pub fn is_axis_aligned(self, epsilon: f64) -> bool {
        self.b.abs() <= epsilon && self.c.abs() <= epsilon
    }

    /// Scale factor when the matrix is a uniform scale plus translation.
    pub fn uniform_scale(self, epsilon: f64) -> Option<f64> {
        if self.is_axis_aligned(epsilon) && (self.a.abs() - self.d.abs()).abs() <= epsilon {
            Some(self.a.abs())
        } else {
            None
        }
    }

    // Approx: area scale -> sqrt(|det|).
    pub fn scale_factor(self) -> f64 {
        let det = self.a * self.d - self.b * self.c;
        libm::sqrt(det.abs())
    }

    pub fn axis_scales(self) -> (f64, f64) {
        (libm::hypot(self.a, self.b), libm::hypot(self.c, self.d))
    }
}

pub fn identity() -> Matrix {
    Matrix::identity()
}

pub fn multiply(m1: Matrix, m2: Matrix) -> Matrix {
    m1.multiply(m2)
}

pub fn transform_point(p: Point, m: Matrix) -> Point {
    m.apply(p)
}

/// Parses an SVG transform list. Functions compose right-to-left: the
/// rightmost one acts on the point first. A function with an unknown name
/// or a bad argument count contributes identity.
pub fn parse_transform_list(input: &str) -> Matrix {
    let mut out = Matrix::identity();
    let mut s = input.trim();

    while !s.is_empty() {
        let Some(open) = s.find('(') else {
            if !s.trim_matches(|c: char| c == ',' || c.is_whitespace()).is_empty() {
                warn!(transform = input, rest = s, "trailing garbage in transform list");
            }
            break;
        };
        let name = s[..open].trim_matches(|c: char| c == ',' || c.is_whitespace());
        let Some(close) = s[open + 1..].find(')') else {
            warn!(transform = input, function = name, "unterminated transform function");
            break;
        };
        let args_str = &s[open + 1..open + 1 + close];
        out = out.multiply(transform_function(name, args_str));
        s = s[open + 1 + close + 1..].trim_start();
    }

    out
}

fn transform_function(name: &str, args_str: &str) -> Matrix {
    let Some(args) = parse_number_list(args_str) else {
        warn!(function = name, args = args_str, "non-numeric transform arguments");
        return Matrix::identity();
    };

    let m = match (name, args.as_slice()) {
        ("matrix", &[a, b, c, d, e, f]) => Some(Matrix::new(a, b, c, d, e, f)),
        ("translate", &[tx]) => Some(Matrix::translate(tx, 0.0)),
        ("translate", &[tx, ty]) => Some(Matrix::translate(tx, ty)),
        ("scale", &[s]) => Some(Matrix::scale(s, s)),
        ("scale", &[sx, sy]) => Some(Matrix::scale(sx, sy)),
        ("rotate", &[deg]) => Some(Matrix::rotate(deg)),
        ("rotate", &[deg, cx, cy]) => Some(Matrix::rotate_around(deg, cx, cy)),
        ("skewX", &[deg]) => Some(Matrix::skew_x(deg)),
        ("skewY", &[deg]) => Some(Matrix::skew_y(deg)),
        ("matrix" | "translate" | "scale" | "rotate" | "skewX" | "skewY", _) => {
            warn!(function = name, arity = args.len(), "wrong transform argument count");
            None
        }
        _ => {
            warn!(function = name, "unknown transform function");
            None
        }
    };
    m.unwrap_or_else(Matrix::identity)
}

fn parse_number_list(input: &str) -> Option<Vec<f64>> {
    input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect()
}

/// Composes the transforms of every ancestor of `node` below the document
/// root. The outermost ancestor's transform is applied last.
pub fn accumulate_ancestor_transform<N: ElementView>(node: &N) -> Matrix {
    let mut out = Matrix::identity();
    let mut current = node.parent_element();
    while let Some(parent) = current {
        let next = parent.parent_element();
        if next.is_none() {
            // `parent` is the document root.
            break;
        }
        if let Some(transform) = parent.attribute("transform") {
            out = parse_transform_list(transform).multiply(out);
        }
        current = next;
    }
    out
}

/// Full matrix mapping `node`'s local coordinates to document space.
pub fn element_transform<N: ElementView>(node: &N) -> Matrix {
    let local = node
        .attribute("transform")
        .map(parse_transform_list)
        .unwrap_or_default();
    accumulate_ancestor_transform(node).multiply(local)
}
