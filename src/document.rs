use crate::error::RejectReason;
use crate::shape::Primitive;
use crate::types::{Point, SourceId};

/// Read-only view of a drawing node, supplied by whatever parsed the
/// markup. Only attribute lookup and upward traversal are needed.
pub trait ElementView: Sized {
    fn tag_name(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;
    fn source_id(&self) -> SourceId;
}

impl<'a, 'input: 'a> ElementView for roxmltree::Node<'a, 'input> {
    fn tag_name(&self) -> &str {
        roxmltree::Node::tag_name(self).name()
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        roxmltree::Node::attribute(self, name)
    }

    fn parent_element(&self) -> Option<Self> {
        roxmltree::Node::parent_element(self)
    }

    fn source_id(&self) -> SourceId {
        match roxmltree::Node::attribute(self, "id") {
            Some(id) => SourceId::new(id),
            // Fall back to the byte offset in the source markup.
            None => SourceId::new(format!(
                "{}@{}",
                roxmltree::Node::tag_name(self).name(),
                self.range().start
            )),
        }
    }
}

// Subtrees that are never rendered directly.
const NON_RENDERED: &[&str] = &["defs", "symbol", "clipPath", "mask", "pattern", "marker"];

const DRAWABLE: &[&str] = &["rect", "line", "polygon", "polyline", "path", "circle", "ellipse"];

pub fn is_drawable(tag: &str) -> bool {
    drawable_kind(tag).is_some()
}

pub(crate) fn drawable_kind(tag: &str) -> Option<&'static str> {
    DRAWABLE.iter().copied().find(|t| *t == tag)
}

/// Drawable element descendants of `root` (inclusive) in document order.
pub fn drawable_descendants<'a, 'input>(
    root: roxmltree::Node<'a, 'input>,
) -> Vec<roxmltree::Node<'a, 'input>> {
    let mut out = Vec::new();
    collect_drawables(root, &mut out);
    out
}

fn collect_drawables<'a, 'input>(
    node: roxmltree::Node<'a, 'input>,
    out: &mut Vec<roxmltree::Node<'a, 'input>>,
) {
    if !node.is_element() {
        return;
    }
    let tag = node.tag_name().name();
    if NON_RENDERED.contains(&tag) {
        return;
    }
    if is_drawable(tag) {
        out.push(node);
        return;
    }
    for child in node.children().filter(|n| n.is_element()) {
        collect_drawables(child, out);
    }
}

impl Primitive {
    /// Reads the primitive described by `node`. `Ok(None)` for tags that
    /// draw nothing by themselves.
    pub fn from_element<N: ElementView>(node: &N) -> Result<Option<Primitive>, RejectReason> {
        let primitive = match node.tag_name() {
            "rect" => {
                let width = required_number(node, "width")?;
                let height = required_number(node, "height")?;
                if width <= 0.0 || height <= 0.0 {
                    return Err(RejectReason::NonPositiveSize);
                }
                Primitive::Rect {
                    x: optional_number(node, "x")?,
                    y: optional_number(node, "y")?,
                    width,
                    height,
                }
            }
            "line" => Primitive::Line {
                from: Point::new(optional_number(node, "x1")?, optional_number(node, "y1")?),
                to: Point::new(optional_number(node, "x2")?, optional_number(node, "y2")?),
            },
            "polygon" => Primitive::Polygon(required_points(node)?),
            "polyline" => Primitive::Polyline(required_points(node)?),
            "path" => {
                let d = node
                    .attribute("d")
                    .ok_or(RejectReason::MissingAttribute("d"))?;
                if d.trim().is_empty() {
                    return Err(RejectReason::EmptyPath);
                }
                Primitive::Path(d.to_string())
            }
            "circle" => {
                let r = required_number(node, "r")?;
                if r <= 0.0 {
                    return Err(RejectReason::NonPositiveSize);
                }
                Primitive::Circle {
                    center: Point::new(optional_number(node, "cx")?, optional_number(node, "cy")?),
                    r,
                }
            }
            "ellipse" => {
                let rx = maybe_number(node, "rx")?;
                let ry = maybe_number(node, "ry")?;
                let (rx, ry) = match (rx, ry) {
                    (Some(rx), Some(ry)) => (rx, ry),
                    (Some(r), None) | (None, Some(r)) => (r, r),
                    (None, None) => return Err(RejectReason::MissingAttribute("rx")),
                };
                if rx <= 0.0 || ry <= 0.0 {
                    return Err(RejectReason::NonPositiveSize);
                }
                Primitive::Ellipse {
                    center: Point::new(optional_number(node, "cx")?, optional_number(node, "cy")?),
                    rx,
                    ry,
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(primitive))
    }
}

fn parse_number(input: &str) -> Option<f64> {
    let s = input.trim();
    // Ignore unit suffixes (treat user units as-is).
    let s = s
        .trim_end_matches("px")
        .trim_end_matches("pt")
        .trim_end_matches("mm")
        .trim_end_matches("cm")
        .trim_end_matches("in")
        .trim();
    s.parse::<f64>().ok()
}

fn maybe_number<N: ElementView>(node: &N, name: &'static str) -> Result<Option<f64>, RejectReason> {
    match node.attribute(name) {
        None => Ok(None),
        Some(raw) => parse_number(raw)
            .map(Some)
            .ok_or_else(|| RejectReason::InvalidAttribute {
                name,
                value: raw.to_string(),
            }),
    }
}

fn optional_number<N: ElementView>(node: &N, name: &'static str) -> Result<f64, RejectReason> {
    Ok(maybe_number(node, name)?.unwrap_or(0.0))
}

fn required_number<N: ElementView>(node: &N, name: &'static str) -> Result<f64, RejectReason> {
    maybe_number(node, name)?.ok_or(RejectReason::MissingAttribute(name))
}

fn required_points<N: ElementView>(node: &N) -> Result<Vec<Point>, RejectReason> {
    let raw = node
        .attribute("points")
        .ok_or(RejectReason::MissingAttribute("points"))?;
    parse_points(raw).ok_or_else(|| RejectReason::InvalidAttribute {
        name: "points",
        value: raw.to_string(),
    })
}

/// Parses a `points` list. `None` if any token is not a number; a trailing
/// odd coordinate is ignored.
pub fn parse_points(input: &str) -> Option<Vec<Point>> {
    let nums = input
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok())
        .collect::<Option<Vec<f64>>>()?;
    Some(nums.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
}
