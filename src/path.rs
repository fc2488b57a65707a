use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PathSyntaxError;
use crate::transform::Matrix;
use crate::types::{Point, format_number};

/// One parameter tuple of a path command as written, before absolutization.
/// `letter` keeps its case: lowercase means relative.
#[derive(Debug, Clone, PartialEq)]
pub struct RawCommand {
    pub letter: char,
    pub args: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ArcParams {
    pub rx: f64,
    pub ry: f64,
    pub x_axis_rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
    pub end: Point,
}

/// Absolute path command.
///
/// Smooth curves keep their written arity; the control point implied by
/// reflection is carried alongside (`c1` / `control`) but is not part of
/// the encoded parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PathCommand {
    MoveTo(Point),
    LineTo(Point),
    HorizontalTo(f64),
    VerticalTo(f64),
    CubicTo { c1: Point, c2: Point, end: Point },
    SmoothCubicTo { c1: Point, c2: Point, end: Point },
    QuadTo { control: Point, end: Point },
    SmoothQuadTo { control: Point, end: Point },
    ArcTo(ArcParams),
    Close,
}

impl PathCommand {
    pub fn letter(&self) -> char {
        match self {
            PathCommand::MoveTo(_) => 'M',
            PathCommand::LineTo(_) => 'L',
            PathCommand::HorizontalTo(_) => 'H',
            PathCommand::VerticalTo(_) => 'V',
            PathCommand::CubicTo { .. } => 'C',
            PathCommand::SmoothCubicTo { .. } => 'S',
            PathCommand::QuadTo { .. } => 'Q',
            PathCommand::SmoothQuadTo { .. } => 'T',
            PathCommand::ArcTo(_) => 'A',
            PathCommand::Close => 'Z',
        }
    }

    pub fn params(&self) -> Vec<f64> {
        match *self {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => vec![p.x, p.y],
            PathCommand::HorizontalTo(v) | PathCommand::VerticalTo(v) => vec![v],
            PathCommand::CubicTo { c1, c2, end } => vec![c1.x, c1.y, c2.x, c2.y, end.x, end.y],
            PathCommand::SmoothCubicTo { c2, end, .. } => vec![c2.x, c2.y, end.x, end.y],
            PathCommand::QuadTo { control, end } => vec![control.x, control.y, end.x, end.y],
            PathCommand::SmoothQuadTo { end, .. } => vec![end.x, end.y],
            PathCommand::ArcTo(arc) => vec![
                arc.rx,
                arc.ry,
                arc.x_axis_rotation,
                if arc.large_arc { 1.0 } else { 0.0 },
                if arc.sweep { 1.0 } else { 0.0 },
                arc.end.x,
                arc.end.y,
            ],
            PathCommand::Close => Vec::new(),
        }
    }

    pub fn is_line_like(&self) -> bool {
        matches!(
            self,
            PathCommand::MoveTo(_)
                | PathCommand::LineTo(_)
                | PathCommand::HorizontalTo(_)
                | PathCommand::VerticalTo(_)
                | PathCommand::Close
        )
    }

    fn map_points(self, f: impl Fn(Point) -> Point) -> PathCommand {
        match self {
            PathCommand::MoveTo(p) => PathCommand::MoveTo(f(p)),
            PathCommand::LineTo(p) => PathCommand::LineTo(f(p)),
            PathCommand::CubicTo { c1, c2, end } => PathCommand::CubicTo {
                c1: f(c1),
                c2: f(c2),
                end: f(end),
            },
            PathCommand::SmoothCubicTo { c1, c2, end } => PathCommand::SmoothCubicTo {
                c1: f(c1),
                c2: f(c2),
                end: f(end),
            },
            PathCommand::QuadTo { control, end } => PathCommand::QuadTo {
                control: f(control),
                end: f(end),
            },
            PathCommand::SmoothQuadTo { control, end } => PathCommand::SmoothQuadTo {
                control: f(control),
                end: f(end),
            },
            PathCommand::ArcTo(arc) => PathCommand::ArcTo(ArcParams {
                end: f(arc.end),
                ..arc
            }),
            other => other,
        }
    }

    pub(crate) fn rounded(self, precision: u32) -> PathCommand {
        let r = |v: f64| crate::types::round_to(v, precision);
        match self {
            PathCommand::HorizontalTo(x) => PathCommand::HorizontalTo(r(x)),
            PathCommand::VerticalTo(y) => PathCommand::VerticalTo(r(y)),
            PathCommand::ArcTo(arc) => PathCommand::ArcTo(ArcParams {
                rx: r(arc.rx),
                ry: r(arc.ry),
                x_axis_rotation: r(arc.x_axis_rotation),
                end: arc.end.rounded(precision),
                ..arc
            }),
            other => other.map_points(|p| p.rounded(precision)),
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.params().iter().all(|v| v.is_finite())
    }
}

fn arity(letter: char) -> Option<usize> {
    match letter.to_ascii_uppercase() {
        'M' | 'L' | 'T' => Some(2),
        'H' | 'V' => Some(1),
        'C' => Some(6),
        'S' | 'Q' => Some(4),
        'A' => Some(7),
        'Z' => Some(0),
        _ => None,
    }
}

/// Tokenizes path data into one `RawCommand` per parameter tuple.
/// Implicit repetition expands a letter followed by several tuples; extra
/// pairs after a moveto become linetos of the same relativity.
pub fn try_parse_path(d: &str) -> Result<Vec<RawCommand>, PathSyntaxError> {
    let mut p = PathParser::new(d);
    let mut out = Vec::new();
    let mut current: Option<char> = None;

    p.skip_ws();
    match p.peek() {
        None => return Ok(out),
        Some(b'M' | b'm') => {}
        Some(_) => return Err(PathSyntaxError::MissingMoveTo),
    }

    loop {
        p.skip_ws();
        let Some(b) = p.peek() else { break };
        let offset = p.i;

        if b.is_ascii_alphabetic() {
            p.i += 1;
            let letter = b as char;
            let Some(n) = arity(letter) else {
                warn!(command = %letter, offset, "skipping unknown path command");
                while p.next_number().is_some() {}
                current = None;
                continue;
            };
            current = Some(letter);
            if n == 0 {
                out.push(RawCommand {
                    letter,
                    args: Vec::new(),
                });
                continue;
            }
            let args = p
                .next_tuple(letter)
                .ok_or(PathSyntaxError::IncompleteParameters {
                    command: letter,
                    offset,
                })?;
            out.push(RawCommand { letter, args });
        } else if is_number_start(b) {
            let letter = match current {
                Some('M') => 'L',
                Some('m') => 'l',
                Some(c) if c != 'Z' && c != 'z' => c,
                _ => return Err(PathSyntaxError::UnexpectedCharacter { ch: b as char, offset }),
            };
            let args = p
                .next_tuple(letter)
                .ok_or(PathSyntaxError::IncompleteParameters {
                    command: letter,
                    offset,
                })?;
            current = Some(letter);
            out.push(RawCommand { letter, args });
        } else {
            let ch = d[offset..].chars().next().unwrap_or(b as char);
            return Err(PathSyntaxError::UnexpectedCharacter { ch, offset });
        }
    }

    Ok(out)
}

/// Lenient form of [`try_parse_path`]: syntax errors yield no commands.
pub fn parse_path(d: &str) -> Vec<RawCommand> {
    match try_parse_path(d) {
        Ok(commands) => commands,
        Err(err) => {
            warn!(error = %err, "discarding unparseable path data");
            Vec::new()
        }
    }
}

fn is_number_start(b: u8) -> bool {
    b.is_ascii_digit() || matches!(b, b'.' | b'+' | b'-')
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveKind {
    Cubic,
    Quadratic,
}

/// Running state of absolutization.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathState {
    pub current: Point,
    pub subpath_start: Point,
    pub last_control: Option<(CurveKind, Point)>,
}

impl PathState {
    pub fn new() -> Self {
        Self {
            current: Point::ORIGIN,
            subpath_start: Point::ORIGIN,
            last_control: None,
        }
    }

    /// Control point implied by a smooth curve: the previous control
    /// reflected about the current point when the previous command was a
    /// compatible curve, else the current point.
    pub fn reflected_control(&self, kind: CurveKind) -> Point {
        match self.last_control {
            Some((last, ctrl)) if last == kind => Point::new(
                2.0 * self.current.x - ctrl.x,
                2.0 * self.current.y - ctrl.y,
            ),
            _ => self.current,
        }
    }

    fn resolve(&self, relative: bool, x: f64, y: f64) -> Point {
        if relative {
            Point::new(self.current.x + x, self.current.y + y)
        } else {
            Point::new(x, y)
        }
    }
}

/// One step of the absolutization fold.
pub fn absolutize_step(state: PathState, raw: &RawCommand) -> (PathState, PathCommand) {
    let rel = raw.letter.is_ascii_lowercase();
    let a = |i: usize| raw.args.get(i).copied().unwrap_or(0.0);
    let mut next = state;
    next.last_control = None;

    let command = match raw.letter.to_ascii_uppercase() {
        'M' => {
            let p = state.resolve(rel, a(0), a(1));
            next.current = p;
            next.subpath_start = p;
            PathCommand::MoveTo(p)
        }
        'L' => {
            let p = state.resolve(rel, a(0), a(1));
            next.current = p;
            PathCommand::LineTo(p)
        }
        'H' => {
            let x = if rel { state.current.x + a(0) } else { a(0) };
            next.current.x = x;
            PathCommand::HorizontalTo(x)
        }
        'V' => {
            let y = if rel { state.current.y + a(0) } else { a(0) };
            next.current.y = y;
            PathCommand::VerticalTo(y)
        }
        'C' => {
            let c1 = state.resolve(rel, a(0), a(1));
            let c2 = state.resolve(rel, a(2), a(3));
            let end = state.resolve(rel, a(4), a(5));
            next.current = end;
            next.last_control = Some((CurveKind::Cubic, c2));
            PathCommand::CubicTo { c1, c2, end }
        }
        'S' => {
            let c1 = state.reflected_control(CurveKind::Cubic);
            let c2 = state.resolve(rel, a(0), a(1));
            let end = state.resolve(rel, a(2), a(3));
            next.current = end;
            next.last_control = Some((CurveKind::Cubic, c2));
            PathCommand::SmoothCubicTo { c1, c2, end }
        }
        'Q' => {
            let control = state.resolve(rel, a(0), a(1));
            let end = state.resolve(rel, a(2), a(3));
            next.current = end;
            next.last_control = Some((CurveKind::Quadratic, control));
            PathCommand::QuadTo { control, end }
        }
        'T' => {
            let control = state.reflected_control(CurveKind::Quadratic);
            let end = state.resolve(rel, a(0), a(1));
            next.current = end;
            next.last_control = Some((CurveKind::Quadratic, control));
            PathCommand::SmoothQuadTo { control, end }
        }
        'A' => {
            let end = state.resolve(rel, a(5), a(6));
            next.current = end;
            PathCommand::ArcTo(ArcParams {
                rx: a(0),
                ry: a(1),
                x_axis_rotation: a(2),
                large_arc: a(3) != 0.0,
                sweep: a(4) != 0.0,
                end,
            })
        }
        _ => {
            next.current = state.subpath_start;
            PathCommand::Close
        }
    };

    (next, command)
}

pub fn absolutize(raw: &[RawCommand]) -> Vec<PathCommand> {
    raw.iter()
        .scan(PathState::new(), |state, cmd| {
            let (next, command) = absolutize_step(*state, cmd);
            *state = next;
            Some(command)
        })
        .collect()
}

/// Applies `m` to every coordinate of an absolute command stream.
///
/// H/V survive axis-aligned matrices and become L otherwise. Arc radii are
/// only scaled under a uniform scale; any other matrix moves the endpoint
/// and leaves the radii untouched.
pub fn transform_commands(commands: &[PathCommand], m: Matrix, epsilon: f64) -> Vec<PathCommand> {
    let axis_aligned = m.is_axis_aligned(epsilon);
    let uniform = m.uniform_scale(epsilon);
    let mirrored = m.a * m.d - m.b * m.c < 0.0;
    let mut current = Point::ORIGIN;
    let mut start = Point::ORIGIN;
    let mut out = Vec::with_capacity(commands.len());

    for cmd in commands {
        let mapped = match *cmd {
            PathCommand::HorizontalTo(x) => {
                current.x = x;
                if axis_aligned {
                    PathCommand::HorizontalTo(m.a * x + m.e)
                } else {
                    PathCommand::LineTo(m.apply(current))
                }
            }
            PathCommand::VerticalTo(y) => {
                current.y = y;
                if axis_aligned {
                    PathCommand::VerticalTo(m.d * y + m.f)
                } else {
                    PathCommand::LineTo(m.apply(current))
                }
            }
            PathCommand::ArcTo(arc) => {
                current = arc.end;
                let end = m.apply(arc.end);
                match uniform {
                    Some(s) => PathCommand::ArcTo(ArcParams {
                        rx: arc.rx * s,
                        ry: arc.ry * s,
                        x_axis_rotation: if mirrored {
                            -arc.x_axis_rotation
                        } else {
                            arc.x_axis_rotation
                        },
                        sweep: arc.sweep != mirrored,
                        end,
                        ..arc
                    }),
                    None => {
                        debug!("arc under rotation/skew keeps its radii; only the endpoint moves");
                        PathCommand::ArcTo(ArcParams { end, ..arc })
                    }
                }
            }
            PathCommand::Close => {
                current = start;
                PathCommand::Close
            }
            other => {
                if let Some(end) = endpoint(&other) {
                    current = end;
                    if let PathCommand::MoveTo(p) = other {
                        start = p;
                    }
                }
                other.map_points(|p| m.apply(p))
            }
        };
        out.push(mapped);
    }

    out
}

fn endpoint(cmd: &PathCommand) -> Option<Point> {
    match *cmd {
        PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(p),
        PathCommand::CubicTo { end, .. }
        | PathCommand::SmoothCubicTo { end, .. }
        | PathCommand::QuadTo { end, .. }
        | PathCommand::SmoothQuadTo { end, .. } => Some(end),
        PathCommand::ArcTo(arc) => Some(arc.end),
        _ => None,
    }
}

/// Vertices of a single-subpath stream made only of line-like commands,
/// with whether it ends in a closepath. `None` for curves, arcs or
/// multiple subpaths.
pub fn line_vertices(commands: &[PathCommand]) -> Option<(Vec<Point>, bool)> {
    let (first, rest) = commands.split_first()?;
    let PathCommand::MoveTo(start) = *first else {
        return None;
    };
    let mut current = start;
    let mut points = vec![start];
    let mut closed = false;

    for cmd in rest {
        if closed {
            // Anything after a closepath starts another subpath.
            if *cmd == PathCommand::Close {
                continue;
            }
            return None;
        }
        match *cmd {
            PathCommand::LineTo(p) => current = p,
            PathCommand::HorizontalTo(x) => current.x = x,
            PathCommand::VerticalTo(y) => current.y = y,
            PathCommand::Close => {
                closed = true;
                continue;
            }
            _ => return None,
        }
        points.push(current);
    }

    Some((points, closed))
}

/// Encodes commands back into path data.
pub fn encode_path(commands: &[PathCommand], precision: u32) -> String {
    let num = |v: f64| format_number(v, precision);
    let pair = |p: Point| format!("{},{}", num(p.x), num(p.y));
    let mut parts = Vec::with_capacity(commands.len());
    for cmd in commands {
        let body = match *cmd {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => pair(p),
            PathCommand::HorizontalTo(v) | PathCommand::VerticalTo(v) => num(v),
            PathCommand::CubicTo { c1, c2, end } => {
                format!("{} {} {}", pair(c1), pair(c2), pair(end))
            }
            PathCommand::SmoothCubicTo { c2, end, .. } => format!("{} {}", pair(c2), pair(end)),
            PathCommand::QuadTo { control, end } => format!("{} {}", pair(control), pair(end)),
            PathCommand::SmoothQuadTo { end, .. } => pair(end),
            PathCommand::ArcTo(arc) => format!(
                "{},{} {} {} {} {}",
                num(arc.rx),
                num(arc.ry),
                num(arc.x_axis_rotation),
                u8::from(arc.large_arc),
                u8::from(arc.sweep),
                pair(arc.end)
            ),
            PathCommand::Close => String::new(),
        };
        parts.push(format!("{}{}", cmd.letter(), body));
    }
    parts.join(" ")
}

struct PathParser<'a> {
    bytes: &'a [u8],
    i: usize,
}

impl<'a> PathParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            i: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.i).copied()
    }

    fn skip_ws(&mut self) {
        while self.i < self.bytes.len() {
            let b = self.bytes[self.i];
            if b == b' ' || b == b'\n' || b == b'\r' || b == b'\t' || b == b',' {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    fn next_number(&mut self) -> Option<f64> {
        self.skip_ws();
        if self.i >= self.bytes.len() {
            return None;
        }
        let start = self.i;
        let mut has = false;

        if matches!(self.bytes[self.i], b'+' | b'-') {
            self.i += 1;
        }
        while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
            self.i += 1;
            has = true;
        }
        if self.i < self.bytes.len() && self.bytes[self.i] == b'.' {
            self.i += 1;
            while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
                has = true;
            }
        }
        if !has {
            self.i = start;
            return None;
        }
        if self.i < self.bytes.len() && matches!(self.bytes[self.i], b'e' | b'E') {
            let mark = self.i;
            self.i += 1;
            if self.i < self.bytes.len() && matches!(self.bytes[self.i], b'+' | b'-') {
                self.i += 1;
            }
            let digits = self.i;
            while self.i < self.bytes.len() && self.bytes[self.i].is_ascii_digit() {
                self.i += 1;
            }
            if self.i == digits {
                self.i = mark;
            }
        }

        let s = std::str::from_utf8(&self.bytes[start..self.i]).ok()?;
        match s.parse::<f64>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.i = start;
                None
            }
        }
    }

    fn next_arc_flag(&mut self) -> Option<f64> {
        self.skip_ws();
        match self.peek()? {
            b'0' => {
                self.i += 1;
                Some(0.0)
            }
            b'1' => {
                self.i += 1;
                Some(1.0)
            }
            _ => None,
        }
    }

    // Reads one full parameter tuple for `letter`, restoring the position
    // when the tuple is incomplete.
    fn next_tuple(&mut self, letter: char) -> Option<Vec<f64>> {
        let start = self.i;
        let n = arity(letter)?;
        let is_arc = letter.eq_ignore_ascii_case(&'a');
        let mut args = Vec::with_capacity(n);
        for idx in 0..n {
            let v = if is_arc && (idx == 3 || idx == 4) {
                self.next_arc_flag()
            } else {
                self.next_number()
            };
            match v {
                Some(v) => args.push(v),
                None => {
                    self.i = start;
                    return None;
                }
            }
        }
        Some(args)
    }
}
