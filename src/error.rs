use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathSyntaxError {
    #[error("path data must start with a moveto command")]
    MissingMoveTo,
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
    #[error("incomplete parameters for command '{command}' at offset {offset}")]
    IncompleteParameters { command: char, offset: usize },
}

/// Why a node produced no geometry. Used for diagnostics only.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RejectReason {
    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),
    #[error("attribute '{name}' is not a number: {value:?}")]
    InvalidAttribute { name: &'static str, value: String },
    #[error("non-positive size")]
    NonPositiveSize,
    #[error("empty or unparseable path data")]
    EmptyPath,
    #[error("only {found} usable points, at least {required} required")]
    TooFewPoints { found: usize, required: usize },
    #[error("zero perimeter")]
    ZeroPerimeter,
    #[error("area/perimeter ratio {ratio:.4} below {min}")]
    Sliver { ratio: f64, min: f64 },
    #[error("non-finite coordinates")]
    NonFinite,
}
