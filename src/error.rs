use thiserror::Error;

/// Failure to turn a dump into a `UiTree`.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Nothing left after pre-cleaning, or no element at all
    #[error("dump contains no elements")]
    Empty,

    /// quick-xml rejected the document
    #[error("XML syntax error at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// A closing tag did not match the element that was open
    #[error("unexpected closing tag </{found}> at byte {position}")]
    UnexpectedClose { found: String, position: usize },

    /// End of input reached with elements still open
    #[error("{open} element(s) left unclosed at end of input")]
    Unclosed { open: usize },

    /// A second top-level element after the root was closed
    #[error("multiple root elements (second root <{tag}>)")]
    MultipleRoots { tag: String },
}

/// A path expression outside the supported grammars.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("empty path expression")]
    Empty,

    #[error("unsupported path syntax: {0}")]
    Unsupported(String),

    #[error("invalid positional index in segment '{0}'")]
    BadIndex(String),
}

/// A tap (or other action) could not be delivered to the device.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// adb could not be spawned
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    /// adb ran but reported failure
    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Candidate has no usable bounds to tap
    #[error("element {0} has no tappable bounds")]
    NoBounds(usize),

    #[error("dispatch rejected: {0}")]
    Rejected(String),
}

/// The strategy-scoring collaborator failed.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("scoring request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("scoring service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("scoring response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("scoring service unavailable: {0}")]
    Unavailable(String),
}

/// Top-level error for CLI commands.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
