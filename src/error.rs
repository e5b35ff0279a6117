//! Application error type.
//!
//! Every failure carries an [`ErrorKind`] so callers (the display layer in
//! particular) can tell "forecast not produced yet" style conditions apart
//! from hard failures without string matching.

/// Failure taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Network/transport failure, timeout, or non-success status from the remote API.
    RemoteUnavailable,
    /// The remote response does not have the documented shape.
    MalformedResponse,
    /// A required local file is missing, empty, or lacks required columns.
    DataUnavailable,
    /// A local file exists but its contents fail coercion into the data model.
    MalformedData,
    /// An aggregate was requested over zero observations.
    EmptyDataset,
    /// Bad arguments (e.g. inverted year range, empty series id).
    InvalidInput,
    /// Local write failures.
    Io,
    /// Terminal setup/draw failures in the TUI.
    Terminal,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput => 2,
            ErrorKind::DataUnavailable | ErrorKind::MalformedData => 3,
            ErrorKind::RemoteUnavailable | ErrorKind::MalformedResponse => 4,
            ErrorKind::EmptyDataset => 5,
            ErrorKind::Io | ErrorKind::Terminal => 6,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
