use std::fmt::{self, Display};
use std::io;

/// Provides `ContagionError` and maps to other errors to
/// convert to a `ContagionError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum ContagionError {
    /// A vertex was referenced that is not part of the graph.
    NotFound(String),
    /// A parameter value that cannot be clamped into something meaningful.
    InvalidParameter(String),
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    ContagionError(String),
}

impl ContagionError {
    pub(crate) fn not_found(vertex: &str) -> Self {
        ContagionError::NotFound(vertex.to_string())
    }
}

impl From<io::Error> for ContagionError {
    fn from(error: io::Error) -> Self {
        ContagionError::IoError(error)
    }
}

impl From<serde_json::Error> for ContagionError {
    fn from(error: serde_json::Error) -> Self {
        ContagionError::JsonError(error)
    }
}

impl From<csv::Error> for ContagionError {
    fn from(error: csv::Error) -> Self {
        ContagionError::CsvError(error)
    }
}

impl From<String> for ContagionError {
    fn from(error: String) -> Self {
        ContagionError::ContagionError(error)
    }
}

impl From<&str> for ContagionError {
    fn from(error: &str) -> Self {
        ContagionError::ContagionError(error.to_string())
    }
}

impl std::error::Error for ContagionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ContagionError::IoError(error) => Some(error),
            ContagionError::JsonError(error) => Some(error),
            ContagionError::CsvError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for ContagionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ContagionError::NotFound(vertex) => write!(f, "Error: vertex `{vertex}` not found"),
            ContagionError::InvalidParameter(message) => {
                write!(f, "Error: invalid parameter: {message}")
            }
            ContagionError::ContagionError(message) => write!(f, "Error: {message}"),
            other => write!(f, "Error: {other:?}"),
        }
    }
}
