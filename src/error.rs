use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Why a raw SofaScore payload could not be turned into a minimal record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("invalid json: {0}")]
    InvalidJson(String),
    #[error("missing field `{path}`")]
    MissingField { path: String },
    #[error("field `{path}` is not {expected}")]
    WrongType { path: String, expected: &'static str },
}

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("fixture registry not found: {}", .0.display())]
    RegistryMissing(PathBuf),
    #[error("fixture registry {} has no `{column}` column", .path.display())]
    SchemaInvalid { path: PathBuf, column: String },
    #[error("no event id found in registry row {row}")]
    IdentifierNotFound { row: usize },
    #[error("no content from {url} within {waited_ms} ms")]
    FetchTimeout { url: String, waited_ms: u128 },
    #[error("event {event_id} not finished (status {status:?})")]
    StatusNotFinished { event_id: u64, status: Option<i64> },
    #[error("parse failed: {0}")]
    Parse(#[from] ParseError),
    #[error("failed writing {}: {source}", .path.display())]
    EmitWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("io error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ListenerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
