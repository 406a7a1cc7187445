use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineContext {
    pub line_num: u64,
}

/// Problems with a single alignment line, independent of where it came from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("expected at least 11 fields, found {found}")]
    TooFewFields { found: usize },
    #[error("flag '{value}' is not a non-negative 16-bit integer")]
    InvalidFlag { value: String },
    #[error("quality length ({qual}) does not match sequence length ({seq})")]
    LengthMismatch { seq: usize, qual: usize },
    #[error("record '{name}' has no RG tag")]
    MissingReadGroup { name: String },
}

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("could not start '{program}': {source}")]
    SourceUnavailable {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("no header from '{program}': {reason}")]
    HeaderUnavailable { program: String, reason: String },
    #[error("malformed record at line {}: {source}", .ctx.line_num)]
    MalformedRecord {
        #[source]
        source: RecordError,
        ctx: LineContext,
    },
    #[error(
        "record '{name}' at line {} has no RG tag and the header does not declare exactly one read group",
        .ctx.line_num
    )]
    MissingReadGroup { name: String, ctx: LineContext },
    #[error("downstream reader stayed disconnected after {attempts} write attempts")]
    SinkRetriesExhausted { attempts: u32 },
    #[error("I/O error{}: {source}", .path.as_ref().map(|p| format!(" on {}", p.display())).unwrap_or_default())]
    Io {
        #[source]
        source: io::Error,
        path: Option<PathBuf>,
    },
    #[error("read groups '{read_group}' and '{other}' would both write to {}", .path.display())]
    OutputCollision {
        read_group: String,
        other: String,
        path: PathBuf,
    },
    #[error("gzip output requested but the `gzip` feature is disabled")]
    GzipDisabled,
    #[error("conversion cancelled")]
    Cancelled,
}

impl ConvertError {
    pub(crate) fn record_err(source: RecordError, ctx: LineContext) -> Self {
        match source {
            RecordError::MissingReadGroup { name } => Self::MissingReadGroup { name, ctx },
            other => Self::MalformedRecord { source: other, ctx },
        }
    }
    pub(crate) fn io_err(source: io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}

impl From<io::Error> for ConvertError {
    fn from(source: io::Error) -> Self {
        Self::Io { source, path: None }
    }
}
