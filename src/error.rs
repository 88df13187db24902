use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the report model, codec and handler.
#[derive(Error, Debug)]
pub enum Error {
    /// The report text is not JSON, fails the schema, or carries out-of-range values.
    #[error("malformed report{}: {reason}", fmt_path(.path))]
    MalformedReport {
        path: Option<PathBuf>,
        reason: String,
    },

    /// A file or directory could not be read, written, moved or removed.
    #[error("file system error at {}: {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The report was not loaded from a file, so there is nothing to copy, move or delete.
    #[error("report has no backing file")]
    NoBackingFile,

    #[error("reports disagree on endpoint: expected {expected}, found {found}")]
    MixedEndpoints { expected: String, found: String },

    #[error("no reports given")]
    NoReports,

    #[error("invalid thresholds: minimum {minimum} exceeds maximum {maximum}")]
    InvalidThresholds { minimum: usize, maximum: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::FileSystem {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedReport {
            path: None,
            reason: reason.into(),
        }
    }

    /// Attaches the offending file to a decode failure.
    pub(crate) fn at_path(self, at: impl Into<PathBuf>) -> Self {
        match self {
            Error::MalformedReport { reason, .. } => Error::MalformedReport {
                path: Some(at.into()),
                reason,
            },
            other => other,
        }
    }
}

fn fmt_path(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" ({})", p.display()),
        None => String::new(),
    }
}
