//! Error types for ocrtable library.

use std::io;
use thiserror::Error;

/// Result type alias for ocrtable operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while processing a block graph.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The block JSON could not be parsed.
    #[error("Block parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document contained no blocks at all.
    #[error("No blocks returned for job {0}")]
    EmptyDocument(String),

    /// Error writing the tabular artifact.
    #[error("CSV error: {0}")]
    Csv(String),

    /// Error during rendering (CSV, JSON).
    #[error("Rendering error: {0}")]
    Render(String),

    /// The job notification could not be understood.
    #[error("Invalid notification: {0}")]
    InvalidNotification(String),

    /// A job ran but did not produce its artifacts.
    #[error("Job failed: {0}")]
    JobFailed(String),

    /// An external collaborator (block source, artifact sink, notifier,
    /// header consolidator) reported a failure.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        match err.kind() {
            csv::ErrorKind::Io(_) => match err.into_kind() {
                csv::ErrorKind::Io(e) => Error::Io(e),
                other => Error::Csv(format!("{:?}", other)),
            },
            _ => Error::Csv(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::EmptyDocument("job-1".to_string());
        assert_eq!(err.to_string(), "No blocks returned for job job-1");

        let err = Error::JobFailed("bad input".to_string());
        assert_eq!(err.to_string(), "Job failed: bad input");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
