use connectors::error::{CursorError, ScanError};
use thiserror::Error;

/// Everything that can abort a rendering run. None of these are retried.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Scan of row {row} failed: {source}")]
    Scan {
        row: u64,
        #[source]
        source: ScanError,
    },

    #[error("Cursor error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Failed to encode value: {0}")]
    Encode(String),

    #[error("Failed to encode JSON: {0}")]
    Json(serde_json::Error),

    #[error("Failed to encode CSV: {0}")]
    Csv(csv::Error),

    #[error("Row has {found} values but the header has {expected} columns")]
    RowWidth { expected: usize, found: usize },

    #[error("Failed to write output: {0}")]
    Sink(#[from] std::io::Error),

    #[error("Unknown output format '{token}', expected one of: {expected}")]
    UnknownFormat { token: String, expected: String },

    #[error("Run cancelled")]
    Cancelled,
}

impl RenderError {
    /// Short classification used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Scan { .. } => "scan",
            RenderError::Cursor(_) => "cursor",
            RenderError::Encode(_)
            | RenderError::Json(_)
            | RenderError::Csv(_)
            | RenderError::RowWidth { .. } => "encode",
            RenderError::Sink(_) => "sink",
            RenderError::UnknownFormat { .. } => "config",
            RenderError::Cancelled => "cancelled",
        }
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_io() {
            RenderError::Sink(err.into())
        } else {
            RenderError::Json(err)
        }
    }
}

impl From<csv::Error> for RenderError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return RenderError::Csv(err);
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io) => RenderError::Sink(io),
            other => RenderError::Encode(format!("{other:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_io_backed_json_error_is_a_sink_error() {
        let err = serde_json::Error::io(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        let err = RenderError::from(err);
        assert_eq!(err.kind(), "sink");
        assert!(matches!(err, RenderError::Sink(e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[test]
    fn test_io_backed_csv_error_is_a_sink_error() {
        let err = csv::Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
        assert_eq!(RenderError::from(err).kind(), "sink");
    }
}
