use crate::shutdown::ExitCode;
use connectors::error::CursorError;
use render::error::RenderError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to open output file {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Cursor(#[from] CursorError),

    #[error("Failed to render result set: {0}")]
    Render(#[from] RenderError),

    #[error("Shutdown requested")]
    ShutdownRequested,
}

impl CliError {
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            CliError::ShutdownRequested | CliError::Render(RenderError::Cancelled)
        )
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.is_cancellation() {
            ExitCode::ShutdownRequested
        } else {
            ExitCode::GeneralError
        }
    }
}
