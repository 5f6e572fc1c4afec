//! Error types for the presurvey CLI

use presurvey_client::ClientError;
use presurvey_types::PresurveyError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Pipeline(#[from] PresurveyError),

    #[error("Session file error: {0}")]
    Session(#[from] std::io::Error),

    #[error("Malformed session file: {0}")]
    SessionFormat(#[from] serde_json::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),
}

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

impl From<dialoguer::Error> for CliError {
    fn from(err: dialoguer::Error) -> Self {
        CliError::Prompt(err.to_string())
    }
}
