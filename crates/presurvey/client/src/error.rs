use presurvey_types::PresurveyError;
use thiserror::Error;

/// Errors from talking to the remote API
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Base URL cannot carry a path: {0}")]
    BaseUrl(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// Attribute this failure to the entity being resolved
    pub fn for_entity(self, entity: &str, id: impl Into<String>) -> PresurveyError {
        match self {
            ClientError::NotFound(_) => PresurveyError::not_found(entity, id),
            other => PresurveyError::resolution(entity, other),
        }
    }
}

impl From<ClientError> for PresurveyError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::NotFound(what) => PresurveyError::not_found("resource", what),
            other => PresurveyError::resolution("remote resource", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presurvey_types::ErrorKind;

    #[test]
    fn not_found_keeps_entity() {
        let err = ClientError::NotFound("/api/programs/x".into()).for_entity("program", "x");
        assert_eq!(
            err,
            PresurveyError::NotFound {
                entity: "program".into(),
                id: "x".into()
            }
        );
    }

    #[test]
    fn api_errors_are_resolution_failures() {
        let err: PresurveyError = ClientError::Api {
            status: 502,
            message: "bad gateway".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ResolutionFailure);
        assert!(err.to_string().contains("502"));
    }
}
