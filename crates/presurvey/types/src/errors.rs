use thiserror::Error;

/// Errors raised while resolving or driving a presurvey pipeline
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresurveyError {
    #[error("Failed to resolve {entity}: {reason}")]
    Resolution { entity: String, reason: String },

    #[error("Not found: {entity} '{id}'")]
    NotFound { entity: String, id: String },

    #[error("Program '{program}' references unknown guard '{guard}'")]
    UnknownGuard { program: String, guard: String },

    #[error("Membership check for program '{program}' has no salt configured")]
    MissingSalt { program: String },

    #[error("Invalid survey link '{link}': {reason}")]
    InvalidSurveyLink { link: String, reason: String },

    #[error("No survey resolved for this session")]
    SurveyUnresolved,

    #[error("Guard '{guard}' cannot handle response '{response}'")]
    UnexpectedResponse { guard: String, response: String },

    #[error("Invalid pipeline state: {0}")]
    InvalidState(String),
}

/// Coarse classification of a [`PresurveyError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// A collaborator call failed or returned nothing
    ResolutionFailure,
    /// Program configuration cannot be turned into a pipeline
    ConfigurationGap,
    /// The caller drove the pipeline incorrectly; state is left untouched
    Misuse,
}

impl PresurveyError {
    pub fn resolution(entity: impl Into<String>, reason: impl ToString) -> Self {
        Self::Resolution {
            entity: entity.into(),
            reason: reason.to_string(),
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Resolution { .. } | Self::NotFound { .. } | Self::SurveyUnresolved => {
                ErrorKind::ResolutionFailure
            }
            Self::UnknownGuard { .. }
            | Self::MissingSalt { .. }
            | Self::InvalidSurveyLink { .. } => {
                ErrorKind::ConfigurationGap
            }
            Self::UnexpectedResponse { .. } | Self::InvalidState(_) => ErrorKind::Misuse,
        }
    }

    /// Whether this error ends the pipeline in the permanent error state
    pub fn is_permanent(&self) -> bool {
        !matches!(self.kind(), ErrorKind::Misuse)
    }
}

pub type PresurveyResult<T> = Result<T, PresurveyError>;
