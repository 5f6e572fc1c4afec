//! Presurvey domain types
//!
//! Everything the gatekeeping pipeline passes around: the resolved program,
//! cohort and survey entities, participant progress records, the
//! append-only survey parameters and the [`SessionContext`] that guards
//! mutate on their way to the external survey.
//!
//! # Key Principle
//!
//! **Identity is read, never invented.** A missing session ordinal stays
//! `None` until a guard explicitly forces the default.

#![deny(unsafe_code)]

pub mod context;
pub mod errors;
pub mod params;
pub mod program;
pub mod progress;

pub use context::{
    param_keys, parse_ordinal, ContextUpdate, SessionContext, SessionRequest, OVERRIDE_FLAGS,
};
pub use errors::{ErrorKind, PresurveyError, PresurveyResult};
pub use params::ExtraParams;
pub use program::{
    CohortStatus, CohortWindow, Program, ProgramSurvey, ProjectCohort, Survey, SurveyStatus,
};
pub use progress::{ProgressRecord, PROGRESS_KEY};

/// Parse a boolean-ish query or cookie value.
///
/// Accepts `true`/`1`/`yes` in any case; everything else is false.
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
