//! Shared resolution of the program, cohort and survey a session needs
//!
//! Resolution runs at most once per loader. Every caller, concurrent or not,
//! observes the same outcome, failures included: a failed resolution is
//! never retried behind the pipeline's back.

use std::sync::Arc;

use presurvey_types::{PresurveyResult, Program, ProjectCohort, Survey};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::traits::ProgramRegistry;

/// Entities resolved for one session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedEntities {
    pub program: Program,
    pub project_cohort: ProjectCohort,
    /// Only resolved when the session ordinal is known
    pub survey: Option<Survey>,
}

/// Resolves [`LoadedEntities`] once and hands out the shared result
pub struct EntityLoader {
    programs: Arc<dyn ProgramRegistry>,
    program_label: String,
    code: String,
    session_ordinal: Option<u32>,
    cell: OnceCell<PresurveyResult<LoadedEntities>>,
}

impl EntityLoader {
    pub fn new(
        programs: Arc<dyn ProgramRegistry>,
        program_label: impl Into<String>,
        code: impl Into<String>,
        session_ordinal: Option<u32>,
    ) -> Self {
        Self {
            programs,
            program_label: program_label.into(),
            code: code.into(),
            session_ordinal,
            cell: OnceCell::new(),
        }
    }

    /// Wait for (or trigger) the shared resolution
    pub async fn load(&self) -> PresurveyResult<&LoadedEntities> {
        self.cell
            .get_or_init(|| self.resolve())
            .await
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Whether resolution has settled, successfully or not
    pub fn is_settled(&self) -> bool {
        self.cell.initialized()
    }

    async fn resolve(&self) -> PresurveyResult<LoadedEntities> {
        debug!(
            program = %self.program_label,
            code = %self.code,
            ordinal = ?self.session_ordinal,
            "Resolving session entities"
        );

        let (program, project_cohort) = tokio::try_join!(
            self.programs.get_program(&self.program_label),
            self.programs.get_cohort(&self.code),
        )?;

        let survey = match self.session_ordinal {
            Some(ordinal) => Some(
                self.programs
                    .get_survey(&project_cohort.uid, ordinal)
                    .await?,
            ),
            None => None,
        };

        Ok(LoadedEntities {
            program,
            project_cohort,
            survey,
        })
    }
}
