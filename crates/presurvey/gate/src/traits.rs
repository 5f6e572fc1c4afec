use async_trait::async_trait;
use presurvey_types::{
    PresurveyResult, Program, ProgressRecord, ProjectCohort, SessionContext, Survey,
};
use url::Url;

use crate::outcome::{GuardOutcome, UserResponse};

/// GuardStep: one decision unit of the presurvey pipeline.
///
/// Guards are entered strictly in order. Each invocation yields exactly one
/// outcome: advance to the next guard, or halt behind an interstitial until
/// the participant responds.
#[async_trait]
pub trait GuardStep: Send + Sync {
    /// Name used in program configuration (e.g. `skip_to_first_session`).
    fn name(&self) -> &str;

    /// Called exactly once when this guard becomes the active step.
    ///
    /// May mutate the context (ordinal, survey, survey parameters).
    async fn on_enter(&self, ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome>;

    /// Called when the participant answers this guard's interstitial.
    ///
    /// Guards that never halt keep the default, which rejects the response.
    async fn resume(
        &self,
        _ctx: &mut SessionContext,
        response: UserResponse,
    ) -> PresurveyResult<GuardOutcome> {
        Err(presurvey_types::PresurveyError::UnexpectedResponse {
            guard: self.name().to_string(),
            response: response.to_string(),
        })
    }
}

/// Program, cohort and survey configuration.
#[async_trait]
pub trait ProgramRegistry: Send + Sync {
    async fn get_program(&self, label: &str) -> PresurveyResult<Program>;

    /// Look up the project cohort a participation code belongs to.
    async fn get_cohort(&self, code: &str) -> PresurveyResult<ProjectCohort>;

    async fn get_survey(&self, project_cohort_id: &str, ordinal: u32) -> PresurveyResult<Survey>;
}

/// Historical participant progress.
#[async_trait]
pub trait ParticipantDataClient: Send + Sync {
    async fn get_progress(&self, token: &str, code: &str) -> PresurveyResult<Vec<ProgressRecord>>;
}

/// Static list of salted participant hashes pre-registered for a study.
#[async_trait]
pub trait MembershipList: Send + Sync {
    async fn fetch_hashed_ids(&self) -> PresurveyResult<Vec<String>>;
}

/// Durable per-browser key/value store, namespaced to the participation flow.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn put(&self, key: &str, value: &str);

    fn remove(&self, key: &str);
}

/// One-way hand-off to the external survey platform.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}
