use async_trait::async_trait;
use presurvey_types::{PresurveyError, PresurveyResult, SessionContext};
use tracing::info;

use crate::outcome::{GuardOutcome, Interstitial, UserResponse};
use crate::registry::guard_names;
use crate::traits::GuardStep;

/// Preview acknowledgment gate.
///
/// Staff preview unreleased surveys by adding `date_override` or
/// `ready_override` to the link. Such requests halt until the acknowledgment
/// is accepted; ordinary participants pass straight through.
#[derive(Debug, Default)]
pub struct PreviewAgreementGuard;

impl PreviewAgreementGuard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GuardStep for PreviewAgreementGuard {
    fn name(&self) -> &str {
        guard_names::PREVIEW_AGREEMENT
    }

    async fn on_enter(&self, ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome> {
        let overrides = ctx.override_flags();
        if overrides.is_empty() {
            return Ok(GuardOutcome::Advance);
        }

        info!(
            overrides = ?overrides,
            cohort_open = ctx.project_cohort.is_open(),
            survey_ready = ctx.survey.as_ref().map(|s| s.is_ready()),
            "Preview overrides present, asking for acknowledgment"
        );
        Ok(GuardOutcome::Halt(Interstitial::PreviewAgreement {
            overrides: overrides.into_iter().map(String::from).collect(),
        }))
    }

    async fn resume(
        &self,
        ctx: &mut SessionContext,
        response: UserResponse,
    ) -> PresurveyResult<GuardOutcome> {
        match response {
            UserResponse::Accept => Ok(GuardOutcome::Advance),
            // Declining keeps the prompt up; there is no way past it but accepting
            UserResponse::No => Ok(GuardOutcome::Halt(Interstitial::PreviewAgreement {
                overrides: ctx.override_flags().into_iter().map(String::from).collect(),
            })),
            UserResponse::Yes => Err(PresurveyError::UnexpectedResponse {
                guard: self.name().to_string(),
                response: response.to_string(),
            }),
        }
    }
}
