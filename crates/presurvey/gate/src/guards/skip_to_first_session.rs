use std::sync::Arc;

use async_trait::async_trait;
use presurvey_types::{PresurveyError, PresurveyResult, SessionContext};
use tracing::{debug, info};

use crate::outcome::{GuardOutcome, Interstitial, UserResponse};
use crate::registry::guard_names;
use crate::session_store::session_keys;
use crate::traits::{GuardStep, ParticipantDataClient, ProgramRegistry, SessionStore};

const FIRST_SESSION: u32 = 1;

/// Keeps participants from starting a later wave without the first one.
///
/// - no ordinal: forces session 1 and continues
/// - session 1: continues
/// - session 1 completed on record: continues
/// - otherwise asks "did you already do session 1?"; a "no" moves the
///   participant back to session 1, a "yes" lets them continue as requested
pub struct SkipToFirstSessionGuard {
    participants: Arc<dyn ParticipantDataClient>,
    programs: Arc<dyn ProgramRegistry>,
    store: Arc<dyn SessionStore>,
}

impl SkipToFirstSessionGuard {
    pub fn new(
        participants: Arc<dyn ParticipantDataClient>,
        programs: Arc<dyn ProgramRegistry>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            participants,
            programs,
            store,
        }
    }

    /// Rewrite the session to ordinal 1: survey, link parameters and cookie.
    async fn move_to_first_session(&self, ctx: &mut SessionContext) -> PresurveyResult<()> {
        let survey = self
            .programs
            .get_survey(&ctx.project_cohort.uid, FIRST_SESSION)
            .await?;

        ctx.set_session_ordinal(FIRST_SESSION);
        ctx.set_survey(survey);
        self.store
            .put(session_keys::SESSION, &FIRST_SESSION.to_string());

        info!(
            survey = ctx.survey.as_ref().map(|s| s.uid.as_str()),
            "Session corrected to first session"
        );
        Ok(())
    }
}

#[async_trait]
impl GuardStep for SkipToFirstSessionGuard {
    fn name(&self) -> &str {
        guard_names::SKIP_TO_FIRST_SESSION
    }

    async fn on_enter(&self, ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome> {
        let ordinal = match ctx.session_ordinal {
            Some(ordinal) => ordinal,
            None => {
                debug!("No session ordinal, defaulting to first session");
                self.move_to_first_session(ctx).await?;
                return Ok(GuardOutcome::Advance);
            }
        };

        if ordinal == FIRST_SESSION {
            return Ok(GuardOutcome::Advance);
        }

        if ctx.participant_progress_records.is_none() {
            let records = self.participants.get_progress(&ctx.token, &ctx.code).await?;
            ctx.participant_progress_records = Some(records);
        }

        if ctx.has_completed(FIRST_SESSION) {
            debug!(ordinal, "First session completed on record");
            return Ok(GuardOutcome::Advance);
        }

        Ok(GuardOutcome::Halt(Interstitial::ConfirmFirstSession {
            requested_ordinal: ordinal,
        }))
    }

    async fn resume(
        &self,
        ctx: &mut SessionContext,
        response: UserResponse,
    ) -> PresurveyResult<GuardOutcome> {
        match response {
            UserResponse::Yes => {
                debug!("Participant reports first session done");
                Ok(GuardOutcome::Advance)
            }
            UserResponse::No => {
                self.move_to_first_session(ctx).await?;
                Ok(GuardOutcome::Advance)
            }
            UserResponse::Accept => Err(PresurveyError::UnexpectedResponse {
                guard: self.name().to_string(),
                response: response.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::test_support::context;
    use crate::mocks::{MockParticipantData, MockProgramRegistry};
    use crate::session_store::MemorySessionStore;
    use presurvey_types::ProgressRecord;

    struct Fixture {
        participants: Arc<MockParticipantData>,
        programs: Arc<MockProgramRegistry>,
        store: Arc<MemorySessionStore>,
        guard: SkipToFirstSessionGuard,
    }

    fn fixture(participants: MockParticipantData) -> Fixture {
        let participants = Arc::new(participants);
        let programs = Arc::new(MockProgramRegistry::standard());
        let store = Arc::new(MemorySessionStore::default());
        store.put(session_keys::SESSION, "2");
        let guard =
            SkipToFirstSessionGuard::new(participants.clone(), programs.clone(), store.clone());
        Fixture {
            participants,
            programs,
            store,
            guard,
        }
    }

    #[tokio::test]
    async fn first_session_advances_without_lookup() {
        let f = fixture(MockParticipantData::empty());
        let mut ctx = context(Some(1));

        let outcome = f.guard.on_enter(&mut ctx).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(f.participants.calls(), 0);
    }

    #[tokio::test]
    async fn completed_first_session_advances() {
        let f = fixture(MockParticipantData::with_records(vec![
            ProgressRecord::progress(1, "100"),
        ]));
        let mut ctx = context(Some(2));

        let outcome = f.guard.on_enter(&mut ctx).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(ctx.session_ordinal, Some(2));
    }

    #[tokio::test]
    async fn incomplete_first_session_halts() {
        let f = fixture(MockParticipantData::with_records(vec![
            ProgressRecord::progress(1, 60),
            ProgressRecord::progress(2, 100),
        ]));
        let mut ctx = context(Some(2));

        let outcome = f.guard.on_enter(&mut ctx).await.unwrap();
        assert_eq!(
            outcome,
            GuardOutcome::Halt(Interstitial::ConfirmFirstSession {
                requested_ordinal: 2
            })
        );
        assert_eq!(ctx.participant_progress_records.as_ref().map(Vec::len), Some(2));
    }

    #[tokio::test]
    async fn non_numeric_progress_counts_as_incomplete() {
        let f = fixture(MockParticipantData::with_records(vec![
            ProgressRecord::progress(1, "complete"),
        ]));
        let mut ctx = context(Some(3));
        assert!(f.guard.on_enter(&mut ctx).await.unwrap().is_halt());
    }

    #[tokio::test]
    async fn answering_no_moves_to_first_session() {
        let f = fixture(MockParticipantData::empty());
        let mut ctx = context(Some(2));
        f.guard.on_enter(&mut ctx).await.unwrap();

        let outcome = f.guard.resume(&mut ctx, UserResponse::No).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(ctx.session_ordinal, Some(1));
        assert_eq!(ctx.survey.as_ref().map(|s| s.ordinal), Some(1));
        assert_eq!(ctx.extra_params.get("session_ordinal"), Some("1"));
        assert_eq!(ctx.extra_params.get("survey_id"), Some("Survey_1"));
        assert_eq!(f.store.get(session_keys::SESSION).as_deref(), Some("1"));
        assert_eq!(f.programs.survey_calls(), 1);
    }

    #[tokio::test]
    async fn answering_yes_keeps_session() {
        let f = fixture(MockParticipantData::empty());
        let mut ctx = context(Some(2));
        f.guard.on_enter(&mut ctx).await.unwrap();
        let before = ctx.clone();

        let outcome = f.guard.resume(&mut ctx, UserResponse::Yes).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(ctx, before);
        assert_eq!(f.store.get(session_keys::SESSION).as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn missing_ordinal_forces_first_session() {
        let f = fixture(MockParticipantData::empty());
        let mut ctx = context(None);

        let outcome = f.guard.on_enter(&mut ctx).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(ctx.session_ordinal, Some(1));
        assert_eq!(ctx.survey.as_ref().map(|s| s.uid.as_str()), Some("Survey_1"));
        assert_eq!(f.participants.calls(), 0);
    }

    #[tokio::test]
    async fn progress_failure_propagates() {
        let f = fixture(MockParticipantData::failing());
        let mut ctx = context(Some(2));
        let err = f.guard.on_enter(&mut ctx).await.unwrap_err();
        assert!(matches!(err, PresurveyError::Resolution { .. }));
    }

    #[tokio::test]
    async fn accept_is_not_an_answer() {
        let f = fixture(MockParticipantData::empty());
        let mut ctx = context(Some(2));
        let err = f
            .guard
            .resume(&mut ctx, UserResponse::Accept)
            .await
            .unwrap_err();
        assert!(matches!(err, PresurveyError::UnexpectedResponse { .. }));
    }
}
