//! Pipeline Orchestrator: drives a participant through the presurvey guards
//!
//! The orchestrator:
//! 1. Resolves program, cohort and survey once per session
//! 2. Builds the ordered guard list from program configuration
//! 3. Enters guards strictly in order, one at a time
//! 4. Parks on interstitials and resumes on the participant's answer
//! 5. Hands off to the external survey, or stops on a permanent error
//!
//! Guards work on a copy of the session context. The copy is committed only
//! once the guard settles, so a guard interrupted by teardown leaves no
//! trace behind.

use std::future::Future;
use std::sync::Arc;

use presurvey_types::{
    parse_ordinal, ContextUpdate, PresurveyError, PresurveyResult, SessionContext, SessionRequest,
};
use tokio::sync::watch;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::PipelineConfig;
use crate::link::survey_link_for;
use crate::loader::EntityLoader;
use crate::outcome::{GuardOutcome, Interstitial, PipelineStatus, UserResponse};
use crate::registry::GuardRegistry;
use crate::session_store::session_keys;
use crate::traits::{
    GuardStep, MembershipList, Navigator, ParticipantDataClient, ProgramRegistry, SessionStore,
};

/// Collaborators a pipeline calls out to
#[derive(Clone)]
pub struct PipelineDeps {
    pub programs: Arc<dyn ProgramRegistry>,
    pub participants: Arc<dyn ParticipantDataClient>,
    pub membership: Arc<dyn MembershipList>,
    pub store: Arc<dyn SessionStore>,
    pub navigator: Arc<dyn Navigator>,
}

/// Where a pipeline instance currently is
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineState {
    /// Not started yet
    Idle,
    /// Resolving entities or running a guard
    Running { index: usize, guard: String },
    /// A guard is showing its interstitial
    Halted {
        index: usize,
        guard: String,
        interstitial: Interstitial,
    },
    /// Handed off to the external survey
    Redirected { url: Url },
    /// Unrecoverable failure; only a reload starts over
    PermanentError { reason: String },
    /// Page went away; nothing more happens
    TornDown,
}

/// Cloneable handle that tears a pipeline down from outside.
#[derive(Clone, Debug)]
pub struct TeardownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl TeardownHandle {
    /// Drop any pending guard work; later results are discarded
    pub fn teardown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_torn_down(&self) -> bool {
        *self.tx.borrow()
    }
}

/// The presurvey pipeline for one participant session
pub struct PipelineOrchestrator {
    deps: PipelineDeps,
    config: PipelineConfig,
    registry: GuardRegistry,
    loader: Option<Arc<EntityLoader>>,
    guards: Vec<Arc<dyn GuardStep>>,
    ctx: Option<SessionContext>,
    state: PipelineState,
    mask_visible: bool,
    entered: Vec<String>,
    teardown_tx: Arc<watch::Sender<bool>>,
}

impl PipelineOrchestrator {
    /// Create a pipeline with the standard guard registry
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        let registry = GuardRegistry::standard(&deps, &config);
        Self::with_registry(deps, config, registry)
    }

    /// Create a pipeline with a custom guard registry
    pub fn with_registry(deps: PipelineDeps, config: PipelineConfig, registry: GuardRegistry) -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            deps,
            config,
            registry,
            loader: None,
            guards: Vec::new(),
            ctx: None,
            state: PipelineState::Idle,
            mask_visible: false,
            entered: Vec::new(),
            teardown_tx: Arc::new(tx),
        }
    }

    // ── Inspection ───────────────────────────────────────────────────

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Whether the blocking overlay is up
    pub fn mask_visible(&self) -> bool {
        self.mask_visible
    }

    /// Resolved guard order (empty before start)
    pub fn guard_names(&self) -> Vec<&str> {
        self.guards.iter().map(|g| g.name()).collect()
    }

    /// Guards entered so far, in order
    pub fn entered_guards(&self) -> &[String] {
        &self.entered
    }

    /// Live session context; `None` before start and after a terminal state
    pub fn context(&self) -> Option<&SessionContext> {
        self.ctx.as_ref()
    }

    pub fn teardown_handle(&self) -> TeardownHandle {
        TeardownHandle {
            tx: self.teardown_tx.clone(),
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Resolve the session and enter the first guard.
    pub async fn start(&mut self, request: SessionRequest) -> PresurveyResult<PipelineStatus> {
        if self.state != PipelineState::Idle {
            return Err(PresurveyError::InvalidState(format!(
                "pipeline already started ({:?})",
                self.state
            )));
        }
        if self.is_torn_down() {
            return Ok(self.mark_torn_down());
        }

        self.state = PipelineState::Running {
            index: 0,
            guard: String::new(),
        };
        self.toggle_mask(true);

        let code = match self.identity_field(request.code.as_deref(), session_keys::CODE) {
            Some(code) => code,
            None => return Err(self.fail(missing_identity("participation code"))),
        };
        let token = match self.identity_field(request.token.as_deref(), session_keys::TOKEN) {
            Some(token) => token,
            None => return Err(self.fail(missing_identity("participant token"))),
        };
        let session_ordinal = self
            .identity_field(request.session_ordinal.as_deref(), session_keys::SESSION)
            .as_deref()
            .and_then(parse_ordinal);

        info!(
            program = %request.program_label,
            code = %code,
            ordinal = ?session_ordinal,
            "Presurvey pipeline started"
        );

        let loader = Arc::new(EntityLoader::new(
            self.deps.programs.clone(),
            request.program_label.clone(),
            code.clone(),
            session_ordinal,
        ));
        self.loader = Some(loader.clone());

        let loaded = match self.race(loader.load()).await {
            None => return Ok(self.mark_torn_down()),
            Some(Err(e)) => return Err(self.fail(e)),
            Some(Ok(loaded)) => loaded.clone(),
        };

        self.guards = match self.registry.resolve(&loaded.program, &self.config) {
            Ok(guards) => guards,
            Err(e) => return Err(self.fail(e)),
        };
        debug!(guards = ?self.guard_names(), "Guard order resolved");

        self.ctx = Some(SessionContext::new(
            &request,
            code,
            session_ordinal,
            token,
            loaded.program,
            loaded.project_cohort,
            loaded.survey,
        ));

        self.drive(0).await
    }

    /// Answer the interstitial of the halted guard.
    pub async fn resume(&mut self, response: UserResponse) -> PresurveyResult<PipelineStatus> {
        let (index, guard_name) = match &self.state {
            PipelineState::Halted { index, guard, .. } => (*index, guard.clone()),
            other => {
                return Err(PresurveyError::InvalidState(format!(
                    "no guard is waiting for a response ({:?})",
                    other
                )))
            }
        };
        if self.is_torn_down() {
            return Ok(self.mark_torn_down());
        }

        let guard = self.guards[index].clone();
        let mut working = self.working_context()?;
        debug!(guard = %guard_name, %response, "Resuming guard");

        self.toggle_mask(true);
        let result = self.race(guard.resume(&mut working, response)).await;
        match result {
            None => Ok(self.mark_torn_down()),
            Some(Err(e)) if !e.is_permanent() => {
                // The interstitial stays up
                self.toggle_mask(false);
                Err(e)
            }
            Some(Err(e)) => Err(self.fail(e)),
            Some(Ok(outcome)) => {
                self.ctx = Some(working);
                self.settle(index, outcome).await
            }
        }
    }

    /// Tear down this instance directly
    pub fn teardown(&mut self) {
        self.teardown_handle().teardown();
        self.mark_torn_down();
    }

    // ── Shared context contract ──────────────────────────────────────

    /// The session context once shared resolution has completed.
    ///
    /// Every caller awaits the same resolution; none triggers another one.
    pub async fn get_loaded_data(&self) -> PresurveyResult<SessionContext> {
        let loader = self
            .loader
            .as_ref()
            .ok_or_else(|| PresurveyError::InvalidState("pipeline not started".into()))?;
        loader.load().await?;
        self.ctx
            .clone()
            .ok_or_else(|| PresurveyError::InvalidState("session context discarded".into()))
    }

    /// Merge a partial context update (survey parameters are only ever added)
    pub fn set_loaded_data(&mut self, update: ContextUpdate) -> PresurveyResult<()> {
        self.ctx_mut()?.apply(update);
        Ok(())
    }

    /// Merge parameters into the eventual survey link
    pub fn set_survey_params<I, K, V>(&mut self, params: I) -> PresurveyResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.ctx_mut()?.extra_params.merge(params);
        Ok(())
    }

    /// Show or hide the blocking overlay
    pub fn toggle_mask(&mut self, visible: bool) {
        if self.mask_visible != visible {
            debug!(visible, "Mask toggled");
        }
        self.mask_visible = visible;
    }

    // ── Driving ──────────────────────────────────────────────────────

    /// Enter guards from `index` until one halts or none remain.
    async fn drive(&mut self, mut index: usize) -> PresurveyResult<PipelineStatus> {
        loop {
            let guard = match self.guards.get(index) {
                Some(guard) => guard.clone(),
                None => return self.redirect(),
            };
            let name = guard.name().to_string();

            debug!(guard = %name, index, "Entering guard");
            self.state = PipelineState::Running {
                index,
                guard: name.clone(),
            };
            self.entered.push(name);

            let mut working = self.working_context()?;
            let result = self.race(guard.on_enter(&mut working)).await;
            match result {
                None => return Ok(self.mark_torn_down()),
                Some(Err(e)) => return Err(self.fail(e)),
                Some(Ok(outcome)) => {
                    self.ctx = Some(working);
                    match outcome {
                        GuardOutcome::Advance => index = self.advance(index),
                        GuardOutcome::Halt(interstitial) => return Ok(self.halt(index, interstitial)),
                    }
                }
            }
        }
    }

    /// Continue after a resumed guard settled
    async fn settle(&mut self, index: usize, outcome: GuardOutcome) -> PresurveyResult<PipelineStatus> {
        match outcome {
            GuardOutcome::Advance => {
                let next = self.advance(index);
                self.drive(next).await
            }
            GuardOutcome::Halt(interstitial) => Ok(self.halt(index, interstitial)),
        }
    }

    /// Index of the guard after `index`
    fn advance(&self, index: usize) -> usize {
        debug!(index, "Guard advanced");
        index + 1
    }

    fn halt(&mut self, index: usize, interstitial: Interstitial) -> PipelineStatus {
        let guard = self.guards[index].name().to_string();
        info!(guard = %guard, ?interstitial, "Guard halted for participant input");

        self.toggle_mask(false);
        self.state = PipelineState::Halted {
            index,
            guard: guard.clone(),
            interstitial: interstitial.clone(),
        };
        PipelineStatus::Halted {
            guard,
            interstitial,
        }
    }

    /// Terminal hand-off to the external survey
    fn redirect(&mut self) -> PresurveyResult<PipelineStatus> {
        let ctx = self
            .ctx
            .take()
            .ok_or_else(|| PresurveyError::InvalidState("session context discarded".into()))?;

        let url = match survey_link_for(&ctx) {
            Ok(url) => url,
            Err(e) => return Err(self.fail(e)),
        };

        info!(url = %url, "Handing participant off to survey");
        self.deps.navigator.navigate(&url);
        self.state = PipelineState::Redirected { url: url.clone() };
        Ok(PipelineStatus::Redirected { url })
    }

    /// Enter the permanent error state and hand the error back
    fn fail(&mut self, error: PresurveyError) -> PresurveyError {
        warn!(error = %error, kind = ?error.kind(), "Presurvey pipeline failed");
        self.state = PipelineState::PermanentError {
            reason: error.to_string(),
        };
        self.ctx = None;
        self.toggle_mask(false);
        error
    }

    fn mark_torn_down(&mut self) -> PipelineStatus {
        if self.state != PipelineState::TornDown {
            info!("Presurvey pipeline torn down");
        }
        self.state = PipelineState::TornDown;
        self.ctx = None;
        PipelineStatus::TornDown
    }

    fn is_torn_down(&self) -> bool {
        *self.teardown_tx.borrow()
    }

    /// Run `fut` unless the pipeline is torn down first
    async fn race<F: Future>(&self, fut: F) -> Option<F::Output> {
        let mut rx = self.teardown_tx.subscribe();
        if *rx.borrow_and_update() {
            return None;
        }
        tokio::select! {
            biased;
            _ = torn_down(&mut rx) => None,
            out = fut => Some(out),
        }
    }

    fn identity_field(&self, requested: Option<&str>, key: &str) -> Option<String> {
        requested
            .map(str::to_string)
            .or_else(|| self.deps.store.get(key))
            .filter(|v| !v.trim().is_empty())
    }

    fn working_context(&self) -> PresurveyResult<SessionContext> {
        self.ctx
            .clone()
            .ok_or_else(|| PresurveyError::InvalidState("session context discarded".into()))
    }

    fn ctx_mut(&mut self) -> PresurveyResult<&mut SessionContext> {
        self.ctx
            .as_mut()
            .ok_or_else(|| PresurveyError::InvalidState("no live session context".into()))
    }
}

/// Resolves once the teardown flag flips to true
async fn torn_down(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: teardown can no longer happen
            std::future::pending::<()>().await;
        }
    }
}

fn missing_identity(field: &str) -> PresurveyError {
    PresurveyError::resolution(field, "absent from request and session store")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{test_deps, FIXTURE_CODE};
    use presurvey_types::ExtraParams;

    fn request(ordinal: u32) -> SessionRequest {
        SessionRequest::new("cg17")
            .code(FIXTURE_CODE)
            .token("tok")
            .session_ordinal(ordinal)
    }

    #[tokio::test]
    async fn runs_default_guards_to_redirect() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());

        let status = pipeline.start(request(1)).await.unwrap();
        let url = status.redirect_url().unwrap();
        assert!(url.as_str().starts_with("https://survey.example.com/jfe/form/SV_1?"));
        assert_eq!(
            pipeline.entered_guards(),
            &["consent", "preview_agreement", "skip_to_first_session", "block_switcher"]
        );
        assert!(matches!(pipeline.state(), PipelineState::Redirected { .. }));
        assert!(pipeline.context().is_none());
        assert_eq!(mocks.navigator.visits().len(), 1);
    }

    #[tokio::test]
    async fn cannot_start_twice() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        pipeline.start(request(1)).await.unwrap();

        let err = pipeline.start(request(1)).await.unwrap_err();
        assert!(matches!(err, PresurveyError::InvalidState(_)));
        assert_eq!(mocks.navigator.visits().len(), 1);
    }

    #[tokio::test]
    async fn identity_falls_back_to_session_store() {
        let mocks = test_deps();
        mocks.store.put(session_keys::CODE, FIXTURE_CODE);
        mocks.store.put(session_keys::TOKEN, "stored-token");
        mocks.store.put(session_keys::SESSION, "1");
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());

        let status = pipeline.start(SessionRequest::new("cg17")).await.unwrap();
        let url = status.redirect_url().unwrap();
        let token = url
            .query_pairs()
            .find(|(k, _)| k == "token")
            .map(|(_, v)| v.into_owned());
        assert_eq!(token.as_deref(), Some("stored-token"));
    }

    #[tokio::test]
    async fn missing_code_is_permanent_error() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());

        let err = pipeline
            .start(SessionRequest::new("cg17").token("tok"))
            .await
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(matches!(pipeline.state(), PipelineState::PermanentError { .. }));
        assert_eq!(mocks.programs.program_calls(), 0);
    }

    #[tokio::test]
    async fn halt_hides_mask_and_resume_shows_it() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());

        let status = pipeline
            .start(request(1).param("date_override", "true"))
            .await
            .unwrap();
        assert!(status.interstitial().is_some());
        assert!(!pipeline.mask_visible());

        let status = pipeline.resume(UserResponse::Accept).await.unwrap();
        assert!(status.redirect_url().is_some());
        assert!(pipeline.mask_visible());
    }

    #[tokio::test]
    async fn misuse_response_keeps_guard_halted() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        pipeline
            .start(request(1).param("ready_override", "true"))
            .await
            .unwrap();

        let err = pipeline.resume(UserResponse::Yes).await.unwrap_err();
        assert!(!err.is_permanent());
        assert!(matches!(pipeline.state(), PipelineState::Halted { .. }));
        assert!(!pipeline.mask_visible());

        assert!(pipeline.resume(UserResponse::Accept).await.is_ok());
    }

    #[tokio::test]
    async fn resume_without_halt_is_rejected() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        let err = pipeline.resume(UserResponse::Yes).await.unwrap_err();
        assert!(matches!(err, PresurveyError::InvalidState(_)));
        assert_eq!(pipeline.state(), &PipelineState::Idle);
    }

    #[tokio::test]
    async fn shared_context_contract_while_halted() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        pipeline
            .start(request(2).param("date_override", "true"))
            .await
            .unwrap();

        pipeline
            .set_survey_params([("source", "email")])
            .unwrap();
        let mut extra = ExtraParams::new();
        extra.set("cohort_label", "2019");
        pipeline
            .set_loaded_data(ContextUpdate {
                extra_params: extra,
                ..Default::default()
            })
            .unwrap();

        let (a, b) = tokio::join!(pipeline.get_loaded_data(), pipeline.get_loaded_data());
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_eq!(a, b);
        assert_eq!(a.extra_params.get("source"), Some("email"));
        assert_eq!(a.extra_params.get("cohort_label"), Some("2019"));
        assert_eq!(a.extra_params.get("code"), Some(FIXTURE_CODE));
        assert_eq!(mocks.programs.program_calls(), 1);
    }

    #[tokio::test]
    async fn get_loaded_data_before_start_is_rejected() {
        let mocks = test_deps();
        let pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        assert!(pipeline.get_loaded_data().await.is_err());
    }

    #[tokio::test]
    async fn teardown_while_halted_discards_everything() {
        let mocks = test_deps();
        let mut pipeline = PipelineOrchestrator::new(mocks.deps(), PipelineConfig::default());
        pipeline
            .start(request(1).param("date_override", "true"))
            .await
            .unwrap();

        pipeline.teardown_handle().teardown();
        let status = pipeline.resume(UserResponse::Accept).await.unwrap();
        assert_eq!(status, PipelineStatus::TornDown);
        assert_eq!(pipeline.state(), &PipelineState::TornDown);
        assert!(pipeline.context().is_none());
        assert!(mocks.navigator.visits().is_empty());
    }
}
