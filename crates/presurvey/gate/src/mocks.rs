//! In-memory collaborators for tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use presurvey_types::{
    CohortStatus, PresurveyError, PresurveyResult, Program, ProgramSurvey, ProgressRecord,
    ProjectCohort, Survey, SurveyStatus,
};
use url::Url;

use crate::orchestrator::PipelineDeps;
use crate::session_store::MemorySessionStore;
use crate::traits::{MembershipList, Navigator, ParticipantDataClient, ProgramRegistry};

/// Participation code of the standard fixture
pub const FIXTURE_CODE: &str = "trout viper";
/// Project cohort the standard fixture code belongs to
pub const FIXTURE_COHORT: &str = "ProjectCohort_1";

/// A ready survey for the standard fixture cohort
pub fn fixture_survey(ordinal: u32) -> Survey {
    Survey {
        uid: format!("Survey_{ordinal}"),
        ordinal,
        status: SurveyStatus::Ready,
        anonymous_link: format!("https://survey.example.com/jfe/form/SV_{ordinal}"),
    }
}

/// An open project cohort
pub fn fixture_cohort() -> ProjectCohort {
    ProjectCohort {
        uid: FIXTURE_COHORT.to_string(),
        status: CohortStatus::Open,
        cohort_label: "2019".to_string(),
    }
}

/// A two-wave program with no presurvey states of its own
pub fn fixture_program(label: &str) -> Program {
    let mut program = Program::new(label);
    program.surveys = vec![
        ProgramSurvey {
            ordinal: 1,
            name: "Session 1".into(),
        },
        ProgramSurvey {
            ordinal: 2,
            name: "Session 2".into(),
        },
    ];
    program
}

async fn maybe_delay(delay: Option<Duration>) {
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
}

// ── Program Registry ─────────────────────────────────────────────────

/// Mock program registry.
///
/// Unknown labels, codes and ordinals resolve to `NotFound`.
#[derive(Default)]
pub struct MockProgramRegistry {
    programs: HashMap<String, Program>,
    cohorts: HashMap<String, ProjectCohort>,
    surveys: HashMap<(String, u32), Survey>,
    delay: Option<Duration>,
    program_calls: AtomicUsize,
    cohort_calls: AtomicUsize,
    survey_calls: AtomicUsize,
}

impl MockProgramRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs `cg17` and `ep19`, the fixture cohort and surveys 1 and 2
    pub fn standard() -> Self {
        Self::new()
            .with_program(fixture_program("cg17"))
            .with_program(fixture_program("ep19"))
            .with_cohort(FIXTURE_CODE, fixture_cohort())
            .with_survey(FIXTURE_COHORT, fixture_survey(1))
            .with_survey(FIXTURE_COHORT, fixture_survey(2))
    }

    pub fn with_program(mut self, program: Program) -> Self {
        self.programs.insert(program.label.clone(), program);
        self
    }

    pub fn with_cohort(mut self, code: impl Into<String>, cohort: ProjectCohort) -> Self {
        self.cohorts.insert(code.into(), cohort);
        self
    }

    pub fn with_survey(mut self, project_cohort_id: impl Into<String>, survey: Survey) -> Self {
        self.surveys
            .insert((project_cohort_id.into(), survey.ordinal), survey);
        self
    }

    /// Make every lookup sleep first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn program_calls(&self) -> usize {
        self.program_calls.load(Ordering::SeqCst)
    }

    pub fn cohort_calls(&self) -> usize {
        self.cohort_calls.load(Ordering::SeqCst)
    }

    pub fn survey_calls(&self) -> usize {
        self.survey_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProgramRegistry for MockProgramRegistry {
    async fn get_program(&self, label: &str) -> PresurveyResult<Program> {
        self.program_calls.fetch_add(1, Ordering::SeqCst);
        maybe_delay(self.delay).await;
        self.programs
            .get(label)
            .cloned()
            .ok_or_else(|| PresurveyError::not_found("program", label))
    }

    async fn get_cohort(&self, code: &str) -> PresurveyResult<ProjectCohort> {
        self.cohort_calls.fetch_add(1, Ordering::SeqCst);
        maybe_delay(self.delay).await;
        self.cohorts
            .get(code)
            .cloned()
            .ok_or_else(|| PresurveyError::not_found("project cohort", code))
    }

    async fn get_survey(&self, project_cohort_id: &str, ordinal: u32) -> PresurveyResult<Survey> {
        self.survey_calls.fetch_add(1, Ordering::SeqCst);
        maybe_delay(self.delay).await;
        self.surveys
            .get(&(project_cohort_id.to_string(), ordinal))
            .cloned()
            .ok_or_else(|| {
                PresurveyError::not_found("survey", format!("{project_cohort_id}#{ordinal}"))
            })
    }
}

// ── Participant Data ─────────────────────────────────────────────────

enum ProgressBehavior {
    Records(Vec<ProgressRecord>),
    Fail,
    Hang,
}

/// Mock participant data client
pub struct MockParticipantData {
    behavior: ProgressBehavior,
    calls: AtomicUsize,
}

impl MockParticipantData {
    pub fn with_records(records: Vec<ProgressRecord>) -> Self {
        Self {
            behavior: ProgressBehavior::Records(records),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::with_records(Vec::new())
    }

    pub fn failing() -> Self {
        Self {
            behavior: ProgressBehavior::Fail,
            calls: AtomicUsize::new(0),
        }
    }

    /// Never answers; for teardown tests
    pub fn hanging() -> Self {
        Self {
            behavior: ProgressBehavior::Hang,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParticipantDataClient for MockParticipantData {
    async fn get_progress(&self, _token: &str, _code: &str) -> PresurveyResult<Vec<ProgressRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ProgressBehavior::Records(records) => Ok(records.clone()),
            ProgressBehavior::Fail => Err(PresurveyError::resolution(
                "participant progress",
                "service unavailable",
            )),
            ProgressBehavior::Hang => std::future::pending().await,
        }
    }
}

// ── Membership List ──────────────────────────────────────────────────

/// Mock hashed-ID list
pub struct MockMembershipList {
    hashes: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl MockMembershipList {
    pub fn new<I, S>(hashes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            hashes: Some(hashes.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::<String>::new())
    }

    pub fn failing() -> Self {
        Self {
            hashes: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MembershipList for MockMembershipList {
    async fn fetch_hashed_ids(&self) -> PresurveyResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.hashes
            .clone()
            .ok_or_else(|| PresurveyError::resolution("hashed id list", "fetch failed"))
    }
}

// ── Navigator ────────────────────────────────────────────────────────

/// Navigator that records every hand-off instead of leaving
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<Url>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visits(&self) -> Vec<Url> {
        self.visits.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        self.visits.lock().push(url.clone());
    }
}

// ── Bundle ───────────────────────────────────────────────────────────

/// Concrete handles on every mock collaborator of a pipeline
pub struct MockCollaborators {
    pub programs: Arc<MockProgramRegistry>,
    pub participants: Arc<MockParticipantData>,
    pub membership: Arc<MockMembershipList>,
    pub store: Arc<MemorySessionStore>,
    pub navigator: Arc<RecordingNavigator>,
}

impl MockCollaborators {
    pub fn new(
        programs: MockProgramRegistry,
        participants: MockParticipantData,
        membership: MockMembershipList,
    ) -> Self {
        Self {
            programs: Arc::new(programs),
            participants: Arc::new(participants),
            membership: Arc::new(membership),
            store: Arc::new(MemorySessionStore::default()),
            navigator: Arc::new(RecordingNavigator::new()),
        }
    }

    /// Erased dependencies for a pipeline
    pub fn deps(&self) -> PipelineDeps {
        PipelineDeps {
            programs: self.programs.clone(),
            participants: self.participants.clone(),
            membership: self.membership.clone(),
            store: self.store.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

/// Standard fixture: known programs and surveys, no progress, empty list
pub fn test_deps() -> MockCollaborators {
    MockCollaborators::new(
        MockProgramRegistry::standard(),
        MockParticipantData::empty(),
        MockMembershipList::empty(),
    )
}
