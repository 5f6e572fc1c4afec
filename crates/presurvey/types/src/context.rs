//! Session context: the single mutable value guards operate on
//!
//! A [`SessionRequest`] is what arrives from the participant (query string
//! plus persisted cookies); a [`SessionContext`] is that request joined with
//! the entities resolved from the program registry.

use crate::{ExtraParams, Program, ProgressRecord, ProjectCohort, Survey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request parameters that let staff preview an unreleased survey
pub const OVERRIDE_FLAGS: [&str; 2] = ["date_override", "ready_override"];

/// Parameter names the pipeline itself writes into the survey link
pub mod param_keys {
    pub const CODE: &str = "code";
    pub const TOKEN: &str = "token";
    pub const SESSION_ORDINAL: &str = "session_ordinal";
    pub const PROJECT_COHORT_ID: &str = "project_cohort_id";
    pub const SURVEY_ID: &str = "survey_id";
}

// ── Session Request ──────────────────────────────────────────────────

/// Everything known about a participant before anything is resolved
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRequest {
    pub program_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Raw ordinal as it arrived; may be missing or not a number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_ordinal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Incoming query parameters, override flags included
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl SessionRequest {
    pub fn new(program_label: impl Into<String>) -> Self {
        Self {
            program_label: program_label.into(),
            ..Default::default()
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn session_ordinal(mut self, ordinal: impl ToString) -> Self {
        self.session_ordinal = Some(ordinal.to_string());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Override flags present in the request, whatever their value
    pub fn override_flags(&self) -> Vec<&'static str> {
        active_override_flags(&self.params)
    }

    /// Incoming parameters that should be forwarded to the survey
    pub fn passthrough_params(&self) -> impl Iterator<Item = (&String, &String)> {
        self.params
            .iter()
            .filter(|(k, _)| !OVERRIDE_FLAGS.contains(&k.as_str()))
    }
}

/// Parse a session ordinal; anything but a positive integer is `None`
pub fn parse_ordinal(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|n| *n > 0)
}

fn active_override_flags(params: &BTreeMap<String, String>) -> Vec<&'static str> {
    OVERRIDE_FLAGS
        .iter()
        .copied()
        .filter(|flag| params.contains_key(*flag))
        .collect()
}

// ── Session Context ──────────────────────────────────────────────────

/// Shared state of one presurvey flow
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionContext {
    pub code: String,
    /// `None` until known; only a guard may force the default of 1
    pub session_ordinal: Option<u32>,
    pub token: String,
    pub program: Program,
    pub project_cohort: ProjectCohort,
    pub survey: Option<Survey>,
    /// `None` until fetched by a guard that needs them
    pub participant_progress_records: Option<Vec<ProgressRecord>>,
    pub extra_params: ExtraParams,
    /// Incoming request parameters, read-only for guards
    pub request_params: BTreeMap<String, String>,
}

impl SessionContext {
    /// Build a context and seed the survey parameters from identity and the
    /// request's passthrough parameters.
    pub fn new(
        request: &SessionRequest,
        code: String,
        session_ordinal: Option<u32>,
        token: String,
        program: Program,
        project_cohort: ProjectCohort,
        survey: Option<Survey>,
    ) -> Self {
        let mut extra_params: ExtraParams = request
            .passthrough_params()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        extra_params.set(param_keys::CODE, code.clone());
        extra_params.set(param_keys::TOKEN, token.clone());
        extra_params.set(param_keys::PROJECT_COHORT_ID, project_cohort.uid.clone());

        let mut ctx = Self {
            code,
            session_ordinal: None,
            token,
            program,
            project_cohort,
            survey: None,
            participant_progress_records: None,
            extra_params,
            request_params: request.params.clone(),
        };
        if let Some(ordinal) = session_ordinal {
            ctx.set_session_ordinal(ordinal);
        }
        if let Some(survey) = survey {
            ctx.set_survey(survey);
        }
        ctx
    }

    /// Rewrite the session ordinal and its survey-link parameter
    pub fn set_session_ordinal(&mut self, ordinal: u32) {
        self.session_ordinal = Some(ordinal);
        self.extra_params
            .set(param_keys::SESSION_ORDINAL, ordinal.to_string());
    }

    /// Replace the resolved survey and its survey-link parameter
    pub fn set_survey(&mut self, survey: Survey) {
        self.extra_params.set(param_keys::SURVEY_ID, survey.uid.clone());
        self.survey = Some(survey);
    }

    pub fn override_flags(&self) -> Vec<&'static str> {
        active_override_flags(&self.request_params)
    }

    /// Whether fetched progress records show survey `ordinal` completed
    pub fn has_completed(&self, ordinal: u32) -> bool {
        self.participant_progress_records
            .as_deref()
            .unwrap_or_default()
            .iter()
            .any(|r| r.shows_completed(ordinal))
    }

    /// Merge a partial update; `extra_params` are merged, never replaced
    pub fn apply(&mut self, update: ContextUpdate) {
        if let Some(ordinal) = update.session_ordinal {
            self.set_session_ordinal(ordinal);
        }
        if let Some(survey) = update.survey {
            self.set_survey(survey);
        }
        if let Some(records) = update.participant_progress_records {
            self.participant_progress_records = Some(records);
        }
        self.extra_params.merge(
            update
                .extra_params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
    }
}

/// Partial update to a [`SessionContext`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContextUpdate {
    pub session_ordinal: Option<u32>,
    pub survey: Option<Survey>,
    pub participant_progress_records: Option<Vec<ProgressRecord>>,
    pub extra_params: ExtraParams,
}
