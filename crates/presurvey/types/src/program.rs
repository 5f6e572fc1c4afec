//! Program, cohort and survey entities as served by the program registry
//!
//! These are read-only inputs to the pipeline. Guards may replace the
//! context's survey with a freshly resolved one, but never edit the status
//! fields of an entity they were handed.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ── Program ──────────────────────────────────────────────────────────

/// A survey administration declared by a program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramSurvey {
    pub ordinal: u32,
    #[serde(default)]
    pub name: String,
}

/// A time-boxed administration window of a program
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CohortWindow {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_date: Option<NaiveDate>,
}

/// Program configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub label: String,
    /// Ordered guard names; empty means "use the default order"
    #[serde(default)]
    pub presurvey_states: Vec<String>,
    #[serde(default)]
    pub surveys: Vec<ProgramSurvey>,
    #[serde(default)]
    pub cohorts: Vec<CohortWindow>,
}

impl Program {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            presurvey_states: Vec::new(),
            surveys: Vec::new(),
            cohorts: Vec::new(),
        }
    }

    pub fn with_presurvey_states<I, S>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.presurvey_states = states.into_iter().map(Into::into).collect();
        self
    }

    pub fn cohort(&self, label: &str) -> Option<&CohortWindow> {
        self.cohorts.iter().find(|c| c.label == label)
    }

    /// Number of survey administrations (waves) in the program
    pub fn wave_count(&self) -> usize {
        self.surveys.len()
    }
}

// ── Project Cohort ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CohortStatus {
    Open,
    Closed,
}

/// A participating group's enrollment in a program cohort
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectCohort {
    pub uid: String,
    pub status: CohortStatus,
    pub cohort_label: String,
}

impl ProjectCohort {
    pub fn is_open(&self) -> bool {
        self.status == CohortStatus::Open
    }
}

// ── Survey ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Ready,
    NotReady,
}

/// One survey administration of a project cohort
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Survey {
    pub uid: String,
    pub ordinal: u32,
    pub status: SurveyStatus,
    pub anonymous_link: String,
}

impl Survey {
    pub fn is_ready(&self) -> bool {
        self.status == SurveyStatus::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn program_deserializes_without_optional_lists() {
        let program: Program = serde_json::from_str(r#"{"label": "cg17"}"#).unwrap();
        assert_eq!(program.label, "cg17");
        assert!(program.presurvey_states.is_empty());
        assert_eq!(program.wave_count(), 0);
    }

    #[test]
    fn cohort_window_open_ended() {
        let window: CohortWindow =
            serde_json::from_str(r#"{"label": "2019", "open_date": "2019-06-01"}"#).unwrap();
        assert_eq!(window.open_date, NaiveDate::from_ymd_opt(2019, 6, 1));
        assert_eq!(window.close_date, None);
    }

    #[test]
    fn survey_status_wire_format() {
        let survey: Survey = serde_json::from_str(
            r#"{"uid": "Survey_1", "ordinal": 1, "status": "not_ready",
                "anonymous_link": "https://survey.example.com/s1"}"#,
        )
        .unwrap();
        assert!(!survey.is_ready());

        let cohort: ProjectCohort = serde_json::from_str(
            r#"{"uid": "ProjectCohort_1", "status": "open", "cohort_label": "2019"}"#,
        )
        .unwrap();
        assert!(cohort.is_open());
    }
}
