use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Screen a halted guard shows in place of the loading mask.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interstitial {
    /// Staff preview acknowledgment; lists the override flags in effect
    PreviewAgreement { overrides: Vec<String> },
    /// "Did you already do session 1?"
    ConfirmFirstSession { requested_ordinal: u32 },
}

/// Result of entering or resuming a guard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Move on to the next guard (or the terminal redirect)
    Advance,
    /// Render an interstitial and wait for the participant
    Halt(Interstitial),
}

impl GuardOutcome {
    pub fn is_advance(&self) -> bool {
        matches!(self, GuardOutcome::Advance)
    }

    pub fn is_halt(&self) -> bool {
        matches!(self, GuardOutcome::Halt(_))
    }
}

/// A participant's answer to an interstitial.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserResponse {
    Accept,
    Yes,
    No,
}

impl fmt::Display for UserResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UserResponse::Accept => "accept",
            UserResponse::Yes => "yes",
            UserResponse::No => "no",
        };
        f.write_str(s)
    }
}

/// What the caller sees after driving the pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PipelineStatus {
    /// A guard is waiting on the participant
    Halted {
        guard: String,
        interstitial: Interstitial,
    },
    /// The participant was handed off to the external survey
    Redirected { url: Url },
    /// The instance was torn down while a guard was pending
    TornDown,
}

impl PipelineStatus {
    pub fn redirect_url(&self) -> Option<&Url> {
        match self {
            PipelineStatus::Redirected { url } => Some(url),
            _ => None,
        }
    }

    pub fn interstitial(&self) -> Option<&Interstitial> {
        match self {
            PipelineStatus::Halted { interstitial, .. } => Some(interstitial),
            _ => None,
        }
    }
}
