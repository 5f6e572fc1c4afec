use serde::{Deserialize, Serialize};

use crate::registry::guard_names;

/// Configuration for the presurvey pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Guard order for programs that declare no presurvey states
    #[serde(default = "default_presurvey_states")]
    pub default_presurvey_states: Vec<String>,

    /// Membership check settings
    #[serde(default)]
    pub ies: IesConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_presurvey_states: default_presurvey_states(),
            ies: IesConfig::default(),
        }
    }
}

/// Settings for the privacy-preserving membership check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IesConfig {
    /// Program the membership guard runs for; `None` disables it
    #[serde(default = "default_ies_program")]
    pub program_label: Option<String>,

    /// Salt prepended to the participant token before hashing; required
    /// whenever `program_label` names a program
    #[serde(default)]
    pub salt: String,
}

impl Default for IesConfig {
    fn default() -> Self {
        Self {
            program_label: default_ies_program(),
            salt: String::new(),
        }
    }
}

impl IesConfig {
    pub fn applies_to(&self, program_label: &str) -> bool {
        self.program_label.as_deref() == Some(program_label)
    }
}

fn default_presurvey_states() -> Vec<String> {
    [
        guard_names::CONSENT,
        guard_names::PREVIEW_AGREEMENT,
        guard_names::SKIP_TO_FIRST_SESSION,
        guard_names::BLOCK_SWITCHER,
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_ies_program() -> Option<String> {
    Some("ep19".to_string())
}
