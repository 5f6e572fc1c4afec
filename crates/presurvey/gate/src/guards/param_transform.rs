//! Block switcher: shapes open-response parameters before the survey
//!
//! Older links say `show_open_response_questions=true` and carry the
//! candidate conditions in `learning_conditions`; newer ones carry
//! `open_response_lcs` directly. Either way the participant ends up with at
//! most one open-response condition in `open_response_lcs`.

use std::collections::BTreeSet;

use async_trait::async_trait;
use presurvey_types::{is_truthy, ExtraParams, PresurveyResult, SessionContext};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::outcome::GuardOutcome;
use crate::registry::guard_names;
use crate::traits::GuardStep;

pub const SHOW_OPEN_RESPONSE_QUESTIONS: &str = "show_open_response_questions";
pub const LEARNING_CONDITIONS: &str = "learning_conditions";
pub const OPEN_RESPONSE_LCS: &str = "open_response_lcs";

/// Distinct, sorted condition names from a comma/space separated list
pub fn split_conditions(raw: &str) -> BTreeSet<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Pick one condition, stable for a given seed and candidate set
pub fn narrow(candidates: &BTreeSet<String>, seed: &str) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let digest = Sha256::digest(seed.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let index = (u64::from_be_bytes(head) % candidates.len() as u64) as usize;
    candidates.iter().nth(index).cloned()
}

/// Normalize `open_response_lcs` in place. Returns whether it changed.
pub fn normalize_open_response(params: &mut ExtraParams, seed: &str) -> bool {
    let candidates = match params.get(OPEN_RESPONSE_LCS) {
        Some(existing) => split_conditions(existing),
        None if params.get(SHOW_OPEN_RESPONSE_QUESTIONS).map_or(false, is_truthy) => {
            split_conditions(params.get(LEARNING_CONDITIONS).unwrap_or_default())
        }
        None => return false,
    };

    match narrow(&candidates, seed) {
        Some(chosen) => params.transform(OPEN_RESPONSE_LCS, |_| Some(chosen)),
        None => false,
    }
}

/// Synchronous parameter transform guard; always advances.
#[derive(Debug, Default)]
pub struct ParamTransformGuard;

impl ParamTransformGuard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GuardStep for ParamTransformGuard {
    fn name(&self) -> &str {
        guard_names::BLOCK_SWITCHER
    }

    async fn on_enter(&self, ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome> {
        let token = ctx.token.clone();
        if normalize_open_response(&mut ctx.extra_params, &token) {
            debug!(
                open_response_lcs = ctx.extra_params.get(OPEN_RESPONSE_LCS),
                "Open response condition chosen"
            );
        }
        Ok(GuardOutcome::Advance)
    }
}
