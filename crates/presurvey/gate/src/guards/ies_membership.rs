use std::sync::Arc;

use async_trait::async_trait;
use presurvey_types::{PresurveyResult, SessionContext};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::outcome::GuardOutcome;
use crate::registry::guard_names;
use crate::traits::{GuardStep, MembershipList};

/// Survey parameter set for pre-registered participants
pub const SKIP_TO_COMPLETION_CODE: &str = "skip_to_completion_code";

/// Hex-encoded SHA-256 of `salt` followed by `token`
pub fn salted_hash(salt: &str, token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Membership check against a pre-registered study list.
///
/// Only the salted hash of the participant token is compared; the raw
/// token never leaves this guard. Matching participants get
/// `skip_to_completion_code=true`. Advances after the lookup either way.
pub struct IesMembershipGuard {
    list: Arc<dyn MembershipList>,
    salt: String,
}

impl IesMembershipGuard {
    pub fn new(list: Arc<dyn MembershipList>, salt: impl Into<String>) -> Self {
        Self {
            list,
            salt: salt.into(),
        }
    }
}

#[async_trait]
impl GuardStep for IesMembershipGuard {
    fn name(&self) -> &str {
        guard_names::IES_MEMBERSHIP
    }

    async fn on_enter(&self, ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome> {
        let hashed = salted_hash(&self.salt, &ctx.token);
        let members = self.list.fetch_hashed_ids().await?;

        let is_member = members.iter().any(|h| h.eq_ignore_ascii_case(&hashed));
        if is_member {
            ctx.extra_params.set(SKIP_TO_COMPLETION_CODE, "true");
        }
        debug!(is_member, list_size = members.len(), "Membership check done");

        Ok(GuardOutcome::Advance)
    }
}
