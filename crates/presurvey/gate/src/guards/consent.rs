use async_trait::async_trait;
use presurvey_types::{PresurveyResult, SessionContext};

use crate::outcome::GuardOutcome;
use crate::registry::guard_names;
use crate::traits::GuardStep;

/// Consent gate.
///
/// Consent is captured outside the pipeline today, so this always advances.
#[derive(Debug, Default)]
pub struct ConsentGuard;

impl ConsentGuard {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl GuardStep for ConsentGuard {
    fn name(&self) -> &str {
        guard_names::CONSENT
    }

    async fn on_enter(&self, _ctx: &mut SessionContext) -> PresurveyResult<GuardOutcome> {
        Ok(GuardOutcome::Advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guards::test_support::context;
    use crate::outcome::UserResponse;

    #[tokio::test]
    async fn always_advances_without_touching_context() {
        let mut ctx = context(Some(2));
        let before = ctx.clone();

        let outcome = ConsentGuard::new().on_enter(&mut ctx).await.unwrap();
        assert_eq!(outcome, GuardOutcome::Advance);
        assert_eq!(ctx, before);
    }

    #[tokio::test]
    async fn rejects_responses() {
        let mut ctx = context(Some(1));
        let result = ConsentGuard::new().resume(&mut ctx, UserResponse::Yes).await;
        assert!(result.is_err());
    }
}
