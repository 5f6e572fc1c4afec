pub mod consent;
pub mod ies_membership;
pub mod param_transform;
pub mod preview_agreement;
pub mod skip_to_first_session;

pub use consent::ConsentGuard;
pub use ies_membership::{salted_hash, IesMembershipGuard, SKIP_TO_COMPLETION_CODE};
pub use param_transform::ParamTransformGuard;
pub use preview_agreement::PreviewAgreementGuard;
pub use skip_to_first_session::SkipToFirstSessionGuard;
