//! Presurvey Gate: ordered guard pipeline in front of an external survey.
//!
//! Each participant session passes through a program-specific list of
//! guards before being handed off to the survey platform. A guard either
//! advances, or halts behind an interstitial until the participant answers.
//!
//! ## Invariants
//!
//! - **Strict ordering**: guards run in configured order, one at a time.
//! - **Single resolution**: program, cohort and survey are fetched once per
//!   session and shared by every caller.
//! - **Append-only parameters**: survey-link parameters are added or
//!   rewritten, never removed.
//! - **Terminal redirect**: the hand-off happens at most once and nothing
//!   runs after it.
//! - **Teardown**: once torn down, pending guard work is discarded without
//!   touching the session context.
//!
//! ## Default Guards
//!
//! 1. **consent**: placeholder, advances
//! 2. **preview_agreement**: staff acknowledgment for override links
//! 3. **skip_to_first_session**: no skipping ahead of wave 1
//! 4. **block_switcher**: narrows open-response conditions
//!
//! The designated study program additionally runs **ies_membership** last.

pub mod config;
pub mod guards;
pub mod link;
pub mod loader;
pub mod mocks;
pub mod orchestrator;
pub mod outcome;
pub mod registry;
pub mod session_store;
pub mod traits;

pub use config::{IesConfig, PipelineConfig};
pub use guards::{
    salted_hash, ConsentGuard, IesMembershipGuard, ParamTransformGuard, PreviewAgreementGuard,
    SkipToFirstSessionGuard, SKIP_TO_COMPLETION_CODE,
};
pub use link::{build_survey_link, survey_link_for};
pub use loader::{EntityLoader, LoadedEntities};
pub use orchestrator::{PipelineDeps, PipelineOrchestrator, PipelineState, TeardownHandle};
pub use outcome::{GuardOutcome, Interstitial, PipelineStatus, UserResponse};
pub use registry::{guard_names, GuardRegistry};
pub use session_store::{session_keys, MemorySessionStore, DEFAULT_NAMESPACE};
pub use traits::{
    GuardStep, MembershipList, Navigator, ParticipantDataClient, ProgramRegistry, SessionStore,
};
