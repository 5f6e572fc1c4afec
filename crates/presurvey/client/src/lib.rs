//! HTTP collaborators for the presurvey pipeline.
//!
//! [`ApiClient`] serves as both program registry and participant data
//! client; [`HashedIdList`] fetches the static membership list. Failures map
//! onto [`presurvey_types::PresurveyError`], with 404s reported as not found.

#![deny(unsafe_code)]

pub mod error;
pub mod http;

pub use error::{ClientError, ClientResult};
pub use http::{ApiClient, HashedIdList, DEFAULT_TIMEOUT};
