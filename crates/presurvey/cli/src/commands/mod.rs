//! CLI command implementations

pub mod guards;
pub mod run;
pub mod session;
