//! Configuration for the presurvey CLI

use std::path::PathBuf;
use std::time::Duration;

use presurvey_gate::{PipelineConfig, DEFAULT_NAMESPACE};
use serde::{Deserialize, Serialize};

/// Main CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PresurveyConfig {
    /// Guard order and membership settings
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Remote API
    #[serde(default)]
    pub api: ApiConfig,

    /// Cookie jar
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the program registry and participant data API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Location of the static hashed-ID list; defaults to one under `base_url`
    #[serde(default)]
    pub hashed_ids_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            hashed_ids_url: None,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn hashed_ids_url(&self) -> String {
        self.hashed_ids_url.clone().unwrap_or_else(|| {
            format!(
                "{}/static/ies_hashed_ids.json",
                self.base_url.trim_end_matches('/')
            )
        })
    }
}

/// Cookie jar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// JSON file standing in for browser cookies
    #[serde(default = "default_session_path")]
    pub path: PathBuf,

    /// Key namespace
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: default_session_path(),
            namespace: default_namespace(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_session_path() -> PathBuf {
    PathBuf::from(".presurvey/session.json")
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl PresurveyConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `PRESURVEY_*` environment variables (`PRESURVEY_API__BASE_URL`).
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&PresurveyConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("PRESURVEY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
