//! Runtime configuration for the playground and its backing services.

use std::time::Duration;

#[cfg(feature = "builtin-sandbox-js")]
use learnhub_sandbox_js::RealmConfig;

pub const URL_VAR: &str = "LEARNHUB_SUPABASE_URL";
pub const ANON_KEY_VAR: &str = "LEARNHUB_SUPABASE_ANON_KEY";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Editor session timing and realm limits.
#[derive(Debug, Clone)]
pub struct PlaygroundConfig {
    /// Quiet period after the last edit before an automatic run
    pub debounce_quiet: Duration,

    /// Upper bound on how long a submission waits for a runtime fault
    pub submit_poll_timeout: Duration,

    /// How often the submit poll checks the live diagnostic
    pub submit_poll_interval: Duration,

    #[cfg(feature = "builtin-sandbox-js")]
    pub sandbox: RealmConfig,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            debounce_quiet: Duration::from_millis(1000),
            submit_poll_timeout: Duration::from_millis(2000),
            submit_poll_interval: Duration::from_millis(50),
            #[cfg(feature = "builtin-sandbox-js")]
            sandbox: RealmConfig::default(),
        }
    }
}

/// Location and credentials of the hosted data and auth service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub url: String,
    pub anon_key: String,
    pub timeout: Duration,
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source. Empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::MissingVar(name))
        };
        let url = read(URL_VAR)?;
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                name: URL_VAR,
                reason: format!("expected an http(s) URL, got '{}'", url),
            });
        }
        let anon_key = read(ANON_KEY_VAR)?;
        Ok(Self::new(url.trim_end_matches('/'), anon_key))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
