//! Error types for the playground.
//!
//! - [`PlaygroundError`]: top-level errors surfaced to library callers.
//! - [`ServiceError`]: data and auth service failures.
//! - [`ConfigError`]: missing or invalid configuration.
//! - [`SandboxError`]: the realm could not be launched.
//!
//! Faults found in the user's code are never errors: they are diagnostics
//! recorded on the editor session.

pub use crate::config::ConfigError;
pub use crate::service::ServiceError;
pub use learnhub_types::SandboxError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlaygroundError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias for playground-level results.
pub type PlaygroundResult<T> = Result<T, PlaygroundError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PlaygroundError::from(ConfigError::MissingVar("LEARNHUB_SUPABASE_URL"));
        assert_eq!(
            err.to_string(),
            "Configuration error: Missing environment variable: LEARNHUB_SUPABASE_URL"
        );

        let err = PlaygroundError::from(SandboxError::CodeTooLarge { max: 4, actual: 7 });
        assert_eq!(
            err.to_string(),
            "Sandbox error: Code too large (max 4 bytes, got 7 bytes)"
        );
    }
}
