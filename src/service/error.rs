use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ServiceError {
    /// Maps a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => ServiceError::Auth(body.to_string()),
            404 => ServiceError::NotFound(body.to_string()),
            _ => ServiceError::Api {
                status,
                message: body.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Serialization(e.to_string())
    }
}
