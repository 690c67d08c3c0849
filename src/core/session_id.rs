//! Anonymous session identity persisted across runs.

use std::path::{Path, PathBuf};

use super::runtime_context::RuntimeContext;

pub const SESSION_ID_PREFIX: &str = "session_";

/// Loads or creates the anonymous `session_<millis>_<id>` identifier that
/// progress rows are keyed by.
pub struct SessionIdStore {
    path: PathBuf,
    context: RuntimeContext,
}

impl SessionIdStore {
    pub fn new(path: impl AsRef<Path>, context: RuntimeContext) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored id, generating and persisting a new one when the
    /// file is missing or does not hold a valid id.
    pub async fn load_or_create(&self) -> std::io::Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                let id = text.trim();
                if is_session_id(id) {
                    return Ok(id.to_string());
                }
                tracing::warn!(path = %self.path.display(), "Ignoring malformed session id");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }

        let id = self.generate();
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, &id).await?;
        tracing::debug!(session_id = %id, "Created session id");
        Ok(id)
    }

    pub fn generate(&self) -> String {
        new_session_id(&self.context)
    }
}

/// A fresh `session_<millis>_<id>` identifier.
pub fn new_session_id(context: &RuntimeContext) -> String {
    format!(
        "{}{}_{}",
        SESSION_ID_PREFIX,
        context.time_provider.now_millis(),
        context.id_generator.next_id()
    )
}

fn is_session_id(id: &str) -> bool {
    let Some(rest) = id.strip_prefix(SESSION_ID_PREFIX) else {
        return false;
    };
    match rest.split_once('_') {
        Some((millis, suffix)) => {
            !millis.is_empty()
                && millis.bytes().all(|b| b.is_ascii_digit())
                && !suffix.is_empty()
                && suffix.bytes().all(|b| b.is_ascii_alphanumeric())
        }
        None => false,
    }
}
