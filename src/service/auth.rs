//! Email/password authentication.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::{watch, Mutex};

use super::error::ServiceError;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}

/// Session changes observed through [`AuthService::subscribe`].
pub type SessionWatch = watch::Receiver<Option<AuthSession>>;

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Registers an account and signs it in.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthUser, ServiceError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError>;

    async fn sign_out(&self) -> Result<(), ServiceError>;

    fn current_session(&self) -> Option<AuthSession>;

    fn subscribe(&self) -> SessionWatch;
}

/// Normalizes and checks sign-up/sign-in input.
pub(crate) fn validate_credentials(email: &str, password: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    let valid_email = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty(),
        None => false,
    };
    if !valid_email {
        return Err(ServiceError::InvalidRequest(format!(
            "Invalid email address: {}",
            email
        )));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ServiceError::InvalidRequest(format!(
            "Password should be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(email)
}

struct Account {
    user: AuthUser,
    password_digest: String,
}

/// In-process accounts with one current session.
pub struct MemoryAuthService {
    accounts: Mutex<HashMap<String, Account>>,
    session: watch::Sender<Option<AuthSession>>,
}

impl Default for MemoryAuthService {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuthService {
    pub fn new() -> Self {
        let (session, _) = watch::channel(None);
        Self {
            accounts: Mutex::new(HashMap::new()),
            session,
        }
    }

    fn digest(email: &str, password: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(email.as_bytes());
        hasher.update(b":");
        hasher.update(password.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn open_session(&self, user: AuthUser) -> AuthSession {
        let session = AuthSession {
            access_token: uuid::Uuid::new_v4().to_string(),
            user,
        };
        self.session.send_replace(Some(session.clone()));
        session
    }
}

#[async_trait]
impl AuthService for MemoryAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthUser, ServiceError> {
        let email = validate_credentials(email, password)?;
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&email) {
            return Err(ServiceError::Auth("User already registered".into()));
        }
        let user = AuthUser {
            id: uuid::Uuid::new_v4().to_string(),
            email: email.clone(),
            full_name: Some(full_name.trim().to_string()).filter(|n| !n.is_empty()),
        };
        accounts.insert(
            email.clone(),
            Account {
                user: user.clone(),
                password_digest: Self::digest(&email, password),
            },
        );
        drop(accounts);

        tracing::info!(user_id = %user.id, "Account registered");
        self.open_session(user.clone());
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let email = email.trim().to_lowercase();
        let accounts = self.accounts.lock().await;
        let user = accounts
            .get(&email)
            .filter(|a| a.password_digest == Self::digest(&email, password))
            .map(|a| a.user.clone())
            .ok_or_else(|| ServiceError::Auth("Invalid login credentials".into()))?;
        drop(accounts);
        Ok(self.open_session(user))
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        self.session.send_replace(None);
        Ok(())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> SessionWatch {
        self.session.subscribe()
    }
}
