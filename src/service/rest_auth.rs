//! GoTrue-style HTTP auth client.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::watch;

use super::auth::{validate_credentials, AuthService, AuthSession, AuthUser, SessionWatch};
use super::error::ServiceError;
use super::rest::service_headers;
use crate::config::ServiceConfig;

pub struct RestAuthService {
    config: ServiceConfig,
    client: reqwest::Client,
    session: watch::Sender<Option<AuthSession>>,
}

impl RestAuthService {
    pub fn new(config: ServiceConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        let (session, _) = watch::channel(None);
        Ok(Self {
            config,
            client,
            session,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, bearer: &str, body: Value) -> Result<Value, ServiceError> {
        let response = self
            .client
            .post(self.endpoint(path))
            .headers(service_headers(&self.config.anon_key, bearer)?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(match status.as_u16() {
                400 | 401 | 403 | 422 => ServiceError::Auth(error_message(&text)),
                code => ServiceError::from_status(code, &text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    fn store(&self, session: Option<AuthSession>) {
        self.session.send_replace(session);
    }
}

/// GoTrue reports errors under one of several keys.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "error_description", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.to_string())
}

fn parse_user(value: &Value) -> Result<AuthUser, ServiceError> {
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ServiceError::Serialization("auth response has no user id".into()))?;
    Ok(AuthUser {
        id: id.to_string(),
        email: value
            .get("email")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        full_name: value
            .get("user_metadata")
            .and_then(|m| m.get("full_name"))
            .and_then(|v| v.as_str())
            .map(str::to_string),
    })
}

/// A session body carries `access_token` and `user`; anything else is a bare user.
fn parse_session(body: &Value) -> Result<(AuthUser, Option<AuthSession>), ServiceError> {
    match body.get("access_token").and_then(|v| v.as_str()) {
        Some(token) => {
            let user = parse_user(body.get("user").unwrap_or(&Value::Null))?;
            let session = AuthSession {
                access_token: token.to_string(),
                user: user.clone(),
            };
            Ok((user, Some(session)))
        }
        None => Ok((parse_user(body.get("user").unwrap_or(body))?, None)),
    }
}

#[async_trait]
impl AuthService for RestAuthService {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
    ) -> Result<AuthUser, ServiceError> {
        let email = validate_credentials(email, password)?;
        let body = self
            .post(
                "signup",
                &self.config.anon_key,
                json!({
                    "email": email,
                    "password": password,
                    "data": { "full_name": full_name },
                }),
            )
            .await?;
        let (user, session) = parse_session(&body)?;
        if session.is_some() {
            self.store(session);
        }
        tracing::info!(user_id = %user.id, "Account registered");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, ServiceError> {
        let body = self
            .post(
                "token?grant_type=password",
                &self.config.anon_key,
                json!({ "email": email.trim(), "password": password }),
            )
            .await?;
        let (_, session) = parse_session(&body)?;
        let session =
            session.ok_or_else(|| ServiceError::Auth("sign-in returned no session".into()))?;
        self.store(Some(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), ServiceError> {
        let Some(session) = self.current_session() else {
            return Ok(());
        };
        let result = self.post("logout", &session.access_token, json!({})).await;
        self.store(None);
        result.map(|_| ())
    }

    fn current_session(&self) -> Option<AuthSession> {
        self.session.borrow().clone()
    }

    fn subscribe(&self) -> SessionWatch {
        self.session.subscribe()
    }
}
