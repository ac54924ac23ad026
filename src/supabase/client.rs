//! HTTP client for the hosted auth and table APIs.
//!
//! DESIGN
//! ======
//! One `SupabaseClient` exists per browser visitor and owns that visitor's
//! session. The underlying `reqwest::Client` is shared across visitors.
//! Every session change is published on the visitor's auth-event stream,
//! which is what the sidebar listener consumes.
//!
//! TRADE-OFFS
//! ==========
//! Sign-out clears the local session before the remote call resolves, so a
//! failed revoke still leaves the visitor signed out locally.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::classify::{classify_auth_error, classify_data_error};
use super::config::SupabaseConfig;
use super::types::{AuthEvent, AuthEventKind, AuthEvents, BackendError, ErrorCode, Session, SignUpOutcome, User};
use super::{AuthBackend, TableBackend};

/// Build the shared HTTP client with the configured timeouts.
///
/// # Errors
///
/// Returns an error if the TLS backend fails to initialize.
pub fn build_http_client(config: &SupabaseConfig) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeouts.request_secs))
        .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
        .build()
        .map_err(BackendError::unexpected)
}

pub struct SupabaseClient {
    http: reqwest::Client,
    config: Arc<SupabaseConfig>,
    session: Mutex<Option<Session>>,
    /// Serializes refreshes; the provider rotates refresh tokens on use.
    refresh_lock: tokio::sync::Mutex<()>,
    events: AuthEvents,
}

impl SupabaseClient {
    #[must_use]
    pub fn new(http: reqwest::Client, config: Arc<SupabaseConfig>) -> Self {
        Self {
            http,
            config,
            session: Mutex::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
            events: AuthEvents::new(),
        }
    }

    fn current(&self) -> Option<Session> {
        self.session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn store(&self, session: Option<Session>) {
        *self
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = session;
    }

    fn bearer(&self) -> String {
        self.current()
            .map_or_else(|| self.config.anon_key.clone(), |s| s.access_token)
    }

    async fn post_auth(&self, path: &str, bearer: &str, body: &Value) -> Result<String, BackendError> {
        let response = self
            .http
            .post(self.config.auth_url(path))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(bearer)
            .json(body)
            .send()
            .await
            .map_err(BackendError::network)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(BackendError::network)?;
        if !(200..300).contains(&status) {
            return Err(classify_auth_error(status, &text));
        }
        Ok(text)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let anon_key = self.config.anon_key.clone();
        let text = self
            .post_auth("/token?grant_type=refresh_token", &anon_key, &body)
            .await?;
        parse_session_response(&text, now_secs())
    }
}

#[async_trait::async_trait]
impl AuthBackend for SupabaseClient {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let margin = self.config.refresh_margin_secs;
        match self.current() {
            Some(session) if !session.expires_within(now_secs(), margin) => return Ok(Some(session)),
            None => return Ok(None),
            Some(_) => {}
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed or signed out while we waited.
        let Some(session) = self.current() else {
            return Ok(None);
        };
        if !session.expires_within(now_secs(), margin) {
            return Ok(Some(session));
        }

        debug!(user_id = %session.user.id, "refreshing session");
        match self.refresh(&session.refresh_token).await {
            Ok(fresh) => {
                self.store(Some(fresh.clone()));
                self.events
                    .emit(AuthEventKind::TokenRefreshed, Some(fresh.clone()));
                Ok(Some(fresh))
            }
            Err(e) if e.code == ErrorCode::Network => Err(e),
            Err(e) => {
                let still_current = self
                    .current()
                    .is_some_and(|s| s.refresh_token == session.refresh_token);
                if !still_current {
                    return Ok(self.current());
                }
                warn!(error = %e, "session refresh rejected; signing out locally");
                self.store(None);
                self.events.emit(AuthEventKind::SignedOut, None);
                Ok(None)
            }
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn last_event_seq(&self) -> u64 {
        self.events.last_seq()
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password });
        let anon_key = self.config.anon_key.clone();
        let text = self
            .post_auth("/token?grant_type=password", &anon_key, &body)
            .await?;
        let session = parse_session_response(&text, now_secs())?;

        info!(user_id = %session.user.id, "signed in");
        self.store(Some(session.clone()));
        self.events
            .emit(AuthEventKind::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome, BackendError> {
        let body = serde_json::json!({ "email": email, "password": password, "data": metadata });
        let anon_key = self.config.anon_key.clone();
        let text = self.post_auth("/signup", &anon_key, &body).await?;
        let outcome = parse_signup_response(&text, now_secs())?;

        info!(user_id = %outcome.user.id, confirmed = outcome.session.is_some(), "signed up");
        if let Some(session) = &outcome.session {
            self.store(Some(session.clone()));
            self.events
                .emit(AuthEventKind::SignedIn, Some(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        let Some(session) = self.current() else {
            return Ok(());
        };
        self.store(None);
        self.events.emit(AuthEventKind::SignedOut, None);

        self.post_auth("/logout", &session.access_token, &Value::Object(serde_json::Map::new()))
            .await
            .map(|_| ())
    }
}

#[async_trait::async_trait]
impl TableBackend for SupabaseClient {
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        let response = self
            .http
            .post(self.config.rest_url(table))
            .header("apikey", &self.config.anon_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.bearer())
            .json(&row)
            .send()
            .await
            .map_err(BackendError::network)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(BackendError::network)?;
        if !(200..300).contains(&status) {
            return Err(classify_data_error(status, &text));
        }
        first_row(&text)
    }

    async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>, BackendError> {
        let filter = format!("eq.{value}");
        let response = self
            .http
            .get(self.config.rest_url(table))
            .header("apikey", &self.config.anon_key)
            .bearer_auth(self.bearer())
            .query(&[("select", "*"), (column, filter.as_str())])
            .send()
            .await
            .map_err(BackendError::network)?;

        let status = response.status().as_u16();
        let text = response.text().await.map_err(BackendError::network)?;
        if !(200..300).contains(&status) {
            return Err(classify_data_error(status, &text));
        }
        serde_json::from_str(&text).map_err(BackendError::unexpected)
    }
}

// =============================================================================
// WIRE PARSING
// =============================================================================

#[derive(Deserialize)]
struct TokenBody {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: User,
}

impl TokenBody {
    fn into_session(self, now: i64) -> Session {
        let expires_at = self
            .expires_at
            .unwrap_or_else(|| now + self.expires_in.unwrap_or(3600));
        Session { access_token: self.access_token, refresh_token: self.refresh_token, expires_at, user: self.user }
    }
}

fn now_secs() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_secs()).unwrap_or(i64::MAX)
}

/// Parse a token-endpoint body into a session.
pub(crate) fn parse_session_response(body: &str, now: i64) -> Result<Session, BackendError> {
    serde_json::from_str::<TokenBody>(body)
        .map(|t| t.into_session(now))
        .map_err(|e| BackendError::unexpected(format!("session response: {e}")))
}

/// Parse a sign-up body. With auto-confirm the body is a token response;
/// otherwise it is the bare user (or `{"user": ...}` on older servers).
pub(crate) fn parse_signup_response(body: &str, now: i64) -> Result<SignUpOutcome, BackendError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| BackendError::unexpected(format!("signup response: {e}")))?;

    if value.get("access_token").is_some() {
        let session = parse_session_response(body, now)?;
        return Ok(SignUpOutcome { user: session.user.clone(), session: Some(session) });
    }

    let user_value = value.get("user").cloned().unwrap_or(value);
    let user: User =
        serde_json::from_value(user_value).map_err(|e| BackendError::unexpected(format!("signup user: {e}")))?;
    if user.id == Uuid::nil() {
        return Err(BackendError::unexpected("signup response carried a nil user id"));
    }
    Ok(SignUpOutcome { user, session: None })
}

/// PostgREST returns an array for `return=representation`; take the first row.
pub(crate) fn first_row(body: &str) -> Result<Value, BackendError> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    let value: Value = serde_json::from_str(body).map_err(BackendError::unexpected)?;
    Ok(match value {
        Value::Array(mut rows) if !rows.is_empty() => rows.swap_remove(0),
        Value::Array(_) => Value::Null,
        other => other,
    })
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
