//! Backend types — sessions, auth events, and the closed error-code set.
//!
//! DESIGN
//! ======
//! Everything the controllers see from the hosted backend passes through
//! these types. Provider error strings never leave the adapter: they are
//! classified into an [`ErrorCode`] and controllers switch on the code.

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

const AUTH_EVENT_CAPACITY: usize = 32;

// =============================================================================
// ERROR
// =============================================================================

/// Closed set of backend failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidCredentials,
    EmailTaken,
    WeakPassword,
    InvalidEmail,
    RateLimited,
    EmailNotConfirmed,
    NotNullViolation,
    DuplicateKey,
    InvalidInput,
    PermissionDenied,
    /// Transport failure before a provider response arrived.
    Network,
    /// Response arrived but could not be understood.
    Unexpected,
    /// Provider rejected the request for a reason outside this set.
    Provider,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::EmailTaken => "E_EMAIL_TAKEN",
            Self::WeakPassword => "E_WEAK_PASSWORD",
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::RateLimited => "E_RATE_LIMITED",
            Self::EmailNotConfirmed => "E_EMAIL_NOT_CONFIRMED",
            Self::NotNullViolation => "E_NOT_NULL",
            Self::DuplicateKey => "E_DUPLICATE_KEY",
            Self::InvalidInput => "E_INVALID_INPUT",
            Self::PermissionDenied => "E_PERMISSION_DENIED",
            Self::Network => "E_NETWORK",
            Self::Unexpected => "E_UNEXPECTED",
            Self::Provider => "E_PROVIDER",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified backend failure. `message` is the provider's raw text and is
/// only shown to users for [`ErrorCode::Provider`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    pub code: ErrorCode,
    pub message: String,
    pub status: Option<u16>,
}

impl BackendError {
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), status: None }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::Network, err.to_string())
    }

    #[must_use]
    pub fn unexpected(err: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::Unexpected, err.to_string())
    }

    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self.code, ErrorCode::Network | ErrorCode::RateLimited)
    }
}

// =============================================================================
// SESSION
// =============================================================================

/// Authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

/// Provider-issued session. Mirrored by controllers, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds) after which the access token is invalid.
    pub expires_at: i64,
    pub user: User,
}

impl Session {
    /// Whether the access token expires within `margin_secs` of `now`.
    #[must_use]
    pub fn expires_within(&self, now: i64, margin_secs: i64) -> bool {
        self.expires_at - now <= margin_secs
    }
}

/// Result of a sign-up call. `session` is `None` when the provider requires
/// email confirmation before the first sign-in.
#[derive(Debug, Clone, PartialEq)]
pub struct SignUpOutcome {
    pub user: User,
    pub session: Option<Session>,
}

// =============================================================================
// AUTH EVENTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthEventKind {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

/// One entry in the auth-change stream. `seq` increases by one per event.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthEvent {
    pub seq: u64,
    pub kind: AuthEventKind,
    pub session: Option<Session>,
}

/// Broadcast channel plus sequence counter shared by backend implementations.
pub struct AuthEvents {
    tx: broadcast::Sender<AuthEvent>,
    /// Held while sending so events reach subscribers in `seq` order.
    seq: Mutex<u64>,
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self { tx, seq: Mutex::new(0) }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn emit(&self, kind: AuthEventKind, session: Option<Session>) -> u64 {
        let mut last = self.seq.lock().unwrap_or_else(PoisonError::into_inner);
        *last += 1;
        let _ = self.tx.send(AuthEvent { seq: *last, kind, session });
        *last
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.tx.subscribe()
    }

    #[must_use]
    pub fn last_seq(&self) -> u64 {
        *self.seq.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
