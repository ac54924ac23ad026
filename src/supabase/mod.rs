//! Backend adapter for the hosted auth + table service.
//!
//! DESIGN
//! ======
//! Controllers depend on the [`AuthBackend`] and [`TableBackend`] traits, not
//! on HTTP. [`client::SupabaseClient`] is the production implementation;
//! tests plug in an in-memory mock. Failures surface as
//! [`types::BackendError`] carrying a closed [`types::ErrorCode`].

pub mod classify;
pub mod client;
pub mod config;
#[cfg(test)]
pub mod mock;
pub mod types;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

pub use types::{AuthEvent, BackendError, ErrorCode, Session, SignUpOutcome, User};

/// Session and credential operations.
#[async_trait::async_trait]
pub trait AuthBackend: Send + Sync {
    /// Current session, refreshed first if it is about to expire.
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    /// Subscribe to session changes made after this call.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Sequence number of the most recently emitted auth event (0 if none).
    fn last_event_seq(&self) -> u64;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn sign_up(&self, email: &str, password: &str, metadata: Value) -> Result<SignUpOutcome, BackendError>;

    async fn sign_out(&self) -> Result<(), BackendError>;
}

/// Row-level table operations, authorized with the current session if any.
#[async_trait::async_trait]
pub trait TableBackend: Send + Sync {
    /// Insert one row and return the stored representation.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError>;

    /// Select all rows where `column` equals `value`.
    async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>, BackendError>;
}

/// Both halves of the backend, as held by a visitor.
pub trait Backend: AuthBackend + TableBackend {}

impl<T: AuthBackend + TableBackend + ?Sized> Backend for T {}

/// Creates an isolated backend (own session store) for each new visitor.
pub type BackendFactory = Arc<dyn Fn() -> Arc<dyn Backend> + Send + Sync>;

/// Factory producing [`client::SupabaseClient`]s that share one HTTP pool.
#[must_use]
pub fn supabase_factory(http: reqwest::Client, config: Arc<config::SupabaseConfig>) -> BackendFactory {
    Arc::new(move || -> Arc<dyn Backend> { Arc::new(client::SupabaseClient::new(http.clone(), config.clone())) })
}
