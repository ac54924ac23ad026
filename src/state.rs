//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the config, the backend factory, and the map of live visitors. Each
//! visitor (one browser, identified by the `bagease_visitor` cookie) owns an
//! isolated backend client, its sidebar controller, and its shell state.
//! Dropping a visitor drops its sidebar, which stops the session listener.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use rand::Rng;
use tokio::sync::RwLock;

use crate::config::AppConfig;
use crate::services::shell::Shell;
use crate::services::sidebar::Sidebar;
use crate::supabase::{Backend, BackendFactory};

pub const VISITOR_COOKIE: &str = "bagease_visitor";

// =============================================================================
// VISITOR
// =============================================================================

pub struct Visitor {
    pub backend: Arc<dyn Backend>,
    pub sidebar: Sidebar,
    shell: Mutex<Shell>,
    last_seen: Mutex<Instant>,
}

impl Visitor {
    /// Must be called inside a Tokio runtime (starts the session listener).
    #[must_use]
    pub fn new(backend: Arc<dyn Backend>, config: &AppConfig) -> Self {
        let sidebar = Sidebar::spawn(backend.clone(), config.sidebar);
        Self { backend, sidebar, shell: Mutex::new(Shell::default()), last_seen: Mutex::new(Instant::now()) }
    }

    pub fn touch(&self) {
        *self.last_seen.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }

    #[must_use]
    pub fn idle_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(*self.last_seen.lock().unwrap_or_else(PoisonError::into_inner))
    }

    #[must_use]
    pub fn shell(&self) -> Shell {
        *self.shell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply `f` to the shell and return the result.
    pub fn update_shell(&self, f: impl FnOnce(&mut Shell)) -> Shell {
        let mut shell = self.shell.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut shell);
        *shell
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Creates one isolated backend per visitor.
    pub backends: BackendFactory,
    pub visitors: Arc<RwLock<HashMap<String, Arc<Visitor>>>>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, backends: BackendFactory) -> Self {
        Self { config: Arc::new(config), backends, visitors: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Look up a live visitor without creating one.
    pub async fn known_visitor(&self, token: Option<&str>) -> Option<Arc<Visitor>> {
        let token = token.filter(|t| !t.is_empty())?;
        let visitor = self.visitors.read().await.get(token).cloned()?;
        visitor.touch();
        Some(visitor)
    }

    /// Look up the visitor for `token`, creating a new one when the token is
    /// missing or unknown. Returns the token, the visitor, and whether it was
    /// created by this call.
    pub async fn visitor(&self, token: Option<&str>) -> (String, Arc<Visitor>, bool) {
        if let Some(token) = token {
            if let Some(visitor) = self.known_visitor(Some(token)).await {
                return (token.to_owned(), visitor, false);
            }
        }

        let token = generate_token();
        let visitor = Arc::new(Visitor::new((self.backends)(), &self.config));
        self.visitors
            .write()
            .await
            .insert(token.clone(), visitor.clone());
        tracing::debug!("new visitor");
        (token, visitor, true)
    }

    /// Drop visitors unseen for longer than `idle`. Returns how many went.
    pub async fn evict_idle(&self, idle: Duration) -> usize {
        let now = Instant::now();
        let mut visitors = self.visitors.write().await;
        let before = visitors.len();
        visitors.retain(|_, v| v.idle_for(now) <= idle);
        before - visitors.len()
    }
}

/// Generate a random 32-byte hex visitor token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Today's date in UTC, used for date validation.
#[must_use]
pub fn today() -> time::Date {
    time::OffsetDateTime::now_utc().date()
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
