//! In-memory backend for controller and route tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

use super::types::{AuthEvent, AuthEventKind, AuthEvents, BackendError, Session, SignUpOutcome, User};
use super::{AuthBackend, TableBackend};

pub struct MockBackend {
    events: AuthEvents,
    session: Mutex<Option<Session>>,
    /// Scripted result for the next sign-in; `None` signs in successfully.
    pub sign_in_result: Mutex<Option<Result<Session, BackendError>>>,
    /// Scripted result for the next sign-up; `None` succeeds without a session.
    pub sign_up_result: Mutex<Option<Result<SignUpOutcome, BackendError>>>,
    /// Error returned by the next insert, if any.
    pub insert_error: Mutex<Option<BackendError>>,
    /// Error returned by every select while set.
    pub select_error: Mutex<Option<BackendError>>,
    pub rows: Mutex<HashMap<String, Vec<Value>>>,
    pub calls: Mutex<Vec<String>>,
}

#[must_use]
pub fn user(email: &str) -> User {
    User { id: Uuid::new_v4(), email: Some(email.to_owned()), user_metadata: Value::Null }
}

#[must_use]
pub fn session_for(user: User) -> Session {
    Session { access_token: format!("at-{}", user.id), refresh_token: "rt".into(), expires_at: i64::MAX, user }
}

impl MockBackend {
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: AuthEvents::new(),
            session: Mutex::new(None),
            sign_in_result: Mutex::new(None),
            sign_up_result: Mutex::new(None),
            insert_error: Mutex::new(None),
            select_error: Mutex::new(None),
            rows: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Start with an existing session (no event emitted).
    #[must_use]
    pub fn signed_in(session: Session) -> Self {
        let mock = Self::new();
        *mock.session.lock().unwrap() = Some(session);
        mock
    }

    /// Simulate a provider-side session change.
    pub fn push_session(&self, session: Option<Session>) {
        let kind = if session.is_some() { AuthEventKind::SignedIn } else { AuthEventKind::SignedOut };
        self.session.lock().unwrap().clone_from(&session);
        self.events.emit(kind, session);
    }

    pub fn seed_row(&self, table: &str, row: Value) {
        self.rows
            .lock()
            .unwrap()
            .entry(table.to_owned())
            .or_default()
            .push(row);
    }

    #[must_use]
    pub fn rows_in(&self, table: &str) -> Vec<Value> {
        self.rows
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl AuthBackend for MockBackend {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        self.record("get_session");
        Ok(self.session.lock().unwrap().clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    fn last_event_seq(&self) -> u64 {
        self.events.last_seq()
    }

    async fn sign_in_with_password(&self, email: &str, _password: &str) -> Result<Session, BackendError> {
        self.record(format!("sign_in:{email}"));
        let scripted = self.sign_in_result.lock().unwrap().take();
        let session = match scripted {
            Some(Err(e)) => return Err(e),
            Some(Ok(session)) => session,
            None => session_for(user(email)),
        };
        self.push_session(Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(&self, email: &str, _password: &str, metadata: Value) -> Result<SignUpOutcome, BackendError> {
        self.record(format!("sign_up:{email}"));
        let scripted = self.sign_up_result.lock().unwrap().take();
        let outcome = match scripted {
            Some(Err(e)) => return Err(e),
            Some(Ok(outcome)) => outcome,
            None => {
                let mut u = user(email);
                u.user_metadata = metadata;
                SignUpOutcome { user: u, session: None }
            }
        };
        if let Some(session) = &outcome.session {
            self.push_session(Some(session.clone()));
        }
        Ok(outcome)
    }

    async fn sign_out(&self) -> Result<(), BackendError> {
        self.record("sign_out");
        if self.session.lock().unwrap().is_some() {
            self.push_session(None);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl TableBackend for MockBackend {
    async fn insert(&self, table: &str, row: Value) -> Result<Value, BackendError> {
        self.record(format!("insert:{table}"));
        if let Some(err) = self.insert_error.lock().unwrap().take() {
            return Err(err);
        }
        let mut stored = row;
        if let Value::Object(map) = &mut stored {
            map.entry("id").or_insert_with(|| Value::String(Uuid::new_v4().to_string()));
        }
        self.seed_row(table, stored.clone());
        Ok(stored)
    }

    async fn select_eq(&self, table: &str, column: &str, value: &str) -> Result<Vec<Value>, BackendError> {
        self.record(format!("select:{table}"));
        if let Some(err) = self.select_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .rows_in(table)
            .into_iter()
            .filter(|row| row.get(column).and_then(Value::as_str) == Some(value))
            .collect())
    }
}
