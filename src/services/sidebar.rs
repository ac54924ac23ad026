//! Sidebar controller — auth form, account panel, and the session listener.
//!
//! ARCHITECTURE
//! ============
//! Each visitor owns one `Sidebar`. A background listener task mirrors the
//! backend's auth-event stream into [`SessionMirror`] and fetches profiles;
//! request handlers drive the form through `submit_login`, `submit_signup`,
//! and `sign_out`. Form actions never flip the phase themselves: they call
//! the backend and let the listener observe the resulting session change.
//!
//! CONCURRENCY
//! ===========
//! State sits behind a `std::sync::Mutex` that is never held across an
//! `.await`. Dropping the sidebar aborts the listener, which is the
//! unsubscribe.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::feedback::{self, Feedback, FollowUp};
use super::session::{self, Phase, Profile, ProfileRequest, SessionMirror, Transition};
use super::validate;
use crate::supabase::{AuthEvent, Backend, Session, User};

pub const MSG_MISSING_CREDENTIALS: &str = "Please enter your email and password.";
pub const MSG_NAME_REQUIRED: &str = "Full name is required.";
pub const MSG_EMAIL_REQUIRED: &str = "Email is required.";
pub const MSG_NATIONAL_ID_FORMAT: &str = "National ID must be exactly 12 digits.";
pub const MSG_PASSWORD_LENGTH: &str = "Password must be at least 6 characters long.";
pub const MSG_PHONE_FORMAT: &str = "Phone number must be 10 digits.";
pub const MSG_DOB_FORMAT: &str = "Date of birth must be a past date (YYYY-MM-DD).";
pub const MSG_CHECK_EMAIL: &str = "Account created! Check your email to confirm it, then log in.";
pub const MSG_ACCOUNT_READY: &str = "Account created. You're now signed in.";
pub const MSG_MISSING_PROFILE: &str = "We couldn't load your profile details yet.";

const MIN_PASSWORD_LEN: usize = 6;

// =============================================================================
// CONFIG
// =============================================================================

/// What to do when sign-up succeeds but the provider returns no session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupCompletion {
    /// Show a confirmation message and return to the login form.
    ReturnToLogin,
    /// Try a password sign-in straight away, falling back to the login form.
    SignIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebarConfig {
    pub signup_completion: SignupCompletion,
    /// Extra attempts when a profile fetch finds nothing or fails transiently.
    pub profile_fetch_retries: u32,
    pub profile_retry_delay: Duration,
    /// Show an info message when no profile could be loaded.
    pub surface_missing_profile: bool,
    /// Upper bound for waiting on the session listener to catch up.
    pub settle_timeout: Duration,
}

impl Default for SidebarConfig {
    fn default() -> Self {
        Self {
            signup_completion: SignupCompletion::ReturnToLogin,
            profile_fetch_retries: 0,
            profile_retry_delay: Duration::from_millis(500),
            surface_missing_profile: false,
            settle_timeout: Duration::from_secs(2),
        }
    }
}

// =============================================================================
// FORM STATE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    Login,
    Signup,
}

/// Controlled inputs of the login/sign-up form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AuthForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub national_id: String,
}

impl AuthForm {
    fn email_only(email: &str) -> Self {
        Self { email: email.to_owned(), ..Self::default() }
    }
}

/// Check sign-up inputs before any network call. Returns the first problem.
#[must_use]
pub fn validate_signup(form: &AuthForm, today: time::Date) -> Option<&'static str> {
    if form.full_name.trim().is_empty() {
        return Some(MSG_NAME_REQUIRED);
    }
    if form.email.trim().is_empty() {
        return Some(MSG_EMAIL_REQUIRED);
    }
    if !validate::is_digits(&form.national_id, 12) {
        return Some(MSG_NATIONAL_ID_FORMAT);
    }
    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Some(MSG_PASSWORD_LENGTH);
    }
    if !form.phone.trim().is_empty() && !validate::is_digits(&form.phone, 10) {
        return Some(MSG_PHONE_FORMAT);
    }
    if !form.date_of_birth.trim().is_empty() {
        match validate::parse_date(&form.date_of_birth) {
            Some(dob) if dob < today => {}
            _ => return Some(MSG_DOB_FORMAT),
        }
    }
    None
}

fn optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}

struct SidebarState {
    mirror: SessionMirror,
    mode: AuthMode,
    form: AuthForm,
    feedback: Option<Feedback>,
    /// A login, sign-up, or sign-out call is in flight.
    auth_loading: bool,
}

impl SidebarState {
    fn new() -> Self {
        Self {
            mirror: SessionMirror::new(),
            mode: AuthMode::Login,
            form: AuthForm::default(),
            feedback: None,
            auth_loading: false,
        }
    }

    fn reset_ephemeral(&mut self) {
        self.mode = AuthMode::Login;
        self.form = AuthForm::default();
        self.feedback = None;
    }
}

// =============================================================================
// SNAPSHOT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SidebarView {
    Loading,
    Login,
    Signup,
    Account,
}

/// Form inputs as rendered back to the browser. The password never leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuthFormView {
    pub email: String,
    pub full_name: String,
    pub phone: String,
    pub date_of_birth: String,
    pub national_id: String,
    pub has_password: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SidebarSnapshot {
    pub view: SidebarView,
    pub phase: Phase,
    pub mode: AuthMode,
    pub form: AuthFormView,
    pub feedback: Option<Feedback>,
    pub user: Option<User>,
    pub profile: Option<Profile>,
    pub auth_loading: bool,
}

impl SidebarSnapshot {
    /// What a browser without a live visitor sees: the empty login form.
    #[must_use]
    pub fn signed_out() -> Self {
        Self {
            view: SidebarView::Login,
            phase: Phase::Unauthenticated,
            mode: AuthMode::Login,
            form: AuthFormView::default(),
            feedback: None,
            user: None,
            profile: None,
            auth_loading: false,
        }
    }
}

// =============================================================================
// SIDEBAR
// =============================================================================

/// Everything the listener and profile fetches need, cheaply cloneable.
#[derive(Clone)]
struct Shared {
    backend: Arc<dyn Backend>,
    state: Arc<Mutex<SidebarState>>,
    config: SidebarConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SidebarState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_session(&self, session: Option<&Session>) {
        let transition = {
            let mut st = self.lock();
            let transition = st.mirror.apply_session(session);
            if transition == Transition::SignedOut {
                st.reset_ephemeral();
            }
            transition
        };
        match transition {
            Transition::SignedIn(request) => {
                info!(user_id = %request.user_id, "session authenticated");
                self.spawn_profile_fetch(request);
            }
            Transition::SignedOut => info!("session ended"),
            Transition::Refreshed => debug!("session refreshed"),
            Transition::Unchanged => {}
        }
    }

    fn spawn_profile_fetch(&self, request: ProfileRequest) {
        let shared = self.clone();
        tokio::spawn(async move { shared.fetch_profile(request).await });
    }

    async fn fetch_profile(&self, request: ProfileRequest) {
        let mut attempt = 0;
        let profile = loop {
            match session::fetch_profile(self.backend.as_ref(), request.user_id).await {
                Ok(Some(profile)) => break Some(profile),
                Ok(None) if attempt >= self.config.profile_fetch_retries => {
                    warn!(user_id = %request.user_id, "no profile row for user");
                    break None;
                }
                Err(e) if !e.retryable() || attempt >= self.config.profile_fetch_retries => {
                    warn!(user_id = %request.user_id, error = %e, "profile fetch failed");
                    break None;
                }
                Ok(None) => debug!(user_id = %request.user_id, attempt, "profile not found; retrying"),
                Err(e) => debug!(user_id = %request.user_id, attempt, error = %e, "profile fetch failed; retrying"),
            }
            attempt += 1;
            tokio::time::sleep(self.config.profile_retry_delay).await;
            if !self.lock().mirror.is_current(request) {
                debug!(user_id = %request.user_id, "profile request superseded during retry");
                return;
            }
        };

        let mut st = self.lock();
        let missing = profile.is_none();
        if !st.mirror.apply_profile(request, profile) {
            debug!(user_id = %request.user_id, "discarding stale profile response");
            return;
        }
        if missing && self.config.surface_missing_profile && st.feedback.is_none() {
            st.feedback = Some(Feedback::info(MSG_MISSING_PROFILE));
        }
    }
}

pub struct Sidebar {
    shared: Shared,
    /// Highest auth-event sequence the listener has applied; `None` until the
    /// initial session has been loaded.
    processed: watch::Receiver<Option<u64>>,
    listener: JoinHandle<()>,
}

impl Sidebar {
    /// Start the sidebar and its session listener. Must be called inside a
    /// Tokio runtime.
    #[must_use]
    pub fn spawn(backend: Arc<dyn Backend>, config: SidebarConfig) -> Self {
        let shared = Shared { backend, state: Arc::new(Mutex::new(SidebarState::new())), config };
        let (processed_tx, processed) = watch::channel(None);
        let events = shared.backend.subscribe();
        let listener = tokio::spawn(run_listener(shared.clone(), events, processed_tx));
        Self { shared, processed, listener }
    }

    /// Wait until the listener has applied every auth event emitted so far.
    /// Returns `false` on timeout.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let target = self.shared.backend.last_event_seq();
        let mut rx = self.processed.clone();
        matches!(
            tokio::time::timeout(timeout, rx.wait_for(|seen| seen.is_some_and(|s| s >= target))).await,
            Ok(Ok(_))
        )
    }

    /// [`Self::settle`] bounded by the configured settle timeout.
    pub async fn catch_up(&self) -> bool {
        self.settle(self.shared.config.settle_timeout).await
    }

    #[must_use]
    pub fn snapshot(&self) -> SidebarSnapshot {
        let st = self.shared.lock();
        let phase = st.mirror.phase();
        let view = match (phase, st.mode) {
            (Phase::Initializing, _) => SidebarView::Loading,
            (Phase::Authenticated, _) => SidebarView::Account,
            (Phase::Unauthenticated, AuthMode::Login) => SidebarView::Login,
            (Phase::Unauthenticated, AuthMode::Signup) => SidebarView::Signup,
        };
        SidebarSnapshot {
            view,
            phase,
            mode: st.mode,
            form: AuthFormView {
                email: st.form.email.clone(),
                full_name: st.form.full_name.clone(),
                phone: st.form.phone.clone(),
                date_of_birth: st.form.date_of_birth.clone(),
                national_id: st.form.national_id.clone(),
                has_password: !st.form.password.is_empty(),
            },
            feedback: st.feedback.clone(),
            user: st.mirror.user().cloned(),
            profile: st.mirror.profile().cloned(),
            auth_loading: st.auth_loading,
        }
    }

    /// Switch between login and sign-up. Clears the form and feedback.
    pub fn set_mode(&self, mode: AuthMode) {
        let mut st = self.shared.lock();
        if st.mode != mode {
            st.mode = mode;
            st.form = AuthForm::default();
            st.feedback = None;
        }
    }

    /// Replace the form inputs. Any edit clears the active feedback.
    pub fn edit_form(&self, form: AuthForm) {
        let mut st = self.shared.lock();
        st.form = form;
        st.feedback = None;
    }

    /// Log in with the given credentials.
    pub async fn submit_login(&self, form: AuthForm) {
        let (email, password) = {
            let mut st = self.shared.lock();
            if st.auth_loading {
                return;
            }
            st.mode = AuthMode::Login;
            st.form = form;
            st.feedback = None;
            let email = st.form.email.trim().to_owned();
            if email.is_empty() || st.form.password.is_empty() {
                st.feedback = Some(Feedback::error(MSG_MISSING_CREDENTIALS));
                return;
            }
            st.auth_loading = true;
            (email, st.form.password.clone())
        };

        let result = self
            .shared
            .backend
            .sign_in_with_password(&email, &password)
            .await;

        let mut st = self.shared.lock();
        st.auth_loading = false;
        match result {
            Ok(_) => st.form = AuthForm::default(),
            Err(e) => {
                info!(code = %e.code, "login rejected");
                let (message, follow_up) = feedback::for_login(&e);
                if follow_up == FollowUp::SuggestSignup {
                    st.mode = AuthMode::Signup;
                    st.form = AuthForm::email_only(&email);
                } else {
                    st.form.password.clear();
                }
                st.feedback = Some(message);
            }
        }
    }

    /// Create an account, then its profile row.
    pub async fn submit_signup(&self, form: AuthForm, today: time::Date) {
        let form = {
            let mut st = self.shared.lock();
            if st.auth_loading {
                return;
            }
            st.mode = AuthMode::Signup;
            st.form = form;
            st.feedback = None;
            if let Some(problem) = validate_signup(&st.form, today) {
                st.feedback = Some(Feedback::error(problem));
                return;
            }
            st.auth_loading = true;
            st.form.clone()
        };

        let result = self.create_account(&form).await;

        let refetch = {
            let mut st = self.shared.lock();
            st.auth_loading = false;
            match result {
                Err(feedback) => {
                    st.feedback = Some(feedback);
                    false
                }
                Ok(SignupResult::SignedIn) => {
                    st.form = AuthForm::default();
                    st.feedback = Some(Feedback::success(MSG_ACCOUNT_READY));
                    true
                }
                Ok(SignupResult::AwaitingConfirmation) => {
                    st.mode = AuthMode::Login;
                    st.form = AuthForm::email_only(form.email.trim());
                    st.feedback = Some(Feedback::success(MSG_CHECK_EMAIL));
                    false
                }
            }
        };

        if refetch {
            self.refetch_profile().await;
        }
    }

    async fn create_account(&self, form: &AuthForm) -> Result<SignupResult, Feedback> {
        let backend = &self.shared.backend;
        let email = form.email.trim();
        let metadata = serde_json::json!({
            "full_name": form.full_name.trim(),
            "phone": optional(&form.phone),
        });

        let outcome = backend
            .sign_up(email, &form.password, metadata)
            .await
            .map_err(|e| {
                info!(code = %e.code, "sign-up rejected");
                feedback::for_auth(&e)
            })?;

        let profile = Profile {
            id: outcome.user.id,
            full_name: form.full_name.trim().to_owned(),
            phone: optional(&form.phone),
            date_of_birth: optional(&form.date_of_birth),
            national_id: optional(&form.national_id),
            email: Some(email.to_owned()),
        };
        session::insert_profile(backend.as_ref(), &profile)
            .await
            .map_err(|e| {
                warn!(user_id = %profile.id, code = %e.code, "profile insert failed");
                feedback::for_profile(&e)
            })?;

        if outcome.session.is_some() {
            return Ok(SignupResult::SignedIn);
        }
        if self.shared.config.signup_completion == SignupCompletion::SignIn {
            match backend.sign_in_with_password(email, &form.password).await {
                Ok(_) => return Ok(SignupResult::SignedIn),
                Err(e) => debug!(code = %e.code, "immediate sign-in after sign-up failed"),
            }
        }
        Ok(SignupResult::AwaitingConfirmation)
    }

    /// Re-request the profile once the listener has seen the new session.
    async fn refetch_profile(&self) {
        if !self.catch_up().await {
            debug!("listener still behind; refetching profile anyway");
        }
        let request = self.shared.lock().mirror.refetch();
        if let Some(request) = request {
            self.shared.spawn_profile_fetch(request);
        }
    }

    /// Sign out. The listener performs the reset once the provider reports it.
    pub async fn sign_out(&self) {
        {
            let mut st = self.shared.lock();
            if st.auth_loading {
                return;
            }
            st.auth_loading = true;
        }
        let result = self.shared.backend.sign_out().await;
        self.shared.lock().auth_loading = false;
        if let Err(e) = result {
            warn!(error = %e, "remote sign-out failed; local session already cleared");
        }
    }
}

impl Drop for Sidebar {
    fn drop(&mut self) {
        self.listener.abort();
    }
}

enum SignupResult {
    SignedIn,
    AwaitingConfirmation,
}

// =============================================================================
// LISTENER
// =============================================================================

async fn run_listener(
    shared: Shared,
    mut events: broadcast::Receiver<AuthEvent>,
    processed: watch::Sender<Option<u64>>,
) {
    resync(&shared, &processed).await;

    loop {
        match events.recv().await {
            Ok(event) => {
                debug!(seq = event.seq, kind = ?event.kind, "auth event");
                shared.apply_session(event.session.as_ref());
                processed.send_modify(|seen| *seen = Some(seen.map_or(event.seq, |s| s.max(event.seq))));
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "auth listener lagged; resyncing");
                resync(&shared, &processed).await;
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Load the current session directly and mark everything up to now applied.
async fn resync(shared: &Shared, processed: &watch::Sender<Option<u64>>) {
    let baseline = shared.backend.last_event_seq();
    let session = match shared.backend.get_session().await {
        Ok(session) => session,
        Err(e) => {
            warn!(error = %e, "session fetch failed; treating visitor as signed out");
            None
        }
    };
    shared.apply_session(session.as_ref());
    processed.send_modify(|seen| *seen = Some(seen.map_or(baseline, |s| s.max(baseline))));
}

#[cfg(test)]
#[path = "sidebar_test.rs"]
mod tests;
