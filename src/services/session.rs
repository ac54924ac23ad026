//! Session mirror — the sidebar's view of the provider session.
//!
//! ARCHITECTURE
//! ============
//! `SessionMirror` is a pure state machine fed with whatever session the
//! backend reports. It decides when a profile fetch is needed and hands out
//! a [`ProfileRequest`] ticket for it. The async driver (the sidebar
//! listener) performs the fetch and offers the result back.
//!
//! INVARIANTS
//! ==========
//! Only the most recent ticket may write `profile`. Any session change to a
//! different user, or to no user, invalidates every outstanding ticket, so a
//! fetch started for user A can never land on user B's panel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::supabase::{BackendError, Session, TableBackend, User};

pub const PROFILES_TABLE: &str = "profiles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// Application-level record extending a user. Keyed by the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    #[serde(default)]
    pub national_id: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Ticket identifying one profile fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileRequest {
    pub seq: u64,
    pub user_id: Uuid,
}

/// What a session update changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing observable changed.
    Unchanged,
    /// Same user, new tokens.
    Refreshed,
    /// A (different) user is now present; fetch their profile.
    SignedIn(ProfileRequest),
    /// No user any more.
    SignedOut,
}

#[derive(Debug, Clone)]
pub struct SessionMirror {
    phase: Phase,
    user: Option<User>,
    profile: Option<Profile>,
    request_seq: u64,
}

impl SessionMirror {
    #[must_use]
    pub fn new() -> Self {
        Self { phase: Phase::Initializing, user: None, profile: None, request_seq: 0 }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Mirror the backend's current session.
    pub fn apply_session(&mut self, session: Option<&Session>) -> Transition {
        match session {
            Some(s) => {
                let same_user = self.phase == Phase::Authenticated && self.user.as_ref().is_some_and(|u| u.id == s.user.id);
                if same_user {
                    self.user = Some(s.user.clone());
                    return Transition::Refreshed;
                }
                self.phase = Phase::Authenticated;
                self.user = Some(s.user.clone());
                self.profile = None;
                Transition::SignedIn(self.next_request(s.user.id))
            }
            None => {
                let was = self.phase;
                self.request_seq += 1;
                self.phase = Phase::Unauthenticated;
                self.user = None;
                self.profile = None;
                if was == Phase::Unauthenticated { Transition::Unchanged } else { Transition::SignedOut }
            }
        }
    }

    /// Issue a fresh ticket for the current user, superseding older ones.
    pub fn refetch(&mut self) -> Option<ProfileRequest> {
        if self.phase != Phase::Authenticated {
            return None;
        }
        let user_id = self.user.as_ref()?.id;
        Some(self.next_request(user_id))
    }

    /// Offer a fetch result. Returns `false` (and changes nothing) when the
    /// ticket has been superseded.
    pub fn apply_profile(&mut self, request: ProfileRequest, profile: Option<Profile>) -> bool {
        if !self.is_current(request) {
            return false;
        }
        self.profile = profile;
        true
    }

    #[must_use]
    pub fn is_current(&self, request: ProfileRequest) -> bool {
        request.seq == self.request_seq
            && self.phase == Phase::Authenticated
            && self.user.as_ref().is_some_and(|u| u.id == request.user_id)
    }

    fn next_request(&mut self, user_id: Uuid) -> ProfileRequest {
        self.request_seq += 1;
        ProfileRequest { seq: self.request_seq, user_id }
    }
}

impl Default for SessionMirror {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a user's profile row, if one exists.
///
/// # Errors
///
/// Returns the backend error, or `Unexpected` if the row does not decode.
pub async fn fetch_profile<B>(backend: &B, user_id: Uuid) -> Result<Option<Profile>, BackendError>
where
    B: TableBackend + ?Sized,
{
    let rows = backend
        .select_eq(PROFILES_TABLE, "id", &user_id.to_string())
        .await?;
    let Some(row) = rows.into_iter().next() else {
        return Ok(None);
    };
    serde_json::from_value(row)
        .map(Some)
        .map_err(|e| BackendError::unexpected(format!("profile row: {e}")))
}

/// Insert the profile row created at sign-up.
///
/// # Errors
///
/// Returns the classified backend error.
pub async fn insert_profile<B>(backend: &B, profile: &Profile) -> Result<(), BackendError>
where
    B: TableBackend + ?Sized,
{
    let row = serde_json::to_value(profile).map_err(BackendError::unexpected)?;
    backend.insert(PROFILES_TABLE, row).await.map(|_| ())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
