//! Auth routes — the sidebar's login/sign-up form and account panel.
//!
//! Every handler answers with a fresh [`SidebarSnapshot`] taken after the
//! session listener has caught up, so the browser renders one consistent
//! state per request.

use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{KnownVisit, Visit};
use crate::services::sidebar::{AuthForm, AuthMode, SidebarSnapshot};
use crate::state::{self, Visitor};

type SnapshotResponse = (CookieJar, Json<SidebarSnapshot>);

async fn settled_snapshot(visitor: &Visitor) -> SidebarSnapshot {
    if !visitor.sidebar.catch_up().await {
        tracing::warn!("auth listener did not settle in time");
    }
    visitor.sidebar.snapshot()
}

/// `GET /api/auth/state` — current sidebar state. Unknown visitors get the
/// signed-out form without being registered.
pub async fn auth_state(KnownVisit(visitor): KnownVisit) -> Json<SidebarSnapshot> {
    match visitor {
        Some(visitor) => Json(settled_snapshot(&visitor).await),
        None => Json(SidebarSnapshot::signed_out()),
    }
}

/// `POST /api/auth/login` — password sign-in.
pub async fn login(visit: Visit, Json(form): Json<AuthForm>) -> SnapshotResponse {
    visit.visitor.sidebar.submit_login(form).await;
    let snapshot = settled_snapshot(&visit.visitor).await;
    (visit.jar, Json(snapshot))
}

/// `POST /api/auth/signup` — create an account and its profile.
pub async fn signup(visit: Visit, Json(form): Json<AuthForm>) -> SnapshotResponse {
    visit
        .visitor
        .sidebar
        .submit_signup(form, state::today())
        .await;
    let snapshot = settled_snapshot(&visit.visitor).await;
    (visit.jar, Json(snapshot))
}

/// `POST /api/auth/logout` — end the provider session.
pub async fn logout(visit: Visit) -> SnapshotResponse {
    visit.visitor.sidebar.sign_out().await;
    let snapshot = settled_snapshot(&visit.visitor).await;
    (visit.jar, Json(snapshot))
}

#[derive(Deserialize)]
pub struct ModeBody {
    pub mode: AuthMode,
}

/// `POST /api/auth/mode` — toggle between login and sign-up.
pub async fn mode(visit: Visit, Json(body): Json<ModeBody>) -> SnapshotResponse {
    visit.visitor.sidebar.set_mode(body.mode);
    let snapshot = settled_snapshot(&visit.visitor).await;
    (visit.jar, Json(snapshot))
}

/// `POST /api/auth/input` — store edited inputs; clears any feedback.
pub async fn input(visit: Visit, Json(form): Json<AuthForm>) -> SnapshotResponse {
    visit.visitor.sidebar.edit_form(form);
    let snapshot = settled_snapshot(&visit.visitor).await;
    (visit.jar, Json(snapshot))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
