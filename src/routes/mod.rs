//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api` and serves the static site
//! from `WEBSITE_DIR` for every other path. Handlers resolve the calling
//! visitor from the `bagease_visitor` cookie via [`Visit`], or via
//! [`KnownVisit`] on read-only routes that must not create one.

pub mod auth;
pub mod bookings;
pub mod contact;
pub mod shell;

use std::convert::Infallible;
use std::sync::Arc;

use axum::Router;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::routing::{get, post};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::{AppState, VISITOR_COOKIE, Visitor};

// =============================================================================
// VISITOR EXTRACTOR
// =============================================================================

/// The calling visitor, plus a cookie jar that carries the visitor cookie
/// when the visitor was just created. Handlers must return `jar`.
pub struct Visit {
    pub visitor: Arc<Visitor>,
    pub jar: CookieJar,
}

impl Visit {
    pub async fn resolve(state: &AppState, jar: CookieJar) -> Self {
        let token = jar.get(VISITOR_COOKIE).map(Cookie::value);
        let (token, visitor, created) = state.visitor(token).await;
        let jar = if created {
            jar.add(
                Cookie::build((VISITOR_COOKIE, token))
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(state.config.cookie_secure),
            )
        } else {
            jar
        };
        Self { visitor, jar }
    }
}

impl<S> FromRequestParts<S> for Visit
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        Ok(Self::resolve(&app_state, jar).await)
    }
}

/// The calling visitor if the cookie names a live one. Never creates a
/// visitor, so cookieless reads stay free.
pub struct KnownVisit(pub Option<Arc<Visitor>>);

impl KnownVisit {
    pub async fn resolve(state: &AppState, jar: &CookieJar) -> Self {
        let token = jar.get(VISITOR_COOKIE).map(Cookie::value);
        Self(state.known_visitor(token).await)
    }
}

impl<S> FromRequestParts<S> for KnownVisit
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        Ok(Self::resolve(&app_state, &jar).await)
    }
}

// =============================================================================
// ROUTER
// =============================================================================

fn api_routes(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/state", get(auth::auth_state))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/mode", post(auth::mode))
        .route("/api/auth/input", post(auth::input))
        .route("/api/bookings/quote", post(bookings::quote))
        .route("/api/bookings", post(bookings::create))
        .route("/api/contact", post(contact::submit))
        .route("/api/shell", get(shell::get_shell))
        .route("/api/shell/section", post(shell::navigate))
        .route("/api/shell/auth-panel", post(shell::auth_panel))
        .route("/healthz", get(healthz))
        .layer(cors)
        .with_state(state)
}

/// API routes plus the static site as the fallback.
pub fn app(state: AppState) -> Router {
    let website = ServeDir::new(&state.config.website_dir).append_index_html_on_directories(true);
    api_routes(state)
        .fallback_service(website)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
