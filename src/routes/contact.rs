//! Contact route — public one-way message submission.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use crate::services::contact::{ContactDraft, ContactForm};
use crate::state::AppState;

/// `POST /api/contact` — insert one row into `Contacts` with the anon key.
///
/// Does not need a visitor: a fresh, unauthenticated backend is used.
pub async fn submit(State(state): State<AppState>, Json(draft): Json<ContactDraft>) -> (StatusCode, Json<ContactForm>) {
    let backend = (state.backends)();
    let mut form = ContactForm::new(draft);
    let sent = form.submit(backend.as_ref()).await;
    let status = if sent {
        StatusCode::CREATED
    } else if form.errors.is_empty() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(form))
}

#[cfg(test)]
#[path = "contact_test.rs"]
mod tests;
