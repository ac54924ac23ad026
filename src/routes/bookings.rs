//! Booking routes — live price quote and submission.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use super::Visit;
use crate::services::booking::{self, BookingDraft, BookingError, BookingField, FieldErrors};
use crate::state::{self, AppState};
use crate::supabase::ErrorCode;

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    /// `None` while bag count, weight, or tier is unset; submit stays disabled.
    pub estimated_cost: Option<u32>,
}

/// `POST /api/bookings/quote` — price for the current draft.
pub async fn quote(Json(draft): Json<BookingDraft>) -> Json<QuoteResponse> {
    Json(QuoteResponse { estimated_cost: draft.quote() })
}

#[derive(Debug, Serialize)]
pub struct BookingFailure {
    pub code: &'static str,
    pub message: String,
    pub errors: FieldErrors,
    /// First invalid field, for focus and scroll.
    pub focus: Option<BookingField>,
    pub auth_panel_open: bool,
}

/// `POST /api/bookings` — validate and insert a booking for the signed-in visitor.
pub async fn create(State(state): State<AppState>, visit: Visit, Json(draft): Json<BookingDraft>) -> Response {
    let result = booking::submit_booking(visit.visitor.backend.as_ref(), &draft, &state.config.booking, state::today()).await;

    match result {
        Ok(receipt) => (StatusCode::CREATED, visit.jar, Json(receipt)).into_response(),
        Err(err) => {
            if matches!(err, BookingError::NotSignedIn) {
                visit.visitor.update_shell(|shell| shell.request_auth_panel());
            }
            if let BookingError::Backend(e) = &err {
                tracing::error!(error = %e, status = ?e.status, "booking submission failed");
            }
            let status = booking_error_to_status(&err);
            let errors = match &err {
                BookingError::Invalid(errors) => errors.clone(),
                _ => FieldErrors::new(),
            };
            let failure = BookingFailure {
                code: err.error_code(),
                message: err.user_message(),
                focus: booking::focus_field(&errors),
                errors,
                auth_panel_open: visit.visitor.shell().auth_panel_open,
            };
            (status, visit.jar, Json(failure)).into_response()
        }
    }
}

pub(crate) fn booking_error_to_status(err: &BookingError) -> StatusCode {
    match err {
        BookingError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BookingError::NotSignedIn => StatusCode::UNAUTHORIZED,
        BookingError::Backend(e) => match e.code {
            ErrorCode::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorCode::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::DuplicateKey => StatusCode::CONFLICT,
            ErrorCode::NotNullViolation | ErrorCode::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::BAD_GATEWAY,
        },
    }
}

#[cfg(test)]
#[path = "bookings_test.rs"]
mod tests;
