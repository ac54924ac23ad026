//! Provider error classification.
//!
//! The auth service reports failures as `{error_code, msg}` (newer) or
//! `{error, error_description}` (older); the table API reports Postgres
//! SQLSTATE codes as `{code, message}`. Structured codes are preferred and
//! message text is only consulted when no code is present.

use serde::Deserialize;

use super::types::{BackendError, ErrorCode};

#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl AuthErrorBody {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

#[derive(Debug, Default, Deserialize)]
struct DataErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Classify a non-success response from the auth endpoints.
#[must_use]
pub fn classify_auth_error(status: u16, body: &str) -> BackendError {
    let parsed: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .text()
        .map_or_else(|| fallback_message(status, body), str::to_owned);

    let code = parsed
        .error_code
        .as_deref()
        .and_then(auth_code_from_error_code)
        .or_else(|| auth_code_from_message(&message))
        .unwrap_or(if status == 429 { ErrorCode::RateLimited } else { ErrorCode::Provider });

    BackendError::new(code, message).with_status(status)
}

/// Classify a non-success response from the table endpoints.
#[must_use]
pub fn classify_data_error(status: u16, body: &str) -> BackendError {
    let parsed: DataErrorBody = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .message
        .clone()
        .unwrap_or_else(|| fallback_message(status, body));

    let code = parsed
        .code
        .as_deref()
        .and_then(data_code_from_sqlstate)
        .or_else(|| data_code_from_message(&message))
        .unwrap_or(match status {
            401 | 403 => ErrorCode::PermissionDenied,
            429 => ErrorCode::RateLimited,
            _ => ErrorCode::Provider,
        });

    BackendError::new(code, message).with_status(status)
}

fn fallback_message(status: u16, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() { format!("request failed with status {status}") } else { trimmed.to_owned() }
}

fn auth_code_from_error_code(raw: &str) -> Option<ErrorCode> {
    match raw {
        "invalid_credentials" | "invalid_grant" => Some(ErrorCode::InvalidCredentials),
        "user_already_exists" | "email_exists" => Some(ErrorCode::EmailTaken),
        "weak_password" => Some(ErrorCode::WeakPassword),
        "email_address_invalid" => Some(ErrorCode::InvalidEmail),
        "over_request_rate_limit" | "over_email_send_rate_limit" => Some(ErrorCode::RateLimited),
        "email_not_confirmed" => Some(ErrorCode::EmailNotConfirmed),
        _ => None,
    }
}

fn auth_code_from_message(message: &str) -> Option<ErrorCode> {
    let lower = message.to_ascii_lowercase();
    if lower.contains("invalid login credentials") {
        Some(ErrorCode::InvalidCredentials)
    } else if lower.contains("already registered") || lower.contains("already exists") {
        Some(ErrorCode::EmailTaken)
    } else if lower.contains("password should be") || lower.contains("weak password") {
        Some(ErrorCode::WeakPassword)
    } else if lower.contains("email not confirmed") {
        Some(ErrorCode::EmailNotConfirmed)
    } else if lower.contains("unable to validate email") || (lower.contains("email") && lower.contains("invalid")) {
        Some(ErrorCode::InvalidEmail)
    } else if lower.contains("rate limit") || lower.contains("too many requests") {
        Some(ErrorCode::RateLimited)
    } else {
        None
    }
}

fn data_code_from_sqlstate(raw: &str) -> Option<ErrorCode> {
    match raw {
        "23505" => Some(ErrorCode::DuplicateKey),
        "23502" => Some(ErrorCode::NotNullViolation),
        "22P02" | "22001" | "22003" | "22007" | "22008" | "23514" => Some(ErrorCode::InvalidInput),
        "42501" => Some(ErrorCode::PermissionDenied),
        _ => None,
    }
}

fn data_code_from_message(message: &str) -> Option<ErrorCode> {
    let lower = message.to_ascii_lowercase();
    if lower.contains("duplicate key") {
        Some(ErrorCode::DuplicateKey)
    } else if lower.contains("not-null constraint") {
        Some(ErrorCode::NotNullViolation)
    } else if lower.contains("invalid input syntax") || lower.contains("out of range") {
        Some(ErrorCode::InvalidInput)
    } else if lower.contains("row-level security") || lower.contains("permission denied") {
        Some(ErrorCode::PermissionDenied)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "classify_test.rs"]
mod tests;
