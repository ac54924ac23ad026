//! User-facing feedback and the mapping from backend error codes to it.
//!
//! DESIGN
//! ======
//! Every mapping switches on [`ErrorCode`]; provider text is only shown for
//! [`ErrorCode::Provider`], where nothing better is known.

use serde::Serialize;

use crate::supabase::{BackendError, ErrorCode};

pub const MSG_INVALID_CREDENTIALS: &str =
    "We couldn't find an account with those details. Create one below to get started.";
pub const MSG_EMAIL_TAKEN: &str = "This email is already registered. Please log in instead.";
pub const MSG_WEAK_PASSWORD: &str = "Password must be at least 6 characters long.";
pub const MSG_INVALID_EMAIL: &str = "Please enter a valid email address.";
pub const MSG_RATE_LIMITED: &str = "Too many attempts. Please wait a moment and try again.";
pub const MSG_EMAIL_NOT_CONFIRMED: &str = "Please confirm your email address before logging in.";
pub const MSG_MISSING_PROFILE_FIELD: &str = "Please fill in all required profile fields.";
pub const MSG_DUPLICATE_PROFILE: &str = "A profile with these details already exists.";
pub const MSG_BAD_NATIONAL_ID: &str = "National ID must be a 12-digit number.";
pub const MSG_PERMISSION_DENIED: &str = "You don't have permission to do that. Please log in and try again.";
pub const MSG_UNEXPECTED: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Error,
    Info,
    Success,
}

/// A single transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub text: String,
}

impl Feedback {
    #[must_use]
    pub fn error(text: impl Into<String>) -> Self {
        Self { kind: FeedbackKind::Error, text: text.into() }
    }

    #[must_use]
    pub fn info(text: impl Into<String>) -> Self {
        Self { kind: FeedbackKind::Info, text: text.into() }
    }

    #[must_use]
    pub fn success(text: impl Into<String>) -> Self {
        Self { kind: FeedbackKind::Success, text: text.into() }
    }
}

/// Secondary effect a failed login asks the sidebar to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    None,
    /// Switch to sign-up, keeping only the email.
    SuggestSignup,
}

/// Map a sign-in failure.
#[must_use]
pub fn for_login(err: &BackendError) -> (Feedback, FollowUp) {
    match err.code {
        ErrorCode::InvalidCredentials => (Feedback::info(MSG_INVALID_CREDENTIALS), FollowUp::SuggestSignup),
        _ => (for_auth(err), FollowUp::None),
    }
}

/// Map a sign-up or generic auth failure.
#[must_use]
pub fn for_auth(err: &BackendError) -> Feedback {
    match err.code {
        ErrorCode::InvalidCredentials => Feedback::error("Invalid email or password."),
        ErrorCode::EmailTaken => Feedback::error(MSG_EMAIL_TAKEN),
        ErrorCode::WeakPassword => Feedback::error(MSG_WEAK_PASSWORD),
        ErrorCode::InvalidEmail => Feedback::error(MSG_INVALID_EMAIL),
        ErrorCode::RateLimited => Feedback::error(MSG_RATE_LIMITED),
        ErrorCode::EmailNotConfirmed => Feedback::info(MSG_EMAIL_NOT_CONFIRMED),
        _ => fallback(err),
    }
}

/// Map a failure inserting the profile row at sign-up.
#[must_use]
pub fn for_profile(err: &BackendError) -> Feedback {
    match err.code {
        ErrorCode::NotNullViolation => Feedback::error(MSG_MISSING_PROFILE_FIELD),
        ErrorCode::DuplicateKey => Feedback::error(MSG_DUPLICATE_PROFILE),
        ErrorCode::InvalidInput => Feedback::error(MSG_BAD_NATIONAL_ID),
        ErrorCode::PermissionDenied => Feedback::error(MSG_PERMISSION_DENIED),
        ErrorCode::RateLimited => Feedback::error(MSG_RATE_LIMITED),
        _ => fallback(err),
    }
}

fn fallback(err: &BackendError) -> Feedback {
    match err.code {
        ErrorCode::Provider if !err.message.trim().is_empty() => Feedback::error(err.message.clone()),
        _ => Feedback::error(MSG_UNEXPECTED),
    }
}

#[cfg(test)]
#[path = "feedback_test.rs"]
mod tests;
