//! Field-level checks shared by the auth, booking, and contact forms.

use time::macros::format_description;
use time::{Date, Time};

/// Trimmed, lowercased email if it has the shape `local@domain.tld`.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || normalized.chars().any(char::is_whitespace) {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    let domain = parts[1];
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return None;
    };
    if host.is_empty() || tld.is_empty() || domain.starts_with('.') {
        return None;
    }
    Some(normalized)
}

/// Exactly `len` ASCII digits after trimming.
#[must_use]
pub fn is_digits(value: &str, len: usize) -> bool {
    let value = value.trim();
    value.len() == len && value.bytes().all(|b| b.is_ascii_digit())
}

/// Parse a `YYYY-MM-DD` date.
#[must_use]
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Parse an `HH:MM` 24-hour time.
#[must_use]
pub fn parse_time(value: &str) -> Option<Time> {
    Time::parse(value.trim(), format_description!("[hour]:[minute]")).ok()
}

#[cfg(test)]
#[path = "validate_test.rs"]
mod tests;
