//! Application configuration parsed from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` loads `.env` (if present) and then builds one [`AppConfig`]. The
//! product decisions that differ between deployments (what happens after
//! sign-up, whether a missing profile is retried or shown) are config
//! points here rather than code paths.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::services::booking::BookingConfig;
use crate::services::sidebar::{SidebarConfig, SignupCompletion};
use crate::supabase::config::SupabaseConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_VISITOR_IDLE_SECS: u64 = 1800;
pub const DEFAULT_VISITOR_SWEEP_SECS: u64 = 60;
pub const DEFAULT_SETTLE_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_PROFILE_RETRY_DELAY_MS: u64 = 500;
pub const DEFAULT_SUCCESS_OVERLAY_MS: u64 = 3000;
pub const DEFAULT_BOOKING_STATUS: &str = "Pending";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env var {var}")]
    Missing { var: &'static str },
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Parse `var` with `FromStr`, falling back to `default` when unset.
pub(crate) fn parse_or<T, F>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
    }
}

/// Parse a boolean flag (`1/true/yes/on`, `0/false/no/off`).
pub(crate) fn parse_bool_or<F>(lookup: &F, var: &'static str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => Ok(default),
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisitorConfig {
    /// Visitors unseen for this long are dropped.
    pub idle: Duration,
    /// How often the sweeper runs.
    pub sweep_every: Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub website_dir: PathBuf,
    pub supabase: SupabaseConfig,
    pub sidebar: SidebarConfig,
    pub booking: BookingConfig,
    pub visitors: VisitorConfig,
    /// Mark the visitor cookie `Secure`.
    pub cookie_secure: bool,
}

impl AppConfig {
    /// Build the full config from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the full config from an arbitrary key lookup.
    ///
    /// - `PORT`: default 3000
    /// - `WEBSITE_DIR`: default `./website`
    /// - `SIGNUP_COMPLETION`: `return_to_login` (default) or `sign_in`
    /// - `PROFILE_FETCH_RETRIES`: default 0
    /// - `PROFILE_RETRY_DELAY_MS`: default 500
    /// - `SURFACE_MISSING_PROFILE`: default false
    /// - `BOOKING_DEFAULT_STATUS`: default `Pending`
    /// - `BOOKING_SUCCESS_OVERLAY_MS`: default 3000
    /// - `VISITOR_IDLE_SECS`: default 1800
    /// - `VISITOR_SWEEP_SECS`: default 60, must be positive
    /// - `COOKIE_SECURE`: default false
    /// - `AUTH_SETTLE_TIMEOUT_MS`: default 2000
    ///
    /// # Errors
    ///
    /// Returns an error if a required key is missing or a value fails to parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let supabase = SupabaseConfig::from_lookup(&lookup)?;

        let signup_completion = match lookup("SIGNUP_COMPLETION").as_deref().map(str::trim) {
            None | Some("" | "return_to_login") => SignupCompletion::ReturnToLogin,
            Some("sign_in") => SignupCompletion::SignIn,
            Some(other) => {
                return Err(ConfigError::Invalid { var: "SIGNUP_COMPLETION", value: other.to_owned() });
            }
        };
        let sidebar = SidebarConfig {
            signup_completion,
            profile_fetch_retries: parse_or(&lookup, "PROFILE_FETCH_RETRIES", 0)?,
            profile_retry_delay: Duration::from_millis(parse_or(
                &lookup,
                "PROFILE_RETRY_DELAY_MS",
                DEFAULT_PROFILE_RETRY_DELAY_MS,
            )?),
            surface_missing_profile: parse_bool_or(&lookup, "SURFACE_MISSING_PROFILE", false)?,
            settle_timeout: Duration::from_millis(parse_or(
                &lookup,
                "AUTH_SETTLE_TIMEOUT_MS",
                DEFAULT_SETTLE_TIMEOUT_MS,
            )?),
        };

        let booking = BookingConfig {
            default_status: lookup("BOOKING_DEFAULT_STATUS")
                .map(|s| s.trim().to_owned())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BOOKING_STATUS.to_owned()),
            success_overlay: Duration::from_millis(parse_or(
                &lookup,
                "BOOKING_SUCCESS_OVERLAY_MS",
                DEFAULT_SUCCESS_OVERLAY_MS,
            )?),
        };

        let sweep_secs = parse_or(&lookup, "VISITOR_SWEEP_SECS", DEFAULT_VISITOR_SWEEP_SECS)?;
        if sweep_secs == 0 {
            return Err(ConfigError::Invalid { var: "VISITOR_SWEEP_SECS", value: "0".into() });
        }
        let visitors = VisitorConfig {
            idle: Duration::from_secs(parse_or(&lookup, "VISITOR_IDLE_SECS", DEFAULT_VISITOR_IDLE_SECS)?),
            sweep_every: Duration::from_secs(sweep_secs),
        };

        Ok(Self {
            port: parse_or(&lookup, "PORT", DEFAULT_PORT)?,
            website_dir: lookup("WEBSITE_DIR").map_or_else(|| PathBuf::from("website"), PathBuf::from),
            supabase,
            sidebar,
            booking,
            visitors,
            cookie_secure: parse_bool_or(&lookup, "COOKIE_SECURE", false)?,
        })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
