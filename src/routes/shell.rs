//! Shell routes — active section and the auth panel toggle.

use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use super::{KnownVisit, Visit};
use crate::services::shell::{Section, Shell};

type ShellResponse = (CookieJar, Json<Shell>);

/// `GET /api/shell` — unknown visitors get the default shell.
pub async fn get_shell(KnownVisit(visitor): KnownVisit) -> Json<Shell> {
    Json(visitor.map_or_else(Shell::default, |v| v.shell()))
}

#[derive(Deserialize)]
pub struct SectionBody {
    pub section: Section,
}

/// `POST /api/shell/section` — navigate to a section.
pub async fn navigate(visit: Visit, Json(body): Json<SectionBody>) -> ShellResponse {
    let shell = visit.visitor.update_shell(|shell| shell.navigate(body.section));
    (visit.jar, Json(shell))
}

#[derive(Deserialize)]
pub struct AuthPanelBody {
    pub open: bool,
}

/// `POST /api/shell/auth-panel` — open or close the sidebar auth panel.
pub async fn auth_panel(visit: Visit, Json(body): Json<AuthPanelBody>) -> ShellResponse {
    let shell = visit.visitor.update_shell(|shell| {
        if body.open {
            shell.request_auth_panel();
        } else {
            shell.close_auth_panel();
        }
    });
    (visit.jar, Json(shell))
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
