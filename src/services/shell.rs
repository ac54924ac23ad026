//! Page shell state: which section is showing and whether the auth panel is
//! open. Controllers that need the visitor to log in call
//! [`Shell::request_auth_panel`] directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    #[default]
    Home,
    About,
    Services,
    Storage,
    Pickup,
    Delivery,
    Contact,
    Book,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Shell {
    pub active_section: Section,
    pub auth_panel_open: bool,
}

impl Shell {
    /// Show a section. Navigating closes the auth panel.
    pub fn navigate(&mut self, section: Section) {
        self.active_section = section;
        self.auth_panel_open = false;
    }

    pub fn request_auth_panel(&mut self) {
        self.auth_panel_open = true;
    }

    pub fn close_auth_panel(&mut self) {
        self.auth_panel_open = false;
    }
}

#[cfg(test)]
#[path = "shell_test.rs"]
mod tests;
