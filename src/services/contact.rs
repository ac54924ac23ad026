//! Contact form. One-way submission into the public `Contacts` table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::feedback::Feedback;
use super::validate;
use crate::supabase::{BackendError, TableBackend};

pub const CONTACTS_TABLE: &str = "Contacts";

pub const MSG_SENT: &str = "Thanks for reaching out! We'll get back to you soon.";
pub const MSG_SEND_FAILED: &str = "Sorry, we couldn't send your message. Please try again later.";
pub const MSG_FIX_FIELDS: &str = "Please fill in the required fields.";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactField {
    Name,
    Email,
    Phone,
    Message,
}

pub type ContactErrors = BTreeMap<ContactField, &'static str>;

#[must_use]
pub fn validate(draft: &ContactDraft) -> ContactErrors {
    let mut errors = ContactErrors::new();
    if draft.name.trim().is_empty() {
        errors.insert(ContactField::Name, "Name is required.");
    }
    if validate::normalize_email(&draft.email).is_none() {
        errors.insert(ContactField::Email, "Please enter a valid email address.");
    }
    if !draft.phone.trim().is_empty() && !validate::is_digits(&draft.phone, 10) {
        errors.insert(ContactField::Phone, "Phone number must be 10 digits.");
    }
    if draft.message.trim().is_empty() {
        errors.insert(ContactField::Message, "Message is required.");
    }
    errors
}

#[derive(Debug, Serialize)]
struct ContactRow<'a> {
    name: &'a str,
    email: String,
    phone: Option<&'a str>,
    subject: Option<&'a str>,
    message: &'a str,
}

fn optional(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

/// State of the contact form after a submission attempt.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactForm {
    pub draft: ContactDraft,
    pub errors: ContactErrors,
    pub feedback: Option<Feedback>,
}

impl ContactForm {
    #[must_use]
    pub fn new(draft: ContactDraft) -> Self {
        Self { draft, ..Self::default() }
    }

    /// Validate and insert one row. Returns `true` when the message was sent.
    pub async fn submit<B>(&mut self, backend: &B) -> bool
    where
        B: TableBackend + ?Sized,
    {
        self.errors = validate(&self.draft);
        if !self.errors.is_empty() {
            self.feedback = Some(Feedback::error(MSG_FIX_FIELDS));
            return false;
        }

        match insert_contact(backend, &self.draft).await {
            Ok(()) => {
                info!("contact message received");
                self.draft = ContactDraft::default();
                self.feedback = Some(Feedback::success(MSG_SENT));
                true
            }
            Err(e) => {
                warn!(error = %e, "contact insert failed");
                self.feedback = Some(Feedback::error(MSG_SEND_FAILED));
                false
            }
        }
    }
}

async fn insert_contact<B>(backend: &B, draft: &ContactDraft) -> Result<(), BackendError>
where
    B: TableBackend + ?Sized,
{
    let row = ContactRow {
        name: draft.name.trim(),
        email: validate::normalize_email(&draft.email).unwrap_or_default(),
        phone: optional(&draft.phone),
        subject: optional(&draft.subject),
        message: draft.message.trim(),
    };
    let row = serde_json::to_value(row).map_err(BackendError::unexpected)?;
    backend.insert(CONTACTS_TABLE, row).await.map(|_| ())
}

#[cfg(test)]
#[path = "contact_test.rs"]
mod tests;
