use super::*;
use crate::services::feedback::FeedbackKind;
use crate::supabase::ErrorCode;
use crate::supabase::mock::MockBackend;

fn draft() -> ContactDraft {
    ContactDraft {
        name: "Ravi Kumar".into(),
        email: "ravi@example.com".into(),
        phone: String::new(),
        subject: "Lost tag".into(),
        message: "My bag tag came off, can you help?".into(),
    }
}

#[test]
fn validation_rules() {
    assert!(validate(&draft()).is_empty());

    let errors = validate(&ContactDraft::default());
    assert_eq!(
        errors.keys().copied().collect::<Vec<_>>(),
        vec![ContactField::Name, ContactField::Email, ContactField::Message]
    );

    let mut d = draft();
    d.phone = "12345".into();
    assert!(validate(&d).contains_key(&ContactField::Phone));
}

#[tokio::test]
async fn valid_submit_inserts_exactly_one_row() {
    let backend = MockBackend::new();
    let mut form = ContactForm::new(draft());

    assert!(form.submit(&backend).await);

    let rows = backend.rows_in(CONTACTS_TABLE);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["name"], "Ravi Kumar");
    assert_eq!(rows[0]["phone"], serde_json::Value::Null);
    assert_eq!(form.feedback, Some(Feedback::success(MSG_SENT)));
    assert_eq!(form.draft, ContactDraft::default());
}

#[tokio::test]
async fn provider_error_keeps_draft() {
    let backend = MockBackend::new();
    *backend.insert_error.lock().unwrap() = Some(BackendError::new(ErrorCode::PermissionDenied, "new row violates policy"));
    let mut form = ContactForm::new(draft());

    assert!(!form.submit(&backend).await);

    let feedback = form.feedback.unwrap();
    assert_eq!(feedback.kind, FeedbackKind::Error);
    assert_eq!(feedback.text, MSG_SEND_FAILED);
    assert_eq!(form.draft, draft());
    assert!(backend.rows_in(CONTACTS_TABLE).is_empty());
}

#[tokio::test]
async fn invalid_draft_is_not_sent() {
    let backend = MockBackend::new();
    let mut d = draft();
    d.message = "   ".into();
    let mut form = ContactForm::new(d);

    assert!(!form.submit(&backend).await);
    assert!(form.errors.contains_key(&ContactField::Message));
    assert!(backend.calls().is_empty());
}
