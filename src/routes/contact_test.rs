use std::sync::Arc;

use super::*;
use crate::services::contact::{CONTACTS_TABLE, MSG_SEND_FAILED};
use crate::state::test_helpers::test_app_state_with;
use crate::supabase::mock::MockBackend;
use crate::supabase::{BackendError, ErrorCode};

fn draft() -> ContactDraft {
    ContactDraft {
        name: "Ravi".into(),
        email: "ravi@example.com".into(),
        message: "Do you store bags overnight?".into(),
        ..ContactDraft::default()
    }
}

#[tokio::test]
async fn message_is_stored() {
    let backend = Arc::new(MockBackend::new());
    let state = test_app_state_with(backend.clone());
    let (status, Json(form)) = submit(State(state), Json(draft())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(form.draft, ContactDraft::default());
    assert_eq!(backend.rows_in(CONTACTS_TABLE).len(), 1);
}

#[tokio::test]
async fn provider_failure_keeps_the_draft() {
    let backend = Arc::new(MockBackend::new());
    *backend.insert_error.lock().unwrap() = Some(BackendError::new(ErrorCode::Provider, "boom"));
    let state = test_app_state_with(backend);
    let (status, Json(form)) = submit(State(state), Json(draft())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(form.draft, draft());
    assert_eq!(form.feedback.unwrap().text, MSG_SEND_FAILED);
}

#[tokio::test]
async fn missing_fields_are_unprocessable() {
    let state = test_app_state_with(Arc::new(MockBackend::new()));
    let (status, Json(form)) = submit(State(state), Json(ContactDraft::default())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(!form.errors.is_empty());
}
