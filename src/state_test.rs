use super::test_helpers::test_app_state;
use super::*;

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(token, generate_token());
}

#[tokio::test]
async fn unknown_token_creates_visitor() {
    let state = test_app_state();
    let (token, _, created) = state.visitor(None).await;
    assert!(created);
    assert_eq!(state.visitors.read().await.len(), 1);

    let (again, _, created) = state.visitor(Some(&token)).await;
    assert!(!created);
    assert_eq!(again, token);

    let (other, _, created) = state.visitor(Some("stale-token")).await;
    assert!(created);
    assert_ne!(other, "stale-token");
    assert_eq!(state.visitors.read().await.len(), 2);
}

#[tokio::test]
async fn visitors_have_isolated_shells() {
    let state = test_app_state();
    let (_, a, _) = state.visitor(None).await;
    let (_, b, _) = state.visitor(None).await;
    a.update_shell(Shell::request_auth_panel);
    assert!(a.shell().auth_panel_open);
    assert!(!b.shell().auth_panel_open);
}

#[tokio::test]
async fn evict_idle_drops_only_stale_visitors() {
    let state = test_app_state();
    let (stale, _, _) = state.visitor(None).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    let (fresh, _, _) = state.visitor(None).await;

    let evicted = state.evict_idle(Duration::from_millis(15)).await;
    assert_eq!(evicted, 1);
    let visitors = state.visitors.read().await;
    assert!(!visitors.contains_key(&stale));
    assert!(visitors.contains_key(&fresh));
}

#[tokio::test]
async fn touching_keeps_visitor_alive() {
    let state = test_app_state();
    let (token, _, _) = state.visitor(None).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    state.visitor(Some(&token)).await;
    assert_eq!(state.evict_idle(Duration::from_millis(15)).await, 0);
}

#[tokio::test]
async fn known_visitor_never_creates() {
    let state = test_app_state();
    assert!(state.known_visitor(None).await.is_none());
    assert!(state.known_visitor(Some("")).await.is_none());
    assert!(state.known_visitor(Some("nobody")).await.is_none());
    assert!(state.visitors.read().await.is_empty());

    let (token, created, _) = state.visitor(None).await;
    let found = state.known_visitor(Some(&token)).await.expect("live visitor");
    assert!(Arc::ptr_eq(&found, &created));
}
