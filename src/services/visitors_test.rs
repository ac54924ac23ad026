use std::time::Duration;

use super::*;
use crate::config::VisitorConfig;
use crate::state::test_helpers::test_config;

#[tokio::test]
async fn sweeper_evicts_idle_visitors() {
    let mut config = test_config();
    config.visitors = VisitorConfig { idle: Duration::from_millis(20), sweep_every: Duration::from_millis(10) };
    let state = AppState::new(config, crate::state::test_helpers::test_app_state().backends);

    let (token, visitor, _) = state.visitor(None).await;
    drop(visitor);
    let sweeper = spawn_visitor_sweeper(state.clone());

    let mut gone = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        if !state.visitors.read().await.contains_key(&token) {
            gone = true;
            break;
        }
    }
    sweeper.abort();
    assert!(gone, "idle visitor should be evicted");
}
