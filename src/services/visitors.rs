//! Visitor sweeper — background eviction of idle visitors.
//!
//! Evicting a visitor drops its sidebar, which aborts the session listener
//! and releases its backend client.

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::state::AppState;

/// Spawn the background sweeper. Returns a handle for shutdown.
pub fn spawn_visitor_sweeper(state: AppState) -> JoinHandle<()> {
    let config = state.config.visitors;
    info!(
        idle_secs = config.idle.as_secs(),
        sweep_secs = config.sweep_every.as_secs(),
        "visitor sweeper configured"
    );
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(config.sweep_every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let evicted = state.evict_idle(config.idle).await;
            if evicted > 0 {
                info!(evicted, "evicted idle visitors");
            } else {
                debug!("no idle visitors");
            }
        }
    })
}

#[cfg(test)]
#[path = "visitors_test.rs"]
mod tests;
