mod config;
mod routes;
mod services;
mod state;
mod supabase;

use std::sync::Arc;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let http = supabase::client::build_http_client(&config.supabase).expect("http client init failed");
    let backends = supabase::supabase_factory(http, Arc::new(config.supabase.clone()));
    tracing::info!(
        supabase_url = %config.supabase.url,
        signup_completion = ?config.sidebar.signup_completion,
        "backend configured"
    );

    let port = config.port;
    let state = state::AppState::new(config, backends);

    // Spawn background visitor sweeper.
    let _sweeper = services::visitors::spawn_visitor_sweeper(state.clone());

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "bagease listening");
    axum::serve(listener, app).await.expect("server failed");
}
