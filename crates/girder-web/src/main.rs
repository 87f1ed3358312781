//! Girder status server.
//!
//! Serves the builder status pages over an in-memory master. Intended
//! for development and for fronting an engine seeded by other means;
//! the builder set comes from the environment.

use girder_engine::Engine;
use girder_web::auth::AuthPolicy;
use girder_web::{AppState, routes};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Seed the in-memory master from the environment
    let engine = Engine::new();
    let builders = std::env::var("GIRDER_BUILDERS").unwrap_or_else(|_| "quick,full".to_string());
    for name in builders.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        engine.add_builder(name);
        engine.add_worker(name, format!("{name}-w1"), Some("admin@localhost"), true);
        info!(builder = %name, "registered builder");
    }

    let auth = match (
        std::env::var("GIRDER_AUTH_USER"),
        std::env::var("GIRDER_AUTH_PASSWORD"),
    ) {
        (Ok(user), Ok(password)) => AuthPolicy::with_password(user, password),
        _ => AuthPolicy::open(),
    };

    let read_only = std::env::var("GIRDER_READONLY").is_ok_and(|v| v == "1" || v == "true");
    let control = if read_only {
        info!("running in read-only mode");
        None
    } else {
        Some(engine.control())
    };

    let state = AppState::new(engine.status(), control, auth);
    let app = routes::router(state).layer(TraceLayer::new_for_http());

    let bind = std::env::var("GIRDER_BIND").unwrap_or_else(|_| "0.0.0.0:8010".to_string());
    let addr: SocketAddr = bind.parse()?;
    info!("Starting status server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
