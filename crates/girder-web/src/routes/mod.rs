//! HTTP routes.

pub mod builders;
pub mod builds;

use askama::Template;
use axum::Json;
use axum::Router;
use axum::response::{Html, Redirect};
use axum::routing::get;
use serde_json::{Value, json};

use crate::AppState;
use crate::error::WebError;

#[derive(Template)]
#[template(path = "authfail.html")]
struct AuthFailTemplate;

/// Build the main router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .nest("/builders", builders::router())
        .route("/authfail", get(auth_failed))
        .route("/health", get(health))
        .with_state(state)
}

async fn root() -> Redirect {
    Redirect::to("/builders")
}

async fn auth_failed() -> Result<Html<String>, WebError> {
    Ok(Html(AuthFailTemplate.render()?))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
