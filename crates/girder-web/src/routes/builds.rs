//! The per-build sub-resource, scoped under one builder.
//!
//! Thin on purpose: a detail page for a running build and its stop
//! action. Everything else about single builds lives elsewhere.

use askama::Template;
use axum::Router;
use axum::extract::{Form, Path, State};
use axum::response::{Html, Redirect};
use axum::routing::get;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use girder_core::BuilderControl;

use crate::AppState;
use crate::error::WebError;
use crate::validate::html_escape;
use crate::views::{builder_path, current_build_view};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{number}", get(build_page))
        .route("/{number}/stop", get(stop_build).post(stop_build))
}

#[derive(Template)]
#[template(path = "build.html")]
struct BuildTemplate {
    builder_name: String,
    builder_link: String,
    number: u64,
    current_step: String,
    eta_time: Option<String>,
    stop_url: Option<String>,
}

/// Stop parameters shared with the `_all/stop` fan-out.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct StopForm {
    pub username: Option<String>,
    pub comments: Option<String>,
}

async fn build_page(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, u64)>,
) -> Result<Html<String>, WebError> {
    let Some(status) = state.status.builder(&name).await else {
        return Err(WebError::NotFound(format!("no such builder: {}", name)));
    };
    let Some(snapshot) = status.build(number).await else {
        return Err(WebError::NotFound(format!(
            "no such build: {}/{}",
            name, number
        )));
    };

    let has_control = match &state.control {
        Some(c) => c.builder(&name).await.is_some(),
        None => false,
    };
    let view = current_build_view(status.name(), &snapshot, has_control);
    let template = BuildTemplate {
        builder_name: status.name().to_string(),
        builder_link: builder_path(status.name()),
        number: view.number,
        current_step: view.current_step,
        eta_time: view.eta_time,
        stop_url: view.stop_url,
    };
    Ok(Html(template.render()?))
}

async fn stop_build(
    State(state): State<AppState>,
    Path((name, number)): Path<(String, u64)>,
    Form(form): Form<StopForm>,
) -> Result<Redirect, WebError> {
    let Some(status) = state.status.builder(&name).await else {
        return Err(WebError::NotFound(format!("no such builder: {}", name)));
    };
    let control = match &state.control {
        Some(c) => c.builder(&name).await,
        None => None,
    };
    stop_one(status.name(), control.as_ref(), number, &form).await;
    Ok(Redirect::to(&builder_path(status.name())))
}

/// Stop one running build, if it is still running and we hold control.
/// A build that finished between enumeration and stop is a benign miss.
pub(crate) async fn stop_one(
    builder: &str,
    control: Option<&Arc<dyn BuilderControl>>,
    number: u64,
    form: &StopForm,
) {
    let Some(control) = control else { return };
    let Some(build) = control.build(number).await else {
        return;
    };

    let username = form.username.as_deref().unwrap_or("<unknown>");
    let comments = form.comments.as_deref().unwrap_or("no reason given");
    let reason = format!(
        "The web-page 'stop build' button was pressed by '{}': {}",
        html_escape(username),
        html_escape(comments)
    );
    info!(builder = %builder, number, username = %username, "web stop of build");
    build.stop(&reason).await;
}
