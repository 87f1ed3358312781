//! The builders resource tree: list page, per-builder page, and the
//! force/ping/cancel/stop operator actions.
//!
//! Mutating actions always answer with a redirect, success or not;
//! failures only show up in the server log.

use askama::Template;
use axum::Router;
use axum::extract::{Form, Path, Query, State};
use axum::response::{Html, Redirect};
use axum::routing::{any, get};
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

use girder_core::{
    BuildRequest, BuilderControl, BuilderState, BuilderStatus, ControlError, SourceStamp,
};

use crate::AppState;
use crate::error::WebError;
use crate::props::get_and_check_properties;
use crate::routes::builds::{self, StopForm};
use crate::validate::{html_escape, is_clean_path_component};
use crate::views::{
    CurrentBuildView, PendingBuildView, RecentBuildView, WorkerView, builder_path,
    current_build_view, pending_build_view, recent_build_view, worker_view,
};

/// Reserved path segment fanning an action out to every builder.
const ALL_BUILDERS: &str = "_all";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(builders_page))
        .route("/{name}", get(builder_page))
        .route("/{name}/force", get(force_build).post(force_build))
        .route("/{name}/ping", get(ping_builder).post(ping_builder))
        .route("/{name}/cancelbuild", get(cancel_build).post(cancel_build))
        .route("/{name}/stop", get(stop_builds).post(stop_builds))
        .route("/{name}/events", any(events_unavailable))
        .route("/{name}/events/{*rest}", any(events_unavailable))
        .nest("/{name}/builds", builds::router())
}

// ============================================================================
// Path resolution
// ============================================================================

/// Where the dynamic `{name}` segment lands: a concrete builder (with
/// control only when this deployment is authorized to mutate it), the
/// reserved fan-out target, or nowhere.
enum BuilderTarget {
    Builder {
        status: Arc<dyn BuilderStatus>,
        control: Option<Arc<dyn BuilderControl>>,
    },
    All,
    Unknown,
}

async fn resolve_builder(state: &AppState, segment: &str) -> BuilderTarget {
    if segment == ALL_BUILDERS {
        return BuilderTarget::All;
    }
    match state.status.builder(segment).await {
        Some(status) => {
            let control = match &state.control {
                Some(c) => c.builder(segment).await,
                None => None,
            };
            BuilderTarget::Builder { status, control }
        }
        None => BuilderTarget::Unknown,
    }
}

fn no_such_builder(name: &str) -> WebError {
    WebError::NotFound(format!("no such builder: {}", name))
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Template)]
#[template(path = "builders.html")]
struct BuildersTemplate {
    builders: Vec<BuilderLink>,
}

struct BuilderLink {
    name: String,
    link: String,
}

#[derive(Template)]
#[template(path = "builder.html")]
struct BuilderTemplate {
    name: String,
    state: String,
    current: Vec<CurrentBuildView>,
    pending: Vec<PendingBuildView>,
    recent: Vec<RecentBuildView>,
    workers: Vec<WorkerView>,
    force_url: Option<String>,
    all_workers_offline: bool,
    use_user_passwd: bool,
    cancel_url: Option<String>,
    ping_url: Option<String>,
}

// ============================================================================
// Pages
// ============================================================================

async fn builders_page(State(state): State<AppState>) -> Result<Html<String>, WebError> {
    let builders = state
        .status
        .builder_names()
        .await
        .into_iter()
        .map(|name| BuilderLink {
            link: builder_path(&name),
            name,
        })
        .collect();
    Ok(Html(BuildersTemplate { builders }.render()?))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BuilderPageQuery {
    numbuilds: Option<String>,
}

async fn builder_page(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(query): Query<BuilderPageQuery>,
) -> Result<Html<String>, WebError> {
    let BuilderTarget::Builder { status, control } = resolve_builder(&state, &name).await else {
        return Err(no_such_builder(&name));
    };

    let numbuilds = match query.numbuilds.as_deref() {
        None => 5,
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| WebError::BadRequest(format!("bad numbuilds value '{}'", raw)))?,
    };

    let has_control = control.is_some();
    let name = status.name().to_string();
    let path = builder_path(&name);

    let workers: Vec<WorkerView> = status.workers().await.iter().map(worker_view).collect();
    let any_connected = workers.iter().any(|w| w.connected);

    let now = Utc::now();
    let current = status
        .current_builds()
        .await
        .iter()
        .map(|b| current_build_view(&name, b, has_control))
        .collect();
    let pending = status
        .pending_builds()
        .await
        .iter()
        .map(|p| pending_build_view(p, now))
        .collect();
    let recent = status
        .recent_builds(numbuilds)
        .await
        .iter()
        .map(|b| recent_build_view(&name, b))
        .collect();

    let template = BuilderTemplate {
        state: status.state().await.to_string(),
        current,
        pending,
        recent,
        workers,
        force_url: (has_control && any_connected).then(|| format!("{}/force", path)),
        all_workers_offline: has_control && !any_connected,
        use_user_passwd: state.auth.requires_auth(),
        cancel_url: has_control.then(|| format!("{}/cancelbuild", path)),
        ping_url: has_control.then(|| format!("{}/ping", path)),
        name,
    };
    Ok(Html(template.render()?))
}

// ============================================================================
// Force
// ============================================================================

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ForceForm {
    pub username: Option<String>,
    pub comments: Option<String>,
    pub branch: Option<String>,
    pub revision: Option<String>,
    pub passwd: Option<String>,
    pub property1name: Option<String>,
    pub property1value: Option<String>,
    pub property2name: Option<String>,
    pub property2value: Option<String>,
    pub property3name: Option<String>,
    pub property3value: Option<String>,
}

async fn force_build(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<ForceForm>,
) -> Result<Redirect, WebError> {
    match resolve_builder(&state, &name).await {
        BuilderTarget::Builder { status, control } => {
            Ok(force_one(&state, status.name(), control, &form).await)
        }
        BuilderTarget::All => {
            // One submission, same parameters for every builder.
            for bname in state.status.builder_names().await {
                let Some(status) = state.status.builder(&bname).await else {
                    continue;
                };
                let control = match &state.control {
                    Some(c) => c.builder(&bname).await,
                    None => None,
                };
                force_one(&state, status.name(), control, &form).await;
            }
            Ok(Redirect::to("/"))
        }
        BuilderTarget::Unknown => Err(no_such_builder(&name)),
    }
}

/// The force state machine for one builder. Each gate exits with a
/// redirect; nothing past a failed gate runs.
async fn force_one(
    state: &AppState,
    name: &str,
    control: Option<Arc<dyn BuilderControl>>,
    form: &ForceForm,
) -> Redirect {
    let username = form.username.clone().unwrap_or_else(|| "<unknown>".into());
    let comments = form
        .comments
        .clone()
        .unwrap_or_else(|| "<no reason specified>".into());
    let branch = form.branch.clone().unwrap_or_default();
    let revision = form.revision.clone().unwrap_or_default();

    let reason = format!(
        "The web-page 'force build' button was pressed by '{}': {}\n",
        html_escape(&username),
        html_escape(&comments)
    );
    info!(
        builder = %name,
        branch = %branch,
        revision = %revision,
        username = %username,
        "web force build"
    );

    let Some(control) = control else {
        info!(builder = %name, "force denied: builder control is disabled");
        return Redirect::to("/builders");
    };

    if state.auth.requires_auth() {
        let user = form.username.as_deref().unwrap_or("");
        let passwd = form.passwd.as_deref().unwrap_or("");
        if !state.auth.check(user, passwd) {
            info!(builder = %name, username = %user, "force denied: bad credentials");
            return Redirect::to("/authfail");
        }
    }

    if !is_clean_path_component(&branch) {
        info!(builder = %name, branch = %branch, "force rejected: bad branch");
        return Redirect::to("/builders");
    }
    if !is_clean_path_component(&revision) {
        info!(builder = %name, revision = %revision, "force rejected: bad revision");
        return Redirect::to("/builders");
    }
    let pairs = [
        (
            form.property1name.as_deref().unwrap_or(""),
            form.property1value.as_deref().unwrap_or(""),
        ),
        (
            form.property2name.as_deref().unwrap_or(""),
            form.property2value.as_deref().unwrap_or(""),
        ),
        (
            form.property3name.as_deref().unwrap_or(""),
            form.property3value.as_deref().unwrap_or(""),
        ),
    ];
    let Some(properties) = get_and_check_properties(&pairs) else {
        return Redirect::to("/builders");
    };

    let source = SourceStamp::new(branch, revision);
    let request = BuildRequest::new(reason, source, name, properties);
    match control.request_build_soon(request).await {
        Ok(()) => {}
        // Legacy behavior: the operator is never told that no worker
        // was available; the request just evaporates.
        Err(ControlError::NoWorkerAvailable) => {}
        Err(e) => {
            tracing::warn!(builder = %name, error = %e, "force build submission failed");
        }
    }

    Redirect::to(&builder_path(name))
}

// ============================================================================
// Ping / cancel / stop
// ============================================================================

async fn ping_builder(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Redirect, WebError> {
    let BuilderTarget::Builder { status, control } = resolve_builder(&state, &name).await else {
        return Err(no_such_builder(&name));
    };
    // Read-only deployments never link here; treat like any unknown path.
    let Some(control) = control else {
        return Err(no_such_builder(&name));
    };

    info!(builder = %status.name(), "web ping of builder");
    control.ping().await;
    Ok(Redirect::to(&builder_path(status.name())))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CancelForm {
    pub id: Option<String>,
}

#[derive(Clone, Copy)]
enum CancelTarget {
    All,
    One(u64),
    Nothing,
}

async fn cancel_build(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<CancelForm>,
) -> Result<Redirect, WebError> {
    let BuilderTarget::Builder { status, control } = resolve_builder(&state, &name).await else {
        return Err(no_such_builder(&name));
    };
    let Some(control) = control else {
        return Err(no_such_builder(&name));
    };
    let back = Redirect::to(&builder_path(status.name()));

    let target = match form.id.as_deref() {
        Some("all") => CancelTarget::All,
        Some(raw) => match raw.parse::<u64>() {
            Ok(id) => CancelTarget::One(id),
            Err(_) => {
                // Garbage id: fall through to the redirect untouched.
                info!(builder = %name, id = %raw, "ignoring cancel with unparseable id");
                CancelTarget::Nothing
            }
        },
        None => CancelTarget::Nothing,
    };

    if !matches!(target, CancelTarget::Nothing) {
        // A request may have been scheduled away since we enumerated;
        // the loop then simply finds no match.
        for request in control.pending_builds().await {
            let hit = match target {
                CancelTarget::All => true,
                CancelTarget::One(id) => request.id() == id,
                CancelTarget::Nothing => false,
            };
            if hit {
                info!(builder = %name, pending_id = request.id(), "cancelling pending build request");
                request.cancel().await;
                if matches!(target, CancelTarget::One(_)) {
                    break;
                }
            }
        }
    }

    Ok(back)
}

/// `/builders/_all/stop`: stop every current build of every builder
/// that is actually building. Only the `_all` segment carries this
/// action.
async fn stop_builds(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Form(form): Form<StopForm>,
) -> Result<Redirect, WebError> {
    if !matches!(resolve_builder(&state, &name).await, BuilderTarget::All) {
        return Err(WebError::NotFound(format!("no such resource: {}/stop", name)));
    }

    for bname in state.status.builder_names().await {
        let Some(status) = state.status.builder(&bname).await else {
            continue;
        };
        if status.state().await != BuilderState::Building {
            continue;
        }
        let control = match &state.control {
            Some(c) => c.builder(&bname).await,
            None => None,
        };
        for build in status.current_builds().await {
            builds::stop_one(&bname, control.as_ref(), build.number, &form).await;
        }
    }

    Ok(Redirect::to("/"))
}

/// Event pages were retired long ago; the path stays routed so stale
/// links fail cleanly and without side effects.
async fn events_unavailable() -> WebError {
    WebError::NotFound("events are not available".to_string())
}
