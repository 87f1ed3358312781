//! Read-only status snapshots and lookup traits.
//!
//! Everything returned here is an owned, immutable snapshot: the engine
//! keeps mutating its own state in the background, and readers must
//! tolerate a snapshot going stale the moment it is taken.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::change::Change;
use crate::request::SourceStamp;

/// Coarse builder state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuilderState {
    /// No current builds, at least one connected worker.
    Idle,
    /// At least one build currently running.
    Building,
    /// No connected workers.
    Offline,
}

impl fmt::Display for BuilderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuilderState::Idle => "idle",
            BuilderState::Building => "building",
            BuilderState::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Final disposition of a finished build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildOutcome {
    Success,
    Failure,
    Cancelled,
}

impl fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BuildOutcome::Success => "success",
            BuildOutcome::Failure => "failure",
            BuildOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Snapshot of one attached worker.
///
/// `admin` is only populated while the worker is connected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerInfo {
    pub name: String,
    pub connected: bool,
    pub admin: Option<String>,
}

/// Snapshot of a build request still waiting for a free worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingBuild {
    /// Identity token, stable for the lifetime of the request and never
    /// reused by the engine. Used to address cancellation.
    pub id: u64,
    pub submitted_at: DateTime<Utc>,
    pub source: SourceStamp,
    pub changes: Vec<Change>,
}

/// Snapshot of a currently running build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSnapshot {
    /// Per-builder sequence number, monotonically assigned.
    pub number: u64,
    /// Estimated time remaining, if the engine has one.
    pub eta: Option<Duration>,
    /// Name of the step currently executing, if any.
    pub current_step: Option<String>,
}

/// Snapshot of a finished build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedBuild {
    pub number: u64,
    pub outcome: BuildOutcome,
    pub finished_at: DateTime<Utc>,
}

/// Master-wide read-only status lookup.
#[async_trait]
pub trait Status: Send + Sync {
    /// All known builder names, in a stable order.
    async fn builder_names(&self) -> Vec<String>;

    /// Status handle for one builder, if it exists.
    async fn builder(&self, name: &str) -> Option<Arc<dyn BuilderStatus>>;
}

/// Read-only view of a single builder.
#[async_trait]
pub trait BuilderStatus: Send + Sync {
    fn name(&self) -> &str;

    async fn state(&self) -> BuilderState;

    async fn current_builds(&self) -> Vec<BuildSnapshot>;

    /// Pending requests in submission order.
    async fn pending_builds(&self) -> Vec<PendingBuild>;

    /// The `n` most recently finished builds, newest first.
    async fn recent_builds(&self, n: usize) -> Vec<FinishedBuild>;

    async fn workers(&self) -> Vec<WorkerInfo>;

    /// A current build by sequence number.
    async fn build(&self, number: u64) -> Option<BuildSnapshot>;
}
