//! Mutating control traits.
//!
//! A control handle is only available to authorized callers; its
//! absence means the whole surface is read-only for that request.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use crate::request::BuildRequest;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("no such builder: {0}")]
    NoSuchBuilder(String),

    #[error("no worker available to run the build")]
    NoWorkerAvailable,

    #[error("internal error: {0}")]
    Internal(String),
}

/// Master-wide control lookup.
#[async_trait]
pub trait Control: Send + Sync {
    /// Control handle for one builder, if it exists.
    async fn builder(&self, name: &str) -> Option<Arc<dyn BuilderControl>>;
}

/// Mutating operations on a single builder.
#[async_trait]
pub trait BuilderControl: Send + Sync {
    /// Queue a build request for the next free worker.
    ///
    /// Fails with [`ControlError::NoWorkerAvailable`] when no connected
    /// worker can run it.
    async fn request_build_soon(&self, request: BuildRequest) -> Result<(), ControlError>;

    /// Cancellation handles for the currently pending requests, in
    /// submission order.
    async fn pending_builds(&self) -> Vec<Arc<dyn PendingBuildControl>>;

    /// Ping the builder's workers.
    async fn ping(&self);

    /// Control handle for a currently running build.
    async fn build(&self, number: u64) -> Option<Arc<dyn BuildControl>>;
}

/// Cancellation handle for one pending build request.
#[async_trait]
pub trait PendingBuildControl: Send + Sync {
    /// Identity token, matching the status-side [`crate::PendingBuild::id`].
    fn id(&self) -> u64;

    /// Withdraw the request. Cancelling a request that has already been
    /// scheduled or cancelled is a no-op.
    async fn cancel(&self);
}

/// Control handle for one running build.
#[async_trait]
pub trait BuildControl: Send + Sync {
    fn number(&self) -> u64;

    /// Stop the build. Stopping a build that already finished is a
    /// no-op.
    async fn stop(&self, reason: &str);
}
