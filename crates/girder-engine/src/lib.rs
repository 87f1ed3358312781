//! An in-memory build master.
//!
//! Implements the `girder-core` status and control traits over plain
//! shared state. It schedules nothing and executes nothing; builds and
//! workers change state only when something calls the mutators below.
//! That is enough to run the web surface in development mode and to
//! give its tests a live collaborator whose mutations are observable.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

use girder_core::{
    BuildControl, BuildOutcome, BuildRequest, BuildSnapshot, BuilderControl, BuilderState,
    BuilderStatus, Change, Control, ControlError, FinishedBuild, PendingBuild,
    PendingBuildControl, SourceStamp, Status, WorkerInfo,
};

#[derive(Default)]
struct BuilderSlot {
    workers: Vec<WorkerInfo>,
    pending: Vec<PendingBuild>,
    current: Vec<BuildSnapshot>,
    finished: Vec<FinishedBuild>,
    next_build_number: u64,
    pings: u64,
}

#[derive(Default)]
struct Master {
    builders: BTreeMap<String, BuilderSlot>,
    // Pending ids are master-wide and never reused, so a stale id from
    // a racing cancel simply matches nothing.
    next_pending_id: u64,
    submitted: Vec<BuildRequest>,
}

/// Handle to the shared master state. Cheap to clone.
#[derive(Clone, Default)]
pub struct Engine {
    inner: Arc<RwLock<Master>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only status handle.
    pub fn status(&self) -> Arc<dyn Status> {
        Arc::new(StatusHandle {
            inner: self.inner.clone(),
        })
    }

    /// Mutating control handle.
    pub fn control(&self) -> Arc<dyn Control> {
        Arc::new(ControlHandle {
            inner: self.inner.clone(),
        })
    }

    pub fn add_builder(&self, name: impl Into<String>) {
        let mut master = self.inner.write().expect("master lock poisoned");
        master.builders.entry(name.into()).or_default();
    }

    pub fn add_worker(
        &self,
        builder: &str,
        name: impl Into<String>,
        admin: Option<&str>,
        connected: bool,
    ) {
        let mut master = self.inner.write().expect("master lock poisoned");
        if let Some(slot) = master.builders.get_mut(builder) {
            slot.workers.push(WorkerInfo {
                name: name.into(),
                connected,
                admin: if connected {
                    admin.map(String::from)
                } else {
                    None
                },
            });
        }
    }

    /// Queue a pending request directly, with optional attached changes.
    /// Returns the identity token.
    pub fn add_pending(
        &self,
        builder: &str,
        source: SourceStamp,
        changes: Vec<Change>,
    ) -> Option<u64> {
        let mut master = self.inner.write().expect("master lock poisoned");
        master.next_pending_id += 1;
        let id = master.next_pending_id;
        let slot = master.builders.get_mut(builder)?;
        slot.pending.push(PendingBuild {
            id,
            submitted_at: Utc::now(),
            source,
            changes,
        });
        Some(id)
    }

    /// Mark a build as running. Returns its sequence number.
    pub fn start_build(
        &self,
        builder: &str,
        step: Option<&str>,
        eta: Option<Duration>,
    ) -> Option<u64> {
        let mut master = self.inner.write().expect("master lock poisoned");
        let slot = master.builders.get_mut(builder)?;
        slot.next_build_number += 1;
        let number = slot.next_build_number;
        slot.current.push(BuildSnapshot {
            number,
            eta,
            current_step: step.map(String::from),
        });
        Some(number)
    }

    /// Move a running build to the finished list.
    pub fn finish_build(&self, builder: &str, number: u64, outcome: BuildOutcome) {
        let mut master = self.inner.write().expect("master lock poisoned");
        if let Some(slot) = master.builders.get_mut(builder) {
            slot.current.retain(|b| b.number != number);
            slot.finished.push(FinishedBuild {
                number,
                outcome,
                finished_at: Utc::now(),
            });
        }
    }

    /// How many times this builder has been pinged. Test observation.
    pub fn ping_count(&self, builder: &str) -> u64 {
        let master = self.inner.read().expect("master lock poisoned");
        master.builders.get(builder).map(|s| s.pings).unwrap_or(0)
    }

    /// Every build request accepted through the control API, oldest
    /// first. Test observation.
    pub fn submitted_requests(&self) -> Vec<BuildRequest> {
        let master = self.inner.read().expect("master lock poisoned");
        master.submitted.clone()
    }
}

struct StatusHandle {
    inner: Arc<RwLock<Master>>,
}

#[async_trait]
impl Status for StatusHandle {
    async fn builder_names(&self) -> Vec<String> {
        let master = self.inner.read().expect("master lock poisoned");
        master.builders.keys().cloned().collect()
    }

    async fn builder(&self, name: &str) -> Option<Arc<dyn BuilderStatus>> {
        let master = self.inner.read().expect("master lock poisoned");
        if !master.builders.contains_key(name) {
            return None;
        }
        Some(Arc::new(BuilderHandle {
            name: name.to_string(),
            inner: self.inner.clone(),
        }))
    }
}

struct ControlHandle {
    inner: Arc<RwLock<Master>>,
}

#[async_trait]
impl Control for ControlHandle {
    async fn builder(&self, name: &str) -> Option<Arc<dyn BuilderControl>> {
        let master = self.inner.read().expect("master lock poisoned");
        if !master.builders.contains_key(name) {
            return None;
        }
        Some(Arc::new(BuilderHandle {
            name: name.to_string(),
            inner: self.inner.clone(),
        }))
    }
}

/// Per-builder handle, serving both the status and control traits.
struct BuilderHandle {
    name: String,
    inner: Arc<RwLock<Master>>,
}

impl BuilderHandle {
    fn read<T>(&self, f: impl FnOnce(&BuilderSlot) -> T) -> Option<T> {
        let master = self.inner.read().expect("master lock poisoned");
        master.builders.get(&self.name).map(f)
    }
}

#[async_trait]
impl BuilderStatus for BuilderHandle {
    fn name(&self) -> &str {
        &self.name
    }

    async fn state(&self) -> BuilderState {
        self.read(|slot| {
            if !slot.current.is_empty() {
                BuilderState::Building
            } else if !slot.workers.iter().any(|w| w.connected) {
                BuilderState::Offline
            } else {
                BuilderState::Idle
            }
        })
        .unwrap_or(BuilderState::Offline)
    }

    async fn current_builds(&self) -> Vec<BuildSnapshot> {
        self.read(|slot| slot.current.clone()).unwrap_or_default()
    }

    async fn pending_builds(&self) -> Vec<PendingBuild> {
        self.read(|slot| slot.pending.clone()).unwrap_or_default()
    }

    async fn recent_builds(&self, n: usize) -> Vec<FinishedBuild> {
        self.read(|slot| slot.finished.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    async fn workers(&self) -> Vec<WorkerInfo> {
        self.read(|slot| slot.workers.clone()).unwrap_or_default()
    }

    async fn build(&self, number: u64) -> Option<BuildSnapshot> {
        self.read(|slot| slot.current.iter().find(|b| b.number == number).cloned())
            .flatten()
    }
}

#[async_trait]
impl BuilderControl for BuilderHandle {
    async fn request_build_soon(&self, request: BuildRequest) -> Result<(), ControlError> {
        let mut master = self.inner.write().expect("master lock poisoned");
        master.next_pending_id += 1;
        let id = master.next_pending_id;
        let slot = master
            .builders
            .get_mut(&self.name)
            .ok_or_else(|| ControlError::NoSuchBuilder(self.name.clone()))?;
        if !slot.workers.iter().any(|w| w.connected) {
            return Err(ControlError::NoWorkerAvailable);
        }
        slot.pending.push(PendingBuild {
            id,
            submitted_at: request.submitted_at,
            source: request.source.clone(),
            changes: Vec::new(),
        });
        debug!(builder = %self.name, pending_id = id, "queued build request");
        master.submitted.push(request);
        Ok(())
    }

    async fn pending_builds(&self) -> Vec<Arc<dyn PendingBuildControl>> {
        self.read(|slot| {
            slot.pending
                .iter()
                .map(|p| {
                    Arc::new(PendingHandle {
                        builder: self.name.clone(),
                        id: p.id,
                        inner: self.inner.clone(),
                    }) as Arc<dyn PendingBuildControl>
                })
                .collect()
        })
        .unwrap_or_default()
    }

    async fn ping(&self) {
        let mut master = self.inner.write().expect("master lock poisoned");
        if let Some(slot) = master.builders.get_mut(&self.name) {
            slot.pings += 1;
        }
    }

    async fn build(&self, number: u64) -> Option<Arc<dyn BuildControl>> {
        let exists = self
            .read(|slot| slot.current.iter().any(|b| b.number == number))
            .unwrap_or(false);
        if !exists {
            return None;
        }
        Some(Arc::new(BuildHandle {
            builder: self.name.clone(),
            number,
            inner: self.inner.clone(),
        }))
    }
}

struct PendingHandle {
    builder: String,
    id: u64,
    inner: Arc<RwLock<Master>>,
}

#[async_trait]
impl PendingBuildControl for PendingHandle {
    fn id(&self) -> u64 {
        self.id
    }

    async fn cancel(&self) {
        let mut master = self.inner.write().expect("master lock poisoned");
        if let Some(slot) = master.builders.get_mut(&self.builder) {
            let before = slot.pending.len();
            slot.pending.retain(|p| p.id != self.id);
            if slot.pending.len() < before {
                debug!(builder = %self.builder, pending_id = self.id, "cancelled pending request");
            }
        }
    }
}

struct BuildHandle {
    builder: String,
    number: u64,
    inner: Arc<RwLock<Master>>,
}

#[async_trait]
impl BuildControl for BuildHandle {
    fn number(&self) -> u64 {
        self.number
    }

    async fn stop(&self, reason: &str) {
        let mut master = self.inner.write().expect("master lock poisoned");
        if let Some(slot) = master.builders.get_mut(&self.builder) {
            let before = slot.current.len();
            slot.current.retain(|b| b.number != self.number);
            if slot.current.len() < before {
                debug!(builder = %self.builder, number = self.number, %reason, "stopped build");
                slot.finished.push(FinishedBuild {
                    number: self.number,
                    outcome: BuildOutcome::Cancelled,
                    finished_at: Utc::now(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_state_follows_contents() {
        let engine = Engine::new();
        engine.add_builder("b1");
        let status = engine.status();
        let b = status.builder("b1").await.unwrap();
        assert_eq!(b.state().await, BuilderState::Offline);

        engine.add_worker("b1", "w1", Some("admin@example.com"), true);
        assert_eq!(b.state().await, BuilderState::Idle);

        engine.start_build("b1", Some("compile"), None);
        assert_eq!(b.state().await, BuilderState::Building);
    }

    #[tokio::test]
    async fn test_request_build_soon_needs_connected_worker() {
        let engine = Engine::new();
        engine.add_builder("b1");
        engine.add_worker("b1", "w1", None, false);
        let control = engine.control();
        let bc = control.builder("b1").await.unwrap();

        let req = BuildRequest::new("why", SourceStamp::default(), "b1", Default::default());
        assert!(matches!(
            bc.request_build_soon(req).await,
            Err(ControlError::NoWorkerAvailable)
        ));
        assert!(engine.submitted_requests().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_is_idempotent_and_id_stable() {
        let engine = Engine::new();
        engine.add_builder("b1");
        let id = engine
            .add_pending("b1", SourceStamp::default(), vec![])
            .unwrap();

        let control = engine.control();
        let bc = control.builder("b1").await.unwrap();
        let handles = bc.pending_builds().await;
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].id(), id);

        handles[0].cancel().await;
        handles[0].cancel().await;

        let status = engine.status();
        let b = status.builder("b1").await.unwrap();
        assert!(b.pending_builds().await.is_empty());
    }

    #[tokio::test]
    async fn test_stop_moves_build_to_finished() {
        let engine = Engine::new();
        engine.add_builder("b1");
        engine.add_worker("b1", "w1", None, true);
        let number = engine.start_build("b1", Some("test"), None).unwrap();

        let control = engine.control();
        let bc = control.builder("b1").await.unwrap();
        let build = bc.build(number).await.unwrap();
        build.stop("operator request").await;

        let status = engine.status();
        let b = status.builder("b1").await.unwrap();
        assert!(b.current_builds().await.is_empty());
        let finished = b.recent_builds(5).await;
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].outcome, BuildOutcome::Cancelled);
    }
}
