//! Projection of engine snapshots into render-ready records.
//!
//! These are pure functions over the owned snapshots the status traits
//! return; the records they produce never alias live engine state.

use chrono::{DateTime, Local, Utc};
use girder_core::{BuildSnapshot, FinishedBuild, PendingBuild, WorkerInfo};

/// Shown as the current step of a running build that reports no active
/// step. Heuristic only: a step-less build is usually blocked on a
/// shared lock, but nothing guarantees it.
pub const WAITING_FOR_LOCK: &str = "[waiting for lock]";

pub struct CurrentBuildView {
    pub number: u64,
    pub link: String,
    /// Estimated completion as a local wall-clock time, when known.
    pub eta_time: Option<String>,
    pub current_step: String,
    pub stop_url: Option<String>,
}

pub struct ChangeView {
    pub link: String,
    pub who: String,
}

pub struct PendingBuildView {
    /// Identity token addressed by the cancel action.
    pub id: u64,
    pub when: String,
    /// How long the request has been waiting, human readable.
    pub delay: String,
    pub reason: String,
    pub changes: Vec<ChangeView>,
}

pub struct WorkerView {
    pub name: String,
    pub link: String,
    pub connected: bool,
    pub admin: Option<String>,
}

pub struct RecentBuildView {
    pub number: u64,
    pub link: String,
    pub outcome: String,
    pub finished_at: String,
}

/// Canonical page path for a builder.
pub fn builder_path(name: &str) -> String {
    format!("/builders/{}", urlencoding::encode(name))
}

fn build_path(builder: &str, number: u64) -> String {
    format!("{}/builds/{}", builder_path(builder), number)
}

pub fn current_build_view(
    builder: &str,
    build: &BuildSnapshot,
    has_control: bool,
) -> CurrentBuildView {
    let link = build_path(builder, build.number);
    let eta_time = build.eta.and_then(|eta| {
        let eta = chrono::Duration::from_std(eta).ok()?;
        Some((Local::now() + eta).format("%H:%M:%S").to_string())
    });
    CurrentBuildView {
        number: build.number,
        stop_url: has_control.then(|| format!("{}/stop", link)),
        link,
        eta_time,
        current_step: build
            .current_step
            .clone()
            .unwrap_or_else(|| WAITING_FOR_LOCK.to_string()),
    }
}

pub fn pending_build_view(pending: &PendingBuild, now: DateTime<Utc>) -> PendingBuildView {
    let changes: Vec<ChangeView> = pending
        .changes
        .iter()
        .map(|c| ChangeView {
            link: c.link(),
            who: c.author.clone(),
        })
        .collect();

    let reason = if !changes.is_empty() {
        "see changes".to_string()
    } else if let Some(revision) = &pending.source.revision {
        revision.clone()
    } else {
        "no changes specified".to_string()
    };

    PendingBuildView {
        id: pending.id,
        when: pending
            .submitted_at
            .with_timezone(&Local)
            .format("%b %d %H:%M:%S")
            .to_string(),
        delay: format_interval((now - pending.submitted_at).num_seconds()),
        reason,
        changes,
    }
}

pub fn worker_view(worker: &WorkerInfo) -> WorkerView {
    WorkerView {
        name: worker.name.clone(),
        link: format!("/workers/{}", urlencoding::encode(&worker.name)),
        connected: worker.connected,
        admin: if worker.connected {
            worker.admin.clone()
        } else {
            None
        },
    }
}

pub fn recent_build_view(builder: &str, build: &FinishedBuild) -> RecentBuildView {
    RecentBuildView {
        number: build.number,
        link: build_path(builder, build.number),
        outcome: build.outcome.to_string(),
        finished_at: build
            .finished_at
            .with_timezone(&Local)
            .format("%b %d %H:%M:%S")
            .to_string(),
    }
}

/// Render a second count as "N hrs, M mins, S secs", dropping leading
/// zero parts.
pub fn format_interval(seconds: i64) -> String {
    let mut rest = seconds.max(0);
    let mut parts = Vec::new();
    if rest > 3600 {
        parts.push(format!("{} hrs", rest / 3600));
        rest %= 3600;
    }
    if rest > 60 {
        parts.push(format!("{} mins", rest / 60));
        rest %= 60;
    }
    parts.push(format!("{} secs", rest));
    parts.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use girder_core::{Change, SourceStamp};

    fn pending(source: SourceStamp, changes: Vec<Change>) -> PendingBuild {
        PendingBuild {
            id: 7,
            submitted_at: Utc::now() - Duration::seconds(90),
            source,
            changes,
        }
    }

    #[test]
    fn test_reason_is_literal_revision_without_changes() {
        let p = pending(SourceStamp::new("", "deadbeef"), vec![]);
        let view = pending_build_view(&p, Utc::now());
        assert_eq!(view.reason, "deadbeef");
        assert!(view.changes.is_empty());
    }

    #[test]
    fn test_reason_points_at_attached_changes() {
        let p = pending(
            SourceStamp::default(),
            vec![
                Change::new(41, "alice", "fix the build"),
                Change::new(42, "bob", "break it again"),
            ],
        );
        let view = pending_build_view(&p, Utc::now());
        assert_eq!(view.reason, "see changes");
        assert_eq!(view.changes.len(), 2);
        assert_eq!(view.changes[0].link, "/changes/41");
        assert_eq!(view.changes[0].who, "alice");
        assert_eq!(view.changes[1].link, "/changes/42");
        assert_eq!(view.changes[1].who, "bob");
    }

    #[test]
    fn test_reason_with_nothing_specified() {
        let p = pending(SourceStamp::default(), vec![]);
        let view = pending_build_view(&p, Utc::now());
        assert_eq!(view.reason, "no changes specified");
    }

    #[test]
    fn test_stepless_build_shows_lock_sentinel() {
        let b = BuildSnapshot {
            number: 3,
            eta: None,
            current_step: None,
        };
        let view = current_build_view("b1", &b, true);
        assert_eq!(view.current_step, WAITING_FOR_LOCK);
        assert_eq!(view.eta_time, None);
        assert_eq!(view.stop_url.as_deref(), Some("/builders/b1/builds/3/stop"));
    }

    #[test]
    fn test_no_stop_link_without_control() {
        let b = BuildSnapshot {
            number: 3,
            eta: Some(std::time::Duration::from_secs(120)),
            current_step: Some("compile".to_string()),
        };
        let view = current_build_view("b1", &b, false);
        assert_eq!(view.current_step, "compile");
        assert!(view.eta_time.is_some());
        assert!(view.stop_url.is_none());
    }

    #[test]
    fn test_worker_admin_hidden_when_disconnected() {
        let w = WorkerInfo {
            name: "w one".to_string(),
            connected: false,
            admin: Some("admin@example.com".to_string()),
        };
        let view = worker_view(&w);
        assert_eq!(view.admin, None);
        assert_eq!(view.link, "/workers/w%20one");
    }

    #[test]
    fn test_format_interval() {
        assert_eq!(format_interval(5), "5 secs");
        assert_eq!(format_interval(90), "1 mins, 30 secs");
        assert_eq!(format_interval(3725), "1 hrs, 2 mins, 5 secs");
        assert_eq!(format_interval(-10), "0 secs");
    }
}
