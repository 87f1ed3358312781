//! Core domain types and traits for the Girder build master.
//!
//! This crate contains:
//! - Source stamps, build requests, and change records
//! - Read-only status snapshots and the `Status` trait family
//! - The mutating `Control` trait family and its error type
//!
//! The traits are the boundary between the HTTP status surface and the
//! build engine proper: the engine owns and mutates builders, builds,
//! workers, and pending requests; consumers only read snapshots and
//! invoke control calls.

pub mod change;
pub mod control;
pub mod request;
pub mod status;

pub use change::Change;
pub use control::{BuildControl, BuilderControl, Control, ControlError, PendingBuildControl};
pub use request::{BuildRequest, SourceStamp};
pub use status::{
    BuildOutcome, BuildSnapshot, BuilderState, BuilderStatus, FinishedBuild, PendingBuild, Status,
    WorkerInfo,
};
