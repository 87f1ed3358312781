//! Web status and control surface for the Girder build master.
//!
//! Renders per-builder state (current builds, pending requests,
//! workers, recent history) and translates operator actions — force,
//! cancel, ping, stop — into calls on the `girder-core` control traits.

pub mod auth;
pub mod error;
pub mod props;
pub mod routes;
pub mod state;
pub mod validate;
pub mod views;

pub use state::AppState;
