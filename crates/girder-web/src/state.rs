//! Application state.

use girder_core::{Control, Status};
use std::sync::Arc;

use crate::auth::AuthPolicy;

/// Shared application state.
///
/// `control` is `None` when the server runs in read-only mode; every
/// handler then sees every builder without a control handle, so the
/// distinction is uniform for the lifetime of any one request.
#[derive(Clone)]
pub struct AppState {
    pub status: Arc<dyn Status>,
    pub control: Option<Arc<dyn Control>>,
    pub auth: Arc<AuthPolicy>,
}

impl AppState {
    pub fn new(
        status: Arc<dyn Status>,
        control: Option<Arc<dyn Control>>,
        auth: AuthPolicy,
    ) -> Self {
        Self {
            status,
            control,
            auth: Arc::new(auth),
        }
    }
}
