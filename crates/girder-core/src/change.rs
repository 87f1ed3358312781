//! Source change records.

use serde::{Deserialize, Serialize};

/// A single source change that triggered (or is attached to) a build
/// request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Change number, unique across the master.
    pub number: u64,
    /// Who made the change.
    pub author: String,
    /// Commit comments.
    pub comments: String,
}

impl Change {
    pub fn new(number: u64, author: impl Into<String>, comments: impl Into<String>) -> Self {
        Self {
            number,
            author: author.into(),
            comments: comments.into(),
        }
    }

    /// Path to this change's detail page.
    pub fn link(&self) -> String {
        format!("/changes/{}", self.number)
    }
}
