//! Build requests and source stamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// An immutable pointer to "what to build": an optional branch and an
/// optional revision. Absence of both means "latest of the default
/// branch".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub branch: Option<String>,
    pub revision: Option<String>,
}

impl SourceStamp {
    /// Build a stamp from raw form input, normalizing empty strings to
    /// "unspecified".
    pub fn new(branch: impl Into<String>, revision: impl Into<String>) -> Self {
        fn normalize(s: String) -> Option<String> {
            if s.is_empty() { None } else { Some(s) }
        }
        Self {
            branch: normalize(branch.into()),
            revision: normalize(revision.into()),
        }
    }

    /// True when neither branch nor revision was specified.
    pub fn is_latest(&self) -> bool {
        self.branch.is_none() && self.revision.is_none()
    }
}

/// A queued intent to run a builder against a [`SourceStamp`], with a
/// human-readable reason and custom properties attached.
///
/// Constructed transiently per force action; the control API owns it
/// after submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub reason: String,
    pub source: SourceStamp,
    pub builder_name: String,
    pub properties: HashMap<String, String>,
    pub submitted_at: DateTime<Utc>,
}

impl BuildRequest {
    pub fn new(
        reason: impl Into<String>,
        source: SourceStamp,
        builder_name: impl Into<String>,
        properties: HashMap<String, String>,
    ) -> Self {
        Self {
            reason: reason.into(),
            source,
            builder_name: builder_name.into(),
            properties,
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_strings_normalize_to_none() {
        let s = SourceStamp::new("", "");
        assert_eq!(s.branch, None);
        assert_eq!(s.revision, None);
        assert!(s.is_latest());
    }

    #[test]
    fn test_branch_only() {
        let s = SourceStamp::new("feature/x", "");
        assert_eq!(s.branch.as_deref(), Some("feature/x"));
        assert_eq!(s.revision, None);
        assert!(!s.is_latest());
    }
}
