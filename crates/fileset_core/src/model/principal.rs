//! Acting principal passed explicitly through every call.

use serde::{Deserialize, Serialize};

/// Who is performing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Principal {
    /// Unauthenticated caller. May only use read paths.
    Anonymous,
    /// Authenticated user with group memberships.
    User { id: String, groups: Vec<String> },
}

impl Principal {
    /// Creates an authenticated user without group memberships.
    pub fn user(id: impl Into<String>) -> Self {
        Self::User {
            id: id.into(),
            groups: Vec::new(),
        }
    }

    /// Creates an authenticated user with the given groups.
    pub fn user_in_groups(id: impl Into<String>, groups: &[&str]) -> Self {
        Self::User {
            id: id.into(),
            groups: groups.iter().map(|group| group.to_string()).collect(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::User { .. })
    }

    /// Returns the user id, or `None` for anonymous callers.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Self::Anonymous => None,
            Self::User { id, .. } => Some(id.as_str()),
        }
    }

    pub fn groups(&self) -> &[String] {
        match self {
            Self::Anonymous => &[],
            Self::User { groups, .. } => groups,
        }
    }

    /// Identifier safe for diagnostic logs.
    pub fn log_id(&self) -> &str {
        self.user_id().unwrap_or("anonymous")
    }
}
