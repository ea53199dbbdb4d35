//! Account records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::AccountId;
use super::Extras;

/// An account as supplied by the backing store.
///
/// The kernel never mutates accounts; it only attaches them to the
/// threads and replies they authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique account identifier.
    pub id: AccountId,
    /// Identifier of the account in the upstream identity system.
    pub upstream_id: String,
    /// Display name.
    pub username: String,
    /// Contact email.
    pub email: String,
    /// Whether the account is banned.
    #[serde(default)]
    pub banned: bool,
    /// Optional badge shown next to the username.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    /// Opaque extension data.
    #[serde(default)]
    pub extras: Extras,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    /// Time the ban was applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub banned_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Create an active account with both timestamps set to `created_at`.
    pub fn new(
        id: AccountId,
        upstream_id: impl Into<String>,
        username: impl Into<String>,
        email: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            upstream_id: upstream_id.into(),
            username: username.into(),
            email: email.into(),
            banned: false,
            badge: None,
            extras: Extras::new(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
            banned_at: None,
        }
    }

    /// Set the badge.
    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    /// Mark the account as banned at the given time.
    pub fn banned_at(mut self, at: DateTime<Utc>) -> Self {
        self.banned = true;
        self.banned_at = Some(at);
        self
    }

    /// Whether the account has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
