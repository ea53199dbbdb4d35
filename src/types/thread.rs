//! Thread and reply records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{AccountId, NodeId};
use super::Extras;

/// Root discussion unit authored by one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    /// Unique thread identifier; also the root key of its reply forest.
    pub id: NodeId,
    /// Authoring account.
    pub account_id: AccountId,
    /// Identifier of the thread in the upstream system.
    pub upstream_id: String,
    /// Thread title.
    pub title: String,
    /// Thread body.
    pub body: String,
    /// Whether new replies are accepted.
    #[serde(default = "default_allow_replies")]
    pub allow_replies: bool,
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
}

fn default_allow_replies() -> bool {
    true
}

impl Thread {
    /// Create a thread that accepts replies.
    pub fn new(
        id: NodeId,
        account_id: AccountId,
        upstream_id: impl Into<String>,
        title: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            account_id,
            upstream_id: upstream_id.into(),
            title: title.into(),
            body: body.into(),
            allow_replies: true,
            extras: Extras::new(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Lock or unlock the thread for new replies.
    pub fn with_allow_replies(mut self, allow: bool) -> Self {
        self.allow_replies = allow;
        self
    }
}

/// A comment attached to a thread or nested under another reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    /// Unique reply identifier.
    pub id: NodeId,
    /// Owning thread.
    pub thread_id: NodeId,
    /// Authoring account.
    pub account_id: AccountId,
    /// Reply body.
    pub body: String,
    /// Parent node: the thread id for a top-level reply, otherwise the
    /// id of the reply this one is nested under.
    pub reply_to_id: NodeId,
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
}

impl Reply {
    /// Create a reply.
    pub fn new(
        id: NodeId,
        thread_id: NodeId,
        account_id: AccountId,
        reply_to_id: NodeId,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            thread_id,
            account_id,
            body: body.into(),
            reply_to_id,
            extras: Extras::new(),
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Whether this reply is attached directly to its thread.
    pub fn is_top_level(&self) -> bool {
        self.reply_to_id == self.thread_id
    }
}
