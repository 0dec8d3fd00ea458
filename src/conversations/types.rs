//! Types for conversation management.
//!
//! Field names follow the durable record layout (`camelCase`, the turn list
//! under `history`), so a serialized [`SessionState`] is the record itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ConversationId, TurnId};

/// One prompt/response exchange with the citations returned for it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique within the owning conversation.
    pub id: TurnId,
    /// Text the user submitted.
    pub prompt: String,
    /// Answer returned by the backend.
    pub response: String,
    /// Opaque source identifiers, in backend order.
    #[serde(default)]
    pub sources: Vec<String>,
    /// When the turn was recorded.
    pub timestamp: DateTime<Utc>,
}

/// A named, ordered sequence of turns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier.
    pub id: ConversationId,
    /// Display name.
    pub name: String,
    /// Turns in chronological order.
    #[serde(default)]
    pub history: Vec<Turn>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last mutation timestamp, never earlier than `created_at`.
    pub last_updated: DateTime<Utc>,
}

impl Conversation {
    /// Create an empty conversation.
    #[must_use]
    pub fn new(id: ConversationId, name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            history: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Refresh `last_updated`, keeping it at or after `created_at`.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_updated = now.max(self.created_at);
    }

    /// Whether no turn has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Summary for list views.
    #[must_use]
    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            turn_count: self.history.len(),
            last_updated: self.last_updated,
        }
    }
}

/// Full persisted snapshot: every conversation plus the active pointer.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Conversations, most recently updated first.
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    /// Active conversation, if any.
    #[serde(default)]
    pub current_id: Option<ConversationId>,
}

/// Compact view of a conversation for sidebars and listings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: ConversationId,
    /// Display name.
    pub name: String,
    /// Number of turns.
    pub turn_count: usize,
    /// Last mutation timestamp.
    pub last_updated: DateTime<Utc>,
}
