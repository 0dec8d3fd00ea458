//! Conversation management.
//!
//! This module provides the durable conversation store and its data types.

pub mod ids;
pub mod naming;
pub mod store;
pub mod types;

pub use ids::{ConversationId, TurnId};
pub use naming::NamePolicy;
pub use store::ConversationStore;
pub use types::{Conversation, ConversationSummary, SessionState, Turn};
