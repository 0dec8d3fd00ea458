//! Durable multi-conversation store with an active-conversation pointer.
//!
//! Every mutation rewrites the whole [`SessionState`] through the injected
//! [`StateStorage`] in one `save` call. Storage failures are logged and
//! swallowed: the in-memory state stays authoritative for the session.

use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::common::clock::Clock;
use crate::storage::StateStorage;

use super::ids::{next_millis, ConversationId, TurnId};
use super::naming::NamePolicy;
use super::types::{Conversation, ConversationSummary, SessionState, Turn};

/// Conversation store. Single source of truth for conversation data.
pub struct ConversationStore {
    storage: Box<dyn StateStorage>,
    clock: Box<dyn Clock>,
    naming: NamePolicy,
    state: SessionState,
}

impl ConversationStore {
    /// Load session state from `storage`, or start fresh with one empty conversation.
    ///
    /// Read or decode failures fall back to a fresh state and are only logged.
    /// A restored record without conversations also gets a fresh one, so an
    /// opened store always has an active conversation.
    pub fn open(
        storage: Box<dyn StateStorage>,
        clock: Box<dyn Clock>,
        naming: NamePolicy,
    ) -> Self {
        let restored = match storage.load() {
            Ok(Some(blob)) => match serde_json::from_str::<SessionState>(&blob) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Stored session state is corrupt, starting fresh: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read session state, starting fresh: {e}");
                None
            }
        };

        let mut store = Self {
            storage,
            clock,
            naming,
            state: SessionState::default(),
        };

        if let Some(state) = restored {
            store.state = reconcile(state);
            info!(
                conversations = store.state.conversations.len(),
                active = ?store.state.current_id,
                "Restored session state"
            );
        }
        if store.state.conversations.is_empty() {
            store.create_conversation();
        }

        store
    }

    /// Conversations, most recently updated first.
    #[must_use]
    pub fn conversations(&self) -> &[Conversation] {
        &self.state.conversations
    }

    /// Summaries in display order.
    #[must_use]
    pub fn summaries(&self) -> Vec<ConversationSummary> {
        self.state
            .conversations
            .iter()
            .map(Conversation::summary)
            .collect()
    }

    /// Look up a conversation by id.
    #[must_use]
    pub fn conversation(&self, id: &ConversationId) -> Option<&Conversation> {
        self.state.conversations.iter().find(|c| &c.id == id)
    }

    /// Active conversation id, if any.
    #[must_use]
    pub const fn active_id(&self) -> Option<&ConversationId> {
        self.state.current_id.as_ref()
    }

    /// The conversation currently receiving new turns.
    #[must_use]
    pub fn active_conversation(&self) -> Option<&Conversation> {
        self.active_id().and_then(|id| self.conversation(id))
    }

    /// Turns of the active conversation, or an empty slice.
    #[must_use]
    pub fn active_history(&self) -> &[Turn] {
        self.active_conversation()
            .map(|conv| conv.history.as_slice())
            .unwrap_or_default()
    }

    /// Read-only view of the full session state.
    #[must_use]
    pub const fn state(&self) -> &SessionState {
        &self.state
    }

    /// Create an empty conversation, make it active, and return its id.
    pub fn create_conversation(&mut self) -> ConversationId {
        let id = self.insert_conversation();
        self.persist();
        id
    }

    /// Make `id` active. Unknown ids are ignored.
    pub fn select_conversation(&mut self, id: &ConversationId) {
        if self.conversation(id).is_none() {
            debug!("Ignoring select of unknown conversation {id}");
            return;
        }
        if self.active_id() == Some(id) {
            return;
        }

        self.state.current_id = Some(id.clone());
        debug!("Selected conversation {id}");
        self.persist();
    }

    /// Remove a conversation, repairing the active pointer if needed.
    ///
    /// Deleting the last conversation replaces it with a fresh empty one.
    pub fn delete_conversation(&mut self, id: &ConversationId) {
        let Some(index) = self.position(id) else {
            debug!("Ignoring delete of unknown conversation {id}");
            return;
        };

        self.state.conversations.remove(index);
        debug!("Deleted conversation {id}");

        if self.active_id() == Some(id) {
            self.state.current_id = self.state.conversations.first().map(|c| c.id.clone());
            if self.state.current_id.is_none() {
                self.insert_conversation();
            }
        }

        self.persist();
    }

    /// Rename a conversation. Blank names and unknown ids are ignored.
    pub fn rename_conversation(&mut self, id: &ConversationId, new_name: &str) {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            debug!("Ignoring blank rename of conversation {id}");
            return;
        }
        let Some(index) = self.position(id) else {
            debug!("Ignoring rename of unknown conversation {id}");
            return;
        };

        let now = self.clock.now();
        let conv = &mut self.state.conversations[index];
        conv.name = new_name.to_string();
        conv.touch(now);
        self.bring_to_front(index);
        debug!("Renamed conversation {id} to {new_name:?}");
        self.persist();
    }

    /// Append a turn to the active conversation, creating one first if none is active.
    ///
    /// The first turn of a conversation that still carries its default name
    /// also renames it after the prompt.
    pub fn append_turn(
        &mut self,
        prompt: impl Into<String>,
        response: impl Into<String>,
        sources: Vec<String>,
    ) -> Turn {
        let index = match self.active_id().and_then(|id| self.position(id)) {
            Some(index) => index,
            None => {
                let id = self.insert_conversation();
                self.position(&id).unwrap_or_default()
            }
        };

        let now = self.clock.now();
        let prompt = prompt.into();
        let title = self.naming.title_from_prompt(&prompt);
        let conv = &mut self.state.conversations[index];

        let turn_id = TurnId::from_millis(next_millis(
            now,
            conv.history.iter().map(|t| t.id.millis()),
        ));
        let turn = Turn {
            id: turn_id,
            prompt,
            response: response.into(),
            sources,
            timestamp: now,
        };

        if conv.is_empty() && self.naming.is_default_name(&conv.name) {
            if let Some(title) = title {
                conv.name = title;
            }
        }
        conv.history.push(turn.clone());
        conv.touch(now);
        debug!(conversation = %conv.id, turn = %turn.id, "Appended turn");

        self.bring_to_front(index);
        self.persist();
        turn
    }

    /// Insert a new empty conversation at the head and make it active, without persisting.
    fn insert_conversation(&mut self) -> ConversationId {
        let now = self.clock.now();
        let id = ConversationId::from_millis(next_millis(
            now,
            self.state.conversations.iter().map(|c| c.id.millis()),
        ));
        let name = self.naming.default_name(self.clock.today());

        self.state
            .conversations
            .insert(0, Conversation::new(id.clone(), name, now));
        sort_by_recency(&mut self.state.conversations);
        self.state.current_id = Some(id.clone());
        info!("Created conversation {id}");
        id
    }

    fn position(&self, id: &ConversationId) -> Option<usize> {
        self.state.conversations.iter().position(|c| &c.id == id)
    }

    /// Move a just-touched conversation ahead of its ties, then re-sort.
    fn bring_to_front(&mut self, index: usize) {
        let conv = self.state.conversations.remove(index);
        self.state.conversations.insert(0, conv);
        sort_by_recency(&mut self.state.conversations);
    }

    fn persist(&self) {
        let blob = match serde_json::to_string(&self.state) {
            Ok(blob) => blob,
            Err(e) => {
                warn!("Failed to serialize session state: {e}");
                return;
            }
        };
        if let Err(e) = self.storage.save(&blob) {
            warn!("Failed to save session state: {e}");
        }
    }
}

/// Stable sort, most recently updated first.
fn sort_by_recency(conversations: &mut [Conversation]) {
    conversations.sort_by(|a, b| b.last_updated.cmp(&a.last_updated));
}

/// Repair a restored state so every invariant holds.
fn reconcile(mut state: SessionState) -> SessionState {
    let mut seen = HashSet::new();
    state.conversations.retain(|conv| {
        let fresh = seen.insert(conv.id.clone());
        if !fresh {
            warn!("Dropping duplicate stored conversation {}", conv.id);
        }
        fresh
    });

    for conv in &mut state.conversations {
        if conv.last_updated < conv.created_at {
            conv.last_updated = conv.created_at;
        }
    }
    sort_by_recency(&mut state.conversations);

    let pointer_valid = state
        .current_id
        .as_ref()
        .is_some_and(|id| state.conversations.iter().any(|c| &c.id == id));
    if !pointer_valid {
        if let Some(stale) = &state.current_id {
            warn!("Stored active conversation {stale} no longer exists");
        }
        state.current_id = state.conversations.first().map(|c| c.id.clone());
    }

    state
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::*;
    use crate::common::clock::ManualClock;
    use crate::common::config::NamingConfig;
    use crate::common::errors::{SidekickError, SidekickResult};
    use crate::storage::MemoryStorage;

    struct FailingStorage;

    impl StateStorage for FailingStorage {
        fn load(&self) -> SidekickResult<Option<String>> {
            Err(SidekickError::StoragePoisoned)
        }

        fn save(&self, _blob: &str) -> SidekickResult<()> {
            Err(SidekickError::StoragePoisoned)
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
    }

    fn policy() -> NamePolicy {
        NamePolicy::new(&NamingConfig::default()).unwrap()
    }

    fn open_with(storage: &Arc<MemoryStorage>, clock: &Arc<ManualClock>) -> ConversationStore {
        ConversationStore::open(
            Box::new(Arc::clone(storage)),
            Box::new(Arc::clone(clock)),
            policy(),
        )
    }

    fn fresh() -> (ConversationStore, Arc<MemoryStorage>, Arc<ManualClock>) {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);
        (store, storage, clock)
    }

    fn stored_state(storage: &MemoryStorage) -> SessionState {
        serde_json::from_str(&storage.snapshot().unwrap()).unwrap()
    }

    fn assert_invariants(store: &ConversationStore) {
        let mut ids: Vec<_> = store.conversations().iter().map(|c| c.id.clone()).collect();
        let total = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), total, "duplicate conversation ids");
        if let Some(active) = store.active_id() {
            assert!(store.conversation(active).is_some(), "dangling active pointer");
        }
        for pair in store.conversations().windows(2) {
            assert!(pair[0].last_updated >= pair[1].last_updated, "not sorted");
        }
        for conv in store.conversations() {
            assert!(conv.last_updated >= conv.created_at);
        }
    }

    #[test]
    fn test_open_without_state_creates_one_active_conversation() {
        let (store, storage, _) = fresh();
        assert_eq!(store.conversations().len(), 1);
        let active = store.active_conversation().unwrap();
        assert_eq!(active.name, "Interview 1/1/2024");
        assert!(active.history.is_empty());
        assert_eq!(stored_state(&storage), *store.state());
    }

    #[test]
    fn test_open_with_corrupt_blob_starts_fresh() {
        let storage = Arc::new(MemoryStorage::with_blob("{not json"));
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);
        assert_eq!(store.conversations().len(), 1);
        assert!(store.active_id().is_some());
    }

    #[test]
    fn test_open_with_read_failure_starts_fresh() {
        let store = ConversationStore::open(
            Box::new(FailingStorage),
            Box::new(ManualClock::new(start())),
            policy(),
        );
        assert_eq!(store.conversations().len(), 1);
        assert!(store.active_conversation().is_some());
    }

    #[test]
    fn test_write_failure_keeps_memory_state() {
        let mut store = ConversationStore::open(
            Box::new(FailingStorage),
            Box::new(ManualClock::new(start())),
            policy(),
        );
        store.append_turn("q", "a", vec!["doc".to_string()]);
        assert_eq!(store.active_history().len(), 1);
    }

    #[test]
    fn test_create_makes_new_conversation_active_and_first() {
        let (mut store, storage, clock) = fresh();
        clock.advance(Duration::seconds(1));
        let id = store.create_conversation();

        assert_eq!(store.active_id(), Some(&id));
        assert_eq!(store.conversations()[0].id, id);
        assert_eq!(stored_state(&storage).current_id, Some(id));
    }

    #[test]
    fn test_ids_unique_within_same_millisecond() {
        let (mut store, _, _) = fresh();
        let a = store.create_conversation();
        let b = store.create_conversation();
        assert_ne!(a, b);
        assert_eq!(store.conversations()[0].id, b);
        assert!(b.millis() > a.millis());
        assert_invariants(&store);
    }

    #[test]
    fn test_select_unknown_is_noop() {
        let (mut store, _, _) = fresh();
        let before = store.active_id().cloned();
        store.select_conversation(&ConversationId::from("nope"));
        assert_eq!(store.active_id().cloned(), before);
    }

    #[test]
    fn test_select_switches_active() {
        let (mut store, storage, clock) = fresh();
        let first = store.active_id().cloned().unwrap();
        clock.advance(Duration::seconds(1));
        store.create_conversation();
        store.select_conversation(&first);
        assert_eq!(store.active_id(), Some(&first));
        assert_eq!(stored_state(&storage).current_id, Some(first));
    }

    #[test]
    fn test_delete_active_activates_most_recent_remaining() {
        let (mut store, _, clock) = fresh();
        let a = store.active_id().cloned().unwrap();
        clock.advance(Duration::seconds(1));
        let b = store.create_conversation();
        clock.advance(Duration::seconds(1));
        let c = store.create_conversation();

        clock.advance(Duration::seconds(1));
        store.select_conversation(&a);
        store.append_turn("touch a", "ok", Vec::new());

        store.select_conversation(&c);
        store.delete_conversation(&c);

        assert_eq!(store.active_id(), Some(&a));
        assert!(store.conversation(&b).is_some());
        assert_invariants(&store);
    }

    #[test]
    fn test_delete_inactive_keeps_pointer() {
        let (mut store, _, clock) = fresh();
        let a = store.active_id().cloned().unwrap();
        clock.advance(Duration::seconds(1));
        let b = store.create_conversation();
        store.delete_conversation(&a);
        assert_eq!(store.active_id(), Some(&b));
        assert_eq!(store.conversations().len(), 1);
    }

    #[test]
    fn test_delete_last_creates_fresh_active() {
        let (mut store, storage, clock) = fresh();
        let only = store.active_id().cloned().unwrap();
        store.append_turn("hello", "hi", Vec::new());
        clock.advance(Duration::seconds(5));

        store.delete_conversation(&only);

        assert_eq!(store.conversations().len(), 1);
        let active = store.active_conversation().unwrap();
        assert_ne!(active.id, only);
        assert!(active.history.is_empty());
        assert_eq!(stored_state(&storage), *store.state());
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let (mut store, _, _) = fresh();
        let before = store.state().clone();
        store.delete_conversation(&ConversationId::from("missing"));
        assert_eq!(*store.state(), before);
    }

    #[test]
    fn test_rename_whitespace_is_noop() {
        let (mut store, _, clock) = fresh();
        let id = store.active_id().cloned().unwrap();
        let before = store.active_conversation().unwrap().clone();
        clock.advance(Duration::seconds(1));
        store.rename_conversation(&id, "   ");
        assert_eq!(store.active_conversation().unwrap(), &before);
    }

    #[test]
    fn test_rename_trims_touches_and_resorts() {
        let (mut store, _, clock) = fresh();
        let a = store.active_id().cloned().unwrap();
        clock.advance(Duration::seconds(1));
        store.create_conversation();
        clock.advance(Duration::seconds(1));

        store.rename_conversation(&a, "  Acme onsite  ");

        let first = &store.conversations()[0];
        assert_eq!(first.id, a);
        assert_eq!(first.name, "Acme onsite");
        assert_eq!(first.last_updated, clock.now());
    }

    #[test]
    fn test_open_with_empty_record_creates_active_conversation() {
        let storage = Arc::new(MemoryStorage::with_blob(
            r#"{"conversations":[],"currentId":null}"#,
        ));
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);

        assert_eq!(store.conversations().len(), 1);
        let active = store.active_conversation().unwrap();
        assert!(active.history.is_empty());
        assert_eq!(stored_state(&storage), *store.state());
    }

    #[test]
    fn test_append_on_empty_store_creates_exactly_one() {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(start()));
        let mut store = ConversationStore {
            storage: Box::new(Arc::clone(&storage)),
            clock: Box::new(Arc::clone(&clock)),
            naming: policy(),
            state: SessionState::default(),
        };
        assert!(store.active_id().is_none());

        store.append_turn("first question", "answer", Vec::new());

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.active_history().len(), 1);
        assert_eq!(stored_state(&storage).conversations.len(), 1);
    }

    #[test]
    fn test_first_turn_renames_default_named_conversation() {
        let (mut store, _, _) = fresh();
        assert_eq!(store.active_conversation().unwrap().name, "Interview 1/1/2024");

        store.append_turn(
            "What is a transformer model and how does self-attention work?",
            "It is...",
            Vec::new(),
        );

        assert_eq!(
            store.active_conversation().unwrap().name,
            "What is a transformer model an..."
        );
    }

    #[test]
    fn test_custom_name_survives_first_turn() {
        let (mut store, _, _) = fresh();
        let id = store.active_id().cloned().unwrap();
        store.rename_conversation(&id, "Acme onsite");
        store.append_turn("What is RAG?", "Retrieval...", Vec::new());
        assert_eq!(store.active_conversation().unwrap().name, "Acme onsite");
    }

    #[test]
    fn test_second_turn_does_not_rename() {
        let (mut store, _, clock) = fresh();
        store.append_turn("first", "a", Vec::new());
        let id = store.active_id().cloned().unwrap();
        store.rename_conversation(&id, "Interview 2/2/2024");
        clock.advance(Duration::seconds(1));
        store.append_turn("second", "b", Vec::new());
        assert_eq!(store.active_conversation().unwrap().name, "Interview 2/2/2024");
    }

    #[test]
    fn test_turn_ids_unique_within_conversation() {
        let (mut store, _, _) = fresh();
        let a = store.append_turn("one", "1", Vec::new());
        let b = store.append_turn("two", "2", Vec::new());
        assert_ne!(a.id, b.id);
        let history = store.active_history();
        assert_eq!(history[0].prompt, "one");
        assert_eq!(history[1].prompt, "two");
    }

    #[test]
    fn test_roundtrip_reproduces_history_and_citations() {
        let (mut store, storage, clock) = fresh();
        store.append_turn("q1", "a1", vec!["paper-7".to_string(), "notes.md".to_string()]);
        clock.advance(Duration::seconds(1));
        store.append_turn("q2", "a2", Vec::new());
        let expected = store.active_history().to_vec();

        let reloaded = open_with(&storage, &clock);
        assert_eq!(reloaded.active_history(), expected.as_slice());
        assert_eq!(reloaded.active_history()[0].sources, vec!["paper-7", "notes.md"]);
    }

    #[test]
    fn test_touch_order_puts_latest_first() {
        let (mut store, _, clock) = fresh();
        let a = store.active_id().cloned().unwrap();
        let b = store.create_conversation();

        store.select_conversation(&a);
        store.append_turn("to a", "x", Vec::new());
        store.select_conversation(&b);
        store.append_turn("to b", "y", Vec::new());
        assert_eq!(store.conversations()[0].id, b);
        assert_eq!(store.conversations()[1].id, a);

        clock.advance(Duration::seconds(1));
        store.rename_conversation(&a, "A");
        assert_eq!(store.conversations()[0].id, a);
    }

    #[test]
    fn test_clock_going_backwards_keeps_invariants() {
        let (mut store, _, clock) = fresh();
        clock.set(start() - Duration::days(1));
        store.append_turn("late", "x", Vec::new());
        store.create_conversation();
        assert_invariants(&store);
    }

    #[test]
    fn test_restore_without_pointer_selects_most_recent() {
        let blob = r#"{
            "conversations": [
                {"id":"1","name":"old","history":[],
                 "createdAt":"2024-01-01T00:00:00Z","lastUpdated":"2024-01-01T00:00:00Z"},
                {"id":"2","name":"new","history":[],
                 "createdAt":"2024-01-02T00:00:00Z","lastUpdated":"2024-01-03T00:00:00Z"}
            ],
            "currentId": null
        }"#;
        let storage = Arc::new(MemoryStorage::with_blob(blob));
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);

        assert_eq!(store.active_id(), Some(&ConversationId::from("2")));
        assert_eq!(store.conversations()[0].name, "new");
    }

    #[test]
    fn test_restore_ties_pick_first_occurrence() {
        let blob = r#"{"conversations":[
            {"id":"a","name":"A","createdAt":"2024-01-01T00:00:00Z","lastUpdated":"2024-01-02T00:00:00Z"},
            {"id":"b","name":"B","createdAt":"2024-01-01T00:00:00Z","lastUpdated":"2024-01-02T00:00:00Z"}
        ]}"#;
        let storage = Arc::new(MemoryStorage::with_blob(blob));
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);
        assert_eq!(store.active_id(), Some(&ConversationId::from("a")));
    }

    #[test]
    fn test_restore_repairs_dangling_pointer_and_duplicates() {
        let blob = r#"{"conversations":[
            {"id":"1","name":"first","createdAt":"2024-01-05T00:00:00Z","lastUpdated":"2024-01-01T00:00:00Z"},
            {"id":"1","name":"dup","createdAt":"2024-01-01T00:00:00Z","lastUpdated":"2024-01-09T00:00:00Z"}
        ],"currentId":"gone"}"#;
        let storage = Arc::new(MemoryStorage::with_blob(blob));
        let clock = Arc::new(ManualClock::new(start()));
        let store = open_with(&storage, &clock);

        assert_eq!(store.conversations().len(), 1);
        assert_eq!(store.conversations()[0].name, "first");
        assert_eq!(store.active_id(), Some(&ConversationId::from("1")));
        assert_invariants(&store);
    }

    #[test]
    fn test_random_operation_sequence_keeps_invariants() {
        let (mut store, storage, clock) = fresh();
        for step in 0_u32..60 {
            clock.advance(Duration::milliseconds(i64::from(step % 3)));
            let ids: Vec<_> = store.conversations().iter().map(|c| c.id.clone()).collect();
            let pick = ids[(step as usize * 7) % ids.len()].clone();
            match step % 5 {
                0 => {
                    store.create_conversation();
                }
                1 => store.delete_conversation(&pick),
                2 => store.rename_conversation(&pick, &format!("name {step}")),
                3 => store.select_conversation(&pick),
                _ => {
                    store.append_turn(format!("q{step}"), "a", Vec::new());
                }
            }
            assert_invariants(&store);
            assert!(store.active_id().is_some());
            assert_eq!(stored_state(&storage), *store.state());
        }
    }
}
