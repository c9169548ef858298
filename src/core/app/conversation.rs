//! Conversation transcript state and stream reconciliation.
//!
//! A response arrives as a placeholder assistant entry that grows in place
//! while chunks stream in, then settles into a permanent entry. User
//! messages are inserted optimistically under a local id and adopt the
//! server id once the service confirms them.

use tracing::warn;

use crate::api::{BackendMessage, HistoryTurn};
use crate::core::message::{EntryId, TranscriptEntry, TranscriptRole};

#[derive(Default)]
pub struct ConversationState {
    chat_id: Option<String>,
    entries: Vec<TranscriptEntry>,
    next_local_id: u64,
}

/// Default title for a chat named after its first message: the first few
/// words, like the original service does.
pub fn title_from_first_message(text: &str) -> String {
    text.split_whitespace().take(3).collect::<Vec<_>>().join(" ")
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_chat(chat_id: impl Into<String>) -> Self {
        Self {
            chat_id: Some(chat_id.into()),
            ..Self::default()
        }
    }

    pub fn chat_id(&self) -> Option<&str> {
        self.chat_id.as_deref()
    }

    pub fn set_chat_id(&mut self, chat_id: impl Into<String>) {
        self.chat_id = Some(chat_id.into());
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace the transcript with server history. Server entries are
    /// confirmed by construction.
    pub fn load_history(&mut self, messages: Vec<BackendMessage>) {
        self.entries.clear();
        for message in messages {
            let role = match TranscriptRole::from_api_role(&message.role) {
                Ok(role) => role,
                Err(e) => {
                    warn!(error = %e, "skipping history entry");
                    continue;
                }
            };
            let chat_id = message.chat_id.or_else(|| self.chat_id.clone());
            self.entries.push(TranscriptEntry::new(
                EntryId::Server(message.id),
                chat_id,
                role,
                message.content,
            ));
        }
    }

    fn alloc_local_id(&mut self) -> u64 {
        self.next_local_id += 1;
        self.next_local_id
    }

    /// Insert a user entry optimistically. Returns its tentative id.
    pub fn push_user(&mut self, text: impl Into<String>) -> EntryId {
        let id = EntryId::Local(self.alloc_local_id());
        self.entries.push(TranscriptEntry::user(
            id.clone(),
            self.chat_id.clone(),
            text,
        ));
        id
    }

    /// Swap a tentative id for the server-issued one. Position and content
    /// are untouched. Returns false when the entry is gone (e.g. the chat
    /// was switched before the confirmation arrived).
    pub fn confirm(&mut self, tentative: &EntryId, server_id: String) -> bool {
        match self.entries.iter_mut().find(|e| &e.id == tentative) {
            Some(entry) => {
                entry.id = EntryId::Server(server_id);
                true
            }
            None => false,
        }
    }

    /// Start receiving a response: insert a transient assistant entry with
    /// empty text. Any entry still marked streaming is finalized first, so
    /// at most one transient entry exists per conversation.
    pub fn begin_stream(&mut self) -> EntryId {
        self.finalize_stream();
        let id = EntryId::Local(self.alloc_local_id());
        self.entries.push(TranscriptEntry::assistant_streaming(
            id.clone(),
            self.chat_id.clone(),
        ));
        id
    }

    /// Append decoded text to the transient entry. Returns false when no
    /// stream is in progress (the chunk is dropped, not misfiled).
    pub fn append_chunk(&mut self, text: &str) -> bool {
        match self.entries.iter_mut().find(|e| e.streaming) {
            Some(entry) => {
                entry.text.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Settle the transient entry: clear the flag and keep its id as the
    /// stable one. The accumulated text is left exactly as received.
    pub fn finalize_stream(&mut self) -> Option<EntryId> {
        let entry = self.entries.iter_mut().find(|e| e.streaming)?;
        entry.streaming = false;
        Some(entry.id.clone())
    }

    /// A user-initiated abort keeps whatever text accumulated.
    pub fn cancel_stream(&mut self) -> Option<EntryId> {
        self.finalize_stream()
    }

    /// A transport failure settles the in-progress entry untouched and
    /// surfaces the error as a separate, clearly-marked entry.
    pub fn fail_stream(&mut self, error: impl Into<String>) {
        self.finalize_stream();
        self.add_app_error(error);
    }

    pub fn has_streaming_entry(&self) -> bool {
        self.entries.iter().any(|e| e.streaming)
    }

    pub fn streaming_text(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.streaming)
            .map(|e| e.text.as_str())
    }

    pub fn add_app_info(&mut self, text: impl Into<String>) {
        let id = EntryId::Local(self.alloc_local_id());
        self.entries.push(TranscriptEntry::app_info(id, text));
    }

    pub fn add_app_warning(&mut self, text: impl Into<String>) {
        let id = EntryId::Local(self.alloc_local_id());
        self.entries.push(TranscriptEntry::app_warning(id, text));
    }

    pub fn add_app_error(&mut self, text: impl Into<String>) {
        let id = EntryId::Local(self.alloc_local_id());
        self.entries.push(TranscriptEntry::app_error(id, text));
    }

    /// Prior turns for a streaming request: user/assistant entries only,
    /// excluding the in-progress one.
    pub fn history_for_api(&self) -> Vec<HistoryTurn> {
        self.entries
            .iter()
            .filter(|e| !e.streaming)
            .filter_map(|e| {
                e.role.to_api_role().map(|role| HistoryTurn {
                    role: role.to_string(),
                    content: e.text.clone(),
                })
            })
            .collect()
    }

    pub fn last_user_text(&self) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.is_user())
            .map(|e| e.text.as_str())
    }

    /// Drop the last settled assistant entry, e.g. before a retry.
    pub fn remove_last_assistant(&mut self) -> Option<TranscriptEntry> {
        let index = self
            .entries
            .iter()
            .rposition(|e| e.is_assistant() && !e.streaming)?;
        Some(self.entries.remove(index))
    }

    /// Pull the last user entry (and everything after it) out of the
    /// transcript so it can be edited and re-sent.
    pub fn take_last_user_for_edit(&mut self) -> Option<String> {
        let index = self.entries.iter().rposition(|e| e.is_user())?;
        let text = self.entries[index].text.clone();
        self.entries.truncate(index);
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_message(id: &str, role: &str, content: &str) -> BackendMessage {
        BackendMessage {
            id: id.to_string(),
            chat_id: Some("c1".to_string()),
            content: content.to_string(),
            role: role.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn chunks_concatenate_in_delivery_order() {
        let mut conversation = ConversationState::for_chat("c1");
        conversation.begin_stream();
        for chunk in ["Hel", "lo, ", "world"] {
            assert!(conversation.append_chunk(chunk));
        }
        conversation.finalize_stream();

        let entry = conversation.entries().last().unwrap();
        assert_eq!(entry.text, "Hello, world");
        assert!(!entry.streaming);
    }

    #[test]
    fn zero_chunk_stream_finalizes_empty() {
        let mut conversation = ConversationState::new();
        let id = conversation.begin_stream();
        let finalized = conversation.finalize_stream();
        assert_eq!(finalized, Some(id));

        let entry = conversation.entries().last().unwrap();
        assert_eq!(entry.text, "");
        assert!(!entry.streaming);
        assert!(!conversation.has_streaming_entry());
    }

    #[test]
    fn cancel_keeps_accumulated_text_and_clears_the_flag() {
        let mut conversation = ConversationState::new();
        conversation.begin_stream();
        conversation.append_chunk("partial ans");
        conversation.cancel_stream();

        let entry = conversation.entries().last().unwrap();
        assert_eq!(entry.text, "partial ans");
        assert!(!entry.streaming);
        assert!(!conversation.append_chunk("late chunk"));
        assert_eq!(conversation.entries().last().unwrap().text, "partial ans");
    }

    #[test]
    fn transport_error_adds_a_distinct_entry() {
        let mut conversation = ConversationState::new();
        conversation.begin_stream();
        conversation.append_chunk("half an answ");
        let before = conversation.entries().len();
        conversation.fail_stream("Connection error: connection reset");

        assert_eq!(conversation.entries().len(), before + 1);
        let partial = &conversation.entries()[before - 1];
        assert_eq!(partial.text, "half an answ");
        assert!(!partial.streaming);
        let error = conversation.entries().last().unwrap();
        assert_eq!(error.role, TranscriptRole::AppError);
        assert!(error.text.contains("connection reset"));
    }

    #[test]
    fn at_most_one_transient_entry() {
        let mut conversation = ConversationState::new();
        conversation.begin_stream();
        conversation.append_chunk("first");
        conversation.begin_stream();

        let streaming: Vec<_> = conversation
            .entries()
            .iter()
            .filter(|e| e.streaming)
            .collect();
        assert_eq!(streaming.len(), 1);
        assert!(streaming[0].text.is_empty());
        // The superseded entry kept its text and settled
        assert_eq!(conversation.entries()[0].text, "first");
        assert!(!conversation.entries()[0].streaming);
    }

    #[test]
    fn tentative_user_ids_are_confirmed_in_place() {
        let mut conversation = ConversationState::for_chat("c1");
        let tentative = conversation.push_user("hello");
        conversation.begin_stream();

        assert!(conversation.confirm(&tentative, "m-42".to_string()));
        let entry = &conversation.entries()[0];
        assert_eq!(entry.id, EntryId::Server("m-42".to_string()));
        assert_eq!(entry.text, "hello");
        assert!(entry.id.is_confirmed());
        // Unknown tentative ids are a no-op
        assert!(!conversation.confirm(&EntryId::Local(99), "m-43".to_string()));
    }

    #[test]
    fn history_excludes_app_entries_and_the_streaming_entry() {
        let mut conversation = ConversationState::new();
        conversation.push_user("question");
        conversation.add_app_error("API error");
        conversation.begin_stream();
        conversation.append_chunk("in progress");

        let history = conversation.history_for_api();
        assert_eq!(
            history,
            vec![HistoryTurn {
                role: "user".to_string(),
                content: "question".to_string(),
            }]
        );
    }

    #[test]
    fn history_load_maps_backend_roles() {
        let mut conversation = ConversationState::for_chat("c1");
        conversation.load_history(vec![
            backend_message("m1", "user", "hi"),
            backend_message("m2", "ai", "hello"),
            backend_message("m3", "system", "ignored"),
        ]);

        assert_eq!(conversation.entries().len(), 2);
        assert_eq!(conversation.entries()[1].role, TranscriptRole::Assistant);
        assert!(conversation.entries().iter().all(|e| e.id.is_confirmed()));
    }

    #[test]
    fn retry_removes_only_the_last_settled_assistant() {
        let mut conversation = ConversationState::new();
        conversation.push_user("q1");
        conversation.begin_stream();
        conversation.append_chunk("a1");
        conversation.finalize_stream();

        let removed = conversation.remove_last_assistant().unwrap();
        assert_eq!(removed.text, "a1");
        assert_eq!(conversation.last_user_text(), Some("q1"));
        assert!(conversation.remove_last_assistant().is_none());
    }

    #[test]
    fn edit_takes_the_last_user_turn_and_its_answer() {
        let mut conversation = ConversationState::new();
        conversation.push_user("q1");
        conversation.begin_stream();
        conversation.append_chunk("a1");
        conversation.finalize_stream();
        conversation.push_user("q2");
        conversation.begin_stream();
        conversation.append_chunk("a2");
        conversation.finalize_stream();

        let taken = conversation.take_last_user_for_edit().unwrap();
        assert_eq!(taken, "q2");
        assert_eq!(conversation.entries().len(), 2);
        assert_eq!(conversation.last_user_text(), Some("q1"));
    }

    #[test]
    fn titles_come_from_the_first_words() {
        assert_eq!(title_from_first_message("help with rust lifetimes"), "help with rust");
        assert_eq!(title_from_first_message("  hi  "), "hi");
        assert_eq!(title_from_first_message(""), "");
    }
}
