//! Runtime application state for an interactive session.

pub mod conversation;

use tokio_util::sync::CancellationToken;
use tui_textarea::TextArea;

use crate::api::{ChatSummary, UltronClient};
use crate::core::categories::{self, Category};
use crate::core::chat_stream::StreamMessage;
use crate::core::config::Config;
use crate::core::memory::MemoryStore;
use crate::core::prompts::PromptLibrary;
use crate::ui::picker::{PickerItem, PickerState};
use crate::ui::theme::Theme;
use crate::utils::logging::LoggingState;

pub use conversation::{title_from_first_message, ConversationState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Home,
    Chat,
    Settings,
    Memory,
    Prompts,
}

pub struct App {
    pub client: UltronClient,
    pub config: Config,
    pub theme: Theme,
    pub logging: LoggingState,

    pub view: View,
    pub panel_return: View,
    pub category: &'static Category,
    pub chats: Vec<ChatSummary>,
    pub recent: Vec<ChatSummary>,
    pub conversation: ConversationState,

    pub home_picker: PickerState,
    pub sidebar: PickerState,
    pub panel_picker: PickerState,
    pub sidebar_focused: bool,

    pub memory: MemoryStore,
    pub prompts: PromptLibrary,

    pub input: TextArea<'static>,
    pub status: Option<String>,
    pub scroll_offset: u16,
    pub auto_scroll: bool,

    pub stream_cancel_token: Option<CancellationToken>,
    pub current_stream_id: u64,
    pub exit_requested: bool,
}

impl App {
    pub fn new(
        config: Config,
        logging: LoggingState,
        memory: MemoryStore,
        prompts: PromptLibrary,
    ) -> Self {
        let client = UltronClient::new(config.resolved_base_url());
        let theme = config
            .theme
            .as_deref()
            .map(Theme::from_name)
            .unwrap_or_else(Theme::dark_default);
        let category = config
            .default_category
            .as_deref()
            .and_then(categories::find_category)
            .unwrap_or_else(categories::default_category);

        let input = Self::themed_input(&theme);
        let mut app = Self {
            client,
            config,
            theme,
            logging,
            view: View::Home,
            panel_return: View::Home,
            category,
            chats: Vec::new(),
            recent: Vec::new(),
            conversation: ConversationState::new(),
            home_picker: PickerState::default(),
            sidebar: PickerState::default(),
            panel_picker: PickerState::default(),
            sidebar_focused: false,
            memory,
            prompts,
            input,
            status: None,
            scroll_offset: 0,
            auto_scroll: true,
            stream_cancel_token: None,
            current_stream_id: 0,
            exit_requested: false,
        };
        app.rebuild_home_picker();
        app
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    pub fn clear_status(&mut self) {
        self.status = None;
    }

    fn themed_input(theme: &Theme) -> TextArea<'static> {
        let mut input = TextArea::default();
        input.set_style(theme.input_text_style);
        input.set_cursor_style(theme.input_cursor_style);
        input
    }

    /// Drain the input box into a single string.
    pub fn take_input(&mut self) -> String {
        let text = self.input.lines().join("\n");
        self.input = Self::themed_input(&self.theme);
        text
    }

    pub fn insert_input_text(&mut self, text: &str) {
        self.input.insert_str(text);
    }

    // --- streaming lifecycle -------------------------------------------

    /// Allocate the next stream id and a fresh cancellation token. A live
    /// stream is cancelled first; its late chunks fail the id check below.
    pub fn begin_new_stream(&mut self) -> (u64, CancellationToken) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        self.current_stream_id += 1;
        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        (self.current_stream_id, token)
    }

    /// User-initiated abort: stop the reader and settle the transient
    /// entry with whatever text accumulated.
    pub fn cancel_active_stream(&mut self) -> bool {
        let Some(token) = self.stream_cancel_token.take() else {
            return false;
        };
        token.cancel();
        self.conversation.cancel_stream();
        true
    }

    pub fn stream_is_active(&self) -> bool {
        self.stream_cancel_token.is_some()
    }

    /// Apply one message from the stream channel. Messages from superseded
    /// streams are dropped. Returns true when the screen needs a redraw.
    pub fn handle_stream_message(&mut self, message: StreamMessage, stream_id: u64) -> bool {
        if stream_id != self.current_stream_id {
            return false;
        }
        match message {
            StreamMessage::Chunk(text) => self.conversation.append_chunk(&text),
            StreamMessage::Error(error) => {
                self.conversation.fail_stream(error);
                true
            }
            StreamMessage::End => {
                if let Some(token) = self.stream_cancel_token.take() {
                    token.cancel();
                }
                if self.conversation.finalize_stream().is_some() {
                    if let Some(text) = self
                        .conversation
                        .entries()
                        .iter()
                        .rev()
                        .find(|e| e.is_assistant())
                        .map(|e| e.text.clone())
                    {
                        if let Err(e) = self.logging.log_message(&text) {
                            self.set_status(format!("Log error: {e}"));
                        }
                    }
                }
                true
            }
        }
    }

    // --- picker/list maintenance ---------------------------------------

    pub fn rebuild_home_picker(&mut self) {
        let mut items: Vec<PickerItem> = categories::CATEGORIES
            .iter()
            .map(|c| {
                PickerItem::new(format!("category:{}", c.slug), c.label)
                    .with_detail(c.description)
            })
            .collect();
        items.push(PickerItem::new("panel:settings", "Settings").with_detail("Console settings"));
        items.push(PickerItem::new("panel:memory", "Memory").with_detail("Saved notes"));
        items.push(PickerItem::new("panel:prompts", "Prompts").with_detail("Prompt library"));
        for chat in &self.recent {
            let detail = chat.last_message.clone().unwrap_or_default();
            items.push(
                PickerItem::new(format!("chat:{}", chat.id), chat.chat_name.clone())
                    .with_detail(detail),
            );
        }
        self.home_picker.title = "Ultron Console".to_string();
        self.home_picker.replace_items(items);
    }

    pub fn rebuild_sidebar(&mut self) {
        let items: Vec<PickerItem> = self
            .chats
            .iter()
            .map(|chat| PickerItem::new(chat.id.clone(), chat.chat_name.clone()))
            .collect();
        self.sidebar.title = format!("{} chats", self.category.label);
        self.sidebar.replace_items(items);
    }

    pub fn rebuild_panel_picker(&mut self) {
        let (title, items) = match self.view {
            View::Settings => (
                "Settings".to_string(),
                vec![
                    PickerItem::new("base-url", "Base URL")
                        .with_detail(self.config.resolved_base_url().to_string()),
                    PickerItem::new("theme", "Theme (Enter to toggle)")
                        .with_detail(self.theme.name.to_string()),
                    PickerItem::new("default-category", "Default category").with_detail(
                        self.config
                            .default_category
                            .clone()
                            .unwrap_or_else(|| "(unset)".to_string()),
                    ),
                    PickerItem::new("display-name", "Display name")
                        .with_detail(self.config.resolved_display_name().to_string()),
                    PickerItem::new("logging", "Transcript logging")
                        .with_detail(self.logging.get_status_string()),
                ],
            ),
            View::Memory => (
                "Memory".to_string(),
                self.memory
                    .notes()
                    .iter()
                    .enumerate()
                    .map(|(i, note)| {
                        PickerItem::new(i.to_string(), note.text.clone())
                            .with_detail(note.created_at.format("%Y-%m-%d").to_string())
                    })
                    .collect(),
            ),
            View::Prompts => (
                "Prompt library".to_string(),
                self.prompts
                    .prompts()
                    .iter()
                    .enumerate()
                    .map(|(i, prompt)| {
                        PickerItem::new(i.to_string(), prompt.name.clone())
                            .with_detail(prompt.text.lines().next().unwrap_or("").to_string())
                    })
                    .collect(),
            ),
            _ => return,
        };
        self.panel_picker.title = title;
        self.panel_picker.replace_items(items);
    }

    pub fn selected_sidebar_chat(&self) -> Option<&ChatSummary> {
        let id = self.sidebar.selected_id()?;
        self.chats.iter().find(|c| c.id == id)
    }

    pub fn toggle_theme(&mut self) {
        self.theme = self.theme.toggled();
        self.config.theme = Some(self.theme.name.to_string());
        self.input.set_style(self.theme.input_text_style);
        self.input.set_cursor_style(self.theme.input_cursor_style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryStore::load_from_path(dir.path().join("memory.json")).unwrap();
        let prompts = PromptLibrary::load_from_path(dir.path().join("prompts.toml")).unwrap();
        let logging = LoggingState::new(None).unwrap();
        App::new(Config::default(), logging, memory, prompts)
    }

    #[test]
    fn stale_stream_messages_are_ignored() {
        let mut app = test_app();
        let (current, _token) = app.begin_new_stream();
        app.conversation.begin_stream();

        assert!(app.handle_stream_message(StreamMessage::Chunk("keep".to_string()), current));
        assert!(!app.handle_stream_message(
            StreamMessage::Chunk("stale".to_string()),
            current - 1
        ));
        assert_eq!(app.conversation.streaming_text(), Some("keep"));
    }

    #[test]
    fn end_settles_the_entry_and_releases_the_token() {
        let mut app = test_app();
        let (current, _token) = app.begin_new_stream();
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("done".to_string()), current);
        app.handle_stream_message(StreamMessage::End, current);

        assert!(!app.stream_is_active());
        assert!(!app.conversation.has_streaming_entry());
        assert_eq!(app.conversation.entries().last().unwrap().text, "done");
    }

    #[test]
    fn a_new_stream_supersedes_the_previous_one() {
        let mut app = test_app();
        let (first, first_token) = app.begin_new_stream();
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("first ".to_string()), first);

        let (second, _second_token) = app.begin_new_stream();
        assert!(first_token.is_cancelled());
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("second".to_string()), second);
        // Late chunk from the superseded stream
        assert!(!app.handle_stream_message(StreamMessage::Chunk("late".to_string()), first));

        assert_eq!(app.conversation.streaming_text(), Some("second"));
    }

    #[test]
    fn cancel_without_a_stream_is_a_no_op() {
        let mut app = test_app();
        assert!(!app.cancel_active_stream());
    }

    #[test]
    fn cancel_keeps_partial_text() {
        let mut app = test_app();
        let (current, token) = app.begin_new_stream();
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("partial".to_string()), current);

        assert!(app.cancel_active_stream());
        assert!(token.is_cancelled());
        assert!(!app.conversation.has_streaming_entry());
        assert_eq!(app.conversation.entries().last().unwrap().text, "partial");
    }

    #[test]
    fn transport_errors_surface_as_app_entries() {
        let mut app = test_app();
        let (current, _token) = app.begin_new_stream();
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("half".to_string()), current);
        app.handle_stream_message(
            StreamMessage::Error("Connection error: reset".to_string()),
            current,
        );
        app.handle_stream_message(StreamMessage::End, current);

        let entries = app.conversation.entries();
        assert_eq!(entries[entries.len() - 2].text, "half");
        assert!(entries.last().unwrap().is_app());
        assert!(!app.stream_is_active());
    }

    #[test]
    fn home_picker_lists_categories_panels_and_recent() {
        let mut app = test_app();
        app.recent = vec![ChatSummary {
            id: "c9".to_string(),
            chat_name: "Rust questions".to_string(),
            created_at: "2026-08-27T10:00:00".to_string(),
            category: Some("Code".to_string()),
            last_message: Some("thanks".to_string()),
        }];
        app.rebuild_home_picker();

        let ids: Vec<&str> = app.home_picker.items.iter().map(|i| i.id.as_str()).collect();
        assert!(ids.contains(&"category:chat"));
        assert!(ids.contains(&"panel:settings"));
        assert!(ids.contains(&"chat:c9"));
    }

    #[test]
    fn take_input_joins_lines_and_clears() {
        let mut app = test_app();
        app.insert_input_text("line one\nline two");
        assert_eq!(app.take_input(), "line one\nline two");
        assert_eq!(app.take_input(), "");
    }
}
