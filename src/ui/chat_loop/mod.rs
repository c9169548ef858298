//! Main event loop: terminal setup, user input, and display updates.
//!
//! All state mutation happens on this task. Streams run on spawned tasks
//! and report back over the channel drained at the top of each iteration.

use std::{error::Error, io, time::Duration};

use chrono::Local;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::Size, Terminal};
use tokio::sync::mpsc;
use tracing::warn;
use tui_textarea::Input;

use crate::api::StreamChatRequest;
use crate::commands::{process_input, CommandResult};
use crate::core::app::{title_from_first_message, App, ConversationState, View};
use crate::core::categories;
use crate::core::chat_stream::{StreamDispatcher, StreamMessage, StreamParams};
use crate::ui::renderer::{ui, wrapped_display_lines};
use crate::utils::scroll::{bottom_offset, clamp_offset};

pub async fn run_chat(
    mut app: App,
    initial_category: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    // Channel for streaming updates, tagged with the stream id
    let (tx, mut rx) = mpsc::unbounded_channel::<(StreamMessage, u64)>();
    let dispatcher = StreamDispatcher::new(tx);

    refresh_recent(&mut app).await;
    if let Some(slug) = initial_category {
        open_category(&mut app, slug).await;
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut app, &dispatcher, &mut rx).await;

    // Restore the terminal whether the loop ended cleanly or with an error
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    dispatcher: &StreamDispatcher,
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
) -> Result<(), Box<dyn Error>> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.exit_requested {
            return Ok(());
        }

        // Drain all pending stream updates, then redraw
        let mut received_any = false;
        while let Ok((message, stream_id)) = rx.try_recv() {
            if app.handle_stream_message(message, stream_id) {
                received_any = true;
            }
        }
        if received_any {
            continue;
        }

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let size = terminal.size()?;
                    handle_key(app, dispatcher, key, size).await;
                }
            }
        }
    }
}

async fn handle_key(app: &mut App, dispatcher: &StreamDispatcher, key: KeyEvent, size: Size) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.exit_requested = true;
        return;
    }

    match app.view {
        View::Home => handle_home_key(app, key).await,
        View::Chat => handle_chat_key(app, dispatcher, key, size).await,
        View::Settings | View::Memory | View::Prompts => handle_panel_key(app, key),
    }
}

async fn handle_home_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Up => app.home_picker.move_up(),
        KeyCode::Down => app.home_picker.move_down(),
        KeyCode::Enter => {
            let Some(id) = app.home_picker.selected_id().map(|id| id.to_string()) else {
                return;
            };
            if let Some(slug) = id.strip_prefix("category:") {
                let slug = slug.to_string();
                open_category(app, &slug).await;
            } else if let Some(panel) = id.strip_prefix("panel:") {
                let view = match panel {
                    "settings" => View::Settings,
                    "memory" => View::Memory,
                    _ => View::Prompts,
                };
                open_panel(app, view);
            } else if let Some(chat_id) = id.strip_prefix("chat:") {
                let chat_id = chat_id.to_string();
                open_recent_chat(app, &chat_id).await;
            }
        }
        KeyCode::Char('d') => {
            // Delete a recent conversation from the home list
            let Some(id) = app.home_picker.selected_id().map(|id| id.to_string()) else {
                return;
            };
            if let Some(chat_id) = id.strip_prefix("chat:") {
                let chat_id = chat_id.to_string();
                match app.client.delete_chat(&chat_id).await {
                    Ok(()) => {
                        app.recent.retain(|c| c.id != chat_id);
                        app.rebuild_home_picker();
                        app.set_status("Conversation deleted");
                    }
                    Err(e) => {
                        warn!(error = %e, "delete failed");
                        app.set_status(format!("Delete failed: {e}"));
                    }
                }
            }
        }
        _ => {}
    }
}

async fn handle_chat_key(
    app: &mut App,
    dispatcher: &StreamDispatcher,
    key: KeyEvent,
    size: Size,
) {
    // Rows reserved around the transcript: header, input box, status line;
    // columns reserved for the sidebar
    let available_height = size.height.saturating_sub(7);
    let pane_width = size.width.saturating_sub(28);

    match key.code {
        KeyCode::Esc => {
            if app.cancel_active_stream() {
                app.set_status("Response cancelled");
            } else {
                app.view = View::Home;
                app.sidebar_focused = false;
                refresh_recent(app).await;
            }
        }
        KeyCode::Tab => {
            app.sidebar_focused = !app.sidebar_focused;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            app.input.insert_newline();
        }
        KeyCode::Enter => {
            if app.sidebar_focused {
                if let Some(chat_id) = app.sidebar.selected_id().map(|id| id.to_string()) {
                    open_chat(app, &chat_id).await;
                    app.sidebar_focused = false;
                }
            } else {
                submit_input(app, dispatcher).await;
            }
        }
        KeyCode::Up if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.sidebar.move_up();
        }
        KeyCode::Down if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.sidebar.move_down();
        }
        KeyCode::Up if app.sidebar_focused => app.sidebar.move_up(),
        KeyCode::Down if app.sidebar_focused => app.sidebar.move_down(),
        KeyCode::Up => scroll_up(app, pane_width, available_height, 1),
        KeyCode::Down => scroll_down(app, pane_width, available_height, 1),
        KeyCode::PageUp => scroll_up(app, pane_width, available_height, 10),
        KeyCode::PageDown => scroll_down(app, pane_width, available_height, 10),
        KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            start_new_chat(app);
        }
        KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            retry_last_response(app, dispatcher);
        }
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            // A live response would otherwise keep streaming into a
            // transcript the edit is about to truncate
            app.cancel_active_stream();
            if let Some(text) = app.conversation.take_last_user_for_edit() {
                app.take_input();
                app.insert_input_text(&text);
                app.set_status("Editing last message (Enter re-sends)");
            }
        }
        _ if !app.sidebar_focused => {
            app.input.input(Input::from(key));
        }
        _ => {}
    }
}

fn handle_panel_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.view = app.panel_return;
        }
        KeyCode::Up => app.panel_picker.move_up(),
        KeyCode::Down => app.panel_picker.move_down(),
        KeyCode::Enter => match app.view {
            View::Settings => {
                if app.panel_picker.selected_id() == Some("theme") {
                    app.toggle_theme();
                    if let Err(e) = app.config.save() {
                        app.set_status(format!("Could not save config: {e}"));
                    }
                    app.rebuild_panel_picker();
                } else {
                    app.set_status("Edit with: ultron set <key> <value>");
                }
            }
            View::Prompts => {
                if let Some(index) = app
                    .panel_picker
                    .selected_id()
                    .and_then(|id| id.parse::<usize>().ok())
                {
                    if let Some(snippet) = app.prompts.get(index) {
                        let text = snippet.text.clone();
                        app.insert_input_text(&text);
                        app.view = app.panel_return;
                    }
                }
            }
            _ => {}
        },
        KeyCode::Char('d') if app.view == View::Memory => {
            if let Some(index) = app
                .panel_picker
                .selected_id()
                .and_then(|id| id.parse::<usize>().ok())
            {
                match app.memory.remove(index) {
                    Ok(()) => app.set_status("Memory note deleted"),
                    Err(e) => app.set_status(format!("Memory error: {e}")),
                }
                app.rebuild_panel_picker();
            }
        }
        _ => {}
    }
}

fn scroll_up(app: &mut App, pane_width: u16, available_height: u16, step: u16) {
    // Offsets count wrapped rows, matching what the renderer draws
    let total_lines = wrapped_display_lines(app, pane_width).len() as u16;
    let bottom = bottom_offset(total_lines, available_height);
    let current = if app.auto_scroll {
        bottom
    } else {
        clamp_offset(app.scroll_offset, total_lines, available_height)
    };
    app.auto_scroll = false;
    app.scroll_offset = current.saturating_sub(step);
}

fn scroll_down(app: &mut App, pane_width: u16, available_height: u16, step: u16) {
    let total_lines = wrapped_display_lines(app, pane_width).len() as u16;
    let bottom = bottom_offset(total_lines, available_height);
    let next = app.scroll_offset.saturating_add(step).min(bottom);
    app.scroll_offset = next;
    if next >= bottom {
        app.auto_scroll = true;
    }
}

fn open_panel(app: &mut App, view: View) {
    app.panel_return = app.view;
    app.view = view;
    app.rebuild_panel_picker();
}

fn start_new_chat(app: &mut App) {
    app.conversation = ConversationState::new();
    app.auto_scroll = true;
    app.set_status(format!("New {} chat", app.category.label));
}

async fn refresh_recent(app: &mut App) {
    match app.client.recent_chats().await {
        Ok(recent) => app.recent = recent,
        Err(e) => {
            // Fall back to an empty list; the session stays usable
            warn!(error = %e, "failed to fetch recent chats");
            app.recent = Vec::new();
            app.set_status(format!("Could not reach {}", app.client.base_url()));
        }
    }
    app.rebuild_home_picker();
}

async fn refresh_chats(app: &mut App) {
    let slug = app.category.slug;
    match app.client.chats_for_category(slug).await {
        Ok(chats) => app.chats = chats,
        Err(e) => {
            warn!(error = %e, slug, "failed to fetch chats");
            app.chats = Vec::new();
            app.set_status(format!("Could not load {slug} chats: {e}"));
        }
    }
    app.rebuild_sidebar();
}

async fn open_category(app: &mut App, slug: &str) {
    let Some(category) = categories::find_category(slug) else {
        app.set_status(format!("Unknown category: {slug}"));
        return;
    };
    app.category = category;
    app.view = View::Chat;
    app.sidebar_focused = false;
    start_new_chat(app);
    app.clear_status();
    refresh_chats(app).await;
}

async fn open_chat(app: &mut App, chat_id: &str) {
    app.conversation = ConversationState::for_chat(chat_id);
    match app.client.chat_messages(chat_id).await {
        Ok(messages) => app.conversation.load_history(messages),
        Err(e) => {
            warn!(error = %e, chat_id, "failed to fetch messages");
            app.conversation
                .add_app_error(format!("Could not load history: {e}"));
        }
    }
    app.auto_scroll = true;
    app.view = View::Chat;
}

/// Open a conversation picked from the home list: switch to its category
/// first so the sidebar and stream routing match.
async fn open_recent_chat(app: &mut App, chat_id: &str) {
    let category_slug = app
        .recent
        .iter()
        .find(|c| c.id == chat_id)
        .and_then(|c| c.category.clone())
        .map(|label| label.to_ascii_lowercase());
    if let Some(slug) = category_slug {
        if let Some(category) = categories::find_category(&slug) {
            app.category = category;
        }
    }
    refresh_chats(app).await;
    open_chat(app, chat_id).await;
}

async fn submit_input(app: &mut App, dispatcher: &StreamDispatcher) {
    let input_text = app.take_input();
    if input_text.trim().is_empty() {
        return;
    }
    app.clear_status();

    match process_input(app, &input_text) {
        CommandResult::Continue => {}
        CommandResult::Quit => app.exit_requested = true,
        CommandResult::NewChat => start_new_chat(app),
        CommandResult::OpenPanel(view) => open_panel(app, view),
        CommandResult::RefreshChats => refresh_chats(app).await,
        CommandResult::RenameChat(title) => rename_active_chat(app, &title).await,
        CommandResult::DeleteChat => delete_active_chat(app).await,
        CommandResult::ProcessAsMessage(text) => send_message(app, dispatcher, text).await,
    }
}

async fn rename_active_chat(app: &mut App, title: &str) {
    let Some(chat_id) = app.conversation.chat_id().map(|id| id.to_string()) else {
        app.set_status("No active chat to rename");
        return;
    };
    match app.client.rename_chat(&chat_id, title).await {
        Ok(()) => {
            app.set_status(format!("Renamed to: {title}"));
            refresh_chats(app).await;
        }
        Err(e) => {
            warn!(error = %e, "rename failed");
            app.set_status(format!("Rename failed: {e}"));
        }
    }
}

async fn delete_active_chat(app: &mut App) {
    let Some(chat_id) = app.conversation.chat_id().map(|id| id.to_string()) else {
        app.set_status("No active chat to delete");
        return;
    };
    app.cancel_active_stream();
    match app.client.delete_chat(&chat_id).await {
        Ok(()) => {
            start_new_chat(app);
            app.set_status("Chat deleted");
            refresh_chats(app).await;
        }
        Err(e) => {
            warn!(error = %e, "delete failed");
            app.set_status(format!("Delete failed: {e}"));
        }
    }
}

async fn send_message(app: &mut App, dispatcher: &StreamDispatcher, text: String) {
    // First message of a fresh conversation creates the chat server-side
    if app.conversation.chat_id().is_none() {
        let title = {
            let from_text = title_from_first_message(&text);
            if from_text.is_empty() {
                // Same default the service uses for untitled chats
                format!("{} {}", app.category.label, Local::now().format("%b %d %H:%M"))
            } else {
                from_text
            }
        };
        match app.client.create_chat(app.category.slug, &title).await {
            Ok(created) => {
                app.conversation.set_chat_id(created.id);
                refresh_chats(app).await;
            }
            Err(e) => {
                warn!(error = %e, "create chat failed");
                app.conversation
                    .add_app_error(format!("Could not start chat: {e}"));
                return;
            }
        }
    }
    let chat_id = app.conversation.chat_id().map(|id| id.to_string());

    // Prior turns only; the service appends the outgoing message itself
    let history = app.conversation.history_for_api();

    let tentative = app.conversation.push_user(text.clone());
    let display_name = app.config.resolved_display_name().to_string();
    if let Err(e) = app.logging.log_message(&format!("{display_name}: {text}")) {
        app.set_status(format!("Log error: {e}"));
    }

    if let Some(id) = &chat_id {
        match app.client.post_message(id, "user", &text).await {
            Ok(posted) => {
                app.conversation.confirm(&tentative, posted.id);
            }
            Err(e) => {
                // The optimistic entry stays; history is reconciled on reload
                warn!(error = %e, "post message failed");
            }
        }
    }

    spawn_stream(app, dispatcher, text, history, chat_id);
}

fn retry_last_response(app: &mut App, dispatcher: &StreamDispatcher) {
    if app.stream_is_active() {
        app.set_status("A response is already streaming");
        return;
    }
    let Some(user_text) = app.conversation.last_user_text().map(|t| t.to_string()) else {
        app.set_status("Nothing to retry");
        return;
    };
    app.conversation.remove_last_assistant();
    if let Err(e) = app
        .logging
        .rewrite_log(app.conversation.entries(), app.config.resolved_display_name())
    {
        app.set_status(format!("Log error: {e}"));
    }

    // The retried message must not appear in its own history
    let mut history = app.conversation.history_for_api();
    if history.last().map(|turn| turn.role == "user").unwrap_or(false) {
        history.pop();
    }
    let chat_id = app.conversation.chat_id().map(|id| id.to_string());
    spawn_stream(app, dispatcher, user_text, history, chat_id);
}

fn spawn_stream(
    app: &mut App,
    dispatcher: &StreamDispatcher,
    message: String,
    history: Vec<crate::api::HistoryTurn>,
    chat_id: Option<String>,
) {
    let (stream_id, cancel_token) = app.begin_new_stream();
    app.conversation.begin_stream();
    app.auto_scroll = true;

    dispatcher.spawn(StreamParams {
        client: app.client.http().clone(),
        base_url: app.client.base_url().to_string(),
        endpoint: app.category.stream_endpoint.to_string(),
        request: StreamChatRequest {
            category: app.category.slug.to_string(),
            message,
            chat_id,
            history,
            filenames: Vec::new(),
        },
        cancel_token,
        stream_id,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::config::Config;
    use crate::core::memory::MemoryStore;
    use crate::core::prompts::PromptLibrary;
    use crate::utils::logging::LoggingState;

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let memory = MemoryStore::load_from_path(dir.path().join("memory.json")).unwrap();
        let prompts = PromptLibrary::load_from_path(dir.path().join("prompts.toml")).unwrap();
        let logging = LoggingState::new(None).unwrap();
        App::new(Config::default(), logging, memory, prompts)
    }

    #[tokio::test]
    async fn edit_during_a_live_stream_cancels_it_first() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = StreamDispatcher::new(tx);
        app.view = View::Chat;
        app.conversation.push_user("question");
        let (id, _token) = app.begin_new_stream();
        app.conversation.begin_stream();
        app.handle_stream_message(StreamMessage::Chunk("partial".to_string()), id);

        let key = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL);
        handle_chat_key(&mut app, &dispatcher, key, Size::new(80, 24)).await;

        assert!(!app.stream_is_active());
        assert!(!app.conversation.has_streaming_entry());
        assert_eq!(app.input.lines().join("\n"), "question");
    }

    #[tokio::test]
    async fn escape_after_edit_goes_back_instead_of_reporting_a_cancel() {
        let mut app = test_app();
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = StreamDispatcher::new(tx);
        app.view = View::Chat;
        app.conversation.push_user("question");
        let (_id, _token) = app.begin_new_stream();
        app.conversation.begin_stream();

        let edit = KeyEvent::new(KeyCode::Char('e'), KeyModifiers::CONTROL);
        handle_chat_key(&mut app, &dispatcher, edit, Size::new(80, 24)).await;
        let esc = KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE);
        handle_chat_key(&mut app, &dispatcher, esc, Size::new(80, 24)).await;

        assert_eq!(app.view, View::Home);
    }
}
