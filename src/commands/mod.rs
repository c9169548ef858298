//! Slash-command parsing and execution.
//!
//! Commands that only touch local state are handled here directly; ones
//! that need the remote API are returned to the chat loop as a
//! [`CommandResult`] variant so the loop can run the request.

use chrono::Utc;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::core::app::{App, View};
use crate::core::message::TranscriptRole;

#[derive(Debug, PartialEq, Eq)]
pub enum CommandResult {
    Continue,
    ProcessAsMessage(String),
    Quit,
    NewChat,
    RenameChat(String),
    DeleteChat,
    RefreshChats,
    OpenPanel(View),
}

pub fn process_input(app: &mut App, input: &str) -> CommandResult {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return CommandResult::ProcessAsMessage(input.to_string());
    }

    let mut parts = trimmed[1..].splitn(2, ' ');
    let command_name = match parts.next() {
        Some(name) if !name.is_empty() => name,
        _ => return CommandResult::ProcessAsMessage(input.to_string()),
    };
    let args = parts.next().unwrap_or("").trim();

    match command_name {
        "help" => handle_help(app),
        "quit" | "exit" => CommandResult::Quit,
        "new" => CommandResult::NewChat,
        "chats" => CommandResult::RefreshChats,
        "rename" => {
            if args.is_empty() {
                app.set_status("Usage: /rename <new title>");
                CommandResult::Continue
            } else {
                CommandResult::RenameChat(args.to_string())
            }
        }
        "delete" => CommandResult::DeleteChat,
        "settings" => CommandResult::OpenPanel(View::Settings),
        "memory" => handle_memory(app, args),
        "prompts" => CommandResult::OpenPanel(View::Prompts),
        "log" => handle_log(app, args),
        "dump" => handle_dump(app, args),
        _ => {
            app.set_status(format!("Unknown command: /{command_name}"));
            CommandResult::Continue
        }
    }
}

fn handle_help(app: &mut App) -> CommandResult {
    let help = "\
Commands:
  /new               Start a new chat in this category
  /rename <title>    Rename the active chat
  /delete            Delete the active chat
  /chats             Refresh the chat list
  /settings          Open the settings panel
  /memory            Open the memory panel
  /memory add <txt>  Save a memory note
  /prompts           Open the prompt library
  /log [file]        Enable or pause transcript logging
  /dump [file]       Write the transcript to a file
  /quit              Leave the console

Keys:
  Enter      send    Alt+Enter  newline    Esc        cancel stream / back
  Ctrl+R     retry   Ctrl+E     edit last  Ctrl+Up/Dn pick chat
  Up/Down    scroll  Tab        focus sidebar         Ctrl+C     quit";
    app.conversation.add_app_info(help);
    CommandResult::Continue
}

fn handle_memory(app: &mut App, args: &str) -> CommandResult {
    match args.split_once(' ') {
        Some(("add", note)) => {
            match app.memory.add(note) {
                Ok(()) => app.set_status("Memory note saved"),
                Err(e) => app.set_status(format!("Memory error: {e}")),
            }
            CommandResult::Continue
        }
        _ if args == "add" => {
            app.set_status("Usage: /memory add <text>");
            CommandResult::Continue
        }
        _ => CommandResult::OpenPanel(View::Memory),
    }
}

fn handle_log(app: &mut App, args: &str) -> CommandResult {
    let result = if args.is_empty() {
        app.logging.toggle_logging()
    } else {
        app.logging.set_log_file(args.to_string())
    };
    match result {
        Ok(message) => app.set_status(message),
        Err(e) => app.set_status(format!("Log error: {e}")),
    }
    CommandResult::Continue
}

fn handle_dump(app: &mut App, args: &str) -> CommandResult {
    let filename = if args.is_empty() {
        format!("ultron-{}.txt", Utc::now().format("%Y-%m-%d"))
    } else {
        args.to_string()
    };

    match dump_transcript(app, &filename) {
        Ok(()) => app.set_status(format!("Transcript written to {filename}")),
        Err(e) => app.set_status(format!("Dump error: {e}")),
    }
    CommandResult::Continue
}

fn dump_transcript(app: &App, filename: &str) -> Result<(), Box<dyn std::error::Error>> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);
    let user_name = app.config.resolved_display_name();

    for entry in app.conversation.entries() {
        match entry.role {
            TranscriptRole::User => {
                writeln!(writer, "{}: {}", user_name, entry.text)?;
                writeln!(writer)?;
            }
            TranscriptRole::Assistant if !entry.text.is_empty() => {
                writeln!(writer, "{}", entry.text)?;
                writeln!(writer)?;
            }
            _ => {}
        }
    }

    writer.flush()?;
    Ok(())
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

    #[test]
    fn plain_text_passes_through_as_a_message() {
        let mut app = test_app();
        assert_eq!(
            process_input(&mut app, "hello there"),
            CommandResult::ProcessAsMessage("hello there".to_string())
        );
    }

    #[test]
    fn a_bare_slash_is_not_a_command() {
        let mut app = test_app();
        assert_eq!(
            process_input(&mut app, "/"),
            CommandResult::ProcessAsMessage("/".to_string())
        );
    }

    #[test]
    fn rename_requires_a_title() {
        let mut app = test_app();
        assert_eq!(process_input(&mut app, "/rename"), CommandResult::Continue);
        assert!(app.status.as_deref().unwrap_or("").starts_with("Usage"));
        assert_eq!(
            process_input(&mut app, "/rename Better title"),
            CommandResult::RenameChat("Better title".to_string())
        );
    }

    #[test]
    fn panel_commands_open_panels() {
        let mut app = test_app();
        assert_eq!(
            process_input(&mut app, "/settings"),
            CommandResult::OpenPanel(View::Settings)
        );
        assert_eq!(
            process_input(&mut app, "/prompts"),
            CommandResult::OpenPanel(View::Prompts)
        );
        assert_eq!(
            process_input(&mut app, "/memory"),
            CommandResult::OpenPanel(View::Memory)
        );
    }

    #[test]
    fn memory_add_saves_a_note() {
        let mut app = test_app();
        assert_eq!(
            process_input(&mut app, "/memory add remember the base url"),
            CommandResult::Continue
        );
        assert_eq!(app.memory.notes().len(), 1);
        assert_eq!(app.memory.notes()[0].text, "remember the base url");
    }

    #[test]
    fn unknown_commands_set_a_status() {
        let mut app = test_app();
        assert_eq!(process_input(&mut app, "/bogus"), CommandResult::Continue);
        assert_eq!(app.status.as_deref(), Some("Unknown command: /bogus"));
    }

    #[test]
    fn help_lands_in_the_transcript() {
        let mut app = test_app();
        assert_eq!(process_input(&mut app, "/help"), CommandResult::Continue);
        let last = app.conversation.entries().last().unwrap();
        assert!(last.is_app());
        assert!(last.text.contains("/rename"));
    }
}
