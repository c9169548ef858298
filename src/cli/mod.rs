//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the
//! appropriate commands.

pub mod category_list;
pub mod recent_list;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::cli::category_list::list_categories;
use crate::cli::recent_list::list_recent;
use crate::core::app::App;
use crate::core::config::Config;
use crate::core::memory::MemoryStore;
use crate::core::prompts::PromptLibrary;
use crate::ui::chat_loop::run_chat;
use crate::utils::logging::LoggingState;

#[derive(Parser)]
#[command(name = "ultron")]
#[command(about = "A terminal console for the Ultron chat service")]
#[command(
    long_about = "Ultron Console is a full-screen terminal client for a self-hosted Ultron \
chat service. Conversations are grouped by category, each backed by its own model, and \
responses stream into the transcript as they are generated.\n\n\
Controls:\n\
  Type              Enter your message in the input field\n\
  Enter             Send the message\n\
  Esc               Cancel a streaming response, or go back\n\
  Up/Down           Scroll through the transcript\n\
  Tab               Focus the chat sidebar\n\
  Ctrl+R            Retry the last response\n\
  Ctrl+E            Edit and re-send your last message\n\
  Ctrl+N            Start a new chat\n\
  Ctrl+C            Quit\n\n\
Commands:\n\
  /help             Show extended help with keyboard shortcuts\n\
  /log <filename>   Enable transcript logging to specified file\n\
  /log              Toggle logging pause/resume"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Base URL of the Ultron service (overrides the configured one)
    #[arg(short = 'u', long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Category to open on startup, or list categories if none specified
    #[arg(short = 'c', long, global = true, value_name = "CATEGORY", num_args = 0..=1, default_missing_value = "")]
    pub category: Option<String>,

    /// Enable transcript logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the interactive console (default)
    Chat,
    /// List the available categories and their models
    Categories,
    /// List recent conversations across all categories
    Recent,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Option<Vec<String>>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    crate::logging::init();
    let args = Args::parse();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Categories => {
            list_categories();
            Ok(())
        }
        Commands::Recent => list_recent(resolve_base_url(args.base_url)?).await,
        Commands::Set { key, value } => {
            let mut config = Config::load()?;
            match value {
                Some(val) if !val.is_empty() => {
                    match config.set_key(&key, val.join(" ")) {
                        Ok(message) => {
                            config.save()?;
                            println!("{message}");
                        }
                        Err(e) => {
                            eprintln!("{e}");
                            std::process::exit(1);
                        }
                    }
                }
                _ => config.print_all(),
            }
            Ok(())
        }
        Commands::Unset { key } => {
            let mut config = Config::load()?;
            match config.unset_key(&key) {
                Ok(message) => {
                    config.save()?;
                    println!("{message}");
                }
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Chat => {
            // -c without a value lists the categories instead
            if args.category.as_deref() == Some("") {
                list_categories();
                return Ok(());
            }

            let mut config = Config::load()?;
            if let Some(base_url) = args.base_url {
                config.base_url = Some(base_url);
            }
            let logging = LoggingState::new(args.log)?;
            let memory = MemoryStore::load()?;
            let prompts = PromptLibrary::load()?;

            let app = App::new(config, logging, memory, prompts);
            run_chat(app, args.category.as_deref()).await
        }
    }
}

fn resolve_base_url(flag: Option<String>) -> Result<String, Box<dyn Error>> {
    match flag {
        Some(url) => Ok(url),
        None => Ok(Config::load()?.resolved_base_url().to_string()),
    }
}
