//! Ultron Console is a terminal-first client for the Ultron chat service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns runtime state: the category table, configuration, the
//!   conversation transcript, and streaming orchestration.
//! - [`ui`] renders the terminal interface and runs the interactive event
//!   loop that drives user input and display updates.
//! - [`commands`] implements slash-command parsing used by the chat loop.
//! - [`api`] defines the Ultron wire payloads and the HTTP client that
//!   talks to the remote service.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which initializes and dispatches into
//! [`core::app`] and [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
