pub mod app;
pub mod categories;
pub mod chat_stream;
pub mod config;
pub mod memory;
pub mod message;
pub mod prompts;
