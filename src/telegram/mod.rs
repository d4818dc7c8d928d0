//! Telegram bot integration and handlers

pub mod bot;
pub mod dialogue;
pub mod handlers;

// Re-exports for convenience
pub use bot::{create_bot, is_message_addressed_to_bot, setup_bot_commands, Command};
pub use dialogue::{DialogueRegistry, DialogueState};
pub use handlers::{advance_dialogue, schema, DialogueReply, HandlerDeps, HandlerError};
