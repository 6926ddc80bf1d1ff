//! Chat fallback module - relays conversations to the Tuling chatbot.

mod commands;
mod expressions;
mod handler;
mod prompt;
mod round;
#[cfg(test)]
mod testing;

pub use commands::chat_commands;
pub use handler::handle_message;
pub use prompt::{PromptEvent, PromptSessions, PromptState};
pub use round::{Chatbot, Outbound, RoundOutcome};
