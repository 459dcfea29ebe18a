mod conversation;
pub mod demo;

pub use conversation::{Conversation, ask_stateless};
