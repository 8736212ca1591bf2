//! Shared types for the chatwatch chat monitor.

mod chat;
mod messages;
mod settings;

pub use chat::*;
pub use messages::*;
pub use settings::*;
