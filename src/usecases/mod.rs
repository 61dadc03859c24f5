//! Application use cases wired through the backend ports.

pub mod contracts;
pub mod open_conversation;
pub mod orchestrator;
pub mod send_message;
pub mod window_timer;
