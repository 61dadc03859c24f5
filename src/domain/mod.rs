//! Domain layer: core entities and merge/unread/window rules.

pub mod content;
pub mod conversation;
pub mod events;
pub mod message;
pub mod message_store;
pub mod roster;
pub mod timestamp;
pub mod window;
