//! Conversation synchronization and messaging-window engine for a
//! multi-channel inbox.
//!
//! The engine is backend-agnostic: hosts implement the [`Backend`] and
//! [`PushSource`] ports and drive an [`InboxOrchestrator`], which owns the
//! conversation roster, the message history of the open conversation, and
//! the per-platform messaging-window countdown.

pub mod backend;
pub mod domain;
pub mod infra;
pub mod usecases;

pub use usecases::{
    contracts::{Backend, BackendError, Clock, PushSource, SendReceipt, SystemClock},
    orchestrator::{InboxOrchestrator, Notice, OpenState},
    send_message::{MediaSource, OutboundMedia, SendError},
};
