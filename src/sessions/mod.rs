//! Interactive sessions bound to one message.
//!
//! A handler opens a session after sending a message with buttons (or one that
//! expects reactions or replies). Follow-up events on that message are routed to
//! the session's [`SessionHandler`] as long as they come from the session owner
//! and the session has not ended.
//!
//! # Lifecycle
//!
//! ```text
//! open() -> Active -> Terminated   (handler returned Flow::Terminate, or close())
//!                  -> Expired      (deadline reached)
//! ```
//!
//! Only `Active` sessions accept events. Leaving `Active` always runs
//! [`SessionHandler::finalize`] exactly once, and removes the message binding in
//! the same step so another session can be opened on the message afterwards.
//!
//! - [`manager`] - The [`SessionManager`] registry and expiry timers
//! - [`session`] - Handler trait, events and delivery outcomes

mod manager;
mod session;

use thiserror::Error;

pub use crate::sessions::manager::SessionManager;
pub use crate::sessions::session::{
    Delivery, Flow, IgnoreReason, SessionEvent, SessionHandle, SessionHandler,
};

/// Errors of [`SessionManager::open`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// A live session is already bound to the message.
    #[error("message {message_id} already drives a live session")]
    Conflict { message_id: String },
}
