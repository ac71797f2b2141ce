//! Session handler trait, follow-up events and delivery outcomes.

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

/// A follow-up event on a session message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A button of the message was clicked.
    Button { custom_id: String },
    /// A reaction was added to the message.
    Reaction { emoji: String },
    /// A message replying to the session message was posted.
    Reply { content: String },
}

/// What a session does after handling an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// Why a delivered event was not handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// No active session is bound to the message.
    NoSession,
    /// The acting user does not own the session.
    NotOwner,
}

/// Outcome of [`crate::sessions::SessionManager::deliver`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Handled,
    Ignored(IgnoreReason),
}

/// Identifies one opened session.
///
/// The id is unique per `open`, so a handle never closes a later session bound to
/// the same message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionHandle {
    pub session_id: Uuid,
    pub owner_id: String,
    pub message_id: String,
    pub created_at: Instant,
    pub expires_at: Instant,
}

/// Callbacks of one interactive session.
///
/// The handler owns the session state. Calls are serialized: no two callbacks of
/// the same session ever run concurrently.
#[async_trait]
pub trait SessionHandler: Send {
    /// Handles an event from the owner.
    async fn on_event(&mut self, event: SessionEvent) -> Flow;

    /// Runs when the deadline passes while the session is still active, right
    /// before [`SessionHandler::finalize`].
    async fn on_expire(&mut self) {}

    /// Detaches the message affordances and finalizes its display.
    ///
    /// Runs exactly once per session, whichever way it ended.
    async fn finalize(&mut self);
}
