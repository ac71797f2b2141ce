//! Invocation routing.
//!
//! Both invocation channels end up here: structured invocations, which name a
//! command and carry typed options, and text messages starting with the
//! configured prefix. The [`Router`] normalizes them into one [`Invocation`],
//! checks the trigger kind and guild scope, runs the execution guard, then runs
//! the handler on its own task.
//!
//! - [`dispatcher`] - The [`Router`] and its dispatch sequence
//! - [`event`] - Incoming events, already stripped of platform specifics
//! - [`invocation`] - The canonical [`Invocation`] and the handler context
//! - [`replies`] - User-facing messages for every rejection

mod dispatcher;
mod event;
mod invocation;
mod replies;

use thiserror::Error;

use crate::{permissions::Capability, platform::PlatformError};

pub use crate::router::dispatcher::Router;
pub use crate::router::event::{PlatformEvent, StructuredEvent, TextEvent};
pub use crate::router::invocation::{Arguments, HandlerContext, Invocation, TriggerKind};

/// Why an invocation did not run to completion.
///
/// Every variant ends the invocation it belongs to and nothing else.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The command does not accept this invocation channel.
    #[error("command '{command}' cannot be invoked as a {trigger} command")]
    UnsupportedTrigger {
        command: String,
        trigger: TriggerKind,
    },

    /// The command requires a guild and was invoked outside of one.
    #[error("command '{0}' can only be used in a guild")]
    ScopeRequired(String),

    #[error("command '{command}' is on cooldown for {remaining_millis}ms")]
    OnCooldown {
        command: String,
        remaining_millis: u64,
    },

    #[error("caller is missing {}", capability_names(.missing))]
    InsufficientCallerPermission { missing: Vec<Capability> },

    #[error("bot is missing {}", capability_names(.missing))]
    InsufficientBotPermission { missing: Vec<Capability> },

    /// A structured invocation named a command the catalog does not know.
    #[error("unknown structured command '{0}'")]
    UnknownCommand(String),

    /// Capabilities could not be resolved before the guard ran.
    #[error("cannot resolve capabilities: {0}")]
    Platform(#[from] PlatformError),

    /// The handler returned an error or panicked.
    #[error("command '{command}' failed: {reason}")]
    HandlerFailure { command: String, reason: String },
}

/// Joins capability names for messages, e.g. `ManageChannels, KickMembers`.
pub fn capability_names(capabilities: &[Capability]) -> String {
    capabilities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
