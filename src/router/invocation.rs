//! The canonical invocation handed to command handlers.

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde_json::Value;

use crate::{catalog::Catalog, platform::Responder, sessions::SessionManager};

/// The channel an invocation came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Structured,
    Text,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Structured => f.write_str("structured"),
            TriggerKind::Text => f.write_str("text"),
        }
    }
}

/// Arguments of an invocation, in the shape of its channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Arguments {
    /// Whitespace separated tokens following the command name.
    Raw(Vec<String>),
    /// Typed options keyed by parameter name.
    Options(BTreeMap<String, Value>),
}

impl Arguments {
    /// Free text for a trailing text parameter.
    ///
    /// For structured invocations this is the string value of option `name`.
    /// For text invocations all raw tokens are joined with single spaces.
    pub fn text(&self, name: &str) -> Option<String> {
        match self {
            Arguments::Raw(tokens) if tokens.is_empty() => None,
            Arguments::Raw(tokens) => Some(tokens.join(" ")),
            Arguments::Options(options) => match options.get(name)? {
                Value::String(text) => Some(text.clone()),
                other => Some(other.to_string()),
            },
        }
    }
}

/// One call of one command, built by the router and discarded after the handler
/// returns.
#[derive(Clone)]
pub struct Invocation {
    /// Canonical name, even when the caller used an alias.
    pub command_name: String,
    pub trigger: TriggerKind,
    pub caller_id: String,
    /// Channel the invocation happened in.
    pub scope_id: String,
    /// Absent in direct messages.
    pub guild_id: Option<String>,
    pub arguments: Arguments,
    pub responder: Arc<dyn Responder>,
}

impl fmt::Debug for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command_name", &self.command_name)
            .field("trigger", &self.trigger)
            .field("caller_id", &self.caller_id)
            .field("scope_id", &self.scope_id)
            .field("guild_id", &self.guild_id)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}

/// Engine services available to handlers.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub sessions: SessionManager,
    pub catalog: Arc<Catalog>,
}
