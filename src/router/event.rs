//! Events consumed by the router.
//!
//! The platform adapter builds these from its own payloads. Capabilities are
//! optional: when the platform already resolved them (structured invocations
//! usually carry both sets) the router uses them as is, otherwise it asks the
//! [`crate::platform::ChatPlatform`] when a command actually needs them.

use std::{collections::BTreeMap, sync::Arc};

use serde_json::Value;

use crate::{permissions::CapabilitySet, platform::Responder};

/// A structured invocation: the platform names the command directly.
#[derive(Clone)]
pub struct StructuredEvent {
    pub command_name: String,
    pub options: BTreeMap<String, Value>,
    pub caller_id: String,
    pub scope_id: String,
    pub guild_id: Option<String>,
    pub caller_capabilities: Option<CapabilitySet>,
    pub bot_capabilities: Option<CapabilitySet>,
    pub responder: Arc<dyn Responder>,
}

/// A plain message that may start with the command prefix.
#[derive(Clone)]
pub struct TextEvent {
    pub content: String,
    pub author_id: String,
    pub scope_id: String,
    pub guild_id: Option<String>,
    pub caller_capabilities: Option<CapabilitySet>,
    pub bot_capabilities: Option<CapabilitySet>,
    pub responder: Arc<dyn Responder>,
}

/// Input of [`crate::router::Router::dispatch`].
#[derive(Clone)]
pub enum PlatformEvent {
    Structured(StructuredEvent),
    Text(TextEvent),
}

impl PlatformEvent {
    pub fn caller_id(&self) -> &str {
        match self {
            PlatformEvent::Structured(event) => &event.caller_id,
            PlatformEvent::Text(event) => &event.author_id,
        }
    }
}

/// Splits a prefixed message into a lowercase command name and raw arguments.
///
/// Returns `None` when the first character of the message is not `prefix` or
/// nothing but whitespace follows it.
pub fn parse_text_command(content: &str, prefix: char) -> Option<(String, Vec<String>)> {
    let rest = content.strip_prefix(prefix)?;
    if rest.starts_with(char::is_whitespace) {
        return None;
    }

    let mut tokens = rest.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    Some((name, tokens.map(str::to_owned).collect()))
}
