//! Inbound gateway events, reduced to the fields the engine reads.
//!
//! Serenity hands the bot fully typed payloads. The bot only needs a handful of
//! ids and texts from them, so each one is flattened into a small owned struct
//! with string ids before it reaches the router or the session manager.

use std::collections::BTreeMap;

use serde_json::Value;
use serenity::all::{
    CommandDataOptionValue, CommandInteraction, ComponentInteraction, Message, Reaction,
    ReactionType,
};

use crate::permissions::CapabilitySet;

/// A message posted in a channel the bot can read.
#[derive(Debug, Clone, Default)]
pub struct IncomingMessage {
    pub id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_is_bot: bool,
    pub content: String,
    /// Message this one replies to, if any.
    pub referenced_message_id: Option<String>,
}

impl From<&Message> for IncomingMessage {
    fn from(message: &Message) -> Self {
        IncomingMessage {
            id: message.id.to_string(),
            channel_id: message.channel_id.to_string(),
            guild_id: message.guild_id.map(|id| id.to_string()),
            author_id: message.author.id.to_string(),
            author_is_bot: message.author.bot,
            content: message.content.clone(),
            referenced_message_id: message
                .message_reference
                .as_ref()
                .and_then(|reference| reference.message_id)
                .map(|id| id.to_string()),
        }
    }
}

/// A structured command invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandCall {
    pub interaction_id: String,
    pub token: String,
    pub command_name: String,
    /// Top level options keyed by name.
    pub options: BTreeMap<String, Value>,
    pub caller_id: String,
    pub channel_id: String,
    pub guild_id: Option<String>,
    /// Permissions of the invoking member, resolved by the platform.
    pub caller_capabilities: Option<CapabilitySet>,
    /// Permissions of the bot in the invocation channel.
    pub bot_capabilities: Option<CapabilitySet>,
}

impl From<&CommandInteraction> for CommandCall {
    fn from(command: &CommandInteraction) -> Self {
        CommandCall {
            interaction_id: command.id.to_string(),
            token: command.token.clone(),
            command_name: command.data.name.clone(),
            options: command
                .data
                .options
                .iter()
                .filter_map(|option| Some((option.name.clone(), option_value(&option.value)?)))
                .collect(),
            caller_id: command.user.id.to_string(),
            channel_id: command.channel_id.to_string(),
            guild_id: command.guild_id.map(|id| id.to_string()),
            caller_capabilities: command
                .member
                .as_ref()
                .and_then(|member| member.permissions)
                .map(|permissions| CapabilitySet::from_bits(permissions.bits())),
            bot_capabilities: command
                .app_permissions
                .map(|permissions| CapabilitySet::from_bits(permissions.bits())),
        }
    }
}

/// A click on a button of a bot message.
#[derive(Debug, Clone, Default)]
pub struct ComponentClick {
    pub interaction_id: String,
    pub token: String,
    pub user_id: String,
    pub message_id: String,
    pub custom_id: String,
}

impl From<&ComponentInteraction> for ComponentClick {
    fn from(component: &ComponentInteraction) -> Self {
        ComponentClick {
            interaction_id: component.id.to_string(),
            token: component.token.clone(),
            user_id: component.user.id.to_string(),
            message_id: component.message.id.to_string(),
            custom_id: component.data.custom_id.clone(),
        }
    }
}

/// A reaction added to a message.
#[derive(Debug, Clone, Default)]
pub struct ReactionAdd {
    pub user_id: String,
    pub message_id: String,
    pub emoji: String,
}

impl ReactionAdd {
    /// Returns `None` for reactions whose author the gateway did not send.
    pub fn from_reaction(reaction: &Reaction) -> Option<Self> {
        Some(ReactionAdd {
            user_id: reaction.user_id?.to_string(),
            message_id: reaction.message_id.to_string(),
            emoji: emoji_key(&reaction.emoji),
        })
    }
}

/// Unicode emojis are identified by their text, custom ones as `name:id`.
pub fn emoji_key(emoji: &ReactionType) -> String {
    match emoji {
        ReactionType::Unicode(text) => text.clone(),
        ReactionType::Custom {
            id, name: Some(name), ..
        } => format!("{}:{}", name, id),
        ReactionType::Custom { id, name: None, .. } => id.to_string(),
        _ => String::new(),
    }
}

/// Converts an option value to JSON. Ids become strings, sub-commands and
/// partial autocomplete values are skipped.
pub fn option_value(value: &CommandDataOptionValue) -> Option<Value> {
    let value = match value {
        CommandDataOptionValue::String(text) => Value::from(text.as_str()),
        CommandDataOptionValue::Integer(number) => Value::from(*number),
        CommandDataOptionValue::Number(number) => Value::from(*number),
        CommandDataOptionValue::Boolean(flag) => Value::from(*flag),
        CommandDataOptionValue::User(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Channel(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Role(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Mentionable(id) => Value::from(id.to_string()),
        CommandDataOptionValue::Attachment(id) => Value::from(id.to_string()),
        _ => return None,
    };
    Some(value)
}
