//! Boundary between the engine and the chat platform.
//!
//! The engine never talks to the platform directly. The router and the handlers
//! use two ports:
//!
//! - [`ChatPlatform`] - Messages, interaction callbacks and capability lookups,
//!   implemented on serenity by [`crate::discord::DiscordClient`]
//! - [`Responder`] - The reply callback injected into every invocation, bound to
//!   the channel or interaction the invocation came from

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

use crate::permissions::CapabilitySet;

/// Failure of a platform call.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The request failed or the platform answered with an error status.
    #[error("platform request failed: {0}")]
    Request(#[from] serenity::Error),

    /// An id handed to the platform is not a snowflake.
    #[error("invalid platform id {0:?}")]
    InvalidId(String),
}

/// Visual style of a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Success,
    Danger,
}

/// A clickable button attached to a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    /// Identifier sent back with the click.
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>, style: ButtonStyle) -> Self {
        Button {
            custom_id: custom_id.into(),
            label: label.into(),
            style,
        }
    }
}

/// A message sent or edited on behalf of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    pub content: String,
    /// Buttons shown under the message. An empty list removes existing buttons
    /// when editing.
    pub buttons: Vec<Button>,
    /// Only visible to the caller, when the invocation channel allows it.
    pub ephemeral: bool,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Reply {
            content: content.into(),
            ..Reply::default()
        }
    }

    pub fn ephemeral(content: impl Into<String>) -> Self {
        Reply {
            content: content.into(),
            ephemeral: true,
            ..Reply::default()
        }
    }

    pub fn with_buttons(mut self, buttons: Vec<Button>) -> Self {
        self.buttons = buttons;
        self
    }
}

/// Operations the engine needs from the chat platform.
#[automock]
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Sends a message to a channel, optionally as a reply to `reply_to`.
    /// Returns the id of the new message.
    async fn send_message(
        &self,
        channel_id: &str,
        reply: &Reply,
        reply_to: Option<String>,
    ) -> Result<String, PlatformError>;

    /// Replaces the content and buttons of a bot message.
    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError>;

    /// Answers a structured invocation. Returns the id of the response message.
    async fn respond_to_interaction(
        &self,
        interaction_id: &str,
        token: &str,
        reply: &Reply,
    ) -> Result<String, PlatformError>;

    /// Sends another message for an interaction that was already answered.
    async fn send_followup(&self, token: &str, reply: &Reply) -> Result<String, PlatformError>;

    /// Edits a message sent through an interaction token.
    async fn edit_interaction_message(
        &self,
        token: &str,
        message_id: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError>;

    /// Acknowledges a button click without changing the message.
    async fn acknowledge_component(
        &self,
        interaction_id: &str,
        token: &str,
    ) -> Result<(), PlatformError>;

    /// Resolves the capabilities a user holds in a guild.
    async fn caller_capabilities(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<CapabilitySet, PlatformError>;

    /// Resolves the capabilities the bot holds in a guild.
    async fn bot_capabilities(&self, guild_id: &str) -> Result<CapabilitySet, PlatformError>;
}

/// Reply callback handed to command handlers.
///
/// Handlers only ever see this trait, never the event that triggered them.
#[automock]
#[async_trait]
pub trait Responder: Send + Sync {
    /// Sends a reply and returns the id of the message it created.
    async fn reply(&self, reply: Reply) -> Result<String, PlatformError>;

    /// Edits a message previously created by [`Responder::reply`].
    async fn edit(&self, message_id: &str, reply: Reply) -> Result<(), PlatformError>;
}

/// Replies in the channel of a text invocation, referencing the invoking message.
pub struct ChannelResponder {
    platform: Arc<dyn ChatPlatform>,
    channel_id: String,
    source_message_id: String,
}

impl ChannelResponder {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        channel_id: impl Into<String>,
        source_message_id: impl Into<String>,
    ) -> Self {
        ChannelResponder {
            platform,
            channel_id: channel_id.into(),
            source_message_id: source_message_id.into(),
        }
    }
}

#[async_trait]
impl Responder for ChannelResponder {
    async fn reply(&self, reply: Reply) -> Result<String, PlatformError> {
        self.platform
            .send_message(
                &self.channel_id,
                &reply,
                Some(self.source_message_id.clone()),
            )
            .await
    }

    async fn edit(&self, message_id: &str, reply: Reply) -> Result<(), PlatformError> {
        self.platform
            .edit_message(&self.channel_id, message_id, &reply)
            .await
    }
}

/// Replies to a structured invocation through its interaction token.
///
/// The first reply answers the interaction itself, later replies are sent as
/// follow-up messages.
pub struct InteractionResponder {
    platform: Arc<dyn ChatPlatform>,
    interaction_id: String,
    token: String,
    answered: AtomicBool,
}

impl InteractionResponder {
    pub fn new(
        platform: Arc<dyn ChatPlatform>,
        interaction_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        InteractionResponder {
            platform,
            interaction_id: interaction_id.into(),
            token: token.into(),
            answered: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Responder for InteractionResponder {
    async fn reply(&self, reply: Reply) -> Result<String, PlatformError> {
        if self.answered.swap(true, Ordering::SeqCst) {
            return self.platform.send_followup(&self.token, &reply).await;
        }

        let result = self
            .platform
            .respond_to_interaction(&self.interaction_id, &self.token, &reply)
            .await;
        if result.is_err() {
            self.answered.store(false, Ordering::SeqCst);
        }
        result
    }

    async fn edit(&self, message_id: &str, reply: Reply) -> Result<(), PlatformError> {
        self.platform
            .edit_interaction_message(&self.token, message_id, &reply)
            .await
    }
}
