//! REST side of the Discord adapter, on top of serenity's [`Http`] client.
//!
//! This module provides the [`DiscordClient`], which implements both engine ports
//! that need REST calls: [`ChatPlatform`] for messages, interaction callbacks and
//! permission lookups, and [`CommandRegistryApi`] for the bulk command replace.
//! The engine speaks in string ids; they are parsed into serenity ids here.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info};
use serenity::{
    all::{
        ApplicationId, ChannelId, CreateActionRow, CreateButton, CreateInteractionResponse,
        CreateInteractionResponseFollowup, CreateInteractionResponseMessage, CreateMessage,
        EditMessage, GuildId, InteractionId, MessageId, UserId,
    },
    http::{Http, HttpBuilder},
    model::application::ButtonStyle as SerenityButtonStyle,
};
use tokio::sync::OnceCell;

use crate::{
    permissions::{Capability, CapabilitySet},
    platform::{Button, ButtonStyle, ChatPlatform, PlatformError, Reply},
    publisher::{CommandRegistryApi, RegisteredCommand, RegistryError},
};

/// Buttons Discord accepts in a single action row.
const MAX_BUTTONS_PER_ROW: usize = 5;

/// REST client bound to one bot application.
///
/// # Examples
///
/// ```ignore
/// let client = DiscordClient::new("token", "1234", None, None)?;
/// let message_id = client.send_message("5678", &Reply::text("hello"), None).await?;
/// ```
pub struct DiscordClient {
    http: Arc<Http>,
    /// Guild receiving the commands instead of the global scope
    dev_guild_id: Option<GuildId>,
    /// Id of the bot user, fetched on first use
    bot_user_id: OnceCell<UserId>,
}

impl DiscordClient {
    /// Creates a new [`DiscordClient`].
    ///
    /// # Arguments
    ///
    /// * `token` - Bot token
    /// * `application_id` - Id of the bot application
    /// * `dev_guild_id` - When set, commands are published to this guild only
    /// * `proxy_url` - When set, every request goes through this HTTP proxy,
    ///   which then owns rate limiting
    ///
    /// # Errors
    ///
    /// Returns [`PlatformError::InvalidId`] when an id is not a snowflake.
    pub fn new(
        token: &str,
        application_id: &str,
        dev_guild_id: Option<&str>,
        proxy_url: Option<&str>,
    ) -> Result<Self, PlatformError> {
        let mut builder =
            HttpBuilder::new(token).application_id(parse_id(application_id, ApplicationId::new)?);
        if let Some(proxy_url) = proxy_url {
            builder = builder.proxy(proxy_url).ratelimiter_disabled(true);
        }

        Ok(DiscordClient {
            http: Arc::new(builder.build()),
            dev_guild_id: dev_guild_id
                .map(|id| parse_id(id, GuildId::new))
                .transpose()?,
            bot_user_id: OnceCell::new(),
        })
    }

    async fn bot_user_id(&self) -> Result<UserId, PlatformError> {
        self.bot_user_id
            .get_or_try_init(|| async {
                let user = self.http.get_current_user().await?;
                Ok::<_, PlatformError>(user.id)
            })
            .await
            .copied()
    }

    /// Combines the `@everyone` role with the member's roles.
    ///
    /// Channel overwrites are not applied. The guild owner holds every capability.
    async fn member_capabilities(
        &self,
        guild_id: GuildId,
        user_id: UserId,
    ) -> Result<CapabilitySet, PlatformError> {
        let guild = self.http.get_guild(guild_id).await?;
        if guild.owner_id == user_id {
            return Ok(CapabilitySet::from(Capability::ALL));
        }

        let member = self.http.get_member(guild_id, user_id).await?;
        let member_roles: Vec<u64> = member.roles.iter().map(|role| role.get()).collect();
        let bits = combined_role_bits(
            guild_id.get(),
            guild
                .roles
                .values()
                .map(|role| (role.id.get(), role.permissions.bits())),
            &member_roles,
        );

        Ok(CapabilitySet::from_bits(bits))
    }
}

/// Parses a string id into a serenity id. Zero is not a valid snowflake.
fn parse_id<T>(raw: &str, id: fn(u64) -> T) -> Result<T, PlatformError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value != 0 => Ok(id(value)),
        _ => Err(PlatformError::InvalidId(raw.to_owned())),
    }
}

/// ORs the permissions of `@everyone` (whose id is the guild id) and of every
/// role the member holds.
fn combined_role_bits(
    guild_id: u64,
    roles: impl Iterator<Item = (u64, u64)>,
    member_roles: &[u64],
) -> u64 {
    roles
        .filter(|(role_id, _)| *role_id == guild_id || member_roles.contains(role_id))
        .fold(0, |bits, (_, role_bits)| bits | role_bits)
}

fn button_style(style: ButtonStyle) -> SerenityButtonStyle {
    match style {
        ButtonStyle::Primary => SerenityButtonStyle::Primary,
        ButtonStyle::Secondary => SerenityButtonStyle::Secondary,
        ButtonStyle::Success => SerenityButtonStyle::Success,
        ButtonStyle::Danger => SerenityButtonStyle::Danger,
    }
}

fn action_rows(buttons: &[Button]) -> Vec<CreateActionRow> {
    buttons
        .chunks(MAX_BUTTONS_PER_ROW)
        .map(|row| {
            CreateActionRow::Buttons(
                row.iter()
                    .map(|button| {
                        CreateButton::new(&button.custom_id)
                            .label(&button.label)
                            .style(button_style(button.style))
                    })
                    .collect(),
            )
        })
        .collect()
}

/// Channel messages cannot be ephemeral, so the flag is not carried over.
fn channel_message(reply: &Reply) -> CreateMessage {
    CreateMessage::new()
        .content(&reply.content)
        .components(action_rows(&reply.buttons))
}

fn interaction_message(reply: &Reply) -> CreateInteractionResponseMessage {
    CreateInteractionResponseMessage::new()
        .content(&reply.content)
        .components(action_rows(&reply.buttons))
        .ephemeral(reply.ephemeral)
}

fn followup_message(reply: &Reply) -> CreateInteractionResponseFollowup {
    CreateInteractionResponseFollowup::new()
        .content(&reply.content)
        .components(action_rows(&reply.buttons))
        .ephemeral(reply.ephemeral)
}

#[async_trait]
impl ChatPlatform for DiscordClient {
    async fn send_message(
        &self,
        channel_id: &str,
        reply: &Reply,
        reply_to: Option<String>,
    ) -> Result<String, PlatformError> {
        let channel = parse_id(channel_id, ChannelId::new)?;
        debug!("send message to {}", channel);

        let mut builder = channel_message(reply);
        if let Some(reply_to) = reply_to {
            builder = builder.reference_message((channel, parse_id(&reply_to, MessageId::new)?));
        }

        let message = channel.send_message(&self.http, builder).await?;
        Ok(message.id.to_string())
    }

    async fn edit_message(
        &self,
        channel_id: &str,
        message_id: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError> {
        let channel = parse_id(channel_id, ChannelId::new)?;
        let message = parse_id(message_id, MessageId::new)?;
        debug!("edit message {} in {}", message, channel);

        let builder = EditMessage::new()
            .content(&reply.content)
            .components(action_rows(&reply.buttons));
        channel.edit_message(&self.http, message, builder).await?;
        Ok(())
    }

    /// Answers with a channel message, then reads back the id of the response.
    async fn respond_to_interaction(
        &self,
        interaction_id: &str,
        token: &str,
        reply: &Reply,
    ) -> Result<String, PlatformError> {
        let interaction = parse_id(interaction_id, InteractionId::new)?;
        debug!("respond to interaction {}", interaction);

        let response = CreateInteractionResponse::Message(interaction_message(reply));
        self.http
            .create_interaction_response(interaction, token, &response, Vec::new())
            .await?;

        let original = self.http.get_original_interaction_response(token).await?;
        Ok(original.id.to_string())
    }

    async fn send_followup(&self, token: &str, reply: &Reply) -> Result<String, PlatformError> {
        let message = self
            .http
            .create_followup_message(token, &followup_message(reply), Vec::new())
            .await?;

        Ok(message.id.to_string())
    }

    async fn edit_interaction_message(
        &self,
        token: &str,
        message_id: &str,
        reply: &Reply,
    ) -> Result<(), PlatformError> {
        let message = parse_id(message_id, MessageId::new)?;
        let builder = CreateInteractionResponseFollowup::new()
            .content(&reply.content)
            .components(action_rows(&reply.buttons));

        self.http
            .edit_followup_message(token, message, &builder, Vec::new())
            .await?;
        Ok(())
    }

    async fn acknowledge_component(
        &self,
        interaction_id: &str,
        token: &str,
    ) -> Result<(), PlatformError> {
        let interaction = parse_id(interaction_id, InteractionId::new)?;

        self.http
            .create_interaction_response(
                interaction,
                token,
                &CreateInteractionResponse::Acknowledge,
                Vec::new(),
            )
            .await?;
        Ok(())
    }

    async fn caller_capabilities(
        &self,
        guild_id: &str,
        user_id: &str,
    ) -> Result<CapabilitySet, PlatformError> {
        self.member_capabilities(
            parse_id(guild_id, GuildId::new)?,
            parse_id(user_id, UserId::new)?,
        )
        .await
    }

    async fn bot_capabilities(&self, guild_id: &str) -> Result<CapabilitySet, PlatformError> {
        let guild_id = parse_id(guild_id, GuildId::new)?;
        let bot_user_id = self.bot_user_id().await?;
        self.member_capabilities(guild_id, bot_user_id).await
    }
}

#[async_trait]
impl CommandRegistryApi for DiscordClient {
    /// Bulk overwrite of the global commands, or of the dev guild commands. The
    /// registry answers with the commands it now holds.
    async fn replace_all(&self, commands: &[RegisteredCommand]) -> Result<usize, RegistryError> {
        let registered = match self.dev_guild_id {
            Some(guild_id) => {
                info!("replace {} commands of guild {}", commands.len(), guild_id);
                self.http.create_guild_commands(guild_id, &commands).await
            }
            None => {
                info!("replace {} global commands", commands.len());
                self.http.create_global_commands(&commands).await
            }
        };

        registered
            .map(|registered| registered.len())
            .map_err(registry_error)
    }
}

/// Classifies a failed registry call.
///
/// A `400` is a validation failure, `401` and `403` are refused credentials and
/// anything else is transport.
fn registry_error(error: serenity::Error) -> RegistryError {
    let serenity::Error::Http(http_error) = &error else {
        return RegistryError::Transport(error.to_string());
    };

    match http_error.status_code().map(|status| status.as_u16()) {
        Some(400) => RegistryError::Validation(http_error.to_string()),
        Some(status @ (401 | 403)) => RegistryError::Unauthorized(status),
        _ => RegistryError::Transport(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn client(url: &str, dev_guild_id: Option<&str>) -> DiscordClient {
        DiscordClient::new("secret", "7", dev_guild_id, Some(url)).unwrap()
    }

    fn command(name: &str) -> RegisteredCommand {
        RegisteredCommand {
            name: name.to_string(),
            kind: 1,
            description: "A command".to_string(),
            options: vec![],
            default_member_permissions: None,
            dm_permission: true,
        }
    }

    fn registered_body(names: &[&str]) -> String {
        let commands: Vec<_> = names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                json!({
                    "id": (index + 1).to_string(),
                    "application_id": "7",
                    "version": "1",
                    "type": 1,
                    "name": name,
                    "description": "A command",
                    "default_member_permissions": null,
                    "dm_permission": true
                })
            })
            .collect();
        serde_json::to_string(&commands).unwrap()
    }

    fn message_body(id: &str) -> String {
        json!({
            "id": id,
            "channel_id": "10",
            "author": {
                "id": "99",
                "username": "herald",
                "discriminator": "0",
                "global_name": null,
                "avatar": null,
                "bot": true
            },
            "content": "pong",
            "timestamp": "2024-05-01T12:00:00.000000+00:00",
            "edited_timestamp": null,
            "tts": false,
            "mention_everyone": false,
            "mentions": [],
            "mention_roles": [],
            "attachments": [],
            "embeds": [],
            "pinned": false,
            "type": 0,
            "flags": 0,
            "components": []
        })
        .to_string()
    }

    #[test]
    fn test_new_rejects_invalid_ids() {
        assert!(matches!(
            DiscordClient::new("secret", "app", None, None),
            Err(PlatformError::InvalidId(id)) if id == "app"
        ));
        assert!(matches!(
            DiscordClient::new("secret", "7", Some("0"), None),
            Err(PlatformError::InvalidId(_))
        ));
    }

    #[test]
    fn test_combined_role_bits() {
        let roles = [(1, 2048), (20, 8192), (30, 8)].into_iter();

        // @everyone (the guild id) plus the member's own role
        assert_eq!(combined_role_bits(1, roles, &[20]), 2048 | 8192);
    }

    #[test]
    fn test_action_rows_hold_five_buttons() {
        let buttons: Vec<_> = (0..7)
            .map(|index| Button::new(format!("b{}", index), "Go", ButtonStyle::Primary))
            .collect();

        let rows = serde_json::to_value(action_rows(&buttons)).unwrap();

        assert_eq!(rows.as_array().unwrap().len(), 2);
        assert_eq!(rows[0]["components"].as_array().unwrap().len(), 5);
        assert_eq!(rows[1]["components"][1]["custom_id"], json!("b6"));
    }

    #[tokio::test]
    async fn test_replace_all_global() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v10/applications/7/commands")
            .match_header("authorization", "Bot secret")
            .match_body(Matcher::PartialJson(json!([{"name": "ping"}, {"name": "help"}])))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(registered_body(&["ping", "help"]))
            .create_async()
            .await;

        let accepted = client(&server.url(), None)
            .replace_all(&[command("ping"), command("help")])
            .await
            .unwrap();

        assert_eq!(accepted, 2);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_replace_all_dev_guild() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("PUT", "/api/v10/applications/7/guilds/55/commands")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;

        let accepted = client(&server.url(), Some("55"))
            .replace_all(&[])
            .await
            .unwrap();

        assert_eq!(accepted, 0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_replace_all_validation_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/v10/applications/7/commands")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 50035, "message": "Invalid Form Body"}"#)
            .create_async()
            .await;

        let error = client(&server.url(), None)
            .replace_all(&[command("ping")])
            .await
            .unwrap_err();

        assert!(matches!(error, RegistryError::Validation(_)));
    }

    #[tokio::test]
    async fn test_replace_all_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/v10/applications/7/commands")
            .with_status(401)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 0, "message": "401: Unauthorized"}"#)
            .create_async()
            .await;

        let error = client(&server.url(), None)
            .replace_all(&[command("ping")])
            .await
            .unwrap_err();

        assert!(matches!(error, RegistryError::Unauthorized(401)));
    }

    #[tokio::test]
    async fn test_replace_all_server_error_is_transport() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PUT", "/api/v10/applications/7/commands")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let error = client(&server.url(), None)
            .replace_all(&[command("ping")])
            .await
            .unwrap_err();

        assert!(matches!(error, RegistryError::Transport(_)));
    }

    #[tokio::test]
    async fn test_send_message_as_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v10/channels/10/messages")
            .match_body(Matcher::PartialJson(json!({"content": "pong"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(message_body("12"))
            .create_async()
            .await;

        let message_id = client(&server.url(), None)
            .send_message("10", &Reply::text("pong"), Some("11".to_string()))
            .await
            .unwrap();

        assert_eq!(message_id, "12");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_message_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v10/channels/10/messages")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": 50013, "message": "Missing Permissions"}"#)
            .create_async()
            .await;

        let error = client(&server.url(), None)
            .send_message("10", &Reply::text("pong"), None)
            .await
            .unwrap_err();

        assert!(matches!(error, PlatformError::Request(_)));
    }

    #[tokio::test]
    async fn test_respond_to_interaction_returns_original_id() {
        let mut server = mockito::Server::new_async().await;
        let callback = server
            .mock("POST", "/api/v10/interactions/21/tok/callback")
            .match_body(Matcher::PartialJson(json!({
                "type": 4,
                "data": {"content": "Sure?"}
            })))
            .with_status(204)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v10/webhooks/7/tok/messages/@original")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(message_body("22"))
            .create_async()
            .await;

        let reply = Reply::text("Sure?").with_buttons(vec![Button::new(
            "confirm",
            "Confirm",
            ButtonStyle::Success,
        )]);
        let message_id = client(&server.url(), None)
            .respond_to_interaction("21", "tok", &reply)
            .await
            .unwrap();

        assert_eq!(message_id, "22");
        callback.assert_async().await;
    }

    #[tokio::test]
    async fn test_acknowledge_component() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v10/interactions/21/tok/callback")
            .match_body(Matcher::PartialJson(json!({"type": 6})))
            .with_status(204)
            .create_async()
            .await;

        client(&server.url(), None)
            .acknowledge_component("21", "tok")
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invalid_channel_id_is_not_sent() {
        let error = DiscordClient::new("secret", "7", None, None)
            .unwrap()
            .send_message("general", &Reply::text("pong"), None)
            .await
            .unwrap_err();

        assert!(matches!(error, PlatformError::InvalidId(id) if id == "general"));
    }
}
