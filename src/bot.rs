//! Bot module wiring the engine to Discord.
//!
//! This module provides the main [`Bot`] implementation. It loads the command
//! catalog, builds the execution guard, the router and the session manager, then
//! feeds them with the events serenity receives from the gateway.
//!
//! # Event Flow
//!
//! ```text
//! serenity ─┬─ message ─┬─ reply to a session message → SessionManager::deliver
//!           │           └─ otherwise → Router::dispatch (text)
//!           ├─ interaction_create ─┬─ command → Router::dispatch (structured)
//!           │                      └─ button click → SessionManager::deliver
//!           └─ reaction_add → SessionManager::deliver
//! ```
//!
//! Serenity runs every event handler on its own task, so a slow handler never
//! delays the others. Messages written by bots, including this one, are never
//! routed.
//!
//! # Start-up
//!
//! 1. The catalog is loaded and the cooldown retention checked against it; any
//!    error aborts the start
//! 2. Structured commands are published; a failure is logged and the bot keeps
//!    running with the previously published set
//! 3. The cooldown eviction task starts when a retention is configured
//! 4. The gateway connection runs until the process ends

use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Context as _;
use log::{error, info, warn};
use serenity::{
    Client,
    all::{Context, EventHandler, GatewayIntents, Interaction, Message, Reaction, Ready},
    async_trait,
};

use crate::{
    catalog::Catalog,
    commands,
    config::Config,
    discord::{CommandCall, ComponentClick, DiscordClient, IncomingMessage, ReactionAdd},
    guard::{CooldownTracker, ExecutionGuard},
    permissions::PermissionGate,
    platform::{ChannelResponder, ChatPlatform, InteractionResponder, Reply},
    publisher::{PublishError, PublishReport, Publisher},
    router::{PlatformEvent, Router, StructuredEvent, TextEvent},
    sessions::{Delivery, IgnoreReason, SessionEvent, SessionManager},
};

/// How often stale cooldown records are evicted.
const EVICTION_PERIOD: Duration = Duration::from_secs(60 * 60);

/// Gateway events the bot subscribes to.
fn intents() -> GatewayIntents {
    GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::GUILD_MESSAGE_REACTIONS
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::DIRECT_MESSAGE_REACTIONS
        | GatewayIntents::MESSAGE_CONTENT
}

/// Main bot structure.
pub struct Bot {
    config: Config,
    catalog: Arc<Catalog>,
    client: Arc<DiscordClient>,
    cooldowns: CooldownTracker,
    /// Age past which cooldown records are evicted
    retention: Option<Duration>,
    handler: Handler,
}

impl Bot {
    /// Creates the bot and loads the catalog from `catalog_dir`.
    ///
    /// # Errors
    ///
    /// Fails when the catalog cannot be loaded, when the cooldown retention does
    /// not exceed the longest cooldown of the catalog, or when a Discord id of
    /// the configuration is not a snowflake.
    pub fn new(config: Config, catalog_dir: &Path) -> anyhow::Result<Bot> {
        let catalog = Catalog::load(catalog_dir, &commands::handlers()).with_context(|| {
            format!("cannot load the catalog from {}", catalog_dir.display())
        })?;
        let catalog = Arc::new(catalog);
        info!("loaded {} commands", catalog.len());

        let longest_cooldown = catalog
            .iter()
            .map(|definition| definition.cooldown)
            .max()
            .unwrap_or_default();
        let retention = config.bot.cooldown_retention(longest_cooldown)?;

        let client = Arc::new(
            DiscordClient::new(
                &config.discord.token,
                &config.discord.application_id,
                config.discord.dev_guild_id.as_deref(),
                config.discord.proxy_url.as_deref(),
            )
            .context("invalid discord settings")?,
        );

        let cooldowns = CooldownTracker::new();
        let guard = ExecutionGuard::new(
            cooldowns.clone(),
            PermissionGate::new(config.bot.owner_ids.iter().cloned()),
        );
        let sessions = SessionManager::new();
        let router = Router::new(
            Arc::clone(&catalog),
            guard,
            sessions.clone(),
            client.clone(),
            config.bot.prefix,
        );

        let handler = Handler {
            platform: client.clone(),
            router,
            sessions,
        };

        Ok(Bot {
            config,
            catalog,
            client,
            cooldowns,
            retention,
            handler,
        })
    }

    /// Publishes every structured-capable command of the catalog.
    ///
    /// # Errors
    ///
    /// Returns the [`PublishError`] of the publisher.
    pub async fn publish(&self) -> Result<PublishReport, PublishError> {
        let report = Publisher::new(self.client.clone())
            .publish(&self.catalog)
            .await?;

        info!(
            "published {}/{} structured commands",
            report.accepted, report.attempted
        );
        if !report.dropped.is_empty() {
            warn!("commands left out: {}", report.dropped.join(", "));
        }

        Ok(report)
    }

    /// Publishes the commands, then handles gateway events until the process ends.
    ///
    /// # Errors
    ///
    /// Fails when the gateway client cannot be built or its connection ends
    /// with an error serenity does not recover from.
    pub async fn start(self) -> anyhow::Result<()> {
        if let Err(e) = self.publish().await {
            error!("structured commands not published: {}", e);
        }

        if let Some(retention) = self.retention {
            info!("evicting cooldowns older than {}s", retention.as_secs());
            self.cooldowns
                .start_eviction_task(retention, EVICTION_PERIOD);
        }

        let mut client = Client::builder(&self.config.discord.token, intents())
            .event_handler(self.handler)
            .await
            .context("cannot create the gateway client")?;

        client
            .start()
            .await
            .context("gateway connection failed")?;

        info!("gateway closed, stopping");
        Ok(())
    }
}

/// Turns gateway events into router dispatches and session deliveries.
struct Handler {
    platform: Arc<dyn ChatPlatform>,
    router: Router,
    sessions: SessionManager,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, _: Context, ready: Ready) {
        info!("connected as {} ({})", ready.user.name, ready.user.id);
    }

    async fn message(&self, _: Context, message: Message) {
        self.on_message(IncomingMessage::from(&message)).await;
    }

    async fn interaction_create(&self, _: Context, interaction: Interaction) {
        match interaction {
            Interaction::Command(command) => self.on_command(CommandCall::from(&command)).await,
            Interaction::Component(component) => {
                self.on_component(ComponentClick::from(&component)).await
            }
            _ => {}
        }
    }

    async fn reaction_add(&self, _: Context, reaction: Reaction) {
        match ReactionAdd::from_reaction(&reaction) {
            Some(reaction) => self.on_reaction(reaction).await,
            None => warn!("reaction without author on {}", reaction.message_id),
        }
    }
}

impl Handler {
    async fn on_message(&self, message: IncomingMessage) {
        if message.author_is_bot {
            return;
        }

        if let Some(referenced) = message.referenced_message_id.as_deref() {
            let event = SessionEvent::Reply {
                content: message.content.clone(),
            };
            if self.sessions.deliver(referenced, &message.author_id, event).await
                == Delivery::Handled
            {
                return;
            }
        }

        let responder = ChannelResponder::new(
            Arc::clone(&self.platform),
            &message.channel_id,
            &message.id,
        );
        let event = TextEvent {
            content: message.content,
            author_id: message.author_id,
            scope_id: message.channel_id,
            guild_id: message.guild_id,
            caller_capabilities: None,
            bot_capabilities: None,
            responder: Arc::new(responder),
        };

        // Failures were already reported to the caller by the router
        let _ = self.router.dispatch(PlatformEvent::Text(event)).await;
    }

    async fn on_command(&self, call: CommandCall) {
        let event = structured_event(call, Arc::clone(&self.platform));
        let _ = self.router.dispatch(PlatformEvent::Structured(event)).await;
    }

    async fn on_component(&self, click: ComponentClick) {
        if let Err(e) = self
            .platform
            .acknowledge_component(&click.interaction_id, &click.token)
            .await
        {
            warn!(
                "cannot acknowledge component interaction {}: {}",
                click.interaction_id, e
            );
        }

        let event = SessionEvent::Button {
            custom_id: click.custom_id,
        };
        let delivery = self
            .sessions
            .deliver(&click.message_id, &click.user_id, event)
            .await;

        if delivery == Delivery::Ignored(IgnoreReason::NotOwner) {
            let notice = Reply::ephemeral("This prompt belongs to someone else.");
            if let Err(e) = self.platform.send_followup(&click.token, &notice).await {
                warn!("cannot notify {}: {}", click.user_id, e);
            }
        }
    }

    async fn on_reaction(&self, reaction: ReactionAdd) {
        let event = SessionEvent::Reaction {
            emoji: reaction.emoji,
        };
        self.sessions
            .deliver(&reaction.message_id, &reaction.user_id, event)
            .await;
    }
}

/// Builds the router event of a structured invocation.
///
/// Capabilities are the resolved permissions the platform attaches to the
/// interaction, so no lookup is needed for them.
fn structured_event(call: CommandCall, platform: Arc<dyn ChatPlatform>) -> StructuredEvent {
    let responder = InteractionResponder::new(platform, call.interaction_id, call.token);

    StructuredEvent {
        command_name: call.command_name,
        options: call.options,
        caller_id: call.caller_id,
        scope_id: call.channel_id,
        guild_id: call.guild_id,
        caller_capabilities: call.caller_capabilities,
        bot_capabilities: call.bot_capabilities,
        responder: Arc::new(responder),
    }
}
