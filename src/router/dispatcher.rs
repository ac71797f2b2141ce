//! The dispatch sequence shared by both invocation channels.

use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::{
    catalog::{Catalog, CommandDefinition},
    guard::{ExecutionGuard, GuardRejection},
    permissions::{Capability, CapabilitySet},
    platform::{ChatPlatform, PlatformError},
    router::{
        Arguments, DispatchError, HandlerContext, Invocation, PlatformEvent, TriggerKind,
        event::parse_text_command, replies,
    },
    sessions::SessionManager,
    utils::ceil_millis,
};

/// Result of a dispatch that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran to completion.
    Executed,
    /// The event was not a command invocation.
    Ignored,
}

/// A resolved invocation waiting for its checks.
struct Pending {
    definition: Arc<CommandDefinition>,
    invocation: Invocation,
    caller_capabilities: Option<CapabilitySet>,
    bot_capabilities: Option<CapabilitySet>,
}

/// Turns platform events into handler executions.
///
/// The router holds no per-invocation state, so one instance is shared by every
/// concurrent dispatch.
pub struct Router {
    catalog: Arc<Catalog>,
    guard: ExecutionGuard,
    sessions: SessionManager,
    platform: Arc<dyn ChatPlatform>,
    prefix: char,
}

impl Router {
    /// Creates a router.
    ///
    /// # Arguments
    ///
    /// * `catalog` - The loaded command catalog
    /// * `guard` - Cooldown and permission checks
    /// * `sessions` - Session manager handed to handlers
    /// * `platform` - Used to resolve capabilities an event did not carry
    /// * `prefix` - Sigil starting text invocations
    pub fn new(
        catalog: Arc<Catalog>,
        guard: ExecutionGuard,
        sessions: SessionManager,
        platform: Arc<dyn ChatPlatform>,
        prefix: char,
    ) -> Self {
        Router {
            catalog,
            guard,
            sessions,
            platform,
            prefix,
        }
    }

    /// Dispatches one event.
    ///
    /// Text messages that are not a known command are ignored without a reply.
    /// Every other failure is reported to the caller with a message naming the
    /// remediation, then returned.
    ///
    /// # Errors
    ///
    /// Returns the [`DispatchError`] that stopped the invocation. It concerns this
    /// invocation only.
    pub async fn dispatch(&self, event: PlatformEvent) -> Result<Outcome, DispatchError> {
        let caller_id = event.caller_id().to_owned();
        let responder = match &event {
            PlatformEvent::Structured(event) => Arc::clone(&event.responder),
            PlatformEvent::Text(event) => Arc::clone(&event.responder),
        };

        let error = match self.route(event).await {
            Ok(outcome) => return Ok(outcome),
            Err(error) => error,
        };

        match &error {
            DispatchError::UnknownCommand(_)
            | DispatchError::Platform(_)
            | DispatchError::HandlerFailure { .. } => {
                error!("{} (caller {})", error, caller_id);
            }
            _ => debug!("rejected invocation of {}: {}", caller_id, error),
        }

        if let Err(reply_error) = responder.reply(replies::format_error(&error)).await {
            warn!("cannot notify {} of the failure: {}", caller_id, reply_error);
        }

        Err(error)
    }

    async fn route(&self, event: PlatformEvent) -> Result<Outcome, DispatchError> {
        let Some(pending) = self.classify(event)? else {
            return Ok(Outcome::Ignored);
        };
        let Pending {
            definition,
            invocation,
            caller_capabilities,
            bot_capabilities,
        } = pending;

        let supported = match invocation.trigger {
            TriggerKind::Structured => definition.supports_structured,
            TriggerKind::Text => definition.supports_text,
        };
        if !supported {
            return Err(DispatchError::UnsupportedTrigger {
                command: definition.name.clone(),
                trigger: invocation.trigger,
            });
        }

        if definition.guild_only && invocation.guild_id.is_none() {
            return Err(DispatchError::ScopeRequired(definition.name.clone()));
        }

        let caller_capabilities = self
            .caller_capabilities(&definition, &invocation, caller_capabilities)
            .await?;
        let bot_capabilities = self
            .bot_capabilities(&definition, &invocation, bot_capabilities)
            .await?;

        self.guard
            .check(
                &invocation.caller_id,
                &definition,
                &caller_capabilities,
                &bot_capabilities,
            )
            .map_err(|rejection| match rejection {
                GuardRejection::OnCooldown { remaining } => DispatchError::OnCooldown {
                    command: definition.name.clone(),
                    remaining_millis: ceil_millis(remaining),
                },
                GuardRejection::InsufficientCaller { missing } => {
                    DispatchError::InsufficientCallerPermission { missing }
                }
                GuardRejection::InsufficientBot { missing } => {
                    DispatchError::InsufficientBotPermission { missing }
                }
            })?;

        self.execute(definition, invocation).await
    }

    /// Resolves the command and builds the invocation, or `None` for messages
    /// that are not commands.
    fn classify(&self, event: PlatformEvent) -> Result<Option<Pending>, DispatchError> {
        match event {
            PlatformEvent::Structured(event) => {
                let definition = self
                    .catalog
                    .resolve(&event.command_name)
                    .ok_or_else(|| DispatchError::UnknownCommand(event.command_name.clone()))?;

                let invocation = Invocation {
                    command_name: definition.name.clone(),
                    trigger: TriggerKind::Structured,
                    caller_id: event.caller_id,
                    scope_id: event.scope_id,
                    guild_id: event.guild_id,
                    arguments: Arguments::Options(event.options),
                    responder: event.responder,
                };

                Ok(Some(Pending {
                    definition,
                    invocation,
                    caller_capabilities: event.caller_capabilities,
                    bot_capabilities: event.bot_capabilities,
                }))
            }
            PlatformEvent::Text(event) => {
                let Some((name, arguments)) = parse_text_command(&event.content, self.prefix)
                else {
                    return Ok(None);
                };
                let Some(definition) = self.catalog.resolve(&name) else {
                    return Ok(None);
                };

                let invocation = Invocation {
                    command_name: definition.name.clone(),
                    trigger: TriggerKind::Text,
                    caller_id: event.author_id,
                    scope_id: event.scope_id,
                    guild_id: event.guild_id,
                    arguments: Arguments::Raw(arguments),
                    responder: event.responder,
                };

                Ok(Some(Pending {
                    definition,
                    invocation,
                    caller_capabilities: event.caller_capabilities,
                    bot_capabilities: event.bot_capabilities,
                }))
            }
        }
    }

    async fn caller_capabilities(
        &self,
        definition: &CommandDefinition,
        invocation: &Invocation,
        known: Option<CapabilitySet>,
    ) -> Result<CapabilitySet, PlatformError> {
        if let Some(capabilities) = known {
            return Ok(capabilities);
        }
        // Owners pass the caller check whatever they hold
        if definition.required_caller.is_empty() || self.guard.is_owner(&invocation.caller_id) {
            return Ok(CapabilitySet::new());
        }

        match &invocation.guild_id {
            Some(guild_id) => {
                self.platform
                    .caller_capabilities(guild_id, &invocation.caller_id)
                    .await
            }
            None => Ok(CapabilitySet::new()),
        }
    }

    async fn bot_capabilities(
        &self,
        definition: &CommandDefinition,
        invocation: &Invocation,
        known: Option<CapabilitySet>,
    ) -> Result<CapabilitySet, PlatformError> {
        if let Some(capabilities) = known {
            return Ok(capabilities);
        }
        if definition.required_bot.is_empty() {
            return Ok(CapabilitySet::new());
        }

        match &invocation.guild_id {
            Some(guild_id) => self.platform.bot_capabilities(guild_id).await,
            None => Ok(direct_message_capabilities()),
        }
    }

    /// Runs the handler on its own task so that a panic stays contained.
    async fn execute(
        &self,
        definition: Arc<CommandDefinition>,
        invocation: Invocation,
    ) -> Result<Outcome, DispatchError> {
        let command = definition.name.clone();
        info!(
            "{} invoked {} ({})",
            invocation.caller_id, command, invocation.trigger
        );

        let context = HandlerContext {
            sessions: self.sessions.clone(),
            catalog: Arc::clone(&self.catalog),
        };
        let handler = Arc::clone(&definition.handler);

        let reason = match tokio::spawn(async move { handler.execute(invocation, context).await })
            .await
        {
            Ok(Ok(())) => return Ok(Outcome::Executed),
            Ok(Err(error)) => format!("{:#}", error),
            Err(join_error) => join_error.to_string(),
        };

        Err(DispatchError::HandlerFailure { command, reason })
    }
}

/// What the bot can always do in a direct message.
fn direct_message_capabilities() -> CapabilitySet {
    CapabilitySet::from([
        Capability::ViewChannel,
        Capability::SendMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
        Capability::AddReactions,
        Capability::ReadMessageHistory,
    ])
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("commands", &self.catalog.len())
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}
