//! Help command handler.
//!
//! Lists every command of the catalog grouped by category. Works in both
//! channels and needs no capability.

use log::debug;

use crate::{
    commands::markdown_response::format_help,
    platform::Reply,
    router::{HandlerContext, Invocation},
};

/// Replies with the command list.
pub async fn handle_help(invocation: Invocation, context: HandlerContext) -> anyhow::Result<()> {
    debug!("handling help command for {}", invocation.caller_id);

    invocation
        .responder
        .reply(Reply::text(format_help(&context.catalog)))
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        catalog::{Catalog, CommandDefinition, handler_fn},
        platform::{MockResponder, PlatformError},
        router::{Arguments, TriggerKind},
        sessions::SessionManager,
    };

    fn create_test_invocation(responder: MockResponder) -> Invocation {
        Invocation {
            command_name: "help".to_string(),
            trigger: TriggerKind::Text,
            caller_id: "u1".to_string(),
            scope_id: "c1".to_string(),
            guild_id: None,
            arguments: Arguments::Raw(vec![]),
            responder: Arc::new(responder),
        }
    }

    fn create_test_context() -> HandlerContext {
        let handler = handler_fn(|_, _| async { Ok(()) });
        HandlerContext {
            sessions: SessionManager::new(),
            catalog: Arc::new(
                Catalog::from_definitions([
                    CommandDefinition::new("help", "utility", handler.clone()),
                    CommandDefinition::new("ping", "utility", handler),
                ])
                .unwrap(),
            ),
        }
    }

    #[tokio::test]
    async fn test_handle_help_lists_commands() {
        let mut responder = MockResponder::new();
        responder
            .expect_reply()
            .withf(|reply| {
                reply.content.contains("`help`")
                    && reply.content.contains("`ping`")
                    && reply.buttons.is_empty()
            })
            .times(1)
            .returning(|_| Ok("m1".to_string()));

        handle_help(create_test_invocation(responder), create_test_context())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_handle_help_propagates_reply_failure() {
        let mut responder = MockResponder::new();
        responder
            .expect_reply()
            .times(1)
            .returning(|_| Err(PlatformError::Request(serenity::Error::Other("gone"))));

        let result = handle_help(create_test_invocation(responder), create_test_context()).await;

        assert!(result.is_err());
    }
}
