//! Ping command handler.

use log::debug;

use crate::{
    commands::markdown_response::format_pong,
    platform::Reply,
    router::{HandlerContext, Invocation},
};

/// Replies `Pong!`. Used to check the bot is alive and the cooldown is applied.
pub async fn handle_ping(invocation: Invocation, _context: HandlerContext) -> anyhow::Result<()> {
    debug!("handling ping command for {}", invocation.caller_id);

    invocation.responder.reply(Reply::text(format_pong())).await?;

    Ok(())
}
