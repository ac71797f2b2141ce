//! Announce command handler.
//!
//! Posts a message in the channel after the caller confirms it. The confirmation
//! runs as an interactive session on the prompt message: the caller has
//! [`CONFIRM_TIMEOUT`] to click `Confirm` or `Cancel`, after which the prompt
//! loses its buttons and shows how it ended.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use log::{debug, info, warn};

use crate::{
    commands::markdown_response::{
        format_announce_closed, format_announce_missing, format_announce_prompt,
        format_announcement,
    },
    platform::{Button, ButtonStyle, Reply, Responder},
    router::{HandlerContext, Invocation},
    sessions::{Flow, SessionEvent, SessionHandler},
};

pub const CONFIRM_ID: &str = "announce:confirm";
pub const CANCEL_ID: &str = "announce:cancel";

/// How long the caller has to answer the prompt.
pub const CONFIRM_TIMEOUT: Duration = Duration::from_secs(60);

/// Asks the caller to confirm the announcement and opens the confirmation session.
///
/// The prompt is sent without buttons and only gets them once the session is
/// open.
///
/// # Errors
///
/// Fails when the prompt cannot be sent or a session already runs on it.
pub async fn handle_announce(invocation: Invocation, context: HandlerContext) -> anyhow::Result<()> {
    debug!("handling announce command for {}", invocation.caller_id);

    let Some(message) = invocation.arguments.text("message") else {
        invocation
            .responder
            .reply(Reply::ephemeral(format_announce_missing()))
            .await?;
        return Ok(());
    };

    let prompt = Reply::text(format_announce_prompt(&message));
    let prompt_id = invocation.responder.reply(prompt.clone()).await?;

    context.sessions.open(
        &invocation.caller_id,
        &prompt_id,
        CONFIRM_TIMEOUT,
        AnnounceSession::new(Arc::clone(&invocation.responder), prompt_id.clone(), message),
    )?;

    // Buttons only show up once a click can reach the session.
    invocation
        .responder
        .edit(
            &prompt_id,
            prompt.with_buttons(vec![
                Button::new(CONFIRM_ID, "Confirm", ButtonStyle::Success),
                Button::new(CANCEL_ID, "Cancel", ButtonStyle::Secondary),
            ]),
        )
        .await?;

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Pending,
    Posted,
    Cancelled,
    Expired,
    Failed,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Pending => "Closed.",
            Status::Posted => "✅ Announcement posted.",
            Status::Cancelled => "❌ Announcement cancelled.",
            Status::Expired => "⌛ No answer, announcement cancelled.",
            Status::Failed => "⚠️ The announcement could not be posted.",
        }
    }
}

/// State of one confirmation prompt.
struct AnnounceSession {
    responder: Arc<dyn Responder>,
    prompt_id: String,
    message: String,
    status: Status,
}

impl AnnounceSession {
    fn new(responder: Arc<dyn Responder>, prompt_id: String, message: String) -> Self {
        AnnounceSession {
            responder,
            prompt_id,
            message,
            status: Status::Pending,
        }
    }
}

#[async_trait]
impl SessionHandler for AnnounceSession {
    async fn on_event(&mut self, event: SessionEvent) -> Flow {
        let SessionEvent::Button { custom_id } = event else {
            return Flow::Continue;
        };

        match custom_id.as_str() {
            CONFIRM_ID => {
                self.status = match self
                    .responder
                    .reply(Reply::text(format_announcement(&self.message)))
                    .await
                {
                    Ok(message_id) => {
                        info!("announcement posted as message {}", message_id);
                        Status::Posted
                    }
                    Err(error) => {
                        warn!("cannot post announcement: {}", error);
                        Status::Failed
                    }
                };
                Flow::Terminate
            }
            CANCEL_ID => {
                self.status = Status::Cancelled;
                Flow::Terminate
            }
            other => {
                debug!("ignoring unknown button {}", other);
                Flow::Continue
            }
        }
    }

    async fn on_expire(&mut self) {
        self.status = Status::Expired;
    }

    async fn finalize(&mut self) {
        let closed = Reply::text(format_announce_closed(self.status.label(), &self.message));
        if let Err(error) = self.responder.edit(&self.prompt_id, closed).await {
            warn!("cannot close announce prompt {}: {}", self.prompt_id, error);
        }
    }
}
