//! User-facing messages for rejected or failed invocations.
//!
//! Messages name the remediation (how long to wait, which permission is missing
//! and who must grant it) but never leak handler internals.

use crate::{
    platform::Reply,
    router::{DispatchError, TriggerKind, capability_names},
    utils::format_seconds,
};

/// Formats the reply sent to the caller for a dispatch error.
///
/// Replies are ephemeral so that only the caller sees them when the channel
/// supports it.
///
/// # Examples
///
/// ```ignore
/// let reply = format_error(&DispatchError::ScopeRequired("announce".to_string()));
/// assert_eq!(reply.content, "`announce` can only be used in a server.");
/// ```
pub fn format_error(error: &DispatchError) -> Reply {
    let content = match error {
        DispatchError::UnsupportedTrigger { command, trigger } => {
            format!(
                "`{}` is not available as a {}.",
                command,
                trigger_label(*trigger)
            )
        }
        DispatchError::ScopeRequired(command) => {
            format!("`{}` can only be used in a server.", command)
        }
        DispatchError::OnCooldown {
            command,
            remaining_millis,
        } => format!(
            "Please wait {} before using `{}` again.",
            format_seconds(*remaining_millis),
            command
        ),
        DispatchError::InsufficientCallerPermission { missing } => format!(
            "You need the following permissions to use this command: {}.",
            capability_names(missing)
        ),
        DispatchError::InsufficientBotPermission { missing } => format!(
            "I am missing the following permissions here: {}. Ask a server administrator to grant them to me.",
            capability_names(missing)
        ),
        DispatchError::UnknownCommand(_)
        | DispatchError::Platform(_)
        | DispatchError::HandlerFailure { .. } => format_generic_failure(),
    };

    Reply::ephemeral(content)
}

/// The only message shown for internal failures.
pub fn format_generic_failure() -> String {
    "Something went wrong while running this command.".to_owned()
}

fn trigger_label(trigger: TriggerKind) -> &'static str {
    match trigger {
        TriggerKind::Structured => "slash command",
        TriggerKind::Text => "text command",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Capability;

    #[test]
    fn test_format_cooldown_gives_exact_wait() {
        let reply = format_error(&DispatchError::OnCooldown {
            command: "ping".to_string(),
            remaining_millis: 3800,
        });

        assert_eq!(reply.content, "Please wait 3.8s before using `ping` again.");
        assert!(reply.ephemeral);
    }

    #[test]
    fn test_format_caller_and_bot_permissions_differ() {
        let missing = vec![Capability::ManageChannels, Capability::KickMembers];
        let caller = format_error(&DispatchError::InsufficientCallerPermission {
            missing: missing.clone(),
        });
        let bot = format_error(&DispatchError::InsufficientBotPermission { missing });

        assert!(caller.content.starts_with("You need"));
        assert!(caller.content.contains("ManageChannels, KickMembers"));
        assert!(bot.content.starts_with("I am missing"));
        assert!(bot.content.contains("ManageChannels, KickMembers"));
    }

    #[test]
    fn test_format_unsupported_trigger() {
        let reply = format_error(&DispatchError::UnsupportedTrigger {
            command: "purge".to_string(),
            trigger: TriggerKind::Structured,
        });

        assert_eq!(reply.content, "`purge` is not available as a slash command.");
    }

    #[test]
    fn test_handler_failure_does_not_leak_details() {
        let reply = format_error(&DispatchError::HandlerFailure {
            command: "ping".to_string(),
            reason: "database password is hunter2".to_string(),
        });

        assert_eq!(reply.content, format_generic_failure());
    }
}
