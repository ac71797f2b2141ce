//! Markdown response formatters for the built-in commands.
//!
//! Discord renders a subset of Markdown: bold, inline code, quotes and bullet
//! lists are all this module relies on.

use crate::{catalog::Catalog, utils::truncate_chars};

/// Maximum length of a message body accepted by the platform.
const MAX_MESSAGE_CHARS: usize = 2000;

/// Formats the command list, grouped by category.
///
/// Categories are sorted by name and commands keep their catalog order. Aliases
/// and the server-only restriction are shown next to each command.
///
/// # Examples
///
/// ```ignore
/// let help = format_help(&catalog);
/// assert!(help.starts_with("**Commands**"));
/// ```
pub fn format_help(catalog: &Catalog) -> String {
    if catalog.is_empty() {
        return "No commands available.".to_owned();
    }

    let mut body = String::from("**Commands**\n");
    for (category, definitions) in catalog.by_category() {
        body.push_str(&format!("\n**{}**\n", category));
        for definition in definitions {
            body.push_str(&format!("- `{}`", definition.name));
            if !definition.aliases.is_empty() {
                body.push_str(&format!(" (alias: {})", definition.aliases.join(", ")));
            }
            if !definition.description.is_empty() {
                body.push_str(&format!(": {}", definition.description));
            }
            if definition.guild_only {
                body.push_str(" *(server only)*");
            }
            body.push('\n');
        }
    }

    truncate_chars(body.trim_end(), MAX_MESSAGE_CHARS)
}

pub fn format_pong() -> String {
    "Pong!".to_owned()
}

/// Formats the confirmation prompt of an announcement.
pub fn format_announce_prompt(message: &str) -> String {
    let quoted: Vec<String> = message.lines().map(|line| format!("> {}", line)).collect();
    truncate_chars(
        &format!("Post this announcement?\n{}", quoted.join("\n")),
        MAX_MESSAGE_CHARS,
    )
}

pub fn format_announce_missing() -> String {
    "Nothing to announce: add the message after the command.".to_owned()
}

/// Formats the announcement itself.
pub fn format_announcement(message: &str) -> String {
    truncate_chars(&format!("📢 {}", message), MAX_MESSAGE_CHARS)
}

/// Formats the prompt once the session is over, without its buttons.
///
/// # Arguments
///
/// * `status` - Short description of how the prompt ended
/// * `message` - The announcement text
pub fn format_announce_closed(status: &str, message: &str) -> String {
    truncate_chars(
        &format!("{}\n> {}", status, message.lines().collect::<Vec<_>>().join("\n> ")),
        MAX_MESSAGE_CHARS,
    )
}
