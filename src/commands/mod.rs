//! Built-in commands.
//!
//! The bot ships a few handlers bound by key in a [`HandlerRegistry`]. Their
//! metadata (name, aliases, cooldown, capabilities, parameters) lives in the YAML
//! sources of the catalog directory, not here:
//!
//! | Key | Category | Description |
//! |-----|----------|-------------|
//! | `help` | utility | List the commands by category |
//! | `ping` | utility | Liveness check |
//! | `announce` | moderation | Post a message after a Confirm/Cancel prompt |
//!
//! - [`actions`] - The handler bodies
//! - [`markdown_response`] - Text formatting of their replies

mod actions;
mod markdown_response;

use crate::catalog::{HandlerRegistry, handler_fn};

use crate::commands::actions::{handle_announce, handle_help, handle_ping};

/// Returns the registry of every built-in handler.
pub fn handlers() -> HandlerRegistry {
    HandlerRegistry::new()
        .with("help", handler_fn(handle_help))
        .with("ping", handler_fn(handle_ping))
        .with("announce", handler_fn(handle_announce))
}
