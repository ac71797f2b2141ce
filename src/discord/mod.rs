//! Discord adapter, built on serenity.
//!
//! Connects the engine to Discord:
//!
//! - [`client`] - REST calls: messages, interaction callbacks, permission
//!   lookups and the bulk command replace used by the publisher
//! - [`events`] - Gateway events flattened into the few fields the engine reads
//!
//! The gateway connection itself is serenity's [`serenity::Client`], driven from
//! [`crate::bot`].

mod client;
mod events;

pub use crate::discord::client::DiscordClient;
pub use crate::discord::events::{CommandCall, ComponentClick, IncomingMessage, ReactionAdd};
