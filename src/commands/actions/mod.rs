//! Command action handlers.
//!
//! Each handler receives the [`Invocation`](crate::router::Invocation) built by
//! the router and the [`HandlerContext`](crate::router::HandlerContext), and
//! answers through the invocation's responder.
//!
//! # Available Handlers
//!
//! - [`handle_help`] - List the catalog by category
//! - [`handle_ping`] - Liveness check
//! - [`handle_announce`] - Confirmed announcement through an interactive session

mod announce;
mod help;
mod ping;

pub use crate::commands::actions::{
    announce::handle_announce, help::handle_help, ping::handle_ping,
};
