//! Herald - A Discord bot command dispatcher.
//!
//! Herald loads a catalog of commands from YAML files, publishes the structured
//! ones to Discord and routes every invocation, structured or prefixed text,
//! through a single guarded path: cooldowns and permission checks live in one
//! place and handlers only ever see a canonical invocation.
//!
//! # Features
//!
//! - **Two trigger channels**: structured (slash) commands and `!`-prefixed text
//!   commands share the same definitions and the same checks
//! - **Cooldowns**: per caller and per command, checked atomically
//! - **Permission gate**: caller and bot capabilities, with an owner/administrator
//!   bypass for callers
//! - **Interactive sessions**: button, reaction and reply driven flows bound to a
//!   message, with a fixed timeout
//! - **Command publication**: bulk replace with a reduced-batch fallback
//!
//! # Configuration
//!
//! ```yaml
//! discord:
//!   token: "bot-token"
//!   application_id: "1234"
//!
//! bot:
//!   prefix: "!"
//!   owner_ids: ["42"]
//! ```
//!
//! Any value can be overridden with a `HERALD_` environment variable, e.g.
//! `HERALD_DISCORD__TOKEN`.
//!
//! # Usage
//!
//! ```bash
//! herald --config config.yaml --catalog ./catalog
//! herald --config config.yaml --catalog ./catalog --publish-only
//! ```
//!
//! # Architecture
//!
//! - [`bot`] - Wiring and the serenity event handler
//! - [`catalog`] - Command definitions loaded from the catalog directory
//! - [`commands`] - Built-in command handlers
//! - [`config`] - YAML configuration with environment overrides
//! - [`discord`] - Serenity adapter: REST client and gateway events
//! - [`guard`] - Cooldown tracker and execution guard
//! - [`permissions`] - Capabilities and the permission gate
//! - [`platform`] - Chat platform port and responders
//! - [`publisher`] - Structured command publication
//! - [`router`] - Invocation routing
//! - [`sessions`] - Interactive session manager
//! - [`utils`] - Text and duration helpers
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (default: `info`)

use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use env_logger::Env;
use log::{error, info};

use crate::{bot::Bot, config::Config};

mod bot;
mod catalog;
mod commands;
mod config;
mod discord;
mod guard;
mod permissions;
mod platform;
mod publisher;
mod router;
mod sessions;
mod utils;

/// Command-line arguments for the Herald bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the YAML configuration file.
    ///
    /// Environment variables prefixed with `HERALD_` override its values.
    #[arg(short, long)]
    config: String,

    /// Path to the catalog directory.
    ///
    /// The directory holds one sub-directory per category, each containing one
    /// YAML file per command.
    #[arg(long, default_value = "catalog")]
    catalog: PathBuf,

    /// Publish the structured commands and exit.
    #[arg(long)]
    publish_only: bool,
}

/// Main entry point for the Herald bot.
///
/// Configuration and catalog errors stop the process before it connects. Once
/// running, no per-invocation error ever stops it.
#[tokio::main]
async fn main() -> ExitCode {
    // Put logger at info level by default
    let env = Env::default().filter_or("RUST_LOG", "info");
    env_logger::init_from_env(env);

    info!("Starting herald {}...", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();

    let config = match Config::load(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config file: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let bot = match Bot::new(config, &args.catalog) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to initialize bot: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.publish_only {
        return match bot.publish().await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                error!("Failed to publish commands: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match bot.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Bot stopped: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
