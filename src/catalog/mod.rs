//! Command catalog: definitions, their on-disk sources and name/alias resolution.
//!
//! The catalog is loaded once at start-up from a two-level directory tree
//! (`<category>/<command>.yaml`) and is immutable afterwards. Any configuration
//! error found while loading is fatal: the bot refuses to start rather than run
//! with an ambiguous command table.
//!
//! # Modules
//!
//! - [`command_catalog`] - The [`Catalog`] with its name and alias indices
//! - [`definition`] - [`CommandDefinition`] and the parameter schema
//! - [`handler`] - The [`CommandHandler`] trait and [`HandlerRegistry`]
//! - [`source`] - YAML source units and their conversion into definitions

mod command_catalog;
mod definition;
mod handler;
mod source;

use thiserror::Error;

pub use crate::catalog::command_catalog::Catalog;
pub use crate::catalog::definition::{
    ChoiceValue, CommandDefinition, ParameterKind, ParameterSpec,
};
pub use crate::catalog::handler::{CommandHandler, HandlerRegistry, handler_fn};

/// Fatal configuration errors raised while building the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The catalog directory or one of its entries could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A source unit is not valid YAML or misses required fields.
    #[error("malformed command source {path}: {reason}")]
    Malformed { path: String, reason: String },

    /// A command name is empty or contains whitespace.
    #[error("invalid command name '{0}'")]
    InvalidName(String),

    /// A command name collides with an existing name or alias.
    #[error("duplicate command name '{0}'")]
    DuplicateName(String),

    /// An alias collides with an existing name or alias.
    #[error("alias '{alias}' of '{command}' collides with '{existing}'")]
    AliasCollision {
        alias: String,
        command: String,
        existing: String,
    },

    /// A structured-capable command declares a parameter kind the registry
    /// cannot express.
    #[error("command '{command}' parameter '{parameter}' has unrecognized kind '{kind}'")]
    UnknownParameterKind {
        command: String,
        parameter: String,
        kind: String,
    },

    /// A parameter declares choices although its kind does not accept any.
    #[error("command '{command}' parameter '{parameter}' of kind {kind} cannot have choices")]
    ChoicesNotSupported {
        command: String,
        parameter: String,
        kind: String,
    },

    /// A choice cannot be expressed in the kind of its parameter.
    #[error("command '{command}' parameter '{parameter}' has invalid choice '{choice}'")]
    InvalidChoice {
        command: String,
        parameter: String,
        choice: String,
    },

    /// A capability name is not known.
    #[error("command '{command}' requires unknown capability '{capability}'")]
    UnknownCapability { command: String, capability: String },

    /// No handler is registered under the key named by the source.
    #[error("command '{command}' refers to missing handler '{handler}'")]
    MissingHandler { command: String, handler: String },
}
