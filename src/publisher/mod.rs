//! Publication of structured commands to the platform registry.
//!
//! Every structured-capable catalog entry is serialized and sent in one bulk
//! replace. When the registry rejects the batch for validation reasons, a single
//! retry is made with the first
//! [`FALLBACK_BATCH`](command_publisher::FALLBACK_BATCH) commands and the rest are
//! reported as dropped. Authorization and transport failures are never retried.
//!
//! - [`command_publisher`] - The [`Publisher`] and its report
//! - [`schema`] - The registry representation of a command

mod command_publisher;
mod schema;

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

pub use crate::publisher::command_publisher::{PublishReport, Publisher};
pub use crate::publisher::schema::RegisteredCommand;

/// Failure of a bulk replace call.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The registry refused the payload itself.
    #[error("registry rejected the commands: {0}")]
    Validation(String),

    /// The credentials were refused.
    #[error("registry refused the credentials (status {0})")]
    Unauthorized(u16),

    /// The call did not complete or failed for another reason.
    #[error("registry call failed: {0}")]
    Transport(String),
}

/// Fatal outcome of [`Publisher::publish`].
#[derive(Debug, Error)]
pub enum PublishError {
    /// The full batch failed with a non-retryable error.
    #[error("cannot publish commands: {0}")]
    Registry(#[source] RegistryError),

    /// The reduced batch failed too.
    #[error("cannot publish the reduced batch: {0}")]
    Fallback(#[source] RegistryError),
}

/// The remote "replace all structured commands" operation.
#[automock]
#[async_trait]
pub trait CommandRegistryApi: Send + Sync {
    /// Replaces every registered command with `commands`.
    ///
    /// Returns how many commands the registry now holds.
    async fn replace_all(&self, commands: &[RegisteredCommand]) -> Result<usize, RegistryError>;
}
