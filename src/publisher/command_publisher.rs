//! Bulk publication with the reduced-batch fallback.

use std::sync::Arc;

use log::{error, info, warn};

use crate::{
    catalog::Catalog,
    publisher::{CommandRegistryApi, PublishError, RegisteredCommand, RegistryError},
};

/// Size of the retry batch after a validation rejection.
pub const FALLBACK_BATCH: usize = 50;

/// Summary of a publication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Number of structured-capable commands in the catalog.
    pub attempted: usize,
    /// Number of commands the registry accepted.
    pub accepted: usize,
    /// Names left out by the fallback, in catalog order. Empty on full success.
    pub dropped: Vec<String>,
}

/// Publishes the catalog's structured commands.
pub struct Publisher {
    registry: Arc<dyn CommandRegistryApi>,
}

impl Publisher {
    pub fn new(registry: Arc<dyn CommandRegistryApi>) -> Self {
        Publisher { registry }
    }

    /// Replaces the registry content with every structured-capable command.
    ///
    /// # Errors
    ///
    /// * [`PublishError::Registry`] - the full batch failed with anything but a
    ///   validation error, or a validation error with nothing to drop
    /// * [`PublishError::Fallback`] - the reduced batch failed as well
    pub async fn publish(&self, catalog: &Catalog) -> Result<PublishReport, PublishError> {
        let commands: Vec<RegisteredCommand> = catalog
            .all_structured_capable()
            .map(RegisteredCommand::from_definition)
            .collect();
        let attempted = commands.len();

        info!("publishing {} structured commands", attempted);

        let reason = match self.registry.replace_all(&commands).await {
            Ok(accepted) => {
                info!("registry accepted {} commands", accepted);
                return Ok(PublishReport {
                    attempted,
                    accepted,
                    dropped: Vec::new(),
                });
            }
            Err(RegistryError::Validation(reason)) if attempted > FALLBACK_BATCH => reason,
            Err(error) => {
                error!("publication failed: {}", error);
                return Err(PublishError::Registry(error));
            }
        };

        warn!(
            "registry rejected {} commands ({}), retrying with the first {}",
            attempted, reason, FALLBACK_BATCH
        );

        let (kept, dropped) = commands.split_at(FALLBACK_BATCH);
        let accepted = self
            .registry
            .replace_all(kept)
            .await
            .map_err(PublishError::Fallback)?;
        let dropped: Vec<String> = dropped.iter().map(|command| command.name.clone()).collect();

        warn!(
            "registry accepted {} commands, dropped {}",
            accepted,
            dropped.join(", ")
        );

        Ok(PublishReport {
            attempted,
            accepted,
            dropped,
        })
    }
}
