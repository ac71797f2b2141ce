//! Permission gate.
//!
//! Evaluates a command's declared requirement sets against the resolved
//! capabilities of the caller and of the bot.
//!
//! # Bypass rule
//!
//! A caller bypasses the caller-side check when their id is one of the configured
//! owner ids **or** when they hold [`Capability::Administrator`]. The bypass never
//! applies to the bot-side check: an owner cannot make the bot do what the platform
//! will refuse anyway.

use std::collections::HashSet;

use log::debug;

use crate::permissions::{Capability, CapabilitySet};

/// Reason a gate evaluation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateRejection {
    /// The caller lacks these capabilities.
    Caller(Vec<Capability>),
    /// The bot lacks these capabilities in the current scope.
    Bot(Vec<Capability>),
}

/// Evaluates capability requirements with the unified owner/administrator bypass.
#[derive(Debug, Clone, Default)]
pub struct PermissionGate {
    owner_ids: HashSet<String>,
}

impl PermissionGate {
    /// Creates a gate with the given owner ids.
    pub fn new<I, S>(owner_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        PermissionGate {
            owner_ids: owner_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns `true` if `caller_id` is a configured owner.
    ///
    /// Owners bypass caller-side requirements whatever they hold, so their
    /// capabilities never need to be resolved.
    pub fn is_owner(&self, caller_id: &str) -> bool {
        self.owner_ids.contains(caller_id)
    }

    /// Returns `true` if the caller skips caller-side requirements.
    fn bypasses(&self, caller_id: &str, caller_capabilities: &CapabilitySet) -> bool {
        self.is_owner(caller_id) || caller_capabilities.contains(Capability::Administrator)
    }

    /// Checks caller requirements first, then bot requirements.
    ///
    /// # Arguments
    ///
    /// * `caller_id` - Id of the invoking user
    /// * `required_caller` - Capabilities the command requires from the caller
    /// * `caller_capabilities` - Capabilities the caller holds in scope
    /// * `required_bot` - Capabilities the command requires from the bot
    /// * `bot_capabilities` - Capabilities the bot holds in scope
    pub fn evaluate(
        &self,
        caller_id: &str,
        required_caller: &CapabilitySet,
        caller_capabilities: &CapabilitySet,
        required_bot: &CapabilitySet,
        bot_capabilities: &CapabilitySet,
    ) -> Result<(), GateRejection> {
        if !self.bypasses(caller_id, caller_capabilities) {
            let missing = required_caller.missing_from(caller_capabilities);
            if !missing.is_empty() {
                debug!("caller {} is missing {:?}", caller_id, missing);
                return Err(GateRejection::Caller(missing));
            }
        }

        // Administrator grants every permission on the platform side too
        if bot_capabilities.contains(Capability::Administrator) {
            return Ok(());
        }

        let missing = required_bot.missing_from(bot_capabilities);
        if !missing.is_empty() {
            debug!("bot is missing {:?} for caller {}", missing, caller_id);
            return Err(GateRejection::Bot(missing));
        }

        Ok(())
    }
}
