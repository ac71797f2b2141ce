//! The combined cooldown and permission check.

use std::time::Duration;

use tokio::time::Instant;

use crate::{
    catalog::CommandDefinition,
    guard::{CooldownTracker, cooldown::AcquireError},
    permissions::{Capability, CapabilitySet, GateRejection, PermissionGate},
};

/// Reason the guard refused an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardRejection {
    OnCooldown { remaining: Duration },
    InsufficientCaller { missing: Vec<Capability> },
    InsufficientBot { missing: Vec<Capability> },
}

/// Runs cooldown, caller and bot checks as one atomic step.
#[derive(Debug, Clone, Default)]
pub struct ExecutionGuard {
    cooldowns: CooldownTracker,
    gate: PermissionGate,
}

impl ExecutionGuard {
    pub fn new(cooldowns: CooldownTracker, gate: PermissionGate) -> Self {
        ExecutionGuard { cooldowns, gate }
    }

    /// Returns `true` if `caller_id` bypasses caller requirements as an owner.
    pub fn is_owner(&self, caller_id: &str) -> bool {
        self.gate.is_owner(caller_id)
    }

    /// Decides whether `caller_id` may run `definition` now.
    ///
    /// On success the cooldown record for `(caller_id, definition.name)` is set
    /// to the current instant. Nothing is recorded on rejection.
    ///
    /// # Errors
    ///
    /// Returns the first failing check as a [`GuardRejection`].
    pub fn check(
        &self,
        caller_id: &str,
        definition: &CommandDefinition,
        caller_capabilities: &CapabilitySet,
        bot_capabilities: &CapabilitySet,
    ) -> Result<(), GuardRejection> {
        self.check_at(
            caller_id,
            definition,
            caller_capabilities,
            bot_capabilities,
            Instant::now(),
        )
    }

    fn check_at(
        &self,
        caller_id: &str,
        definition: &CommandDefinition,
        caller_capabilities: &CapabilitySet,
        bot_capabilities: &CapabilitySet,
        now: Instant,
    ) -> Result<(), GuardRejection> {
        self.cooldowns
            .acquire(
                caller_id,
                &definition.name,
                definition.cooldown,
                now,
                || {
                    self.gate.evaluate(
                        caller_id,
                        &definition.required_caller,
                        caller_capabilities,
                        &definition.required_bot,
                        bot_capabilities,
                    )
                },
            )
            .map_err(|error| match error {
                AcquireError::OnCooldown(remaining) => GuardRejection::OnCooldown { remaining },
                AcquireError::Rejected(GateRejection::Caller(missing)) => {
                    GuardRejection::InsufficientCaller { missing }
                }
                AcquireError::Rejected(GateRejection::Bot(missing)) => {
                    GuardRejection::InsufficientBot { missing }
                }
            })
    }
}
