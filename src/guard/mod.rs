//! Execution guard: cooldowns and permission checks run before every handler.
//!
//! The guard is the single place where per-user-per-command cooldowns and
//! capability requirements are enforced. Handlers never repeat these checks.
//!
//! # Check order
//!
//! 1. **Cooldown** - rejects with the exact remaining time
//! 2. **Caller permission** - rejects with the missing capability names
//! 3. **Bot permission** - rejects with the capabilities the bot must be granted
//!
//! A cooldown record is written only when all three pass, and the write happens
//! under the same lock as the cooldown read so that two concurrent invocations of
//! the same command by the same user cannot both pass.
//!
//! - [`cooldown`] - The `(caller, command) -> last pass` tracker
//! - [`execution_guard`] - The combined check

mod cooldown;
mod execution_guard;

pub use crate::guard::cooldown::CooldownTracker;
pub use crate::guard::execution_guard::{ExecutionGuard, GuardRejection};
