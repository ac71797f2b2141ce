//! Capabilities and the permission gate.
//!
//! A [`Capability`] is one atomic permission flag of the chat platform. Callers and
//! the bot itself hold a [`CapabilitySet`] resolved for the scope an invocation
//! happened in, and every command declares the capabilities it needs from both.
//!
//! - [`capability`] - Capability flags and bitfield conversion
//! - [`gate`] - Evaluation of declared requirements against resolved sets

mod capability;
mod gate;

pub use crate::permissions::capability::{Capability, CapabilitySet};
pub use crate::permissions::gate::{GateRejection, PermissionGate};
