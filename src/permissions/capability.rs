//! Capability flags and sets.
//!
//! Capabilities map one-to-one to the platform permission bits.
//! [`CapabilitySet::from_bits`] turns resolved permissions into a set of known
//! flags. Unknown bits are dropped since no command can require them.

use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single permission flag.
///
/// The declaration order is the display order used in user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    CreateInstantInvite,
    KickMembers,
    BanMembers,
    Administrator,
    ManageChannels,
    ManageGuild,
    AddReactions,
    ViewChannel,
    SendMessages,
    ManageMessages,
    EmbedLinks,
    AttachFiles,
    ReadMessageHistory,
    MentionEveryone,
    ManageNicknames,
    ManageRoles,
    ModerateMembers,
}

/// Error returned when a capability name is not known.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown capability: {0}")]
pub struct ParseCapabilityError(pub String);

impl Capability {
    /// Every known capability, in display order.
    pub const ALL: [Capability; 17] = [
        Capability::CreateInstantInvite,
        Capability::KickMembers,
        Capability::BanMembers,
        Capability::Administrator,
        Capability::ManageChannels,
        Capability::ManageGuild,
        Capability::AddReactions,
        Capability::ViewChannel,
        Capability::SendMessages,
        Capability::ManageMessages,
        Capability::EmbedLinks,
        Capability::AttachFiles,
        Capability::ReadMessageHistory,
        Capability::MentionEveryone,
        Capability::ManageNicknames,
        Capability::ManageRoles,
        Capability::ModerateMembers,
    ];

    /// Returns the platform permission bit for this capability.
    pub fn bit(self) -> u64 {
        match self {
            Capability::CreateInstantInvite => 1 << 0,
            Capability::KickMembers => 1 << 1,
            Capability::BanMembers => 1 << 2,
            Capability::Administrator => 1 << 3,
            Capability::ManageChannels => 1 << 4,
            Capability::ManageGuild => 1 << 5,
            Capability::AddReactions => 1 << 6,
            Capability::ViewChannel => 1 << 10,
            Capability::SendMessages => 1 << 11,
            Capability::ManageMessages => 1 << 13,
            Capability::EmbedLinks => 1 << 14,
            Capability::AttachFiles => 1 << 15,
            Capability::ReadMessageHistory => 1 << 16,
            Capability::MentionEveryone => 1 << 17,
            Capability::ManageNicknames => 1 << 27,
            Capability::ManageRoles => 1 << 28,
            Capability::ModerateMembers => 1 << 40,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Capability::CreateInstantInvite => "CreateInstantInvite",
            Capability::KickMembers => "KickMembers",
            Capability::BanMembers => "BanMembers",
            Capability::Administrator => "Administrator",
            Capability::ManageChannels => "ManageChannels",
            Capability::ManageGuild => "ManageGuild",
            Capability::AddReactions => "AddReactions",
            Capability::ViewChannel => "ViewChannel",
            Capability::SendMessages => "SendMessages",
            Capability::ManageMessages => "ManageMessages",
            Capability::EmbedLinks => "EmbedLinks",
            Capability::AttachFiles => "AttachFiles",
            Capability::ReadMessageHistory => "ReadMessageHistory",
            Capability::MentionEveryone => "MentionEveryone",
            Capability::ManageNicknames => "ManageNicknames",
            Capability::ManageRoles => "ManageRoles",
            Capability::ModerateMembers => "ModerateMembers",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = ParseCapabilityError;

    /// Parses a capability name, ignoring case and `_`/`-` separators so that
    /// `ManageChannels`, `manage_channels` and `MANAGE-CHANNELS` are all accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();

        Capability::ALL
            .into_iter()
            .find(|capability| capability.name().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ParseCapabilityError(s.to_owned()))
    }
}

/// An ordered set of capabilities.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// Creates an empty set.
    pub fn new() -> Self {
        CapabilitySet(BTreeSet::new())
    }

    /// Builds a set from raw permission bits.
    pub fn from_bits(bits: u64) -> Self {
        Capability::ALL
            .into_iter()
            .filter(|capability| bits & capability.bit() != 0)
            .collect()
    }

    /// Returns the raw permission bits of this set.
    pub fn bits(&self) -> u64 {
        self.0.iter().fold(0, |bits, capability| bits | capability.bit())
    }

    /// Returns the platform's decimal bitfield representation.
    pub fn to_bitfield(&self) -> String {
        self.bits().to_string()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the capabilities of `self` that are absent from `held`, in
    /// display order.
    pub fn missing_from(&self, held: &CapabilitySet) -> Vec<Capability> {
        self.0.difference(&held.0).copied().collect()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = Capability>>(iter: T) -> Self {
        CapabilitySet(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[Capability; N]> for CapabilitySet {
    fn from(capabilities: [Capability; N]) -> Self {
        capabilities.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_capability_is_case_and_separator_insensitive() {
        assert_eq!(
            "ManageChannels".parse::<Capability>().unwrap(),
            Capability::ManageChannels
        );
        assert_eq!(
            "manage_channels".parse::<Capability>().unwrap(),
            Capability::ManageChannels
        );
        assert_eq!(
            "MANAGE-MESSAGES".parse::<Capability>().unwrap(),
            Capability::ManageMessages
        );
    }

    #[test]
    fn test_parse_unknown_capability() {
        let error = "FlyAircraft".parse::<Capability>().unwrap_err();
        assert_eq!(error, ParseCapabilityError("FlyAircraft".to_string()));
    }

    #[test]
    fn test_from_bits() {
        // SendMessages (2048) | ManageChannels (16)
        let set = CapabilitySet::from_bits(2064);
        assert!(set.contains(Capability::SendMessages));
        assert!(set.contains(Capability::ManageChannels));
        assert!(!set.contains(Capability::Administrator));
        assert_eq!(set.to_bitfield(), "2064");
    }

    #[test]
    fn test_from_bits_ignores_unknown_bits() {
        let set = CapabilitySet::from_bits((1u64 << 12) | (1 << 3));
        assert_eq!(set, CapabilitySet::from([Capability::Administrator]));
    }

    #[test]
    fn test_large_bits_round_trip() {
        let set = CapabilitySet::from([Capability::ModerateMembers]);
        assert_eq!(set.bits(), 1 << 40);
    }

    #[test]
    fn test_missing_from_keeps_display_order() {
        let required = CapabilitySet::from([
            Capability::ManageRoles,
            Capability::KickMembers,
            Capability::SendMessages,
        ]);
        let held = CapabilitySet::from([Capability::SendMessages]);

        assert_eq!(
            required.missing_from(&held),
            vec![Capability::KickMembers, Capability::ManageRoles]
        );
    }
}
