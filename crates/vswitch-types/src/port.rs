//! Port identity and VLAN membership definitions.

use crate::{ParseError, VlanId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Designator token that marks a trunk port in VLAN configuration.
pub const TRUNK_DESIGNATOR: &str = "T";

/// Index of a switch port, assigned by the link transport (0..port_count).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(usize);

impl PortId {
    pub const fn new(index: usize) -> Self {
        PortId(index)
    }

    pub const fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for PortId {
    fn from(index: usize) -> Self {
        PortId(index)
    }
}

/// VLAN membership of a port.
///
/// Fixed at configuration load; the forwarding path only reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortConfig {
    /// Member of exactly one VLAN; frames are untagged on the wire.
    Access(VlanId),
    /// Carries every VLAN; frames are always tagged on the wire.
    Trunk,
}

impl PortConfig {
    /// Returns true if this is a trunk port.
    pub const fn is_trunk(&self) -> bool {
        matches!(self, PortConfig::Trunk)
    }
}

impl fmt::Display for PortConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortConfig::Access(vlan) => write!(f, "access vlan {}", vlan),
            PortConfig::Trunk => write!(f, "trunk"),
        }
    }
}

impl FromStr for PortConfig {
    type Err = ParseError;

    /// Parses a VLAN designator: `"T"` for a trunk, otherwise a VLAN id.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == TRUNK_DESIGNATOR {
            return Ok(PortConfig::Trunk);
        }
        s.parse::<VlanId>().map(PortConfig::Access)
    }
}
