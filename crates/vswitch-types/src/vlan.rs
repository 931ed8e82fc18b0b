//! VLAN ID type with validation.

use crate::ParseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// IEEE 802.1Q VLAN identifier (1-4094).
///
/// VLAN 0 (priority tagged) and VLAN 4095 are reserved and cannot be
/// assigned to an access port.
///
/// # Examples
///
/// ```
/// use vswitch_types::VlanId;
///
/// let vlan = VlanId::new(10).unwrap();
/// assert_eq!(vlan.as_u16(), 10);
///
/// assert!(VlanId::new(0).is_err());
/// assert!(VlanId::new(4095).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct VlanId(u16);

impl VlanId {
    /// Minimum valid VLAN ID.
    pub const MIN: u16 = 1;

    /// Maximum valid VLAN ID.
    pub const MAX: u16 = 4094;

    /// Mask selecting the VID bits of a tag control field.
    pub const VID_MASK: u16 = 0x0fff;

    /// Creates a new VLAN ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the VLAN ID is not in the valid range (1-4094).
    pub const fn new(id: u16) -> Result<Self, ParseError> {
        if id >= Self::MIN && id <= Self::MAX {
            Ok(VlanId(id))
        } else {
            Err(ParseError::InvalidVlanId(id))
        }
    }

    /// Returns the VLAN ID as a u16.
    pub const fn as_u16(&self) -> u16 {
        self.0
    }

    /// Returns true if `vid`, as carried in a tag, names this VLAN.
    pub const fn matches_vid(&self, vid: u16) -> bool {
        self.0 == vid & Self::VID_MASK
    }
}

impl fmt::Display for VlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for VlanId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u16 = s
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidVlanDesignator(s.to_string()))?;

        VlanId::new(id)
    }
}

impl TryFrom<u16> for VlanId {
    type Error = ParseError;

    fn try_from(id: u16) -> Result<Self, Self::Error> {
        VlanId::new(id)
    }
}

impl From<VlanId> for u16 {
    fn from(vlan: VlanId) -> u16 {
        vlan.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_valid_vlan_ids() {
        assert!(VlanId::new(1).is_ok());
        assert!(VlanId::new(100).is_ok());
        assert!(VlanId::new(4094).is_ok());
    }

    #[test]
    fn test_invalid_vlan_ids() {
        assert_eq!(VlanId::new(0), Err(ParseError::InvalidVlanId(0)));
        assert_eq!(VlanId::new(4095), Err(ParseError::InvalidVlanId(4095)));
        assert!(VlanId::new(65535).is_err());
    }

    #[test]
    fn test_parse_numeric() {
        let vlan: VlanId = "100".parse().unwrap();
        assert_eq!(vlan.as_u16(), 100);
    }

    #[test]
    fn test_parse_rejects_non_numeric() {
        assert_eq!(
            "ten".parse::<VlanId>(),
            Err(ParseError::InvalidVlanDesignator("ten".to_string()))
        );
        assert_eq!("5000".parse::<VlanId>(), Err(ParseError::InvalidVlanId(5000)));
        assert!("-1".parse::<VlanId>().is_err());
    }

    #[test]
    fn test_matches_vid_ignores_priority_bits() {
        let vlan = VlanId::new(20).unwrap();
        assert!(vlan.matches_vid(20));
        assert!(vlan.matches_vid(0xe014));
        assert!(!vlan.matches_vid(21));
    }

    #[test]
    fn test_display() {
        let vlan = VlanId::new(100).unwrap();
        assert_eq!(vlan.to_string(), "100");
    }

    #[test]
    fn test_ordering() {
        let v1 = VlanId::new(10).unwrap();
        let v2 = VlanId::new(20).unwrap();
        assert!(v1 < v2);
    }
}
