//! Common types for the vswitch data-plane.
//!
//! This crate provides type-safe representations of the primitives the
//! forwarding path is built from:
//!
//! - [`MacAddress`]: 48-bit Ethernet MAC addresses
//! - [`VlanId`]: IEEE 802.1Q VLAN identifiers (1-4094)
//! - [`PortId`]: Transport-assigned switch port index
//! - [`PortConfig`]: Access/trunk classification of a port

mod mac;
mod port;
mod vlan;

pub use mac::MacAddress;
pub use port::{PortConfig, PortId, TRUNK_DESIGNATOR};
pub use vlan::VlanId;

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid MAC address format: {0}")]
    InvalidMacAddress(String),

    #[error("invalid VLAN ID: {0} (must be 1-4094)")]
    InvalidVlanId(u16),

    #[error("invalid VLAN designator: {0:?} (expected \"T\" or 1-4094)")]
    InvalidVlanDesignator(String),
}
