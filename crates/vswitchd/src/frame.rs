//! Ethernet / 802.1Q frame codec.
//!
//! Frame layout handled here:
//!
//! ```text
//!  0      6      12          14     16          18
//!  +------+------+-----------+------+-----------+---------
//!  | dst  | src  | ethertype | payload ...
//!  +------+------+-----------+------+-----------+---------
//!  | dst  | src  |   TPID    | TCI  | ethertype | payload ...
//!  +------+------+-----------+------+-----------+---------
//! ```
//!
//! Only a single tag is recognised. The tag EtherType (TPID) is a codec
//! parameter because the simulated links this switch runs on use `0x8200`
//! rather than the IEEE `0x8100`.

use byteorder::{BigEndian, ByteOrder};
use vswitch_types::{MacAddress, VlanId};

use crate::error::{Result, SwitchError};

/// Untagged Ethernet header length.
pub const ETH_HEADER_LEN: usize = 14;

/// 802.1Q tag length (TPID + TCI).
pub const TAG_LEN: usize = 4;

/// Tagged Ethernet header length.
pub const TAGGED_HEADER_LEN: usize = ETH_HEADER_LEN + TAG_LEN;

/// Length of the destination + source MAC prefix.
const MAC_PAIR_LEN: usize = 2 * MacAddress::LEN;

/// IEEE 802.1Q tag protocol identifier.
pub const DOT1Q_TPID: u16 = 0x8100;

/// Tag protocol identifier used by the simulated topology.
pub const DEFAULT_TPID: u16 = 0x8200;

/// Decoded Ethernet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetHeader {
    pub dst: MacAddress,
    pub src: MacAddress,
    /// EtherType of the payload (after the tag, if any).
    pub ether_type: u16,
    /// VLAN id from the tag's TCI, `None` for an untagged frame.
    pub vlan: Option<u16>,
}

impl EthernetHeader {
    pub fn is_tagged(&self) -> bool {
        self.vlan.is_some()
    }

    /// Header length on the wire.
    pub fn wire_len(&self) -> usize {
        if self.is_tagged() {
            TAGGED_HEADER_LEN
        } else {
            ETH_HEADER_LEN
        }
    }
}

/// Frame codec parameterised by the tag EtherType.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    tpid: u16,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_TPID)
    }
}

impl FrameCodec {
    pub const fn new(tpid: u16) -> Self {
        Self { tpid }
    }

    pub const fn tpid(&self) -> u16 {
        self.tpid
    }

    /// Decodes the Ethernet header of `frame`.
    ///
    /// Does not allocate. Fails with [`SwitchError::MalformedFrame`] if the
    /// frame is shorter than 14 bytes, or shorter than 18 bytes when it
    /// carries a tag.
    pub fn decode(&self, frame: &[u8]) -> Result<EthernetHeader> {
        if frame.len() < ETH_HEADER_LEN {
            return Err(SwitchError::MalformedFrame {
                len: frame.len(),
                needed: ETH_HEADER_LEN,
            });
        }

        let malformed = || SwitchError::MalformedFrame {
            len: frame.len(),
            needed: ETH_HEADER_LEN,
        };
        let dst = MacAddress::from_slice(&frame[0..6]).ok_or_else(malformed)?;
        let src = MacAddress::from_slice(&frame[6..12]).ok_or_else(malformed)?;
        let candidate = BigEndian::read_u16(&frame[12..14]);

        if candidate != self.tpid {
            return Ok(EthernetHeader {
                dst,
                src,
                ether_type: candidate,
                vlan: None,
            });
        }

        if frame.len() < TAGGED_HEADER_LEN {
            return Err(SwitchError::MalformedFrame {
                len: frame.len(),
                needed: TAGGED_HEADER_LEN,
            });
        }

        let tci = BigEndian::read_u16(&frame[14..16]);
        Ok(EthernetHeader {
            dst,
            src,
            ether_type: BigEndian::read_u16(&frame[16..18]),
            vlan: Some(tci & VlanId::VID_MASK),
        })
    }

    /// Returns true if `frame` carries this codec's tag EtherType.
    pub fn is_tagged(&self, frame: &[u8]) -> bool {
        frame.len() >= ETH_HEADER_LEN && BigEndian::read_u16(&frame[12..14]) == self.tpid
    }

    /// Builds the 4-byte tag for `vid` (priority and DEI bits zero).
    pub fn tag(&self, vid: u16) -> [u8; TAG_LEN] {
        let mut tag = [0u8; TAG_LEN];
        BigEndian::write_u16(&mut tag[0..2], self.tpid);
        BigEndian::write_u16(&mut tag[2..4], vid & VlanId::VID_MASK);
        tag
    }

    /// Returns a copy of `frame` with a tag for `vid` spliced in after the
    /// MAC pair. The result is exactly 4 bytes longer.
    ///
    /// `frame` must be an untagged frame of at least 14 bytes. Tagging an
    /// already tagged frame yields a double tag; debug builds assert on it.
    pub fn insert_tag(&self, frame: &[u8], vid: u16) -> Vec<u8> {
        debug_assert!(frame.len() >= ETH_HEADER_LEN, "frame shorter than header");
        debug_assert!(!self.is_tagged(frame), "insert_tag on a tagged frame");

        let mut out = Vec::with_capacity(frame.len() + TAG_LEN);
        out.extend_from_slice(&frame[..MAC_PAIR_LEN]);
        out.extend_from_slice(&self.tag(vid));
        out.extend_from_slice(&frame[MAC_PAIR_LEN..]);
        out
    }

    /// Returns a copy of `frame` with bytes 12..16 removed. The result is
    /// exactly 4 bytes shorter.
    ///
    /// `frame` must be tagged; stripping an untagged frame corrupts the
    /// header and debug builds assert on it.
    pub fn strip_tag(&self, frame: &[u8]) -> Vec<u8> {
        debug_assert!(self.is_tagged(frame), "strip_tag on an untagged frame");

        let mut out = Vec::with_capacity(frame.len().saturating_sub(TAG_LEN));
        out.extend_from_slice(&frame[..MAC_PAIR_LEN]);
        out.extend_from_slice(&frame[MAC_PAIR_LEN + TAG_LEN..]);
        out
    }
}
