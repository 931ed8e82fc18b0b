//! VLAN-aware forwarding engine.
//!
//! Per received frame the engine:
//!
//! 1. learns the source MAC on the ingress port, before anything else;
//! 2. forwards a known unicast destination unmodified to its learned port;
//! 3. otherwise floods to every other port whose VLAN membership matches,
//!    inserting a tag toward trunks (untagged ingress) or stripping it
//!    toward access ports (tagged ingress).
//!
//! The known-unicast path does no VLAN translation: both ends are assumed
//! to agree on tagging already. Ports without configuration are never
//! targets.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace, warn};
use vswitch_types::{PortConfig, PortId, VlanId};

use crate::error::Result;
use crate::frame::{EthernetHeader, FrameCodec};
use crate::learning::LearningTable;
use crate::port_config::PortConfigTable;

/// Tag rewrite applied to a frame on one egress port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagAction {
    /// Send the received bytes as they are.
    Unmodified,
    /// Insert a tag for the VLAN (access ingress toward a trunk).
    InsertTag(VlanId),
    /// Remove the tag (trunk ingress toward an access port).
    StripTag,
}

/// One flood target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Egress {
    pub port: PortId,
    pub action: TagAction,
}

impl Egress {
    pub const fn new(port: PortId, action: TagAction) -> Self {
        Self { port, action }
    }
}

/// Why a frame was not sent anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Destination was learned on a port with no VLAN configuration.
    UnconfiguredEgress(PortId),
    /// Untagged frame arrived on a port with no VLAN configuration.
    UnconfiguredIngress,
    /// Untagged frame arrived on a trunk, so it has no VLAN.
    UntaggedOnTrunk,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::UnconfiguredEgress(port) => {
                write!(f, "destination port {} is not configured", port)
            }
            DropReason::UnconfiguredIngress => write!(f, "ingress port is not configured"),
            DropReason::UntaggedOnTrunk => write!(f, "untagged frame on a trunk port"),
        }
    }
}

/// Forwarding decision for a single frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForwardingDecision {
    /// Known unicast destination: send unmodified to this port.
    Unicast(PortId),
    /// Unknown or group destination: send to each egress with its rewrite.
    Flood(Vec<Egress>),
    /// No rule applies.
    Drop(DropReason),
}

impl ForwardingDecision {
    /// Number of frames this decision sends.
    pub fn fanout(&self) -> usize {
        match self {
            ForwardingDecision::Unicast(_) => 1,
            ForwardingDecision::Flood(egress) => egress.len(),
            ForwardingDecision::Drop(_) => 0,
        }
    }
}

/// A frame ready to be handed to the link transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub port: PortId,
    pub bytes: Vec<u8>,
}

impl OutboundFrame {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Forwarding engine for one switch instance.
///
/// Owns the learning table; the port configuration is shared read-only.
#[derive(Debug)]
pub struct ForwardingEngine {
    codec: FrameCodec,
    ports: Vec<PortId>,
    config: Arc<PortConfigTable>,
    table: LearningTable,
}

impl ForwardingEngine {
    /// Creates an engine over the active port set with an empty learning
    /// table and the default codec.
    pub fn new(ports: impl IntoIterator<Item = PortId>, config: Arc<PortConfigTable>) -> Self {
        let mut ports: Vec<PortId> = ports.into_iter().collect();
        ports.sort();
        ports.dedup();
        Self {
            codec: FrameCodec::default(),
            ports,
            config,
            table: LearningTable::new(),
        }
    }

    /// Uses `codec` for decoding and tag rewrites.
    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Replaces the learning table (e.g. one with a TTL).
    pub fn with_learning_table(mut self, table: LearningTable) -> Self {
        self.table = table;
        self
    }

    pub fn codec(&self) -> &FrameCodec {
        &self.codec
    }

    pub fn ports(&self) -> &[PortId] {
        &self.ports
    }

    pub fn port_config(&self) -> &Arc<PortConfigTable> {
        &self.config
    }

    pub fn learning_table(&self) -> &LearningTable {
        &self.table
    }

    pub fn learning_table_mut(&mut self) -> &mut LearningTable {
        &mut self.table
    }

    /// Decodes `frame`, learns its source and renders the outbound frames.
    ///
    /// Fails only if the frame is malformed; the caller drops it.
    pub fn process(&mut self, ingress: PortId, frame: &[u8]) -> Result<Vec<OutboundFrame>> {
        let header = self.codec.decode(frame)?;
        trace!(
            port = %ingress,
            len = frame.len(),
            dst = %header.dst,
            src = %header.src,
            ether_type = header.ether_type,
            vlan = ?header.vlan,
            "Received frame"
        );

        let decision = self.decide(ingress, &header);
        Ok(self.render(frame, &decision))
    }

    /// Learns the source of `header` and decides where the frame goes.
    pub fn decide(&mut self, ingress: PortId, header: &EthernetHeader) -> ForwardingDecision {
        self.table.learn(header.src, ingress);

        if header.dst.is_unicast() {
            if let Some(egress) = self.table.lookup(&header.dst) {
                return self.unicast(egress);
            }
        }

        match header.vlan {
            None => self.flood_untagged(ingress),
            Some(vid) => self.flood_tagged(ingress, vid),
        }
    }

    /// Builds the outbound frames for `decision`.
    pub fn render(&self, frame: &[u8], decision: &ForwardingDecision) -> Vec<OutboundFrame> {
        match decision {
            ForwardingDecision::Unicast(port) => vec![OutboundFrame {
                port: *port,
                bytes: frame.to_vec(),
            }],
            ForwardingDecision::Flood(egress) => egress
                .iter()
                .map(|e| OutboundFrame {
                    port: e.port,
                    bytes: match e.action {
                        TagAction::Unmodified => frame.to_vec(),
                        TagAction::InsertTag(vlan) => self.codec.insert_tag(frame, vlan.as_u16()),
                        TagAction::StripTag => self.codec.strip_tag(frame),
                    },
                })
                .collect(),
            ForwardingDecision::Drop(_) => Vec::new(),
        }
    }

    /// Known destination: sent back out even if it is the ingress port.
    fn unicast(&self, egress: PortId) -> ForwardingDecision {
        if self.config.lookup(egress).is_none() {
            debug!(port = %egress, "Destination learned on unconfigured port, dropping");
            return ForwardingDecision::Drop(DropReason::UnconfiguredEgress(egress));
        }
        ForwardingDecision::Unicast(egress)
    }

    /// Untagged ingress: the frame belongs to the ingress access VLAN.
    fn flood_untagged(&self, ingress: PortId) -> ForwardingDecision {
        let vlan = match self.config.lookup(ingress) {
            Some(PortConfig::Access(vlan)) => vlan,
            Some(PortConfig::Trunk) => {
                warn!(port = %ingress, "Untagged frame on trunk port, dropping");
                return ForwardingDecision::Drop(DropReason::UntaggedOnTrunk);
            }
            None => {
                warn!(port = %ingress, "Untagged frame on unconfigured port, dropping");
                return ForwardingDecision::Drop(DropReason::UnconfiguredIngress);
            }
        };

        let egress = self
            .other_ports(ingress)
            .filter_map(|(port, config)| match config {
                PortConfig::Trunk => Some(Egress::new(port, TagAction::InsertTag(vlan))),
                PortConfig::Access(v) if v == vlan => Some(Egress::new(port, TagAction::Unmodified)),
                PortConfig::Access(_) => None,
            })
            .collect();
        ForwardingDecision::Flood(egress)
    }

    /// Tagged ingress: the frame belongs to the VLAN in its tag.
    fn flood_tagged(&self, ingress: PortId, vid: u16) -> ForwardingDecision {
        let egress = self
            .other_ports(ingress)
            .filter_map(|(port, config)| match config {
                PortConfig::Trunk => Some(Egress::new(port, TagAction::Unmodified)),
                PortConfig::Access(v) if v.matches_vid(vid) => {
                    Some(Egress::new(port, TagAction::StripTag))
                }
                PortConfig::Access(_) => None,
            })
            .collect();
        ForwardingDecision::Flood(egress)
    }

    /// Configured ports other than `ingress`, in port order.
    fn other_ports(&self, ingress: PortId) -> impl Iterator<Item = (PortId, PortConfig)> + '_ {
        self.ports
            .iter()
            .copied()
            .filter(move |port| *port != ingress)
            .filter_map(move |port| self.config.lookup(port).map(|config| (port, config)))
    }
}
