//! VLAN-aware learning switch data-plane
//!
//! This crate implements the forwarding path of a simulated Ethernet switch
//! that learns MAC addresses and forwards between access ports (one VLAN,
//! untagged on the wire) and trunk ports (many VLANs, 802.1Q tagged).
//!
//! # Architecture
//!
//! ```text
//! LinkTransport ──▶ FrameCodec::decode ──▶ LearningTable::learn
//!                                               │
//!                                               ▼
//! LinkTransport ◀── FrameCodec (re-tag) ◀── ForwardingEngine::decide
//! ```
//!
//! # Components
//!
//! - [`frame`]: Ethernet / 802.1Q header decode, tag insert and strip
//! - [`port_config`]: access/trunk configuration and the per-switch VLAN file
//! - [`learning`]: MAC to port learning table with optional aging
//! - [`forwarding`]: unicast / flood decisions with per-port tag actions
//! - [`transport`]: link transport trait and an in-memory implementation
//! - [`udp_transport`]: one UDP socket per virtual link
//! - [`control_plane`]: periodic control-plane hook
//! - [`switch`]: the receive loop tying it together
//! - [`config_file`]: TOML daemon configuration

pub mod config_file;
pub mod control_plane;
pub mod error;
pub mod forwarding;
pub mod frame;
pub mod learning;
pub mod port_config;
pub mod switch;
pub mod transport;
pub mod udp_transport;

pub use config_file::{LinkConfig, SwitchDaemonConfig, SwitchSection};
pub use control_plane::{spawn_control_plane, ControlPlane, NoopControlPlane};
pub use error::{Result, SwitchError};
pub use forwarding::{
    DropReason, Egress, ForwardingDecision, ForwardingEngine, OutboundFrame, TagAction,
};
pub use frame::{EthernetHeader, FrameCodec, DEFAULT_TPID, DOT1Q_TPID};
pub use learning::LearningTable;
pub use port_config::{
    load_vlan_config_file, parse_vlan_config, LoadReport, PortConfigTable, PortSpec,
};
pub use switch::{Switch, SwitchStats};
pub use transport::{ChannelTransport, ChannelTransportHandle, LinkTransport, ReceivedFrame};
pub use udp_transport::UdpLinkTransport;
