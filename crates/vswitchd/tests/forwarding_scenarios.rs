//! Forwarding scenarios for the vswitchd engine
//!
//! Exercises the public API end to end on a single switch:
//! - VLAN file parsing and port resolution
//! - Access and trunk flooding with tag rewrite
//! - Known unicast bypass
//! - Unconfigured port exclusion

use std::sync::Arc;

use pretty_assertions::assert_eq;
use vswitch_types::{MacAddress, PortConfig, PortId, VlanId};
use vswitchd::{
    parse_vlan_config, ForwardingDecision, ForwardingEngine, FrameCodec, OutboundFrame,
    PortConfigTable, SwitchError, TagAction, DOT1Q_TPID,
};

const PORTS: [&str; 6] = ["r-0", "r-1", "r-2", "rr-0-1", "rr-0-2", "r-9"];

const VLAN_FILE: &str = "\
14
r-0 10
r-1 10
r-2 20
rr-0-1 T
rr-0-2 T
bogus 30
r-9 5000
";

const HOST_A: [u8; 6] = [0x02, 0, 0, 0, 0, 0x0a];
const HOST_B: [u8; 6] = [0x02, 0, 0, 0, 0, 0x0b];
const HOST_C: [u8; 6] = [0x02, 0, 0, 0, 0, 0x0c];

fn port(name: &str) -> PortId {
    PortId::new(PORTS.iter().position(|p| *p == name).unwrap())
}

/// Engine for the six-port switch described by `VLAN_FILE`.
fn engine_with(codec: FrameCodec) -> ForwardingEngine {
    let (table, report) = PortConfigTable::load(parse_vlan_config(VLAN_FILE), |name| {
        PORTS.iter().position(|p| *p == name).map(PortId::new)
    });
    assert_eq!(report.configured, 5);
    assert_eq!(report.skipped.len(), 2);

    ForwardingEngine::new((0..PORTS.len()).map(PortId::new), Arc::new(table)).with_codec(codec)
}

fn engine() -> ForwardingEngine {
    engine_with(FrameCodec::default())
}

fn untagged(dst: [u8; 6], src: [u8; 6]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&dst);
    frame.extend_from_slice(&src);
    frame.extend_from_slice(&[0x08, 0x00]);
    frame.extend_from_slice(&[0x45; 46]);
    frame
}

fn sorted(mut frames: Vec<OutboundFrame>) -> Vec<OutboundFrame> {
    frames.sort_by_key(|f| f.port);
    frames
}

#[test]
fn test_vlan_file_skips_bad_entries() {
    let engine = engine();
    let config = engine.port_config();

    assert_eq!(
        config.lookup(port("r-2")),
        Some(PortConfig::Access(VlanId::new(20).unwrap()))
    );
    assert_eq!(config.lookup(port("rr-0-2")), Some(PortConfig::Trunk));
    // 5000 is out of range
    assert_eq!(config.lookup(port("r-9")), None);
}

#[test]
fn test_access_broadcast_floods_vlan_and_trunks() {
    let mut engine = engine();
    let codec = *engine.codec();
    let frame = untagged([0xff; 6], HOST_A);

    let out = sorted(engine.process(port("r-0"), &frame).unwrap());
    let ports: Vec<_> = out.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![port("r-1"), port("rr-0-1"), port("rr-0-2")]);

    assert_eq!(out[0].bytes, frame);
    for trunk in &out[1..] {
        assert_eq!(trunk.len(), frame.len() + 4);
        assert_eq!(codec.decode(&trunk.bytes).unwrap().vlan, Some(10));
        assert_eq!(codec.strip_tag(&trunk.bytes), frame);
    }
}

#[test]
fn test_trunk_broadcast_strips_toward_access() {
    let mut engine = engine();
    let codec = *engine.codec();
    let frame = codec.insert_tag(&untagged([0xff; 6], HOST_C), 20);

    let out = sorted(engine.process(port("rr-0-1"), &frame).unwrap());
    let ports: Vec<_> = out.iter().map(|f| f.port).collect();
    assert_eq!(ports, vec![port("r-2"), port("rr-0-2")]);

    assert_eq!(out[0].bytes, untagged([0xff; 6], HOST_C));
    assert_eq!(out[1].bytes, frame);
}

#[test]
fn test_tagged_vlan_without_members_reaches_trunks_only() {
    let mut engine = engine();
    let frame = engine.codec().insert_tag(&untagged([0xff; 6], HOST_C), 99);

    let out = engine.process(port("rr-0-2"), &frame).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].port, port("rr-0-1"));
    assert_eq!(out[0].bytes, frame);
}

#[test]
fn test_known_unicast_bypasses_vlan_rules() {
    let mut engine = engine();

    // B speaks from the VLAN 20 port
    engine.process(port("r-2"), &untagged([0xff; 6], HOST_B)).unwrap();

    // A on VLAN 10 addresses B directly; the learned port wins
    let frame = untagged(HOST_B, HOST_A);
    let out = engine.process(port("r-0"), &frame).unwrap();
    assert_eq!(out, vec![OutboundFrame { port: port("r-2"), bytes: frame }]);
}

#[test]
fn test_unknown_unicast_is_flooded() {
    let mut engine = engine();
    let header = engine.codec().decode(&untagged(HOST_B, HOST_A)).unwrap();

    match engine.decide(port("r-1"), &header) {
        ForwardingDecision::Flood(egress) => {
            let actions: Vec<_> = egress.iter().map(|e| (e.port, e.action)).collect();
            let vlan10 = VlanId::new(10).unwrap();
            assert_eq!(
                actions,
                vec![
                    (port("r-0"), TagAction::Unmodified),
                    (port("rr-0-1"), TagAction::InsertTag(vlan10)),
                    (port("rr-0-2"), TagAction::InsertTag(vlan10)),
                ]
            );
        }
        other => panic!("expected flood, got {:?}", other),
    }
}

#[test]
fn test_unconfigured_port_never_receives() {
    let mut engine = engine();

    // A host behind the unconfigured port is learned but never reachable
    engine
        .process(port("r-9"), &untagged([0xff; 6], HOST_C))
        .unwrap();
    assert_eq!(engine.learning_table().lookup(&MacAddress::new(HOST_C)), Some(port("r-9")));

    let out = engine.process(port("r-0"), &untagged(HOST_C, HOST_A)).unwrap();
    assert!(out.is_empty());

    let out = engine.process(port("r-0"), &untagged([0xff; 6], HOST_A)).unwrap();
    assert!(out.iter().all(|f| f.port != port("r-9")));
}

#[test]
fn test_malformed_frame_is_rejected() {
    let mut engine = engine();
    let err = engine.process(port("r-0"), &[0u8; 12]).unwrap_err();

    assert!(matches!(err, SwitchError::MalformedFrame { len: 12, .. }));
    assert!(engine.learning_table().is_empty());
}

#[test]
fn test_ieee_tpid_codec() {
    let mut engine = engine_with(FrameCodec::new(DOT1Q_TPID));
    let frame = untagged([0xff; 6], HOST_A);

    let out = sorted(engine.process(port("r-1"), &frame).unwrap());
    let trunk = &out[1];
    assert_eq!(&trunk.bytes[12..16], &[0x81, 0x00, 0x00, 0x0a]);
}
