//! The switch: one receive loop driving the forwarding engine.
//!
//! Frames are handled strictly one at a time: receive, decide, send every
//! copy, then receive the next. The engine and its learning table are
//! owned by the loop and need no locking.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use vswitch_types::MacAddress;

use crate::error::Result;
use crate::forwarding::{ForwardingDecision, ForwardingEngine};
use crate::frame::FrameCodec;
use crate::learning::LearningTable;
use crate::port_config::{LoadReport, PortConfigTable, PortSpec};
use crate::transport::{LinkTransport, ReceivedFrame};

/// Upper bound on how often stale MAC entries are swept.
const MAX_AGING_SWEEP: Duration = Duration::from_secs(1);

/// Per-switch frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchStats {
    /// Frames handed to the switch by the transport
    pub received: u64,
    /// Frames forwarded to a single learned port
    pub unicast: u64,
    /// Frames flooded
    pub flooded: u64,
    /// Frames no rule applied to
    pub dropped: u64,
    /// Frames too short to decode
    pub malformed: u64,
    /// Copies handed to the transport
    pub sent: u64,
    /// Copies the transport failed to send
    pub send_errors: u64,
}

impl fmt::Display for SwitchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "received={} unicast={} flooded={} dropped={} malformed={} sent={} send_errors={}",
            self.received,
            self.unicast,
            self.flooded,
            self.dropped,
            self.malformed,
            self.sent,
            self.send_errors
        )
    }
}

enum Event {
    Shutdown,
    AgingSweep,
    Frame(Option<ReceivedFrame>),
}

/// A switch bound to a transport.
pub struct Switch<T: LinkTransport> {
    id: u32,
    mac: MacAddress,
    transport: T,
    engine: ForwardingEngine,
    stats: SwitchStats,
}

impl<T: LinkTransport> Switch<T> {
    /// Creates a switch over every port of `transport`.
    pub fn new(transport: T, config: Arc<PortConfigTable>) -> Self {
        let engine = ForwardingEngine::new(transport.ports(), config);
        Self {
            id: 0,
            mac: MacAddress::ZERO,
            transport,
            engine,
            stats: SwitchStats::default(),
        }
    }

    /// Creates a switch whose port configuration is loaded from `specs`,
    /// resolving port names through the transport.
    pub fn from_specs<I>(transport: T, specs: I) -> (Self, LoadReport)
    where
        I: IntoIterator<Item = PortSpec>,
    {
        let (table, report) = PortConfigTable::load(specs, |name| transport.port_id(name));
        (Self::new(transport, Arc::new(table)), report)
    }

    pub fn with_identity(mut self, id: u32, mac: MacAddress) -> Self {
        self.id = id;
        self.mac = mac;
        self
    }

    pub fn with_codec(mut self, codec: FrameCodec) -> Self {
        self.engine = self.engine.with_codec(codec);
        self
    }

    /// Enables MAC aging with the given lifetime. `None` or a zero
    /// lifetime keeps entries forever.
    pub fn with_mac_ttl(mut self, ttl: Option<Duration>) -> Self {
        let table = match ttl {
            Some(ttl) => LearningTable::with_ttl(ttl),
            None => LearningTable::new(),
        };
        self.engine = self.engine.with_learning_table(table);
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn mac(&self) -> MacAddress {
        self.mac
    }

    pub fn stats(&self) -> SwitchStats {
        self.stats
    }

    pub fn engine(&self) -> &ForwardingEngine {
        &self.engine
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Logs the switch identity and its interfaces.
    pub fn log_startup(&self) {
        info!("# Starting switch with id {}", self.id);
        info!("# Switch MAC: {}", self.mac);
        for port in self.transport.ports() {
            let name = self.transport.port_name(port).unwrap_or("?");
            match self.engine.port_config().lookup(port) {
                Some(config) => info!("# Interface {} ({}): {}", name, port, config),
                None => info!("# Interface {} ({}): unconfigured", name, port),
            }
        }
        let config = self.engine.port_config();
        let trunks = config.iter().filter(|(_, c)| c.is_trunk()).count();
        info!(
            access = config.len() - trunks,
            trunks,
            unconfigured = self.transport.port_count().saturating_sub(config.len()),
            "Port configuration summary"
        );
    }

    /// Forwards one received frame.
    ///
    /// Never fails: malformed frames and send errors are counted and
    /// logged, and the switch keeps going.
    pub async fn handle_frame(&mut self, frame: ReceivedFrame) {
        self.stats.received += 1;

        let header = match self.engine.codec().decode(&frame.bytes) {
            Ok(header) => header,
            Err(e) => {
                self.stats.malformed += 1;
                debug!(port = %frame.port, "Dropping frame: {}", e);
                return;
            }
        };
        debug!(
            port = %frame.port,
            len = frame.bytes.len(),
            dst = %header.dst,
            src = %header.src,
            ether_type = header.ether_type,
            vlan = ?header.vlan,
            "Received frame"
        );

        let decision = self.engine.decide(frame.port, &header);
        debug!(port = %frame.port, fanout = decision.fanout(), "Forwarding decision");
        match &decision {
            ForwardingDecision::Unicast(_) => self.stats.unicast += 1,
            ForwardingDecision::Flood(_) => self.stats.flooded += 1,
            ForwardingDecision::Drop(reason) => {
                self.stats.dropped += 1;
                debug!(port = %frame.port, %reason, "Frame dropped");
            }
        }

        for out in self.engine.render(&frame.bytes, &decision) {
            match self.transport.send(out.port, &out.bytes).await {
                Ok(()) => self.stats.sent += 1,
                Err(e) => {
                    self.stats.send_errors += 1;
                    warn!(port = %out.port, "Failed to send frame: {}", e);
                }
            }
        }
    }

    /// Runs the receive loop until `cancel` fires or the transport closes.
    ///
    /// Only a transport receive failure ends the loop with an error.
    pub async fn run(&mut self, cancel: CancellationToken) -> Result<()> {
        let mut aging = self.engine.learning_table().ttl().map(|ttl| {
            let period = ttl.min(MAX_AGING_SWEEP);
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => Event::Shutdown,
                _ = next_sweep(&mut aging) => Event::AgingSweep,
                received = self.transport.receive() => Event::Frame(received?),
            };

            match event {
                Event::Shutdown => {
                    info!("Shutdown requested");
                    break;
                }
                Event::AgingSweep => {
                    self.engine
                        .learning_table_mut()
                        .expire(Instant::now());
                }
                Event::Frame(Some(frame)) => self.handle_frame(frame).await,
                Event::Frame(None) => {
                    info!("Transport closed");
                    break;
                }
            }
        }

        for (mac, port) in self.engine.learning_table().entries() {
            debug!(%mac, %port, "Learned at shutdown");
        }
        info!(switch = self.id, "Switch stopped: {}", self.stats);
        Ok(())
    }
}

async fn next_sweep(aging: &mut Option<Interval>) {
    match aging {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
