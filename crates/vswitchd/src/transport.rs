//! Link transport abstraction.
//!
//! The switch only needs "receive the next frame from any port" and "send
//! these bytes on that port", plus the static port list. The host
//! environment provides the implementation; [`ChannelTransport`] is an
//! in-memory one for tests and simulations.

use async_trait::async_trait;
use tokio::sync::mpsc;
use vswitch_types::PortId;

use crate::error::{Result, SwitchError};
use crate::forwarding::OutboundFrame;

/// A frame received on a port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub port: PortId,
    pub bytes: Vec<u8>,
}

impl ReceivedFrame {
    pub fn new(port: PortId, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            port,
            bytes: bytes.into(),
        }
    }
}

/// Physical send/receive for a fixed set of ports.
///
/// Ports are numbered `0..port_count()`. Sends on one port must not
/// interleave; ordering across ports is not required.
#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Waits for the next frame from any port.
    ///
    /// Returns `Ok(None)` once the transport is closed. Must be cancel safe.
    async fn receive(&mut self) -> Result<Option<ReceivedFrame>>;

    /// Best-effort transmit of `bytes` on `port`.
    async fn send(&self, port: PortId, bytes: &[u8]) -> Result<()>;

    /// Number of ports.
    fn port_count(&self) -> usize;

    /// Name of `port`, if it exists.
    fn port_name(&self, port: PortId) -> Option<&str>;

    /// Resolves a port name to its id.
    fn port_id(&self, name: &str) -> Option<PortId> {
        self.ports()
            .into_iter()
            .find(|port| self.port_name(*port) == Some(name))
    }

    /// All port ids.
    fn ports(&self) -> Vec<PortId> {
        (0..self.port_count()).map(PortId::new).collect()
    }
}

/// In-memory transport backed by tokio channels.
#[derive(Debug)]
pub struct ChannelTransport {
    names: Vec<String>,
    inbound: mpsc::Receiver<ReceivedFrame>,
    outbound: mpsc::UnboundedSender<OutboundFrame>,
}

/// Test side of a [`ChannelTransport`]: injects received frames and
/// collects sent ones.
#[derive(Debug)]
pub struct ChannelTransportHandle {
    inject: Option<mpsc::Sender<ReceivedFrame>>,
    sent: mpsc::UnboundedReceiver<OutboundFrame>,
}

impl ChannelTransport {
    /// Inbound queue depth.
    pub const QUEUE_DEPTH: usize = 256;

    /// Creates a transport with one port per name.
    pub fn new<I, S>(names: I) -> (Self, ChannelTransportHandle)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (inject, inbound) = mpsc::channel(Self::QUEUE_DEPTH);
        let (outbound, sent) = mpsc::unbounded_channel();
        let transport = Self {
            names: names.into_iter().map(Into::into).collect(),
            inbound,
            outbound,
        };
        let handle = ChannelTransportHandle {
            inject: Some(inject),
            sent,
        };
        (transport, handle)
    }
}

#[async_trait]
impl LinkTransport for ChannelTransport {
    async fn receive(&mut self) -> Result<Option<ReceivedFrame>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&self, port: PortId, bytes: &[u8]) -> Result<()> {
        if port.index() >= self.names.len() {
            return Err(SwitchError::Transport(format!("no such port: {}", port)));
        }
        self.outbound
            .send(OutboundFrame {
                port,
                bytes: bytes.to_vec(),
            })
            .map_err(|_| SwitchError::Transport("outbound channel closed".to_string()))
    }

    fn port_count(&self) -> usize {
        self.names.len()
    }

    fn port_name(&self, port: PortId) -> Option<&str> {
        self.names.get(port.index()).map(String::as_str)
    }
}

impl ChannelTransportHandle {
    /// Delivers `bytes` as if received on `port`.
    pub async fn inject(&self, port: PortId, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let inject = self
            .inject
            .as_ref()
            .ok_or_else(|| SwitchError::Transport("input closed".to_string()))?;
        inject
            .send(ReceivedFrame::new(port, bytes))
            .await
            .map_err(|_| SwitchError::Transport("transport dropped".to_string()))
    }

    /// Closes the input side; the transport's `receive` then returns `None`
    /// once queued frames are drained.
    pub fn close(&mut self) {
        self.inject = None;
    }

    /// Waits for the next sent frame.
    pub async fn next_sent(&mut self) -> Option<OutboundFrame> {
        self.sent.recv().await
    }

    /// Returns every frame sent so far without waiting.
    pub fn drain_sent(&mut self) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }
}
