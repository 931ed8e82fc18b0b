//! UDP virtual-link transport.
//!
//! Each port is a UDP socket bound to a local address and connected to a
//! fixed peer; one datagram carries one Ethernet frame. A reader task per
//! port forwards datagrams into a shared channel so the switch can receive
//! from any port.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use vswitch_types::PortId;

use crate::config_file::LinkConfig;
use crate::error::{Result, SwitchError};
use crate::transport::{LinkTransport, ReceivedFrame};

/// Largest datagram accepted from a link.
pub const MAX_DATAGRAM_LEN: usize = 65_535;

const QUEUE_DEPTH: usize = 1024;

#[derive(Debug)]
struct Link {
    name: String,
    socket: Arc<UdpSocket>,
}

/// Transport over connected UDP sockets.
#[derive(Debug)]
pub struct UdpLinkTransport {
    links: Vec<Link>,
    inbound: mpsc::Receiver<ReceivedFrame>,
    readers: Vec<JoinHandle<()>>,
}

impl UdpLinkTransport {
    /// Binds one socket per link, in order; link `i` becomes port `i`.
    pub async fn bind(configs: &[LinkConfig]) -> Result<Self> {
        let (tx, inbound) = mpsc::channel(QUEUE_DEPTH);
        let mut links = Vec::with_capacity(configs.len());
        let mut readers = Vec::with_capacity(configs.len());

        for (index, config) in configs.iter().enumerate() {
            let socket = UdpSocket::bind(config.bind).await.map_err(|e| {
                SwitchError::Transport(format!(
                    "failed to bind {} on {}: {}",
                    config.name, config.bind, e
                ))
            })?;
            socket.connect(config.peer).await.map_err(|e| {
                SwitchError::Transport(format!(
                    "failed to connect {} to {}: {}",
                    config.name, config.peer, e
                ))
            })?;
            let socket = Arc::new(socket);
            let port = PortId::new(index);
            info!(port = %port, name = %config.name, bind = %config.bind, peer = %config.peer, "Link up");

            readers.push(tokio::spawn(read_link(
                port,
                config.name.clone(),
                Arc::clone(&socket),
                tx.clone(),
            )));
            links.push(Link {
                name: config.name.clone(),
                socket,
            });
        }

        Ok(Self {
            links,
            inbound,
            readers,
        })
    }

    /// Local address of `port`'s socket.
    pub fn local_addr(&self, port: PortId) -> Option<std::net::SocketAddr> {
        self.links
            .get(port.index())
            .and_then(|link| link.socket.local_addr().ok())
    }
}

async fn read_link(
    port: PortId,
    name: String,
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<ReceivedFrame>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    loop {
        match socket.recv(&mut buf).await {
            Ok(len) => {
                let frame = ReceivedFrame::new(port, &buf[..len]);
                if tx.send(frame).await.is_err() {
                    debug!(%name, "Receiver gone, stopping link reader");
                    return;
                }
            }
            // ICMP unreachable from a peer that is not up yet
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                debug!(%name, "Peer unreachable");
            }
            Err(e) => {
                warn!(%name, "Link receive failed: {}", e);
                return;
            }
        }
    }
}

#[async_trait]
impl LinkTransport for UdpLinkTransport {
    async fn receive(&mut self) -> Result<Option<ReceivedFrame>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&self, port: PortId, bytes: &[u8]) -> Result<()> {
        let link = self
            .links
            .get(port.index())
            .ok_or_else(|| SwitchError::Transport(format!("no such port: {}", port)))?;
        match link.socket.send(bytes).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => {
                debug!(name = %link.name, "Peer unreachable, frame lost");
                Ok(())
            }
            Err(e) => Err(SwitchError::Transport(format!(
                "send on {} failed: {}",
                link.name, e
            ))),
        }
    }

    fn port_count(&self) -> usize {
        self.links.len()
    }

    fn port_name(&self, port: PortId) -> Option<&str> {
        self.links.get(port.index()).map(|link| link.name.as_str())
    }
}

impl Drop for UdpLinkTransport {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}
