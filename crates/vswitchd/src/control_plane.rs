//! Periodic control-plane hook.
//!
//! The forwarding path never depends on control-plane output. A control
//! plane only gets read access to the port configuration and runs on its
//! own task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::port_config::PortConfigTable;

/// A periodically scheduled control-plane protocol.
#[async_trait]
pub trait ControlPlane: Send {
    /// Returns the name of this control plane (for logging).
    fn name(&self) -> &str;

    /// Called once before the first tick.
    async fn on_start(&mut self, _ports: &PortConfigTable) {
        // Default: no-op
    }

    /// Called every period.
    async fn on_tick(&mut self, ports: &PortConfigTable);
}

/// Control plane that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopControlPlane;

#[async_trait]
impl ControlPlane for NoopControlPlane {
    fn name(&self) -> &str {
        "noop"
    }

    async fn on_tick(&mut self, _ports: &PortConfigTable) {}
}

/// Runs `control_plane` every `period` until `cancel` fires.
///
/// The first tick happens one period after start. The task resolves to the
/// number of ticks delivered.
pub fn spawn_control_plane(
    mut control_plane: Box<dyn ControlPlane>,
    ports: Arc<PortConfigTable>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<u64> {
    tokio::spawn(async move {
        info!(name = control_plane.name(), ?period, "Control plane started");
        control_plane.on_start(&ports).await;

        let mut interval = time::interval_at(time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    control_plane.on_tick(&ports).await;
                    ticks += 1;
                }
            }
        }

        debug!(name = control_plane.name(), ticks, "Control plane stopped");
        ticks
    })
}
