//! vswitchd - VLAN-aware switch data-plane daemon
//!
//! Entry point for the vswitchd daemon.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use vswitchd::config_file::DEFAULT_CONFIG_PATH;
use vswitchd::{
    load_vlan_config_file, spawn_control_plane, NoopControlPlane, Switch, SwitchDaemonConfig,
    UdpLinkTransport,
};

/// VLAN-aware learning switch
#[derive(Parser, Debug)]
#[command(name = "vswitchd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Daemon configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Switch id (overrides the config file)
    #[arg(short = 'i', long)]
    switch_id: Option<u32>,

    /// Per-switch VLAN file (overrides the config file)
    #[arg(long)]
    vlan_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

/// Initializes tracing/logging subsystem
fn init_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_logging(&args.log_level) {
        eprintln!("vswitchd: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(args).await {
        Ok(()) => {
            info!("vswitchd: exiting normally");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("vswitchd: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = SwitchDaemonConfig::load_or_default(&args.config)?;
    if let Some(id) = args.switch_id {
        config.switch.id = id;
    }
    if let Some(path) = args.vlan_config {
        config.switch.vlan_config = Some(path);
    }
    config.validate()?;

    if config.links.is_empty() {
        warn!("No links configured, the switch will not forward anything");
    }

    let transport = UdpLinkTransport::bind(&config.links)
        .await
        .context("failed to bring up links")?;

    let vlan_path = config.vlan_config_path();
    let specs = load_vlan_config_file(&vlan_path)
        .with_context(|| format!("failed to read {}", vlan_path.display()))?;
    let (switch, report) = Switch::from_specs(transport, specs);
    for skipped in &report.skipped {
        warn!("Ignored VLAN config entry: {}", skipped);
    }

    let mut switch = switch
        .with_identity(config.switch.id, config.switch.switch_mac())
        .with_codec(config.codec())
        .with_mac_ttl(config.mac_ttl());
    switch.log_startup();

    let cancel = CancellationToken::new();
    let control_plane = spawn_control_plane(
        Box::new(NoopControlPlane),
        switch.engine().port_config().clone(),
        config.control_plane_period(),
        cancel.clone(),
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("vswitchd: received Ctrl-C");
                shutdown.cancel();
            }
            Err(e) => error!("vswitchd: failed to listen for Ctrl-C: {}", e),
        }
    });

    let result = switch.run(cancel.clone()).await;
    cancel.cancel();
    if let Err(e) = control_plane.await {
        warn!("Control plane task failed: {}", e);
    }

    result.context("switch receive loop failed")
}
