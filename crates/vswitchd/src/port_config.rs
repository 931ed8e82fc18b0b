//! Per-port VLAN configuration.
//!
//! Configuration arrives as `(designator, port name)` pairs. A designator
//! of `T` makes the port a trunk, anything else must be a VLAN id in
//! 1-4094. Bad pairs are skipped with a diagnostic; they never abort
//! startup.
//!
//! The per-switch file format is one port per line:
//!
//! ```text
//! 14            <- lines with a single token (bridge priority) are ignored
//! r-0 1
//! r-1 2
//! rr-0-1 T
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use vswitch_types::{PortConfig, PortId};

use crate::error::{Result, SwitchError};

/// One `(designator, port name)` pair from the configuration source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub designator: String,
    pub port_name: String,
}

impl PortSpec {
    pub fn new(designator: impl Into<String>, port_name: impl Into<String>) -> Self {
        Self {
            designator: designator.into(),
            port_name: port_name.into(),
        }
    }

    /// Resolves the designator into a [`PortConfig`].
    pub fn parse(&self) -> Result<PortConfig> {
        self.designator
            .parse()
            .map_err(|e| SwitchError::invalid_port_spec(&self.port_name, e))
    }
}

/// Parses the line-based per-switch VLAN file.
///
/// Each line is `<port_name> <designator>`; extra tokens are ignored.
/// Blank lines, `#` comments and single-token lines are skipped.
pub fn parse_vlan_config(text: &str) -> Vec<PortSpec> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, line)| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let mut tokens = line.split_whitespace();
            match (tokens.next(), tokens.next()) {
                (Some(name), Some(designator)) => Some(PortSpec::new(designator, name)),
                _ => {
                    debug!(line = idx + 1, content = line, "Skipping non-port config line");
                    None
                }
            }
        })
        .collect()
}

/// Reads a per-switch VLAN file.
///
/// A missing file yields no specs (every port stays unconfigured) with a
/// warning; other IO errors are returned.
pub fn load_vlan_config_file(path: impl AsRef<Path>) -> Result<Vec<PortSpec>> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(text) => Ok(parse_vlan_config(&text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "VLAN config file not found, no port is configured");
            Ok(Vec::new())
        }
        Err(e) => Err(SwitchError::Io(e)),
    }
}

/// Outcome of [`PortConfigTable::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Number of ports that received a configuration.
    pub configured: usize,
    /// Specs that were skipped and why.
    pub skipped: Vec<SwitchError>,
}

/// Immutable mapping from port to its VLAN membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortConfigTable {
    ports: HashMap<PortId, PortConfig>,
}

impl PortConfigTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the table from configuration specs.
    ///
    /// `resolve` maps a port name to the transport's port id. Specs with a
    /// bad designator or an unknown port name are skipped and reported. A
    /// port named twice keeps its last configuration.
    pub fn load<I, F>(specs: I, resolve: F) -> (Self, LoadReport)
    where
        I: IntoIterator<Item = PortSpec>,
        F: Fn(&str) -> Option<PortId>,
    {
        let mut table = Self::new();
        let mut report = LoadReport::default();

        for spec in specs {
            let config = match spec.parse() {
                Ok(config) => config,
                Err(e) => {
                    warn!(port = %spec.port_name, designator = %spec.designator, "Skipping invalid port spec: {}", e);
                    report.skipped.push(e);
                    continue;
                }
            };

            let Some(port) = resolve(&spec.port_name) else {
                warn!(port = %spec.port_name, "Skipping config for unknown port");
                report.skipped.push(SwitchError::UnknownPort(spec.port_name));
                continue;
            };

            if let Some(previous) = table.ports.insert(port, config) {
                warn!(port = %spec.port_name, %previous, %config, "Port configured twice, keeping last");
            } else {
                report.configured += 1;
            }
            debug!(port = %spec.port_name, id = %port, %config, "Port configured");
        }

        info!(
            configured = report.configured,
            skipped = report.skipped.len(),
            "Loaded port VLAN configuration"
        );
        (table, report)
    }

    /// Sets the configuration of a single port.
    pub fn insert(&mut self, port: PortId, config: PortConfig) -> Option<PortConfig> {
        self.ports.insert(port, config)
    }

    /// Returns the configuration of `port`, or `None` if it is unconfigured.
    ///
    /// Unconfigured ports belong to no VLAN and never receive frames.
    pub fn lookup(&self, port: PortId) -> Option<PortConfig> {
        self.ports.get(&port).copied()
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PortId, PortConfig)> + '_ {
        self.ports.iter().map(|(port, config)| (*port, *config))
    }
}

impl FromIterator<(PortId, PortConfig)> for PortConfigTable {
    fn from_iter<T: IntoIterator<Item = (PortId, PortConfig)>>(iter: T) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}
