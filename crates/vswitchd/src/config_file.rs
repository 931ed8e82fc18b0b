//! Configuration file support for vswitchd
//!
//! Loads and validates the daemon configuration from TOML files.
//! Default location: /etc/vswitch/vswitchd.toml

use crate::error::{Result, SwitchError};
use crate::frame::{FrameCodec, DEFAULT_TPID};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;
use vswitch_types::MacAddress;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/vswitch/vswitchd.toml";

/// Smallest value that is an EtherType rather than an 802.3 length.
const MIN_ETHER_TYPE: u16 = 0x0600;

/// Switch identity and behaviour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchSection {
    /// Switch id, used for the default VLAN file name
    #[serde(default)]
    pub id: u32,

    /// Switch MAC; derived from the id when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<MacAddress>,

    /// EtherType marking a tagged frame
    #[serde(default = "default_tag_ether_type")]
    pub tag_ether_type: u16,

    /// MAC entry lifetime in seconds, 0 disables aging
    #[serde(default)]
    pub mac_ttl_secs: u64,

    /// Control plane tick period in milliseconds
    #[serde(default = "default_control_plane_period")]
    pub control_plane_period_ms: u64,

    /// Per-switch VLAN file; defaults to `configs/switch<id>.cfg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vlan_config: Option<PathBuf>,
}

/// One virtual link, carried as one frame per UDP datagram
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Interface name referenced by the VLAN file
    pub name: String,

    /// Local address
    pub bind: SocketAddr,

    /// Remote end of the link
    pub peer: SocketAddr,
}

/// Complete vswitchd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwitchDaemonConfig {
    #[serde(default)]
    pub switch: SwitchSection,

    /// Links in port order
    #[serde(default)]
    pub links: Vec<LinkConfig>,
}

fn default_tag_ether_type() -> u16 {
    DEFAULT_TPID
}

fn default_control_plane_period() -> u64 {
    1000
}

impl Default for SwitchSection {
    fn default() -> Self {
        Self {
            id: 0,
            mac: None,
            tag_ether_type: default_tag_ether_type(),
            mac_ttl_secs: 0,
            control_plane_period_ms: default_control_plane_period(),
            vlan_config: None,
        }
    }
}

impl SwitchSection {
    /// Configured MAC, or a locally administered one built from the id.
    pub fn switch_mac(&self) -> MacAddress {
        self.mac.unwrap_or_else(|| {
            let id = self.id.to_be_bytes();
            MacAddress::new([0x02, 0x00, id[0], id[1], id[2], id[3]])
        })
    }
}

impl SwitchDaemonConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                SwitchError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(SwitchError::Io(e)),
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SwitchError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Control plane tick period
    pub fn control_plane_period(&self) -> Duration {
        Duration::from_millis(self.switch.control_plane_period_ms)
    }

    /// MAC aging lifetime, `None` when aging is disabled
    pub fn mac_ttl(&self) -> Option<Duration> {
        match self.switch.mac_ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Frame codec for the configured tag EtherType
    pub fn codec(&self) -> FrameCodec {
        FrameCodec::new(self.switch.tag_ether_type)
    }

    /// VLAN file path
    pub fn vlan_config_path(&self) -> PathBuf {
        self.switch
            .vlan_config
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("configs/switch{}.cfg", self.switch.id)))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.switch.control_plane_period_ms == 0 {
            return Err(SwitchError::Config(
                "control_plane_period_ms must be > 0".to_string(),
            ));
        }

        if self.switch.tag_ether_type < MIN_ETHER_TYPE {
            return Err(SwitchError::Config(format!(
                "tag_ether_type {:#06x} is a length, not an EtherType",
                self.switch.tag_ether_type
            )));
        }

        let mut names = HashSet::new();
        for link in &self.links {
            if link.name.trim().is_empty() {
                return Err(SwitchError::Config("link name must not be empty".to_string()));
            }
            if !names.insert(link.name.as_str()) {
                return Err(SwitchError::Config(format!(
                    "duplicate link name: {}",
                    link.name
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = SwitchDaemonConfig::default();
        assert_eq!(config.switch.id, 0);
        assert_eq!(config.switch.tag_ether_type, 0x8200);
        assert_eq!(config.control_plane_period(), Duration::from_secs(1));
        assert_eq!(config.mac_ttl(), None);
        assert!(config.links.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[switch]
id = 3
mac = "02:00:00:00:00:03"
tag_ether_type = 0x8100
mac_ttl_secs = 300

[[links]]
name = "r-0"
bind = "127.0.0.1:40000"
peer = "127.0.0.1:41000"

[[links]]
name = "rr-3-4"
bind = "127.0.0.1:40001"
peer = "127.0.0.1:41001"
"#;
        let config: SwitchDaemonConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.switch.id, 3);
        assert_eq!(config.switch.switch_mac().to_string(), "02:00:00:00:00:03");
        assert_eq!(config.codec().tpid(), 0x8100);
        assert_eq!(config.mac_ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.links.len(), 2);
        assert_eq!(config.links[1].name, "rr-3-4");
        assert_eq!(config.links[1].peer.port(), 41001);
        // Unspecified values should use defaults
        assert_eq!(config.switch.control_plane_period_ms, 1000);
        assert_eq!(config.vlan_config_path(), PathBuf::from("configs/switch3.cfg"));
    }

    #[test]
    fn test_invalid_mac_rejected() {
        let toml_str = "[switch]\nmac = \"not-a-mac\"\n";
        assert!(toml::from_str::<SwitchDaemonConfig>(toml_str).is_err());
    }

    #[test]
    fn test_derived_switch_mac() {
        let section = SwitchSection {
            id: 0x0102,
            ..Default::default()
        };
        assert_eq!(section.switch_mac().to_string(), "02:00:00:00:01:02");
        assert!(section.switch_mac().is_unicast());
    }

    #[test]
    fn test_validate_zero_period() {
        let mut config = SwitchDaemonConfig::default();
        config.switch.control_plane_period_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_tag_ether_type() {
        let mut config = SwitchDaemonConfig::default();
        config.switch.tag_ether_type = 0x05dc;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_duplicate_links() {
        let link = LinkConfig {
            name: "r-0".to_string(),
            bind: "127.0.0.1:40000".parse().unwrap(),
            peer: "127.0.0.1:41000".parse().unwrap(),
        };
        let config = SwitchDaemonConfig {
            links: vec![link.clone(), link],
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate link name: r-0"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vswitchd.toml");

        let mut config = SwitchDaemonConfig::default();
        config.switch.id = 7;
        config.switch.vlan_config = Some(PathBuf::from("/tmp/switch7.cfg"));
        config.links.push(LinkConfig {
            name: "r-0".to_string(),
            bind: "127.0.0.1:40000".parse().unwrap(),
            peer: "127.0.0.1:41000".parse().unwrap(),
        });
        config.save(&path).unwrap();

        let loaded = SwitchDaemonConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_sample_config() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../..");
        let config = SwitchDaemonConfig::load_or_default(root.join("configs/vswitchd.toml")).unwrap();
        config.validate().unwrap();
        assert_eq!(config.links.len(), 4);
        assert_eq!(config.vlan_config_path(), PathBuf::from("configs/switch0.cfg"));

        let specs = crate::port_config::load_vlan_config_file(root.join(config.vlan_config_path()))
            .unwrap();
        assert_eq!(specs.len(), config.links.len());
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = SwitchDaemonConfig::load_or_default("/nonexistent/vswitchd.toml").unwrap();
        assert_eq!(config, SwitchDaemonConfig::default());
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "[switch\nid = ").unwrap();

        let err = SwitchDaemonConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, SwitchError::Config(_)));
    }
}
