//! Link configuration loaded from TOML.

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use peerlink_platform::fixed::FixedPeer;
use serde::{Deserialize, Serialize};

use crate::error::LinkError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
}

/// Data socket and runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Data port shared by both peers. Not negotiated.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Address the group owner binds its listener to.
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            connect_timeout_ms: default_connect_timeout_ms(),
            command_queue: default_command_queue(),
            log_level: default_log_level(),
        }
    }
}

impl LinkConfig {
    /// Listener address for the group owner side.
    pub fn bind_addr(&self) -> Result<SocketAddr, LinkError> {
        let ip: IpAddr = self
            .bind
            .parse()
            .map_err(|e| LinkError::Config(format!("invalid bind address {:?}: {e}", self.bind)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Device identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_name")]
    pub name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
        }
    }
}

/// Settings for the fixed peer table backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Whether this device owns the group and hosts the data socket.
    #[serde(default)]
    pub group_owner: bool,
    /// Address reported as the group owner address when owning the group.
    #[serde(default)]
    pub local_ip: Option<IpAddr>,
    #[serde(default)]
    pub peers: Vec<FixedPeer>,
}

fn default_port() -> u16 {
    peerlink_protocol::DEFAULT_DATA_PORT
}

fn default_bind() -> String {
    "0.0.0.0".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    5_000
}

fn default_command_queue() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "peerlink".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("port = 8888"));
        assert!(toml_str.contains("group_owner = false"));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[link]
port = 9000
bind = "192.168.49.1"
connect_timeout_ms = 2500
log_level = "debug"

[identity]
name = "tablet"

[platform]
group_owner = true
local_ip = "192.168.49.1"

[[platform.peers]]
name = "Pixel-7"
address = "aa:bb:cc:dd:ee:01"
ip = "192.168.49.20"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.link.port, 9000);
        assert_eq!(config.link.connect_timeout(), Duration::from_millis(2500));
        assert_eq!(
            config.link.bind_addr().unwrap(),
            "192.168.49.1:9000".parse().unwrap()
        );
        assert_eq!(config.identity.name, "tablet");
        assert!(config.platform.group_owner);
        assert_eq!(config.platform.peers.len(), 1);
        assert_eq!(config.platform.peers[0].name, "Pixel-7");
        // Unset sections fall back to defaults.
        assert_eq!(config.link.command_queue, 64);
    }

    #[test]
    fn bad_bind_address_is_a_config_error() {
        let link = LinkConfig {
            bind: "not-an-ip".to_string(),
            ..LinkConfig::default()
        };
        let err = link.bind_addr().unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
