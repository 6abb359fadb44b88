use anyhow::{Context, Error};
use common::FrameEncoding;
use serde::{Deserialize, Serialize};
use std::{net::Ipv4Addr, path::Path};

pub const CONFIG_PATH: &str = "config.ron";

/// Network joined when nothing else worked within the grace period.
/// Override at build time with `TURRET_BACKUP_SSID`.
pub const BACKUP_NETWORK_NAME: &str = match option_env!("TURRET_BACKUP_SSID") {
    Some(name) => name,
    None => "LocalNetwork",
};

/// Override at build time with `TURRET_BACKUP_PASSPHRASE`.
pub const BACKUP_PASSPHRASE: &str = match option_env!("TURRET_BACKUP_PASSPHRASE") {
    Some(passphrase) => passphrase,
    None => "LocalNetworkPassword",
};

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub hostname: String,
    pub link: LinkConfig,
    pub backup: BackupNetwork,
    pub serial: SerialConfig,
    pub indicator: IndicatorConfig,
    pub bench: BenchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            hostname: "Rover-Turret".to_string(),
            link: LinkConfig::default(),
            backup: BackupNetwork::default(),
            serial: SerialConfig::default(),
            indicator: IndicatorConfig::default(),
            bench: BenchConfig::default(),
        }
    }
}

/// Timing of connection attempts and of the backup fallback
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// Give up on an association attempt after this long
    pub connect_timeout_ms: u64,
    /// How often a pending association is re-checked
    pub poll_interval_ms: u64,
    /// Uptime before the backup network is tried
    pub grace_period_ms: u64,
    /// Pause between control loop iterations
    pub loop_idle_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            poll_interval_ms: 500,
            grace_period_ms: 60_000,
            loop_idle_ms: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackupNetwork {
    pub network_name: String,
    pub passphrase: String,
}

impl Default for BackupNetwork {
    fn default() -> Self {
        Self {
            network_name: BACKUP_NETWORK_NAME.to_string(),
            passphrase: BACKUP_PASSPHRASE.to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub path: String,
    pub baud: u32,
    pub encoding: FrameEncoding,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            path: "/dev/serial0".to_string(),
            baud: 9600,
            encoding: FrameEncoding::Ascii,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct IndicatorConfig {
    /// BCM/GPIO number of the indicator output
    pub gpio: u8,
    /// Whether driving the pin high turns the indicator on
    pub active_high: bool,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            gpio: 4,
            active_high: true,
        }
    }
}

/// Networks the simulated radio knows about in bench mode
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BenchConfig {
    pub networks: Vec<BenchNetwork>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct BenchNetwork {
    pub name: String,
    pub passphrase: String,
    /// Address handed out once associated
    pub address: Ipv4Addr,
    /// How long association takes
    #[serde(default)]
    pub associate_after_ms: u64,
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let path = path.as_ref();
        let config = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Config =
            ron::from_str(&config).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}
