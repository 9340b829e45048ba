// SPDX-License-Identifier: GPL-3.0-only
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::leds::LedColor;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/baylightd.toml";

/// Daemon configuration, read from an optional TOML file
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Config {
    /// LED brightness level, left untouched when unset
    pub brightness: Option<u8>,
    /// Colour used for the "drive present" indicator
    pub presence_color: PresenceColor,
    pub topology: TopologyConfig,
}

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceColor {
    #[default]
    Blue,
    Red,
    Both,
}

impl From<PresenceColor> for LedColor {
    fn from(color: PresenceColor) -> Self {
        match color {
            PresenceColor::Blue => LedColor::BLUE,
            PresenceColor::Red => LedColor::RED,
            PresenceColor::Both => LedColor::BLUE | LedColor::RED,
        }
    }
}

/// Where bays show up in the udev device tree
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Subsystem of the host adapter ancestor
    pub host_subsystem: String,
    /// Devtype of the host adapter ancestor
    pub host_devtype: String,
    /// Subsystem of the devices that are monitored for hotplug
    pub device_subsystem: String,
    /// Devtype of the devices that are enumerated and monitored
    pub device_devtype: String,
    /// Subsystem of a host adapter's parent for adapters that are real bays
    pub internal_bus: String,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            host_subsystem: "scsi".to_string(),
            host_devtype: "scsi_host".to_string(),
            device_subsystem: "scsi".to_string(),
            device_devtype: "scsi_device".to_string(),
            internal_bus: "pci".to_string(),
        }
    }
}

impl Config {
    pub fn from_toml(path: &Path, text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::Config {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Read the configuration file
    ///
    /// A missing file at the default location is not an error. Anything else
    /// that goes wrong is reported and the caller falls back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, AppError> {
        let path: PathBuf = explicit.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                debug!("No configuration file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(AppError::Config {
                    path,
                    reason: e.to_string(),
                });
            }
        };

        let config = Self::from_toml(&path, &text)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}
