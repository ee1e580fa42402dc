//! Configuration types.
//!
//! This module defines the structs that map to the `plansync.yaml` file.
//! Every field has a default, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::device::{DeviceProfile, Firmware, VehicleClass};
use crate::store::DEFAULT_PLAN_DIR;

/// Default ground station name written into plan files.
pub const DEFAULT_GROUND_STATION: &str = "plansync";

/// Default latency of the simulated device, in milliseconds.
pub const DEFAULT_SIM_LATENCY_MS: u64 = 25;

/// The root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSyncConfig {
    /// Profile of the offline stand-in.
    #[serde(default)]
    pub offline_editing: OfflineEditingConfig,
    /// Plan document settings.
    #[serde(default)]
    pub document: DocumentConfig,
    /// Plan storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Simulated device settings.
    #[serde(default)]
    pub simulator: SimulatorConfig,
}

/// Profile used for editing while no device is connected.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OfflineEditingConfig {
    /// Autopilot firmware.
    #[serde(default)]
    pub firmware: Firmware,
    /// Vehicle class.
    #[serde(default)]
    pub vehicle: VehicleClass,
}

/// Plan document settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentConfig {
    /// Name written into the `groundStation` field.
    #[serde(default = "default_ground_station")]
    pub ground_station: String,
}

/// Plan storage settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    /// Directory relative plan paths resolve against.
    #[serde(default = "default_plan_dir")]
    pub plan_dir: PathBuf,
}

/// Simulated device settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Delay before each simulated transfer completes.
    #[serde(default = "default_latency_ms")]
    pub latency_ms: u64,
}

fn default_ground_station() -> String {
    String::from(DEFAULT_GROUND_STATION)
}

fn default_plan_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PLAN_DIR)
}

const fn default_latency_ms() -> u64 {
    DEFAULT_SIM_LATENCY_MS
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            ground_station: default_ground_station(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            plan_dir: default_plan_dir(),
        }
    }
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            latency_ms: DEFAULT_SIM_LATENCY_MS,
        }
    }
}

impl OfflineEditingConfig {
    /// The stand-in profile.
    #[must_use]
    pub const fn profile(&self) -> DeviceProfile {
        DeviceProfile::new(self.firmware, self.vehicle)
    }
}

impl SimulatorConfig {
    /// Latency as a duration.
    #[must_use]
    pub const fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

/// Template written by `plansync init`.
pub const CONFIG_TEMPLATE: &str = "\
# plansync configuration

offline_editing:          # profile used while no device is connected
  firmware: px4           # px4 | ardupilot | generic
  vehicle: multirotor     # multirotor | fixed_wing | vtol | rover | submarine | generic

document:
  ground_station: plansync

storage:
  plan_dir: ./plans

simulator:
  latency_ms: 25
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        let config: PlanSyncConfig =
            serde_yaml::from_str(CONFIG_TEMPLATE).expect("template should parse");
        assert_eq!(config.document.ground_station, "plansync");
        assert_eq!(config.storage.plan_dir, PathBuf::from("./plans"));
        assert_eq!(config.simulator.latency(), Duration::from_millis(25));
    }

    #[test]
    fn test_defaults() {
        let config = PlanSyncConfig::default();
        assert_eq!(config.offline_editing.profile(), DeviceProfile::default());
        assert_eq!(config.storage.plan_dir, PathBuf::from(DEFAULT_PLAN_DIR));
    }
}
