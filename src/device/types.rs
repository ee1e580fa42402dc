//! Device identity and profile types.

use serde::{Deserialize, Serialize};

/// System id of a connected device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(pub u8);

/// Which device, if any, is authoritative for remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DeviceIdentity {
    /// No device: offline editing against the local stand-in.
    #[default]
    None,
    /// A connected remote device.
    Connected(DeviceId),
}

/// Autopilot firmware family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Firmware {
    /// PX4 autopilot.
    #[default]
    Px4,
    /// `ArduPilot` autopilot.
    Ardupilot,
    /// Any other MAVLink autopilot.
    Generic,
}

/// Vehicle class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    /// Multirotor.
    #[default]
    Multirotor,
    /// Fixed wing.
    FixedWing,
    /// Vertical takeoff and landing hybrid.
    Vtol,
    /// Ground rover.
    Rover,
    /// Submarine.
    Submarine,
    /// Unspecified.
    Generic,
}

/// Firmware and vehicle class of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceProfile {
    /// Autopilot firmware.
    #[serde(default)]
    pub firmware: Firmware,
    /// Vehicle class.
    #[serde(default)]
    pub vehicle: VehicleClass,
}

impl DeviceIdentity {
    /// Returns true for [`DeviceIdentity::None`].
    #[must_use]
    pub const fn is_offline(self) -> bool {
        matches!(self, Self::None)
    }
}

impl Firmware {
    /// MAVLink `MAV_AUTOPILOT` value.
    #[must_use]
    pub const fn mav_autopilot(self) -> u8 {
        match self {
            Self::Px4 => 12,
            Self::Ardupilot => 3,
            Self::Generic => 0,
        }
    }
}

impl VehicleClass {
    /// MAVLink `MAV_TYPE` value.
    #[must_use]
    pub const fn mav_type(self) -> u8 {
        match self {
            Self::Multirotor => 2,
            Self::FixedWing => 1,
            Self::Vtol => 20,
            Self::Rover => 10,
            Self::Submarine => 12,
            Self::Generic => 0,
        }
    }
}

impl DeviceProfile {
    /// Creates a profile.
    #[must_use]
    pub const fn new(firmware: Firmware, vehicle: VehicleClass) -> Self {
        Self { firmware, vehicle }
    }
}

impl std::fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "offline"),
            Self::Connected(DeviceId(id)) => write!(f, "device {id}"),
        }
    }
}

impl std::fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let firmware = match self.firmware {
            Firmware::Px4 => "px4",
            Firmware::Ardupilot => "ardupilot",
            Firmware::Generic => "generic",
        };
        let vehicle = match self.vehicle {
            VehicleClass::Multirotor => "multirotor",
            VehicleClass::FixedWing => "fixed_wing",
            VehicleClass::Vtol => "vtol",
            VehicleClass::Rover => "rover",
            VehicleClass::Submarine => "submarine",
            VehicleClass::Generic => "generic",
        };
        write!(f, "{firmware}/{vehicle}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_display() {
        assert_eq!(DeviceIdentity::None.to_string(), "offline");
        assert_eq!(DeviceIdentity::Connected(DeviceId(7)).to_string(), "device 7");
        assert!(DeviceIdentity::None.is_offline());
        assert!(!DeviceIdentity::Connected(DeviceId(1)).is_offline());
    }

    #[test]
    fn test_profile_yaml() {
        let profile: DeviceProfile =
            serde_yaml::from_str("firmware: ardupilot\nvehicle: fixed_wing\n").expect("profile parses");
        assert_eq!(profile, DeviceProfile::new(Firmware::Ardupilot, VehicleClass::FixedWing));
        assert_eq!(profile.to_string(), "ardupilot/fixed_wing");
        assert_eq!(profile.firmware.mav_autopilot(), 3);
        assert_eq!(profile.vehicle.mav_type(), 1);
    }
}
