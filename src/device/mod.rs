//! Remote devices and their transfer managers.
//!
//! This module provides:
//! - Device identity and editing profile types
//! - The transport contract (`RemoteDevice`, `TransferManager`, `Subscription`)
//! - The offline stand-in used while nothing is connected
//! - A simulated device for the CLI and tests

mod offline;
mod sim;
mod transport;
mod types;

pub use offline::OfflineDevice;
pub use sim::{SimulatedDevice, SimulationMode};
pub use transport::{
    DeviceHandle, ManagerBinding, RemoteDevice, Subscription, TransferEvent, TransferManager,
    TransferOp, TransferOutcome,
};
#[cfg(test)]
pub use transport::MockTransferManager;
pub use types::{DeviceId, DeviceIdentity, DeviceProfile, Firmware, VehicleClass};
