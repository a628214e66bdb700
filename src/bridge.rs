//! Power-management bridge lookup.
//!
//! The touchscreen's companion microcontroller sits on I2C and is located by a
//! symbolic reference in the panel's device description. The panel only holds
//! the handle; it never talks to the device.

use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// A counted reference to a bridge device. Dropping it releases the reference.
pub type BridgeRef = Arc<BridgeDevice>;

/// An I2C companion device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeDevice {
    /// Device node name.
    pub name: String,
    /// 7-bit I2C address.
    pub address: u16,
}

impl BridgeDevice {
    /// Create a device description.
    pub fn new(name: impl Into<String>, address: u16) -> Self {
        Self {
            name: name.into(),
            address,
        }
    }
}

/// Why a bridge lookup did not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupError {
    /// The node exists but its device has not been registered yet.
    NotYetAvailable,
    /// The reference names no node at all.
    NoSuchNode,
}

/// Resolves symbolic references to bridge devices.
pub trait BridgeLookup {
    /// Look up the device behind `reference`, taking a reference on it.
    fn find_bridge(&self, reference: &str) -> Result<BridgeRef, LookupError>;
}

/// An in-memory device bus.
///
/// References are linked to node names up front; devices appear on the bus
/// when their driver registers them, possibly after the panel first probes.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    links: HashMap<String, String>,
    devices: HashMap<String, BridgeRef>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Point `reference` at the node called `node`.
    pub fn link(&mut self, reference: impl Into<String>, node: impl Into<String>) {
        self.links.insert(reference.into(), node.into());
    }

    /// Put a device on the bus, returning the registry's reference to it.
    pub fn register(&mut self, device: BridgeDevice) -> BridgeRef {
        debug!("registering bridge device '{}' at 0x{:02x}", device.name, device.address);
        let device = Arc::new(device);
        self.devices.insert(device.name.clone(), Arc::clone(&device));
        device
    }

    /// Take a device off the bus. Outstanding references stay valid.
    pub fn unregister(&mut self, node: &str) -> Option<BridgeRef> {
        self.devices.remove(node)
    }
}

impl BridgeLookup for DeviceRegistry {
    fn find_bridge(&self, reference: &str) -> Result<BridgeRef, LookupError> {
        let node = self.links.get(reference).ok_or(LookupError::NoSuchNode)?;
        self.devices
            .get(node)
            .map(Arc::clone)
            .ok_or(LookupError::NotYetAvailable)
    }
}
