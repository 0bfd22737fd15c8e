use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::error::{LayerError, LayerResult};
use crate::facade::CellDevice;

/// Name-keyed set of cell devices visible to consumers.
///
/// Registration is the last step of a probe: a device appears here only
/// once it is fully initialized, and never appears if initialization
/// failed.
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<String, Arc<dyn CellDevice>>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self {
            devices: RwLock::new(BTreeMap::new()),
        }
    }

    /// Publish `device` under its own name.
    pub fn register(&self, device: Arc<dyn CellDevice>) -> LayerResult<()> {
        let name = device.name().to_owned();
        let mut map = self.devices.write().expect("lock poisoned");
        if map.contains_key(&name) {
            return Err(LayerError::DuplicateDevice(name));
        }
        debug!(device = %name, cells = device.cells().len(), "registered cell device");
        map.insert(name, device);
        Ok(())
    }

    /// Withdraw a device. Returns it if it was registered.
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn CellDevice>> {
        let removed = self.devices.write().expect("lock poisoned").remove(name);
        if removed.is_some() {
            debug!(device = %name, "unregistered cell device");
        }
        removed
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn CellDevice>> {
        self.devices.read().expect("lock poisoned").get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.devices.read().expect("lock poisoned").contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.devices.read().expect("lock poisoned").keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().expect("lock poisoned").is_empty()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DeviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceRegistry")
            .field("devices", &self.names())
            .finish()
    }
}
