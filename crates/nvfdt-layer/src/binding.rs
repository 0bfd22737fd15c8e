use std::sync::Arc;

use nvfdt_device::ByteDevice;
use tracing::{info, warn};

use crate::config::LayerConfig;
use crate::error::{LayerError, LayerResult};
use crate::facade::{CellDevice, FdtCellDevice};
use crate::node::DescriptorNode;
use crate::registry::DeviceRegistry;

/// Binding type identifier handled by [`FdtLayerDriver`].
pub const COMPATIBLE: &str = "nvmem-fdt";

/// A host-managed binding: which driver it wants, the device holding the
/// blob, and optionally the host's descriptor node for the binding.
#[derive(Clone)]
pub struct Binding {
    pub compatible: String,
    pub lower: Arc<dyn ByteDevice>,
    pub of_node: Option<Arc<DescriptorNode>>,
}

impl Binding {
    /// Binding for this translation layer on top of `lower`.
    pub fn new(lower: Arc<dyn ByteDevice>) -> Self {
        Self {
            compatible: COMPATIBLE.to_owned(),
            lower,
            of_node: None,
        }
    }

    pub fn with_node(mut self, node: Arc<DescriptorNode>) -> Self {
        self.of_node = Some(node);
        self
    }

    pub fn with_compatible(mut self, compatible: impl Into<String>) -> Self {
        self.compatible = compatible.into();
        self
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("compatible", &self.compatible)
            .field("lower", &self.lower.name())
            .field("of_node", &self.of_node.as_ref().map(|n| n.name()))
            .finish()
    }
}

/// Driver that instantiates FDT translation layers for matching bindings.
#[derive(Clone, Debug, Default)]
pub struct FdtLayerDriver {
    config: LayerConfig,
}

impl FdtLayerDriver {
    pub fn new(config: LayerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn matches(&self, binding: &Binding) -> bool {
        binding.compatible == COMPATIBLE
    }

    /// Load, enumerate, and register a layer for `binding`.
    ///
    /// The registry is only touched once the layer is fully built, so a
    /// failed probe leaves no trace.
    pub fn probe(
        &self,
        binding: &Binding,
        registry: &DeviceRegistry,
    ) -> LayerResult<Arc<FdtCellDevice>> {
        if !self.matches(binding) {
            return Err(LayerError::IncompatibleBinding(binding.compatible.clone()));
        }

        let device = FdtCellDevice::new(
            Arc::clone(&binding.lower),
            binding.of_node.as_ref(),
            &self.config,
        )
        .map_err(|e| {
            warn!(lower = binding.lower.name(), error = %e, "probe failed");
            e
        })?;
        let device = Arc::new(device);

        registry.register(device.clone())?;
        info!(
            device = device.name(),
            cells = device.cells().len(),
            total_size = device.blob().total_size(),
            "cell device ready"
        );
        Ok(device)
    }

    /// Withdraw a layer. It is released once the last outstanding handle
    /// is dropped. Returns `false` if nothing was registered under `name`.
    pub fn remove(&self, name: &str, registry: &DeviceRegistry) -> bool {
        registry.unregister(name).is_some()
    }
}
