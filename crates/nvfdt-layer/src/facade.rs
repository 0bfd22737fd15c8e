use std::sync::Arc;

use nvfdt_device::ByteDevice;

use crate::cell::{Cell, CellTable, CellToken};
use crate::config::LayerConfig;
use crate::enumerator::enumerate_cells;
use crate::error::{LayerError, LayerResult};
use crate::loader::{load_blob, Blob};
use crate::node::DescriptorNode;

/// Read-only storage device addressed by named cells.
///
/// All implementations must satisfy these invariants:
/// - The cell directory never changes after the device becomes visible.
/// - `read` takes `&self` and is safe to call from many threads at once.
/// - A read matching no cell fails with
///   [`LayerError::UnsupportedAddress`] and leaves the device untouched.
pub trait CellDevice: Send + Sync {
    fn name(&self) -> &str;

    /// Cell devices never accept writes.
    fn read_only(&self) -> bool {
        true
    }

    /// The cell directory, in enumeration order.
    fn cells(&self) -> &CellTable;

    /// Fill `buf` with the first `buf.len()` bytes of the cell at `token`.
    fn read(&self, token: CellToken, buf: &mut [u8]) -> LayerResult<()>;

    /// Read a cell's whole value.
    fn read_cell(&self, cell: &Cell) -> LayerResult<Vec<u8>> {
        let mut buf = vec![0u8; cell.length];
        self.read(cell.token, &mut buf)?;
        Ok(buf)
    }

    /// Read the whole value of the cell named `name`.
    fn read_named(&self, name: &str) -> LayerResult<Vec<u8>> {
        let cell = self
            .cells()
            .by_name(name)
            .ok_or_else(|| LayerError::UnknownCell(name.to_owned()))?;
        self.read_cell(cell)
    }
}

/// Translation layer exposing the root properties of an FDT blob, stored
/// on a byte device, as cells.
///
/// A value of this type only exists once the blob is loaded and the cell
/// table is built; construction either fully succeeds or returns an error
/// and leaves nothing behind. Dropping it releases the blob, the table and
/// the handle to the underlying device together.
pub struct FdtCellDevice {
    name: String,
    blob: Blob,
    cells: CellTable,
    lower: Arc<dyn ByteDevice>,
}

impl FdtCellDevice {
    /// Load the blob from `lower` and enumerate its cells.
    pub fn new(
        lower: Arc<dyn ByteDevice>,
        descriptor: Option<&Arc<DescriptorNode>>,
        config: &LayerConfig,
    ) -> LayerResult<Self> {
        let blob = load_blob(lower.as_ref(), config)?;
        let descriptor = descriptor.filter(|_| config.associate_nodes);
        let cells = enumerate_cells(&blob, descriptor)?;
        Ok(Self {
            name: config.display_name(lower.name()),
            blob,
            cells,
            lower,
        })
    }

    pub fn blob(&self) -> &Blob {
        &self.blob
    }

    /// The device the blob was loaded from.
    pub fn lower(&self) -> &Arc<dyn ByteDevice> {
        &self.lower
    }
}

impl CellDevice for FdtCellDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn cells(&self) -> &CellTable {
        &self.cells
    }

    fn read(&self, token: CellToken, buf: &mut [u8]) -> LayerResult<()> {
        let length = buf.len();
        if self.cells.find(token, length).is_none() {
            return Err(LayerError::UnsupportedAddress { token, length });
        }
        // The property lookup bounds-checks the value against the blob.
        let prop = self.blob.fdt()?.property(token)?;
        let value = prop.value.get(..length).ok_or_else(|| {
            LayerError::InvalidFormat(nvfdt_format::FormatError::Truncated(format!(
                "property at token {token} holds {} bytes, {length} requested",
                prop.len()
            )))
        })?;
        buf.copy_from_slice(value);
        Ok(())
    }
}

impl std::fmt::Debug for FdtCellDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FdtCellDevice")
            .field("name", &self.name)
            .field("lower", &self.lower.name())
            .field("total_size", &self.blob.total_size())
            .field("cell_count", &self.cells.len())
            .finish()
    }
}
