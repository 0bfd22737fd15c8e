use std::sync::Arc;

use nvfdt_device::{ByteDevice, DeviceError, DeviceResult};

use crate::cell::Cell;
use crate::error::{LayerError, LayerResult};
use crate::facade::CellDevice;

/// Byte-addressable view of one cell.
///
/// Lets a cell that holds a nested blob serve as the underlying device of
/// another translation layer. Each read fetches the cell prefix up to the
/// end of the requested range and copies out the window.
pub struct CellWindow {
    name: String,
    device: Arc<dyn CellDevice>,
    cell: Cell,
}

impl CellWindow {
    /// Window over the cell named `cell_name` of `device`.
    pub fn new(device: Arc<dyn CellDevice>, cell_name: &str) -> LayerResult<Self> {
        let cell = device
            .cells()
            .by_name(cell_name)
            .cloned()
            .ok_or_else(|| LayerError::UnknownCell(cell_name.to_owned()))?;
        Ok(Self {
            name: format!("{}-{}", device.name(), cell.name),
            device,
            cell,
        })
    }

    pub fn cell(&self) -> &Cell {
        &self.cell
    }
}

impl ByteDevice for CellWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.cell.length as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DeviceResult<usize> {
        let size = self.size();
        if offset > size {
            return Err(DeviceError::OutOfRange {
                device: self.name.clone(),
                offset,
                size,
            });
        }
        let start = offset as usize;
        let end = start + buf.len().min(self.cell.length - start);

        let mut prefix = vec![0u8; end];
        self.device
            .read(self.cell.token, &mut prefix)
            .map_err(|e| DeviceError::Backend {
                device: self.name.clone(),
                reason: e.to_string(),
            })?;
        buf[..end - start].copy_from_slice(&prefix[start..]);
        Ok(end - start)
    }
}

impl std::fmt::Debug for CellWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CellWindow")
            .field("name", &self.name)
            .field("cell", &self.cell.name)
            .field("length", &self.cell.length)
            .finish()
    }
}
