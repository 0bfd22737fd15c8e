use std::fs::File;
use std::path::Path;

use memmap2::Mmap;
use tracing::debug;

use crate::error::{DeviceError, DeviceResult};
use crate::traits::ByteDevice;

/// Read-only byte device backed by a memory-mapped image file.
///
/// The device name is the file stem, so `board-eeprom.bin` stacks into a
/// layer called `board-eeprom-fdt`.
pub struct MmapDevice {
    name: String,
    /// `None` for empty files, which cannot be mapped on every platform.
    map: Option<Mmap>,
}

impl MmapDevice {
    /// Map the file at `path`.
    pub fn open(path: &Path) -> DeviceResult<Self> {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let io_err = |source| DeviceError::Io {
            device: name.clone(),
            source,
        };

        let file = File::open(path).map_err(io_err)?;
        let len = file.metadata().map_err(io_err)?.len();
        let map = if len == 0 {
            None
        } else {
            // SAFETY: the mapping is read-only; callers must not truncate
            // the image while the device is alive.
            Some(unsafe { Mmap::map(&file) }.map_err(io_err)?)
        };

        debug!(device = %name, path = %path.display(), size = len, "mapped image");
        Ok(Self { name, map })
    }

    fn bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl ByteDevice for MmapDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.bytes().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DeviceResult<usize> {
        let data = self.bytes();
        if offset > data.len() as u64 {
            return Err(DeviceError::OutOfRange {
                device: self.name.clone(),
                offset,
                size: data.len() as u64,
            });
        }
        let start = offset as usize;
        let count = buf.len().min(data.len() - start);
        buf[..count].copy_from_slice(&data[start..start + count]);
        Ok(count)
    }
}

impl std::fmt::Debug for MmapDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapDevice")
            .field("name", &self.name)
            .field("size", &self.size())
            .finish()
    }
}
