use bytes::Bytes;
use nvfdt_device::ByteDevice;
use nvfdt_format::{Fdt, FdtHeader, FormatResult, HEADER_SIZE};
use tracing::debug;

use crate::config::{LayerConfig, Validation};
use crate::error::{LayerError, LayerResult};

/// A fully loaded FDT blob.
///
/// Immutable once loaded; clones share the same buffer.
#[derive(Clone, Debug)]
pub struct Blob {
    data: Bytes,
    header: FdtHeader,
}

impl Blob {
    /// Declared total size, equal to the buffer length.
    pub fn total_size(&self) -> usize {
        self.data.len()
    }

    pub fn header(&self) -> &FdtHeader {
        &self.header
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Borrowed format view over the blob. The header is not re-checked.
    pub fn fdt(&self) -> FormatResult<Fdt<'_>> {
        Fdt::with_header(&self.data, self.header)
    }
}

/// Load the blob stored at offset 0 of `device`.
///
/// Reads and checks the header, allocates exactly the declared total size,
/// then reads the whole blob. With [`Validation::Full`] the struct block is
/// walked before the blob is returned. Nothing is returned on failure.
pub fn load_blob(device: &dyn ByteDevice, config: &LayerConfig) -> LayerResult<Blob> {
    let mut raw = [0u8; HEADER_SIZE];
    read_exact_at(device, 0, &mut raw)?;

    let header = FdtHeader::parse(&raw)?;
    header.check()?;

    let total = header.total_size();
    if total > config.max_blob_size as usize {
        return Err(LayerError::OutOfMemory {
            what: "blob",
            requested: total,
        });
    }
    let mut buf = Vec::new();
    buf.try_reserve_exact(total)
        .map_err(|_| LayerError::OutOfMemory {
            what: "blob",
            requested: total,
        })?;
    buf.resize(total, 0);
    read_exact_at(device, 0, &mut buf)?;

    if config.validation == Validation::Full {
        let stats = Fdt::with_header(&buf, header)?.check_full()?;
        debug!(
            device = device.name(),
            nodes = stats.nodes,
            properties = stats.properties,
            "blob structure verified"
        );
    }

    debug!(device = device.name(), total_size = total, version = header.version, "loaded blob");
    Ok(Blob {
        data: Bytes::from(buf),
        header,
    })
}

/// Fill `buf` from `offset`, treating a short read as an I/O failure.
pub(crate) fn read_exact_at(device: &dyn ByteDevice, offset: u64, buf: &mut [u8]) -> LayerResult<()> {
    let actual = device.read_at(offset, buf)?;
    if actual < buf.len() {
        return Err(LayerError::ShortRead {
            device: device.name().to_owned(),
            offset,
            requested: buf.len(),
            actual,
        });
    }
    Ok(())
}
