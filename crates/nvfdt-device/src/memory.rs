use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::{DeviceError, DeviceResult};
use crate::traits::ByteDevice;

/// Injected failure modes for [`InMemoryDevice`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Faults {
    /// Cap on the number of bytes any single read returns.
    max_read: Option<usize>,
    /// Fail every read with an I/O error.
    fail_reads: bool,
}

/// In-memory, `Vec`-backed byte device.
///
/// Intended for tests and embedding. The contents are fixed at
/// construction; short reads and I/O failures can be injected to exercise
/// error paths of layers built on top.
pub struct InMemoryDevice {
    name: String,
    data: Vec<u8>,
    faults: RwLock<Faults>,
    reads: AtomicU64,
}

impl InMemoryDevice {
    /// Create a device named `name` holding `data`.
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
            faults: RwLock::new(Faults::default()),
            reads: AtomicU64::new(0),
        }
    }

    /// Raw device contents.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Cap every subsequent read at `max` bytes (`None` removes the cap).
    pub fn limit_reads(&self, max: Option<usize>) {
        self.faults.write().expect("lock poisoned").max_read = max;
    }

    /// Make every subsequent read fail (or succeed again).
    pub fn fail_reads(&self, fail: bool) {
        self.faults.write().expect("lock poisoned").fail_reads = fail;
    }

    /// Number of `read_at` calls served so far, including failed ones.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl ByteDevice for InMemoryDevice {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DeviceResult<usize> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let faults = *self.faults.read().expect("lock poisoned");
        if faults.fail_reads {
            return Err(DeviceError::Io {
                device: self.name.clone(),
                source: std::io::Error::other("injected read failure"),
            });
        }

        let size = self.size();
        if offset > size {
            return Err(DeviceError::OutOfRange {
                device: self.name.clone(),
                offset,
                size,
            });
        }

        let start = offset as usize;
        let mut count = buf.len().min(self.data.len() - start);
        if let Some(max) = faults.max_read {
            count = count.min(max);
        }
        buf[..count].copy_from_slice(&self.data[start..start + count]);
        Ok(count)
    }
}

impl std::fmt::Debug for InMemoryDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDevice")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}
