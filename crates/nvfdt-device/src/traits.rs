use crate::error::DeviceResult;

/// Random-access, read-only, byte-addressable storage device.
///
/// All implementations must satisfy these invariants:
/// - `read_at` never writes past `buf.len()` bytes and returns how many
///   bytes it filled, starting at `buf[0]`.
/// - A read that starts inside the device but runs past its end is short,
///   not an error.
/// - A read that starts past the end of the device is an error.
/// - Reads may block on the backing medium; there is no timeout here.
pub trait ByteDevice: Send + Sync {
    /// Device name, used to derive the names of layers stacked on top.
    fn name(&self) -> &str;

    /// Total addressable size in bytes.
    fn size(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> DeviceResult<usize>;
}
