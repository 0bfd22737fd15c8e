//! Byte-addressable storage devices for nvfdt.
//!
//! A translation layer reads its backing image from a device that only
//! knows about byte offsets. This crate defines that contract and the
//! backends used in practice and in tests.
//!
//! # Backends
//!
//! All backends implement the [`ByteDevice`] trait:
//!
//! - [`InMemoryDevice`] -- `Vec`-backed device with fault injection for tests
//! - [`MmapDevice`] -- read-only memory-mapped image file
//!
//! # Design Rules
//!
//! 1. Devices are read-only from the layer's point of view.
//! 2. A read may return fewer bytes than requested; callers decide whether
//!    a short read is an error.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod mmap;
pub mod traits;

pub use error::{DeviceError, DeviceResult};
pub use memory::InMemoryDevice;
pub use mmap::MmapDevice;
pub use traits::ByteDevice;
