//! FDT cell translation layer.
//!
//! Presents a flattened device tree blob, stored on a byte-addressable
//! device, as a read-only device whose addressable units are named cells:
//! one per property of the tree's root node.
//!
//! # Components
//!
//! - [`load_blob`] -- validates the header and loads the whole blob
//! - [`enumerate_cells`] -- walks root properties into a [`CellTable`]
//! - [`FdtCellDevice`] -- serves `read(token, length)` from the table
//! - [`FdtLayerDriver`] -- binds to [`COMPATIBLE`] bindings and publishes
//!   devices in a [`DeviceRegistry`]
//! - [`CellWindow`] -- exposes one cell as a byte device, for stacking
//!
//! # Design Rules
//!
//! 1. Initialization is all-or-nothing: a device is registered only after
//!    the blob is loaded and its cells are enumerated.
//! 2. The blob and the cell table are immutable after initialization;
//!    reads take `&self` and need no locks.
//! 3. Reads never touch the underlying device.
//! 4. A cell is addressed by exact token; a read may ask for a prefix of a
//!    cell but never more than it holds. Anything else is
//!    [`LayerError::UnsupportedAddress`].
//! 5. Unlike layers that trust the blob interior, the struct block is fully
//!    validated on load by default ([`Validation::Full`]) and every read is
//!    bounds-checked against the blob.

pub mod binding;
pub mod cell;
pub mod config;
pub mod enumerator;
pub mod error;
pub mod facade;
pub mod loader;
pub mod node;
pub mod registry;
pub mod window;

pub use binding::{Binding, FdtLayerDriver, COMPATIBLE};
pub use cell::{Cell, CellTable, CellToken};
pub use config::{LayerConfig, Validation};
pub use enumerator::enumerate_cells;
pub use error::{ConfigError, LayerError, LayerResult};
pub use facade::{CellDevice, FdtCellDevice};
pub use loader::{load_blob, Blob};
pub use node::DescriptorNode;
pub use registry::DeviceRegistry;
pub use window::CellWindow;
