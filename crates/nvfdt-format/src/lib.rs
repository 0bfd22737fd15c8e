//! Flattened device tree (FDT) blob format.
//!
//! An FDT blob is a self-describing, big-endian serialization of a
//! property tree:
//!
//! ```text
//! [header: 40 bytes]
//! [memory reservation map: (u64 address, u64 size)* terminated by (0, 0)]
//! [struct block: BEGIN_NODE / PROP / NOP / END_NODE tags, ending in END]
//! [strings block: NUL-terminated property names]
//! ```
//!
//! # Types
//!
//! - [`FdtHeader`] -- parsed and checked header fields
//! - [`Fdt`] -- borrowed view over a blob with a validated header
//! - [`PropertyToken`] -- opaque locator of a property inside the struct block
//! - [`Property`] -- name and value of one property
//! - [`FdtBuilder`] / [`NodeBuilder`] -- produce well-formed blobs
//!
//! # Design Rules
//!
//! 1. Every read from the blob is bounds-checked; malformed input yields a
//!    [`FormatError`], never a panic.
//! 2. Property tokens are the struct-block offsets of `FDT_PROP` tags. They
//!    are compared for equality, never used for arithmetic.
//! 3. A header check alone does not vouch for the interior; call
//!    [`Fdt::check_full`] before trusting a blob from an untrusted medium.

pub mod builder;
pub mod check;
pub mod error;
pub mod fdt;
pub mod header;
pub mod token;

pub use builder::{FdtBuilder, NodeBuilder};
pub use check::TreeStats;
pub use error::{FormatError, FormatResult};
pub use fdt::{Fdt, Properties, Property, Tag, ROOT_NODE};
pub use header::{FdtHeader, FDT_MAGIC, HEADER_SIZE};
pub use token::PropertyToken;
