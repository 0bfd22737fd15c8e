use std::io;

use nvfdt_device::DeviceError;
use nvfdt_format::FormatError;

use crate::cell::CellToken;

/// Errors from loading, enumerating, or reading through a translation layer.
#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    /// The underlying device failed a read.
    #[error(transparent)]
    Device(#[from] DeviceError),

    /// The underlying device returned fewer bytes than requested.
    #[error("short read on {device}: wanted {requested} bytes at offset {offset:#x}, got {actual}")]
    ShortRead {
        device: String,
        offset: u64,
        requested: usize,
        actual: usize,
    },

    /// The blob failed header or structural validation.
    #[error("invalid FDT blob: {0}")]
    InvalidFormat(#[from] FormatError),

    /// A buffer could not be allocated.
    #[error("out of memory allocating {what} ({requested} bytes)")]
    OutOfMemory { what: &'static str, requested: usize },

    /// No cell matches the token with at least the requested length.
    #[error("operation not supported: no cell at token {token} holding {length} bytes")]
    UnsupportedAddress { token: CellToken, length: usize },

    /// The binding does not name this translation layer.
    #[error("binding {0:?} is not handled by this driver")]
    IncompatibleBinding(String),

    /// No cell with this name exists on the device.
    #[error("no cell named {0:?}")]
    UnknownCell(String),

    /// A device with the same name is already registered.
    #[error("device already registered: {0}")]
    DuplicateDevice(String),
}

impl LayerError {
    /// The `std::io` kind callers see for this error.
    ///
    /// Unmatched reads map to [`io::ErrorKind::Unsupported`], never to
    /// `NotFound`; consumers rely on telling the two apart.
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::Device(DeviceError::Io { source, .. }) => source.kind(),
            Self::Device(_) | Self::ShortRead { .. } => io::ErrorKind::UnexpectedEof,
            Self::InvalidFormat(_) => io::ErrorKind::InvalidData,
            Self::OutOfMemory { .. } => io::ErrorKind::OutOfMemory,
            Self::UnsupportedAddress { .. } => io::ErrorKind::Unsupported,
            Self::IncompatibleBinding(_) => io::ErrorKind::InvalidInput,
            Self::UnknownCell(_) => io::ErrorKind::NotFound,
            Self::DuplicateDevice(_) => io::ErrorKind::AlreadyExists,
        }
    }

    /// Whether the underlying device is to blame.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Device(_) | Self::ShortRead { .. })
    }
}

impl From<LayerError> for io::Error {
    fn from(err: LayerError) -> Self {
        io::Error::new(err.kind(), err)
    }
}

/// Result alias for layer operations.
pub type LayerResult<T> = Result<T, LayerError>;

/// Errors from loading a [`crate::LayerConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}
