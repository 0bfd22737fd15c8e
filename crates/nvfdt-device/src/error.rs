/// Errors from byte-device operations.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// I/O error from the backing medium.
    #[error("I/O error on {device}: {source}")]
    Io {
        device: String,
        #[source]
        source: std::io::Error,
    },

    /// The read starts beyond the end of the device.
    #[error("offset {offset:#x} out of range for {device} ({size} bytes)")]
    OutOfRange {
        device: String,
        offset: u64,
        size: u64,
    },

    /// Failure reported by a device stacked on another layer.
    #[error("backend error on {device}: {reason}")]
    Backend { device: String, reason: String },
}

impl DeviceError {
    /// Name of the device that produced the error.
    pub fn device(&self) -> &str {
        match self {
            Self::Io { device, .. } | Self::OutOfRange { device, .. } | Self::Backend { device, .. } => {
                device
            }
        }
    }
}

/// Result alias for device operations.
pub type DeviceResult<T> = Result<T, DeviceError>;
