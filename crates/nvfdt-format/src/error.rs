use thiserror::Error;

/// Errors raised while validating or walking an FDT blob.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid FDT magic: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },

    #[error("unsupported FDT version {version} (last compatible {last_comp_version})")]
    BadVersion { version: u32, last_comp_version: u32 },

    #[error("truncated FDT: {0}")]
    Truncated(String),

    #[error("bad FDT structure at struct offset {offset:#x}: {reason}")]
    BadStructure { offset: u32, reason: String },

    #[error("bad FDT offset {offset:#x}: {reason}")]
    BadOffset { offset: u32, reason: String },

    #[error("unknown FDT tag {tag:#x} at struct offset {offset:#x}")]
    BadTag { tag: u32, offset: u32 },

    #[error("invalid name at offset {offset:#x}")]
    BadName { offset: u32 },
}

pub type FormatResult<T> = Result<T, FormatError>;
