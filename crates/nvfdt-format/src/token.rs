use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque locator of a property within an FDT struct block.
///
/// This is the offset of the property's `FDT_PROP` tag, exactly as
/// property iteration yields it. It does not point at the property value
/// and has no arithmetic: two tokens are either equal or they are not.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyToken(u32);

impl PropertyToken {
    pub(crate) const fn new(offset: u32) -> Self {
        Self(offset)
    }

    /// Rebuild a token carried across an integer interface.
    ///
    /// A token that was never produced by iteration is still a valid value;
    /// lookups with it simply fail.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw representation for integer interfaces.
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    pub(crate) fn offset(self) -> u32 {
        self.0
    }

    /// Hex-encoded big-endian representation.
    pub fn to_hex(self) -> String {
        hex::encode(self.0.to_be_bytes())
    }
}

impl fmt::Debug for PropertyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyToken({:#x})", self.0)
    }
}

impl fmt::Display for PropertyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
