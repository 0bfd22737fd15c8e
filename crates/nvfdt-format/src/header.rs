use serde::{Deserialize, Serialize};

use crate::error::{FormatError, FormatResult};

/// Magic number at offset 0 of every FDT blob.
pub const FDT_MAGIC: u32 = 0xd00d_feed;

/// Size of the version 17 header, the largest defined layout.
pub const HEADER_SIZE: usize = 40;

/// Oldest blob version this crate can walk.
pub const FIRST_SUPPORTED_VERSION: u32 = 0x02;

/// Newest blob version this crate understands.
pub const LAST_SUPPORTED_VERSION: u32 = 0x11;

/// Version written by [`crate::FdtBuilder`].
pub const BUILD_VERSION: u32 = 17;

/// Oldest version a reader must understand to read a built blob.
pub const BUILD_LAST_COMP_VERSION: u32 = 16;

/// FDT header. All fields are stored big-endian.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdtHeader {
    pub magic: u32,
    /// Size of the whole blob, header included.
    pub totalsize: u32,
    pub off_dt_struct: u32,
    pub off_dt_strings: u32,
    pub off_mem_rsvmap: u32,
    pub version: u32,
    pub last_comp_version: u32,
    /// Version 2 and later.
    pub boot_cpuid_phys: u32,
    /// Version 3 and later.
    pub size_dt_strings: u32,
    /// Version 17 and later.
    pub size_dt_struct: u32,
}

impl FdtHeader {
    /// Decode the header fields from the first [`HEADER_SIZE`] bytes.
    ///
    /// Only decodes; [`FdtHeader::check`] decides whether the values make
    /// sense.
    pub fn parse(data: &[u8]) -> FormatResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(FormatError::Truncated(format!(
                "header needs {HEADER_SIZE} bytes, got {}",
                data.len()
            )));
        }
        let field = |index: usize| {
            let at = index * 4;
            u32::from_be_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
        };
        Ok(Self {
            magic: field(0),
            totalsize: field(1),
            off_dt_struct: field(2),
            off_dt_strings: field(3),
            off_mem_rsvmap: field(4),
            version: field(5),
            last_comp_version: field(6),
            boot_cpuid_phys: field(7),
            size_dt_strings: field(8),
            size_dt_struct: field(9),
        })
    }

    /// Encode to the on-disk representation.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let fields = [
            self.magic,
            self.totalsize,
            self.off_dt_struct,
            self.off_dt_strings,
            self.off_mem_rsvmap,
            self.version,
            self.last_comp_version,
            self.boot_cpuid_phys,
            self.size_dt_strings,
            self.size_dt_struct,
        ];
        let mut out = [0u8; HEADER_SIZE];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_be_bytes());
        }
        out
    }

    /// Size of the header as laid out for this blob's version.
    pub fn header_size(&self) -> u32 {
        match self.version {
            0..=1 => 28,
            2 => 32,
            3..=16 => 36,
            _ => 40,
        }
    }

    /// Declared total size in bytes.
    pub fn total_size(&self) -> usize {
        self.totalsize as usize
    }

    /// Size of the struct block. Blobs older than version 17 do not record
    /// it, so the block is taken to run to the end of the blob.
    pub fn struct_size(&self) -> u32 {
        if self.version >= 17 {
            self.size_dt_struct
        } else {
            self.totalsize.saturating_sub(self.off_dt_struct)
        }
    }

    /// Validate magic, version and block placement.
    ///
    /// Every block must lie between the end of the header and `totalsize`.
    /// Nothing past the header is inspected.
    pub fn check(&self) -> FormatResult<()> {
        if self.magic != FDT_MAGIC {
            return Err(FormatError::BadMagic {
                expected: FDT_MAGIC,
                actual: self.magic,
            });
        }
        if self.version < FIRST_SUPPORTED_VERSION
            || self.last_comp_version > LAST_SUPPORTED_VERSION
            || self.version < self.last_comp_version
        {
            return Err(FormatError::BadVersion {
                version: self.version,
                last_comp_version: self.last_comp_version,
            });
        }

        let hdrsize = self.header_size();
        if self.totalsize < hdrsize || self.totalsize > i32::MAX as u32 {
            return Err(FormatError::Truncated(format!(
                "total size {} outside [{hdrsize}, {}]",
                self.totalsize,
                i32::MAX
            )));
        }
        if !self.offset_in_bounds(self.off_mem_rsvmap) {
            return Err(self.block_error("memory reservation map", self.off_mem_rsvmap, 0));
        }
        let struct_ok = if self.version >= 17 {
            self.block_in_bounds(self.off_dt_struct, self.size_dt_struct)
        } else {
            self.offset_in_bounds(self.off_dt_struct)
        };
        if !struct_ok {
            return Err(self.block_error("struct block", self.off_dt_struct, self.size_dt_struct));
        }
        if !self.block_in_bounds(self.off_dt_strings, self.size_dt_strings) {
            return Err(self.block_error(
                "strings block",
                self.off_dt_strings,
                self.size_dt_strings,
            ));
        }
        Ok(())
    }

    fn offset_in_bounds(&self, offset: u32) -> bool {
        offset >= self.header_size() && offset <= self.totalsize
    }

    fn block_in_bounds(&self, base: u32, size: u32) -> bool {
        match base.checked_add(size) {
            Some(end) => self.offset_in_bounds(base) && self.offset_in_bounds(end),
            None => false,
        }
    }

    fn block_error(&self, block: &str, base: u32, size: u32) -> FormatError {
        FormatError::Truncated(format!(
            "{block} at {base:#x} (+{size:#x}) exceeds blob of {} bytes",
            self.totalsize
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> FdtHeader {
        FdtHeader {
            magic: FDT_MAGIC,
            totalsize: 128,
            off_dt_struct: 56,
            off_dt_strings: 100,
            off_mem_rsvmap: 40,
            version: 17,
            last_comp_version: 16,
            boot_cpuid_phys: 0,
            size_dt_strings: 28,
            size_dt_struct: 44,
        }
    }

    #[test]
    fn parse_to_bytes_roundtrip() {
        let header = valid();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &[0xd0, 0x0d, 0xfe, 0xed]);
        assert_eq!(FdtHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn parse_short_input() {
        let err = FdtHeader::parse(&[0u8; 12]).unwrap_err();
        assert!(matches!(err, FormatError::Truncated(_)));
    }

    #[test]
    fn check_accepts_valid() {
        valid().check().unwrap();
    }

    #[test]
    fn check_rejects_bad_magic() {
        let header = FdtHeader { magic: 0xdeadbeef, ..valid() };
        assert_eq!(
            header.check().unwrap_err(),
            FormatError::BadMagic { expected: FDT_MAGIC, actual: 0xdeadbeef }
        );
    }

    #[test]
    fn check_rejects_old_version() {
        let header = FdtHeader { version: 1, last_comp_version: 1, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::BadVersion { version: 1, .. })));
    }

    #[test]
    fn check_rejects_future_compat() {
        let header = FdtHeader { version: 18, last_comp_version: 18, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::BadVersion { .. })));
    }

    #[test]
    fn check_rejects_version_below_compat() {
        let header = FdtHeader { version: 16, last_comp_version: 17, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::BadVersion { .. })));
    }

    #[test]
    fn check_rejects_tiny_totalsize() {
        let header = FdtHeader { totalsize: 20, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::Truncated(_))));
    }

    #[test]
    fn check_rejects_struct_overflow() {
        let header = FdtHeader { size_dt_struct: 200, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::Truncated(_))));
    }

    #[test]
    fn check_rejects_strings_wraparound() {
        let header = FdtHeader { size_dt_strings: u32::MAX, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::Truncated(_))));
    }

    #[test]
    fn check_rejects_block_inside_header() {
        let header = FdtHeader { off_mem_rsvmap: 8, ..valid() };
        assert!(matches!(header.check(), Err(FormatError::Truncated(_))));
    }

    #[test]
    fn header_size_by_version() {
        assert_eq!(FdtHeader { version: 2, ..valid() }.header_size(), 32);
        assert_eq!(FdtHeader { version: 16, ..valid() }.header_size(), 36);
        assert_eq!(valid().header_size(), 40);
    }

    #[test]
    fn struct_size_before_v17_runs_to_end() {
        let header = FdtHeader { version: 16, size_dt_struct: 0, ..valid() };
        assert_eq!(header.struct_size(), 128 - 56);
        assert_eq!(valid().struct_size(), 44);
    }
}
