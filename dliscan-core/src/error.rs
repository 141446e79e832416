//! Error types for DLIS decode operations

/// Errors that can occur while decoding an RP66V1 byte stream
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum DlisError {
    /// Ran out of logical data or file bytes mid-value
    #[error("Unexpected end of data: wanted {wanted} byte(s), {remaining} remain")]
    Eof {
        /// Number of bytes the reader asked for.
        wanted: usize,
        /// Number of bytes that were actually available.
        remaining: usize,
    },

    /// IO error during read/seek
    #[error("IO error: {0}")]
    Io(String),

    /// Storage Unit Label is malformed
    #[error("Storage Unit Label: {0}")]
    StorageUnitLabel(String),

    /// Visible Record version marker is not 0xFF01
    #[error("Visible Record at 0x{position:x}: version 0x{actual:04x}, expected 0x{expected:04x}")]
    VisibleRecordVersion {
        /// File offset of the Visible Record header.
        position: u64,
        /// The expected version marker.
        expected: u16,
        /// The version marker actually read.
        actual: u16,
    },

    /// Visible Record length outside the allowed range
    #[error("Visible Record at 0x{position:x}: length {length} outside [{min}, {max}]")]
    VisibleRecordLength {
        /// File offset of the Visible Record header.
        position: u64,
        /// The length field read.
        length: u16,
        /// Minimum allowed length.
        min: u16,
        /// Maximum allowed length.
        max: u16,
    },

    /// Logical Record Segment chain is inconsistent
    #[error("Broken segment chain: {0}")]
    SegmentChain(String),

    /// Unsupported or out-of-range Representation Code
    #[error("Unsupported representation code {0}")]
    UnsupportedRepCode(u8),

    /// Fixed length requested for a variable-length Representation Code
    #[error("Representation code {0} is not fixed length")]
    NotFixedLength(u8),

    /// Component Descriptor failed construction-time validation
    #[error("Component descriptor 0x{descriptor:02x}: {reason}")]
    BadDescriptor {
        /// The offending descriptor byte.
        descriptor: u8,
        /// Why validation failed.
        reason: &'static str,
    },

    /// A role-specific descriptor accessor was called for the wrong role
    #[error("Descriptor accessor misuse: {0}")]
    DescriptorRole(&'static str),

    /// EFLR Set/Template/Object structure violates the schema rules
    #[error("Schema error: {0}")]
    Schema(String),

    /// Frame/Channel model error (index range, array mismatch, bad channel)
    #[error("Frame error: {0}")]
    Frame(String),
}

impl DlisError {
    /// True for buffer-underrun conditions so batch tools can classify
    /// truncated files separately from malformed ones.
    pub fn is_eof(&self) -> bool {
        matches!(self, DlisError::Eof { .. })
    }
}

impl From<std::io::Error> for DlisError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            DlisError::Eof {
                wanted: 0,
                remaining: 0,
            }
        } else {
            DlisError::Io(err.to_string())
        }
    }
}
