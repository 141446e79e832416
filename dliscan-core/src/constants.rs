//! Constants and limits for the RP66V1 physical and logical format

/// Visible Record version marker, `0xFF` then `0x01`. [RP66V1 Section 2.3.6]
pub const VISIBLE_RECORD_VERSION: u16 = 0xff01;

/// Size of a Visible Record header in bytes: length (2) + version (2)
pub const VISIBLE_RECORD_HEADER_SIZE: usize = 4;

/// Minimum size of a Logical Record Segment. [RP66V1 Section 2.2.2.2]
pub const LRS_MINIMUM_SIZE: u16 = 16;

/// Minimum Visible Record length: one minimal segment plus the header
pub const VISIBLE_RECORD_MIN_LENGTH: u16 = LRS_MINIMUM_SIZE + VISIBLE_RECORD_HEADER_SIZE as u16;

/// Maximum Visible Record length. [RP66V1 Section 2.3.6.5]
pub const VISIBLE_RECORD_MAX_LENGTH: u16 = 0x4000;

/// Size of a Logical Record Segment Header: length (2) + attributes (1) + type (1)
pub const LRSH_SIZE: usize = 4;

/// Size of the Storage Unit Label leader at the start of a file. [RP66V1 Section 2.3.2]
pub const STORAGE_UNIT_LABEL_SIZE: usize = 80;

/// Logical Record type of a public CHANNEL EFLR. [RP66V1 Appendix A]
pub const LR_TYPE_CHANNEL: u8 = 3;

/// Logical Record type of a public FRAME EFLR. [RP66V1 Appendix A]
pub const LR_TYPE_FRAME: u8 = 4;

/// Logical Record type of FDATA, the IFLR carrying frame data. [RP66V1 Appendix A]
pub const LR_TYPE_FDATA: u8 = 0;

/// Set Type of the EFLR describing channels.
pub const SET_TYPE_CHANNEL: &[u8] = b"CHANNEL";

/// Set Type of the EFLR describing frames.
pub const SET_TYPE_FRAME: &[u8] = b"FRAME";

/// Attributes byte of a Logical Record Segment Header. [RP66V1 Section 2.2.2.1]
///
/// Note the `first` and `last` bits are inverted on the wire: a set bit means
/// the segment has a predecessor or successor respectively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentAttributes(u8);

impl SegmentAttributes {
    /// Set when the record is explicitly formatted (EFLR), clear for IFLR
    pub const EFLR: u8 = 0b1000_0000;

    /// Set when the segment has a predecessor (it is not the first)
    pub const HAS_PREDECESSOR: u8 = 0b0100_0000;

    /// Set when the segment has a successor (it is not the last)
    pub const HAS_SUCCESSOR: u8 = 0b0010_0000;

    /// Set when the record is encrypted
    pub const ENCRYPTED: u8 = 0b0001_0000;

    /// Set when an encryption packet follows the header
    pub const HAS_ENCRYPTION_PACKET: u8 = 0b0000_1000;

    /// Set when a 2-byte checksum trails the segment
    pub const HAS_CHECKSUM: u8 = 0b0000_0100;

    /// Set when a redundant 2-byte trailing length trails the segment
    pub const HAS_TRAILING_LENGTH: u8 = 0b0000_0010;

    /// Set when pad bytes trail the logical data
    pub const HAS_PAD_BYTES: u8 = 0b0000_0001;

    /// Create new attributes from the raw byte
    pub const fn new(attributes: u8) -> Self {
        Self(attributes)
    }

    /// Get the raw attributes byte
    pub const fn as_u8(&self) -> u8 {
        self.0
    }

    /// Check if the segment belongs to an EFLR
    pub const fn is_eflr(&self) -> bool {
        (self.0 & Self::EFLR) != 0
    }

    /// Check if this is the first segment of its Logical Record
    pub const fn is_first(&self) -> bool {
        (self.0 & Self::HAS_PREDECESSOR) == 0
    }

    /// Check if this is the last segment of its Logical Record
    pub const fn is_last(&self) -> bool {
        (self.0 & Self::HAS_SUCCESSOR) == 0
    }

    /// Check if the record is encrypted
    pub const fn is_encrypted(&self) -> bool {
        (self.0 & Self::ENCRYPTED) != 0
    }

    /// Check if an encryption packet follows the header
    pub const fn has_encryption_packet(&self) -> bool {
        (self.0 & Self::HAS_ENCRYPTION_PACKET) != 0
    }

    /// Check if a checksum trails the segment
    pub const fn has_checksum(&self) -> bool {
        (self.0 & Self::HAS_CHECKSUM) != 0
    }

    /// Check if a trailing length trails the segment
    pub const fn has_trailing_length(&self) -> bool {
        (self.0 & Self::HAS_TRAILING_LENGTH) != 0
    }

    /// Check if pad bytes trail the logical data
    pub const fn has_pad_bytes(&self) -> bool {
        (self.0 & Self::HAS_PAD_BYTES) != 0
    }

    /// Pad bytes are only visible when the record is not encrypted
    pub const fn must_strip_padding(&self) -> bool {
        self.has_pad_bytes() && !self.is_encrypted()
    }
}
