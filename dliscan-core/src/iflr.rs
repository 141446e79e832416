//! Indirectly Formatted Logical Records. [RP66V1 Section 3.3]
//!
//! The only public IFLR decoded here is FDATA (type 0): an OBNAME naming the
//! Frame object, a UVARI frame number, then the frame slice whose layout is
//! given by the FRAME/CHANNEL EFLRs, not by the record itself.

use crate::logical_data::LogicalData;
use crate::repcode::{self, ObjectName};
use crate::Result;
use tracing::warn;

/// The decoded preamble of one IFLR, cursor left on the first channel value
#[derive(Debug, Clone, PartialEq)]
pub struct IndirectlyFormattedLogicalRecord {
    /// Name of the Frame object the record belongs to
    pub object_name: ObjectName,
    /// One-based frame number within the frame array
    pub frame_number: u32,
    /// Bytes consumed by the preamble, so callers can size the payload
    pub preamble_length: usize,
}

impl IndirectlyFormattedLogicalRecord {
    /// Decode the preamble from the start of the Logical Data. The cursor is
    /// rewound first and ends up on the first byte of frame data.
    pub fn parse(ld: &mut LogicalData) -> Result<Self> {
        ld.rewind();
        let object_name = repcode::obname(ld)?;
        let frame_number = repcode::uvari(ld)?;
        if frame_number == 0 && ld.remaining() != 0 {
            // Frame numbers are one-based; zero with a payload is a known
            // producer quirk worth flagging.
            warn!(%object_name, "IFLR frame number 0 with non-empty payload");
        }
        Ok(Self {
            object_name,
            frame_number,
            preamble_length: ld.index(),
        })
    }

    /// True when the record carries no frame data after the preamble
    pub fn is_empty(&self, ld: &LogicalData) -> bool {
        ld.len() == self.preamble_length
    }
}
