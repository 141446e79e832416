//! Physical and logical framing [RP66V1 Section 2]
//!
//! A file is an 80-byte Storage Unit Label followed by Visible Records, each
//! holding one or more Logical Record Segments. One Logical Record is the
//! concatenation of a chain of segment payloads, following the successor flag
//! until the last segment; a chain may span Visible Record boundaries, so the
//! reader is a state machine over two nested framing layers.

use crate::constants::{
    SegmentAttributes, LRSH_SIZE, LRS_MINIMUM_SIZE, STORAGE_UNIT_LABEL_SIZE,
    VISIBLE_RECORD_MAX_LENGTH, VISIBLE_RECORD_MIN_LENGTH, VISIBLE_RECORD_VERSION,
};
use crate::error::DlisError;
use crate::logical_data::LogicalData;
use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};
use tracing::debug;

fn read_exact_or_eof<R: Read>(file: &mut R, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).map_err(DlisError::from)?;
        if n == 0 {
            return Err(DlisError::Eof {
                wanted: buf.len(),
                remaining: filled,
            });
        }
        filled += n;
    }
    Ok(())
}

fn read_u8<R: Read>(file: &mut R) -> Result<u8> {
    let mut by = [0u8; 1];
    read_exact_or_eof(file, &mut by)?;
    Ok(by[0])
}

fn read_u16_be<R: Read>(file: &mut R) -> Result<u16> {
    let mut by = [0u8; 2];
    read_exact_or_eof(file, &mut by)?;
    Ok(u16::from_be_bytes(by))
}

/// The fixed-format 80-byte leader at the start of a storage unit.
/// [RP66V1 Section 2.3.2]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageUnitLabel {
    /// Storage unit sequence number, field 1
    pub sequence_number: u32,
    /// DLIS version such as `V1.00`, field 2
    pub dlis_version: String,
    /// Storage unit structure, `RECORD` for RP66V1, field 3
    pub storage_unit_structure: String,
    /// Maximum record length, field 4
    pub maximum_record_length: u32,
    /// Storage set identifier, field 5, kept raw
    pub storage_set_identifier: Vec<u8>,
}

impl StorageUnitLabel {
    /// Size of the label in bytes
    pub const SIZE: usize = STORAGE_UNIT_LABEL_SIZE;

    /// Parse the label from its 80 bytes
    pub fn parse(by: &[u8]) -> Result<Self> {
        if by.len() != Self::SIZE {
            return Err(DlisError::StorageUnitLabel(format!(
                "expected {} bytes, got {}",
                Self::SIZE,
                by.len()
            )));
        }
        let sequence_number = std::str::from_utf8(&by[0..4])
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                DlisError::StorageUnitLabel(format!(
                    "bad storage unit sequence number {:?}",
                    &by[0..4]
                ))
            })?;
        let dlis_version = std::str::from_utf8(&by[4..9])
            .ok()
            .filter(|s| s.starts_with("V1."))
            .ok_or_else(|| {
                DlisError::StorageUnitLabel(format!("bad DLIS version {:?}", &by[4..9]))
            })?
            .to_string();
        let storage_unit_structure = std::str::from_utf8(&by[9..15])
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| s == "RECORD")
            .ok_or_else(|| {
                DlisError::StorageUnitLabel(format!(
                    "bad storage unit structure {:?}",
                    &by[9..15]
                ))
            })?;
        let maximum_record_length = std::str::from_utf8(&by[15..20])
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .ok_or_else(|| {
                DlisError::StorageUnitLabel(format!(
                    "bad maximum record length {:?}",
                    &by[15..20]
                ))
            })?;
        Ok(Self {
            sequence_number,
            dlis_version,
            storage_unit_structure,
            maximum_record_length,
            storage_set_identifier: by[20..].to_vec(),
        })
    }
}

/// Outermost framing unit. [RP66V1 Section 2.3.6]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRecord {
    /// File offset of the header
    pub position: u64,
    /// Total length including the 4-byte header
    pub length: u16,
    /// Version marker, always 0xFF01 once validated
    pub version: u16,
}

impl VisibleRecord {
    /// Read and validate a Visible Record header at the current file position
    pub fn read<R: Read + Seek>(file: &mut R) -> Result<Self> {
        let position = file.stream_position().map_err(DlisError::from)?;
        let length = read_u16_be(file)?;
        let version = read_u16_be(file)?;
        if version != VISIBLE_RECORD_VERSION {
            return Err(DlisError::VisibleRecordVersion {
                position,
                expected: VISIBLE_RECORD_VERSION,
                actual: version,
            });
        }
        if !(VISIBLE_RECORD_MIN_LENGTH..=VISIBLE_RECORD_MAX_LENGTH).contains(&length) {
            return Err(DlisError::VisibleRecordLength {
                position,
                length,
                min: VISIBLE_RECORD_MIN_LENGTH,
                max: VISIBLE_RECORD_MAX_LENGTH,
            });
        }
        Ok(Self {
            position,
            length,
            version,
        })
    }

    /// File offset of the next Visible Record header
    pub fn next_position(&self) -> u64 {
        self.position + u64::from(self.length)
    }
}

/// Header of one Logical Record Segment. [RP66V1 Section 2.2.2.1]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogicalRecordSegmentHeader {
    /// File offset of the header
    pub position: u64,
    /// Segment length including header and trailer
    pub length: u16,
    /// Attribute bits
    pub attributes: SegmentAttributes,
    /// Logical Record type
    pub record_type: u8,
}

impl LogicalRecordSegmentHeader {
    /// Read a segment header at the current file position
    pub fn read<R: Read + Seek>(file: &mut R) -> Result<Self> {
        let position = file.stream_position().map_err(DlisError::from)?;
        let length = read_u16_be(file)?;
        let attributes = SegmentAttributes::new(read_u8(file)?);
        let record_type = read_u8(file)?;
        if length < LRS_MINIMUM_SIZE {
            return Err(DlisError::SegmentChain(format!(
                "segment at 0x{position:x} length {length} below minimum {LRS_MINIMUM_SIZE}"
            )));
        }
        Ok(Self {
            position,
            length,
            attributes,
            record_type,
        })
    }

    /// File offset of the next segment header
    pub fn next_position(&self) -> u64 {
        self.position + u64::from(self.length)
    }

    /// Length of the logical data, including padding but excluding the
    /// header, checksum and trailing length
    pub fn logical_data_length(&self) -> usize {
        let mut length = usize::from(self.length) - LRSH_SIZE;
        if self.attributes.has_checksum() {
            length -= 2;
        }
        if self.attributes.has_trailing_length() {
            length -= 2;
        }
        length
    }
}

/// Where a Logical Record starts: its first segment and the Visible Record
/// enclosing that segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogicalRecordPosition {
    /// Offset of the enclosing Visible Record header
    pub vr_position: u64,
    /// Offset of the first Logical Record Segment Header
    pub lrsh_position: u64,
}

/// One fully reassembled Logical Record: framing facts plus its Logical Data
#[derive(Debug, Clone)]
pub struct RawLogicalRecord {
    /// Where the record starts in the file
    pub position: LogicalRecordPosition,
    /// Logical Record type byte
    pub lr_type: u8,
    /// Explicitly formatted (EFLR) or indirectly formatted (IFLR)
    pub is_eflr: bool,
    /// Encrypted records are surfaced, not decoded
    pub is_encrypted: bool,
    /// The reassembled payload
    pub data: LogicalData,
}

/// Sequential reader over a file's Logical Records.
///
/// Decoding is strictly sequential: each record's start offset is only
/// knowable from the previous record's framing, so there is no random access
/// here. The reader owns no shared state and is safe to use one-per-worker.
#[derive(Debug)]
pub struct RecordReader<R> {
    file: R,
    sul: StorageUnitLabel,
    visible_record: VisibleRecord,
    lrsh: LogicalRecordSegmentHeader,
    done: bool,
}

impl<R: Read + Seek> RecordReader<R> {
    /// Read the Storage Unit Label and position on the first segment
    pub fn new(mut file: R) -> Result<Self> {
        file.seek(SeekFrom::Start(0)).map_err(DlisError::from)?;
        let mut label = [0u8; StorageUnitLabel::SIZE];
        read_exact_or_eof(&mut file, &mut label)?;
        let sul = StorageUnitLabel::parse(&label)?;
        let visible_record = VisibleRecord::read(&mut file)?;
        let lrsh = LogicalRecordSegmentHeader::read(&mut file)?;
        if !lrsh.attributes.is_first() {
            return Err(DlisError::SegmentChain(format!(
                "segment at 0x{:x} is not the first of a Logical Record",
                lrsh.position
            )));
        }
        Ok(Self {
            file,
            sul,
            visible_record,
            lrsh,
            done: false,
        })
    }

    /// The Storage Unit Label read at construction
    pub fn storage_unit_label(&self) -> &StorageUnitLabel {
        &self.sul
    }

    /// Read the current segment's payload, stripping padding and consuming
    /// the trailer. Leaves the file at the segment's next_position.
    fn read_segment_payload(&mut self, out: &mut Vec<u8>) -> Result<()> {
        let lrsh = self.lrsh;
        if lrsh.next_position() > self.visible_record.next_position() {
            return Err(DlisError::SegmentChain(format!(
                "segment at 0x{:x} overruns its Visible Record at 0x{:x}",
                lrsh.position, self.visible_record.position
            )));
        }
        let data_length = lrsh.logical_data_length();
        let start = out.len();
        out.resize(start + data_length, 0);
        read_exact_or_eof(&mut self.file, &mut out[start..])?;
        if lrsh.attributes.must_strip_padding() {
            // The pad count is the last pad byte. Counts above 3 have been
            // seen in the wild, so only sanity-check against the payload.
            let pad_length = usize::from(*out.last().ok_or_else(|| {
                DlisError::SegmentChain(format!("segment at 0x{:x} is all padding", lrsh.position))
            })?);
            if pad_length > data_length {
                return Err(DlisError::SegmentChain(format!(
                    "segment at 0x{:x} pad count {pad_length} exceeds payload {data_length}",
                    lrsh.position
                )));
            }
            out.truncate(start + data_length - pad_length);
            debug!(
                position = lrsh.position,
                pad_length, "stripped segment padding"
            );
        }
        if lrsh.attributes.has_checksum() {
            // Consumed but not verified, the checksum algorithm is producer
            // specific in practice.
            let _checksum = read_u16_be(&mut self.file)?;
        }
        if lrsh.attributes.has_trailing_length() {
            let trailing = read_u16_be(&mut self.file)?;
            if trailing != lrsh.length {
                return Err(DlisError::SegmentChain(format!(
                    "segment at 0x{:x} trailing length {trailing} != header length {}",
                    lrsh.position, lrsh.length
                )));
            }
        }
        Ok(())
    }

    /// Move to the next segment header, crossing into a new Visible Record
    /// when the current one is exhausted
    fn advance_segment(&mut self) -> Result<()> {
        let next = self.lrsh.next_position();
        self.file
            .seek(SeekFrom::Start(next))
            .map_err(DlisError::from)?;
        if next == self.visible_record.next_position() {
            self.visible_record = VisibleRecord::read(&mut self.file)?;
        }
        self.lrsh = LogicalRecordSegmentHeader::read(&mut self.file)?;
        Ok(())
    }

    /// Reassemble the next Logical Record.
    ///
    /// Returns `Ok(None)` at a clean end of file, between records. An EOF
    /// mid-record surfaces as a `DlisError::Eof` so truncated files are
    /// distinguishable from well-formed ones.
    pub fn next_record(&mut self) -> Result<Option<RawLogicalRecord>> {
        if self.done {
            return Ok(None);
        }
        if !self.lrsh.attributes.is_first() {
            return Err(DlisError::SegmentChain(format!(
                "segment at 0x{:x} is not the first of a Logical Record",
                self.lrsh.position
            )));
        }
        let position = LogicalRecordPosition {
            vr_position: self.visible_record.position,
            lrsh_position: self.lrsh.position,
        };
        let lr_type = self.lrsh.record_type;
        let is_eflr = self.lrsh.attributes.is_eflr();
        let is_encrypted = self.lrsh.attributes.is_encrypted();

        let mut payload = Vec::new();
        self.read_segment_payload(&mut payload)?;
        while !self.lrsh.attributes.is_last() {
            self.advance_segment()?;
            if self.lrsh.attributes.is_first() {
                return Err(DlisError::SegmentChain(format!(
                    "segment at 0x{:x} starts a new record inside an unfinished chain",
                    self.lrsh.position
                )));
            }
            self.read_segment_payload(&mut payload)?;
        }
        let record = RawLogicalRecord {
            position,
            lr_type,
            is_eflr,
            is_encrypted,
            data: LogicalData::new(Bytes::from(payload)),
        };
        // Position on the next record; EOF here is the normal end.
        match self.advance_segment() {
            Ok(()) => {}
            Err(err) if err.is_eof() => self.done = true,
            Err(err) => return Err(err),
        }
        Ok(Some(record))
    }
}

impl<R: Read + Seek> Iterator for RecordReader<R> {
    type Item = Result<RawLogicalRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sul_bytes() -> Vec<u8> {
        let mut by = Vec::new();
        by.extend_from_slice(b"   1");
        by.extend_from_slice(b"V1.00");
        by.extend_from_slice(b"RECORD");
        by.extend_from_slice(b" 8192");
        by.extend_from_slice(&[b' '; 60]);
        assert_eq!(by.len(), StorageUnitLabel::SIZE);
        by
    }

    fn visible_record(segments: &[Vec<u8>]) -> Vec<u8> {
        let body: usize = segments.iter().map(Vec::len).sum();
        let mut by = Vec::new();
        by.extend_from_slice(&((body + 4) as u16).to_be_bytes());
        by.extend_from_slice(&VISIBLE_RECORD_VERSION.to_be_bytes());
        for segment in segments {
            by.extend_from_slice(segment);
        }
        by
    }

    fn segment(attributes: u8, record_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut by = Vec::new();
        by.extend_from_slice(&((payload.len() + 4) as u16).to_be_bytes());
        by.push(attributes);
        by.push(record_type);
        by.extend_from_slice(payload);
        by
    }

    #[test]
    fn test_storage_unit_label_parse() {
        let sul = StorageUnitLabel::parse(&sul_bytes()).unwrap();
        assert_eq!(sul.sequence_number, 1);
        assert_eq!(sul.dlis_version, "V1.00");
        assert_eq!(sul.storage_unit_structure, "RECORD");
        assert_eq!(sul.maximum_record_length, 8192);
    }

    #[test]
    fn test_storage_unit_label_rejects_garbage() {
        assert!(StorageUnitLabel::parse(&[0u8; 80]).is_err());
        let mut by = sul_bytes();
        by[4..9].copy_from_slice(b"V2.00");
        assert!(StorageUnitLabel::parse(&by).is_err());
        assert!(StorageUnitLabel::parse(&by[..40]).is_err());
    }

    #[test]
    fn test_single_record_single_segment() {
        let payload = vec![0xAAu8; 16];
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0x80, 3, &payload)]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.lr_type, 3);
        assert!(record.is_eflr);
        assert!(!record.is_encrypted);
        assert_eq!(record.position.vr_position, 80);
        assert_eq!(record.position.lrsh_position, 84);
        assert_eq!(record.data.len(), 16);
        assert!(reader.next_record().unwrap().is_none());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_segments_reassemble_across_visible_records() {
        // One record in two segments, each in its own Visible Record.
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0xA0, 0, &[1u8; 12])]));
        file.extend_from_slice(&visible_record(&[segment(0xC0, 0, &[2u8; 12])]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert!(!record.is_eflr);
        assert_eq!(record.data.len(), 24);
        assert_eq!(&record.data.as_slice()[..12], &[1u8; 12]);
        assert_eq!(&record.data.as_slice()[12..], &[2u8; 12]);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_multiple_records_in_one_visible_record() {
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[
            segment(0x80, 3, &[3u8; 12]),
            segment(0x80, 4, &[4u8; 12]),
        ]));

        let reader = RecordReader::new(Cursor::new(file)).unwrap();
        let records: Vec<_> = reader.map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].lr_type, 3);
        assert_eq!(records[1].lr_type, 4);
    }

    #[test]
    fn test_pad_bytes_are_stripped() {
        let mut payload = vec![0x55u8; 13];
        payload.extend_from_slice(&[0, 0, 3]); // 3 pad bytes, count in the last
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0x81, 3, &payload)]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.data.len(), 13);
        assert_eq!(record.data.as_slice(), &[0x55u8; 13]);
    }

    #[test]
    fn test_encrypted_record_keeps_padding() {
        // Pad bit set alongside the encrypted bit: the pad count is part of
        // the ciphertext, so the payload must come through untouched.
        let mut payload = vec![0x55u8; 13];
        payload.extend_from_slice(&[0, 0, 3]);
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0x91, 3, &payload)]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        let record = reader.next_record().unwrap().unwrap();
        assert!(record.is_encrypted);
        assert!(record.is_eflr);
        assert_eq!(record.data.len(), 16);
        assert_eq!(record.data.as_slice(), payload.as_slice());
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn test_trailing_length_is_validated() {
        let mut payload = vec![0x66u8; 12];
        // Trailing length must equal the segment length (4 + 12 + 2 = 18).
        payload.extend_from_slice(&18u16.to_be_bytes());
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0x82, 3, &payload)]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        assert!(reader.next_record().unwrap().is_some());

        let mut payload = vec![0x66u8; 12];
        payload.extend_from_slice(&9999u16.to_be_bytes());
        let mut file = sul_bytes();
        file.extend_from_slice(&visible_record(&[segment(0x82, 3, &payload)]));

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        assert!(matches!(
            reader.next_record(),
            Err(DlisError::SegmentChain(_))
        ));
    }

    #[test]
    fn test_bad_visible_record_version() {
        let mut file = sul_bytes();
        let mut vr = visible_record(&[segment(0x80, 3, &[0u8; 12])]);
        vr[2] = 0xde;
        vr[3] = 0xad;
        file.extend_from_slice(&vr);

        let err = RecordReader::new(Cursor::new(file)).unwrap_err();
        assert_eq!(
            err,
            DlisError::VisibleRecordVersion {
                position: 80,
                expected: VISIBLE_RECORD_VERSION,
                actual: 0xdead,
            }
        );
    }

    #[test]
    fn test_truncated_mid_record_is_eof() {
        let mut file = sul_bytes();
        let vr = visible_record(&[segment(0x80, 3, &[0u8; 12])]);
        file.extend_from_slice(&vr[..vr.len() - 6]);

        let mut reader = RecordReader::new(Cursor::new(file)).unwrap();
        assert!(reader.next_record().unwrap_err().is_eof());
    }

    #[test]
    fn test_chain_must_start_with_first_segment() {
        let mut file = sul_bytes();
        // Predecessor bit set on the very first segment.
        file.extend_from_slice(&visible_record(&[segment(0xC0, 3, &[0u8; 12])]));
        assert!(matches!(
            RecordReader::new(Cursor::new(file)),
            Err(DlisError::SegmentChain(_))
        ));
    }
}
