//! Frame/Channel model: materializing numeric curves from IFLR frame data.
//!
//! A `CHANNEL` EFLR describes each recorded curve (units, dimensions,
//! Representation Code); a `FRAME` EFLR declares which channels make up a
//! frame and in what order, channel 0 being the index. A `LogPass` binds the
//! two into `FrameArray`s that decode IFLR payloads straight into pre-sized
//! numeric arrays.

use crate::constants::{LR_TYPE_CHANNEL, LR_TYPE_FRAME, SET_TYPE_CHANNEL, SET_TYPE_FRAME};
use crate::eflr::ExplicitlyFormattedLogicalRecord;
use crate::error::DlisError;
use crate::iflr::IndirectlyFormattedLogicalRecord;
use crate::logical_data::LogicalData;
use crate::repcode::{self, ObjectName};
use crate::Result;
use bytes::Bytes;
use std::collections::HashMap;
use tracing::warn;

/// Materialized channel values, one slot per frame element.
///
/// Exactly one integer family is kept per channel so values survive decoding
/// without a lossy common type; floats widen to f64.
#[derive(Debug, Clone, PartialEq)]
pub enum NumericArray {
    /// FSINGL, ISINGL, VSINGL and FDOUBL channels
    Float(Vec<f64>),
    /// SSHORT, SNORM and SLONG channels
    Int(Vec<i64>),
    /// USHORT, UNORM, ULONG and UVARI channels
    Uint(Vec<u64>),
}

impl NumericArray {
    /// The empty array matching a channel's Representation Code
    pub fn for_rep_code(rep_code: u8) -> Result<Self> {
        match rep_code {
            repcode::RC_FSINGL | repcode::RC_ISINGL | repcode::RC_VSINGL | repcode::RC_FDOUBL => {
                Ok(NumericArray::Float(Vec::new()))
            }
            repcode::RC_SSHORT | repcode::RC_SNORM | repcode::RC_SLONG => {
                Ok(NumericArray::Int(Vec::new()))
            }
            repcode::RC_USHORT | repcode::RC_UNORM | repcode::RC_ULONG | repcode::RC_UVARI => {
                Ok(NumericArray::Uint(Vec::new()))
            }
            other => Err(DlisError::Frame(format!(
                "representation code {other} is not numeric, cannot back a channel array"
            ))),
        }
    }

    /// Number of stored elements
    pub fn len(&self) -> usize {
        match self {
            NumericArray::Float(v) => v.len(),
            NumericArray::Int(v) => v.len(),
            NumericArray::Uint(v) => v.len(),
        }
    }

    /// True when nothing has been decoded into the array
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn clear_and_reserve(&mut self, elements: usize) {
        match self {
            NumericArray::Float(v) => {
                v.clear();
                v.reserve(elements);
            }
            NumericArray::Int(v) => {
                v.clear();
                v.reserve(elements);
            }
            NumericArray::Uint(v) => {
                v.clear();
                v.reserve(elements);
            }
        }
    }

    fn push(&mut self, value: &repcode::Value) -> Result<()> {
        match self {
            NumericArray::Float(v) => v.push(value.as_f64().ok_or_else(|| {
                DlisError::Frame(format!("non-numeric value {value:?} for a float channel"))
            })?),
            NumericArray::Int(v) => v.push(value.as_i64().ok_or_else(|| {
                DlisError::Frame(format!("value {value:?} out of range for a signed channel"))
            })?),
            NumericArray::Uint(v) => v.push(value.as_u64().ok_or_else(|| {
                DlisError::Frame(format!("value {value:?} out of range for an unsigned channel"))
            })?),
        }
        Ok(())
    }

    /// Element as f64, for export and index inspection
    pub fn value_f64(&self, index: usize) -> Option<f64> {
        match self {
            NumericArray::Float(v) => v.get(index).copied(),
            NumericArray::Int(v) => v.get(index).map(|&x| x as f64),
            NumericArray::Uint(v) => v.get(index).map(|&x| x as f64),
        }
    }

    /// Float storage, when the channel is float-backed
    pub fn as_floats(&self) -> Option<&[f64]> {
        match self {
            NumericArray::Float(v) => Some(v),
            _ => None,
        }
    }
}

/// One channel of a FrameArray: schema from its CHANNEL Object plus the
/// array its values decode into
#[derive(Debug, Clone, PartialEq)]
pub struct FrameChannel {
    /// The CHANNEL Object's name
    pub name: ObjectName,
    /// LONG-NAME attribute, empty when unset
    pub long_name: Bytes,
    /// UNITS attribute, empty when unset
    pub units: Bytes,
    /// DIMENSION attribute, `[1]` when unset
    pub dimensions: Vec<u32>,
    /// Representation Code of every element
    pub rep_code: u8,
    /// Decoded values, `count` per frame
    pub array: NumericArray,
}

impl FrameChannel {
    /// Build a channel from its Object in a CHANNEL EFLR
    pub fn from_eflr(
        channels: &ExplicitlyFormattedLogicalRecord,
        name: &ObjectName,
    ) -> Result<Self> {
        if channels.object(name).is_none() {
            return Err(DlisError::Frame(format!(
                "channel {name} is not in the CHANNEL record"
            )));
        }
        let rep_code = channels
            .attribute(name, b"REPRESENTATION-CODE")
            .and_then(|a| a.scalar())
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                DlisError::Frame(format!("channel {name} has no REPRESENTATION-CODE"))
            })? as u8;
        let long_name = channels
            .attribute(name, b"LONG-NAME")
            .and_then(|a| a.scalar())
            .and_then(|v| v.as_bytes())
            .cloned()
            .unwrap_or_default();
        let units = channels
            .attribute(name, b"UNITS")
            .and_then(|a| a.scalar())
            .and_then(|v| v.as_bytes())
            .cloned()
            .unwrap_or_default();
        let dimensions = match channels.attribute(name, b"DIMENSION") {
            Some(attr) if !attr.values.is_empty() => attr
                .values
                .iter()
                .map(|v| {
                    v.as_u64()
                        .and_then(|d| u32::try_from(d).ok())
                        .filter(|&d| d > 0)
                        .ok_or_else(|| {
                            DlisError::Frame(format!("channel {name} has a bad DIMENSION value"))
                        })
                })
                .collect::<Result<Vec<u32>>>()?,
            _ => vec![1],
        };
        Ok(Self {
            name: name.clone(),
            long_name,
            units,
            dimensions,
            rep_code,
            array: NumericArray::for_rep_code(rep_code)?,
        })
    }

    /// Elements per frame, the product of the dimensions
    pub fn count(&self) -> usize {
        self.dimensions.iter().map(|&d| d as usize).product()
    }

    fn read_frame_slice(&mut self, ld: &mut LogicalData) -> Result<()> {
        for _ in 0..self.count() {
            let value = repcode::decode(self.rep_code, ld)?;
            self.array.push(&value)?;
        }
        Ok(())
    }

    /// Skip this channel's bytes for one frame by decoding and discarding.
    /// Variable-length codes have no closed-form byte length, so skipping
    /// is a decode without a store.
    fn skip_frame_slice(&self, ld: &mut LogicalData) -> Result<()> {
        for _ in 0..self.count() {
            repcode::decode(self.rep_code, ld)?;
        }
        Ok(())
    }
}

/// One frame layout and its materialized channel arrays
#[derive(Debug, Clone, PartialEq)]
pub struct FrameArray {
    /// The FRAME Object's name, what FDATA records address
    pub name: ObjectName,
    /// DESCRIPTION attribute, empty when unset
    pub description: Bytes,
    channels: Vec<FrameChannel>,
    channel_map: HashMap<ObjectName, usize>,
    frames_read: usize,
}

impl FrameArray {
    /// Build a FrameArray from one FRAME Object, resolving its CHANNELS
    /// attribute against the CHANNEL EFLR.
    ///
    /// Channel 0 is the index channel and must be a single-element channel
    /// with a fixed-width Representation Code.
    pub fn from_eflrs(
        frame: &ExplicitlyFormattedLogicalRecord,
        channels: &ExplicitlyFormattedLogicalRecord,
        name: &ObjectName,
    ) -> Result<Self> {
        let channel_names = frame
            .attribute(name, b"CHANNELS")
            .filter(|a| !a.values.is_empty())
            .ok_or_else(|| {
                DlisError::Frame(format!("frame {name} has no CHANNELS attribute"))
            })?;
        let description = frame
            .attribute(name, b"DESCRIPTION")
            .and_then(|a| a.scalar())
            .and_then(|v| v.as_bytes())
            .cloned()
            .unwrap_or_default();
        let mut array = Self {
            name: name.clone(),
            description,
            channels: Vec::with_capacity(channel_names.values.len()),
            channel_map: HashMap::new(),
            frames_read: 0,
        };
        for value in &channel_names.values {
            let channel_name = value.as_name().ok_or_else(|| {
                DlisError::Frame(format!("frame {name} CHANNELS holds a non-OBNAME value"))
            })?;
            array.push_channel(FrameChannel::from_eflr(channels, channel_name)?)?;
        }
        let index = &array.channels[0];
        if !repcode::is_fixed_length(index.rep_code) {
            return Err(DlisError::Frame(format!(
                "index channel {} uses variable-length code {}",
                index.name, index.rep_code
            )));
        }
        if index.count() != 1 {
            return Err(DlisError::Frame(format!(
                "index channel {} is not scalar, dimensions {:?}",
                index.name, index.dimensions
            )));
        }
        Ok(array)
    }

    fn push_channel(&mut self, channel: FrameChannel) -> Result<()> {
        if self.channel_map.contains_key(&channel.name) {
            return Err(DlisError::Frame(format!(
                "duplicate channel {} in frame {}",
                channel.name, self.name
            )));
        }
        self.channel_map
            .insert(channel.name.clone(), self.channels.len());
        self.channels.push(channel);
        Ok(())
    }

    /// The channels in frame order, index channel first
    pub fn channels(&self) -> &[FrameChannel] {
        &self.channels
    }

    /// Look up a channel by its Object name
    pub fn channel(&self, name: &ObjectName) -> Option<&FrameChannel> {
        self.channel_map.get(name).map(|&i| &self.channels[i])
    }

    /// Number of frames decoded so far
    pub fn frames_read(&self) -> usize {
        self.frames_read
    }

    /// Drop decoded values and reserve for an expected frame count
    pub fn init_arrays(&mut self, frame_count: usize) {
        for channel in &mut self.channels {
            let elements = frame_count * channel.count();
            channel.array.clear_and_reserve(elements);
        }
        self.frames_read = 0;
    }

    /// Decode one frame, every channel in declared order.
    ///
    /// Residual bytes after the last channel are reported, not fatal; some
    /// legacy producers write frames longer than their declared schema.
    pub fn read_frame(&mut self, ld: &mut LogicalData) -> Result<()> {
        for channel in &mut self.channels {
            channel.read_frame_slice(ld)?;
        }
        self.finish_frame(ld);
        Ok(())
    }

    /// Decode one frame keeping only the channels in `wanted`. The index
    /// channel is always kept; unwanted channels are decoded and discarded
    /// so the cursor still crosses their bytes.
    pub fn read_frame_partial(&mut self, ld: &mut LogicalData, wanted: &[ObjectName]) -> Result<()> {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            if i == 0 || wanted.contains(&channel.name) {
                channel.read_frame_slice(ld)?;
            } else {
                channel.skip_frame_slice(ld)?;
            }
        }
        self.finish_frame(ld);
        Ok(())
    }

    fn finish_frame(&mut self, ld: &LogicalData) {
        self.frames_read += 1;
        if ld.remaining() != 0 {
            warn!(
                frame = %self.name,
                residual = ld.remaining(),
                "unconsumed bytes after decoding all channels of a frame"
            );
        }
    }
}

/// All FrameArrays of one acquisition run, keyed by FRAME Object name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogPass {
    frame_arrays: Vec<FrameArray>,
    map: HashMap<ObjectName, usize>,
}

impl LogPass {
    /// Build a LogPass from the FRAME and CHANNEL EFLRs of one Logical File.
    ///
    /// Both records are checked for the expected Set Type and Logical Record
    /// type before any Object is consulted.
    pub fn from_eflrs(
        frame: &ExplicitlyFormattedLogicalRecord,
        channels: &ExplicitlyFormattedLogicalRecord,
    ) -> Result<Self> {
        Self::check_record(frame, SET_TYPE_FRAME, LR_TYPE_FRAME)?;
        Self::check_record(channels, SET_TYPE_CHANNEL, LR_TYPE_CHANNEL)?;
        let mut log_pass = Self::default();
        for object in frame.objects() {
            let array = FrameArray::from_eflrs(frame, channels, &object.name)?;
            // Object names are unique per EFLR, so no duplicate check here.
            log_pass.map.insert(object.name.clone(), log_pass.frame_arrays.len());
            log_pass.frame_arrays.push(array);
        }
        Ok(log_pass)
    }

    fn check_record(
        eflr: &ExplicitlyFormattedLogicalRecord,
        set_type: &[u8],
        lr_type: u8,
    ) -> Result<()> {
        if eflr.set.set_type.as_ref() != set_type {
            return Err(DlisError::Frame(format!(
                "expected a {} record, got Set Type {:?}",
                String::from_utf8_lossy(set_type),
                String::from_utf8_lossy(&eflr.set.set_type)
            )));
        }
        if eflr.lr_type != lr_type {
            return Err(DlisError::Frame(format!(
                "{} record framed with Logical Record type {}, expected {lr_type}",
                String::from_utf8_lossy(set_type),
                eflr.lr_type
            )));
        }
        Ok(())
    }

    /// The FrameArrays in declaration order
    pub fn frame_arrays(&self) -> &[FrameArray] {
        &self.frame_arrays
    }

    /// Mutable view of every FrameArray, for array initialization
    pub fn frame_arrays_mut(&mut self) -> &mut [FrameArray] {
        &mut self.frame_arrays
    }

    /// True when the FRAME record declared no frames
    pub fn is_empty(&self) -> bool {
        self.frame_arrays.is_empty()
    }

    /// Number of FrameArrays
    pub fn len(&self) -> usize {
        self.frame_arrays.len()
    }

    /// Look up a FrameArray by FRAME Object name
    pub fn frame_array(&self, name: &ObjectName) -> Option<&FrameArray> {
        self.map.get(name).map(|&i| &self.frame_arrays[i])
    }

    /// Mutable lookup, for decoding IFLRs into the arrays
    pub fn frame_array_mut(&mut self, name: &ObjectName) -> Option<&mut FrameArray> {
        self.map.get(name).map(|&i| &mut self.frame_arrays[i])
    }

    /// Decode one FDATA record into its FrameArray. The IFLR preamble has
    /// already positioned the cursor on the first channel value.
    pub fn read_iflr(
        &mut self,
        iflr: &IndirectlyFormattedLogicalRecord,
        ld: &mut LogicalData,
    ) -> Result<()> {
        let array = self.frame_array_mut(&iflr.object_name).ok_or_else(|| {
            DlisError::Frame(format!(
                "FDATA addresses unknown frame {}",
                iflr.object_name
            ))
        })?;
        array.read_frame(ld)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repcode::{RC_FSINGL, RC_IDENT, RC_UNORM, RC_USHORT};

    // Minimal CHANNEL EFLR: template LONG-NAME/REPRESENTATION-CODE/UNITS/
    // DIMENSION, two channels DEPT (FSINGL) and SPD (UNORM, 2 elements).
    fn channel_eflr() -> ExplicitlyFormattedLogicalRecord {
        let mut by = Vec::new();
        by.push(0xf0); // SET with T
        by.extend_from_slice(b"\x07CHANNEL");
        for label in [
            b"\x09LONG-NAME".as_ref(),
            b"\x13REPRESENTATION-CODE".as_ref(),
            b"\x05UNITS".as_ref(),
            b"\x09DIMENSION".as_ref(),
        ] {
            by.push(0x30); // ATTRIB: L
            by.extend_from_slice(label);
        }
        // DEPT
        by.push(0x70);
        by.extend_from_slice(b"\x01\x00\x04DEPT");
        by.push(0x21);
        by.extend_from_slice(b"\x0ddepth of tool");
        by.push(0x25); // R V: USHORT rep code value
        by.push(RC_USHORT);
        by.push(RC_FSINGL);
        by.push(0x21);
        by.extend_from_slice(b"\x01m");
        by.push(0x00); // DIMENSION absent, defaults to [1]
        // SPD
        by.push(0x70);
        by.extend_from_slice(b"\x01\x00\x03SPD");
        by.push(0x00);
        by.push(0x25);
        by.push(RC_USHORT);
        by.push(RC_UNORM);
        by.push(0x00);
        by.push(0x25); // DIMENSION as USHORT values, count 1 kept
        by.push(RC_USHORT);
        by.push(2);
        let mut ld = LogicalData::from_slice(&by);
        ExplicitlyFormattedLogicalRecord::parse(LR_TYPE_CHANNEL, &mut ld).unwrap()
    }

    fn frame_eflr() -> ExplicitlyFormattedLogicalRecord {
        let mut by = Vec::new();
        by.push(0xf0);
        by.extend_from_slice(b"\x05FRAME");
        by.push(0x30);
        by.extend_from_slice(b"\x0bDESCRIPTION");
        by.push(0x30);
        by.extend_from_slice(b"\x08CHANNELS");
        by.push(0x70);
        by.extend_from_slice(b"\x01\x00\x020B");
        by.push(0x00);
        by.push(0x2d); // C R V: two OBNAME values
        by.push(0x02); // count
        by.push(23); // OBNAME rep code
        by.extend_from_slice(b"\x01\x00\x04DEPT");
        by.extend_from_slice(b"\x01\x00\x03SPD");
        let mut ld = LogicalData::from_slice(&by);
        ExplicitlyFormattedLogicalRecord::parse(LR_TYPE_FRAME, &mut ld).unwrap()
    }

    fn frame_bytes(depth: f32, speeds: [u16; 2]) -> Vec<u8> {
        let mut by = Vec::new();
        by.extend_from_slice(&depth.to_be_bytes());
        for speed in speeds {
            by.extend_from_slice(&speed.to_be_bytes());
        }
        by
    }

    #[test]
    fn test_log_pass_construction() {
        let log_pass = LogPass::from_eflrs(&frame_eflr(), &channel_eflr()).unwrap();
        assert_eq!(log_pass.len(), 1);
        let array = log_pass
            .frame_array(&ObjectName::new(1, 0, b"0B"))
            .unwrap();
        assert_eq!(array.channels().len(), 2);
        let dept = &array.channels()[0];
        assert_eq!(dept.rep_code, RC_FSINGL);
        assert_eq!(dept.long_name.as_ref(), b"depth of tool");
        assert_eq!(dept.units.as_ref(), b"m");
        assert_eq!(dept.count(), 1);
        let spd = &array.channels()[1];
        assert_eq!(spd.dimensions, vec![2]);
        assert_eq!(spd.count(), 2);
    }

    #[test]
    fn test_read_frames() {
        let mut log_pass = LogPass::from_eflrs(&frame_eflr(), &channel_eflr()).unwrap();
        let name = ObjectName::new(1, 0, b"0B");
        log_pass.frame_array_mut(&name).unwrap().init_arrays(2);
        for (i, depth) in [100.5f32, 101.0].into_iter().enumerate() {
            let mut ld = LogicalData::from_slice(&frame_bytes(depth, [i as u16, 10 + i as u16]));
            log_pass
                .frame_array_mut(&name)
                .unwrap()
                .read_frame(&mut ld)
                .unwrap();
        }
        let array = log_pass.frame_array(&name).unwrap();
        assert_eq!(array.frames_read(), 2);
        assert_eq!(array.channels()[0].array.as_floats(), Some(&[100.5, 101.0][..]));
        assert_eq!(array.channels()[1].array.len(), 4);
        assert_eq!(array.channels()[1].array.value_f64(3), Some(11.0));
    }

    #[test]
    fn test_partial_read_keeps_index_channel() {
        let mut log_pass = LogPass::from_eflrs(&frame_eflr(), &channel_eflr()).unwrap();
        let name = ObjectName::new(1, 0, b"0B");
        let array = log_pass.frame_array_mut(&name).unwrap();
        array.init_arrays(1);
        let mut ld = LogicalData::from_slice(&frame_bytes(55.0, [1, 2]));
        array.read_frame_partial(&mut ld, &[]).unwrap();
        assert_eq!(ld.remaining(), 0);
        assert_eq!(array.channels()[0].array.len(), 1);
        assert!(array.channels()[1].array.is_empty());
    }

    #[test]
    fn test_truncated_frame_is_eof() {
        let mut log_pass = LogPass::from_eflrs(&frame_eflr(), &channel_eflr()).unwrap();
        let name = ObjectName::new(1, 0, b"0B");
        let array = log_pass.frame_array_mut(&name).unwrap();
        let mut ld = LogicalData::from_slice(&frame_bytes(55.0, [1, 2])[..5]);
        assert!(array.read_frame(&mut ld).unwrap_err().is_eof());
    }

    #[test]
    fn test_index_channel_must_be_fixed_width_scalar() {
        // Swap the frame's channel order so the 2-element channel leads.
        let mut by = Vec::new();
        by.push(0xf0);
        by.extend_from_slice(b"\x05FRAME");
        by.push(0x30);
        by.extend_from_slice(b"\x08CHANNELS");
        by.push(0x70);
        by.extend_from_slice(b"\x01\x00\x020B");
        by.push(0x2d);
        by.push(0x02);
        by.push(23);
        by.extend_from_slice(b"\x01\x00\x03SPD");
        by.extend_from_slice(b"\x01\x00\x04DEPT");
        let mut ld = LogicalData::from_slice(&by);
        let frame = ExplicitlyFormattedLogicalRecord::parse(LR_TYPE_FRAME, &mut ld).unwrap();
        assert!(matches!(
            LogPass::from_eflrs(&frame, &channel_eflr()),
            Err(DlisError::Frame(_))
        ));
    }

    #[test]
    fn test_wrong_set_type_rejected() {
        assert!(matches!(
            LogPass::from_eflrs(&channel_eflr(), &channel_eflr()),
            Err(DlisError::Frame(_))
        ));
    }

    #[test]
    fn test_unknown_fdata_target() {
        let mut log_pass = LogPass::from_eflrs(&frame_eflr(), &channel_eflr()).unwrap();
        let mut ld = LogicalData::from_slice(b"\x02\x00\x02XX\x01");
        let iflr = IndirectlyFormattedLogicalRecord::parse(&mut ld).unwrap();
        assert!(matches!(
            log_pass.read_iflr(&iflr, &mut ld),
            Err(DlisError::Frame(_))
        ));
    }

    #[test]
    fn test_non_numeric_channel_rejected() {
        assert!(NumericArray::for_rep_code(RC_IDENT).is_err());
    }
}
