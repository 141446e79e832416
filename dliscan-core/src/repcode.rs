//! Representation Code codec [RP66V1 Appendix B]
//!
//! One decode function per supported code, a dispatch from the integer code
//! to the function, and length-only probes for the variable-length codes used
//! by lookahead logic. Codes not seen in practice (FSHORT, the validated and
//! complex floats, ATTREF) are unsupported and decode to a typed error.
//!
//! ```text
//! 2  FSINGL  4        IEEE single precision floating point
//! 5  ISINGL  4        IBM 360 single precision floating point
//! 6  VSINGL  4        VAX single precision floating point
//! 7  FDOUBL  8        IEEE double precision floating point
//! 12 SSHORT  1        Short signed integer
//! 13 SNORM   2        Normal signed integer
//! 14 SLONG   4        Long signed integer
//! 15 USHORT  1        Short unsigned integer
//! 16 UNORM   2        Normal unsigned integer
//! 17 ULONG   4        Long unsigned integer
//! 18 UVARI   1, 2, 4  Variable-length unsigned integer
//! 19 IDENT   V        Variable-length identifier
//! 20 ASCII   V        Variable-length character string
//! 21 DTIME   8        Date and time
//! 22 ORIGIN  V        Origin reference (a UVARI)
//! 23 OBNAME  V        Object name
//! 24 OBJREF  V        Object reference
//! 26 STATUS  1        Boolean status
//! 27 UNITS   V        Units expression
//! ```

use crate::error::DlisError;
use crate::logical_data::LogicalData;
use crate::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Code 2, IEEE single precision float
pub const RC_FSINGL: u8 = 2;
/// Code 5, IBM 360 single precision float
pub const RC_ISINGL: u8 = 5;
/// Code 6, VAX single precision float
pub const RC_VSINGL: u8 = 6;
/// Code 7, IEEE double precision float
pub const RC_FDOUBL: u8 = 7;
/// Code 12, signed 1-byte integer
pub const RC_SSHORT: u8 = 12;
/// Code 13, signed 2-byte integer
pub const RC_SNORM: u8 = 13;
/// Code 14, signed 4-byte integer
pub const RC_SLONG: u8 = 14;
/// Code 15, unsigned 1-byte integer
pub const RC_USHORT: u8 = 15;
/// Code 16, unsigned 2-byte integer
pub const RC_UNORM: u8 = 16;
/// Code 17, unsigned 4-byte integer
pub const RC_ULONG: u8 = 17;
/// Code 18, variable-length unsigned integer
pub const RC_UVARI: u8 = 18;
/// Code 19, length-prefixed identifier
pub const RC_IDENT: u8 = 19;
/// Code 20, UVARI-length-prefixed string
pub const RC_ASCII: u8 = 20;
/// Code 21, calendar timestamp
pub const RC_DTIME: u8 = 21;
/// Code 22, origin reference, a UVARI alias
pub const RC_ORIGIN: u8 = 22;
/// Code 23, compound object name
pub const RC_OBNAME: u8 = 23;
/// Code 24, object reference
pub const RC_OBJREF: u8 = 24;
/// Code 26, boolean-as-byte
pub const RC_STATUS: u8 = 26;
/// Code 27, units expression
pub const RC_UNITS: u8 = 27;

/// Codes acceptable for an index channel: numeric, scalar and fixed width.
/// [RP66V1 Section 5.7.1 Frame Objects, Figure 5-8, Comment 2]
pub const SCALAR_CODES: [u8; 10] = [
    RC_FSINGL, RC_ISINGL, RC_VSINGL, RC_FDOUBL, RC_SSHORT, RC_SNORM, RC_SLONG, RC_USHORT,
    RC_UNORM, RC_ULONG,
];

/// Length in bytes of a fixed-width code, or an error for variable-length and
/// unsupported codes.
pub fn fixed_length(rep_code: u8) -> Result<usize> {
    match rep_code {
        RC_FSINGL | RC_ISINGL | RC_VSINGL | RC_SLONG | RC_ULONG => Ok(4),
        RC_FDOUBL | RC_DTIME => Ok(8),
        RC_SSHORT | RC_USHORT | RC_STATUS => Ok(1),
        RC_SNORM | RC_UNORM => Ok(2),
        _ => Err(DlisError::NotFixedLength(rep_code)),
    }
}

/// True if the code is fixed width
pub fn is_fixed_length(rep_code: u8) -> bool {
    fixed_length(rep_code).is_ok()
}

/// A decoded value of any supported Representation Code
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// FSINGL, ISINGL or VSINGL
    Single(f32),
    /// FDOUBL
    Double(f64),
    /// SSHORT, SNORM or SLONG
    Int(i64),
    /// USHORT, UNORM, ULONG, UVARI or ORIGIN
    Uint(u64),
    /// IDENT
    Ident(Bytes),
    /// ASCII
    Ascii(Bytes),
    /// DTIME
    DateTime(DateTime),
    /// OBNAME
    Name(ObjectName),
    /// OBJREF
    Reference(ObjectReference),
    /// STATUS
    Status(bool),
    /// UNITS
    Units(Bytes),
}

impl Value {
    /// Numeric view as f64, exact for every numeric variant that fits
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Single(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Uint(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Signed integer view
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Uint(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Unsigned integer view
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            Value::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// String-ish view: IDENT, ASCII and UNITS payloads
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Ident(b) | Value::Ascii(b) | Value::Units(b) => Some(b),
            _ => None,
        }
    }

    /// OBNAME view
    pub fn as_name(&self) -> Option<&ObjectName> {
        match self {
            Value::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Compound (origin, copy, identifier) key naming an EFLR Object.
///
/// Ordering is by origin, then copy number, then identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectName {
    /// Origin reference, an ORIGIN (UVARI)
    pub origin: u32,
    /// Copy number, a USHORT
    pub copy: u8,
    /// Identifier, an IDENT
    pub identifier: Vec<u8>,
}

impl ObjectName {
    /// Construct from parts
    pub fn new(origin: u32, copy: u8, identifier: &[u8]) -> Self {
        Self {
            origin,
            copy,
            identifier: identifier.to_vec(),
        }
    }
}

impl std::fmt::Display for ObjectName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "OBNAME: O: {} C: {} I: {}",
            self.origin,
            self.copy,
            String::from_utf8_lossy(&self.identifier)
        )
    }
}

/// Code 24, OBJREF: an object type IDENT plus an OBNAME
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectReference {
    /// Object type
    pub object_type: Bytes,
    /// Object name
    pub name: ObjectName,
}

/// Code 21, DTIME calendar timestamp.
///
/// `tz`: 0 = Local Standard, 1 = Local Daylight Savings, 2 = Greenwich Mean
/// Time. The year on the wire is an offset from 1900.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTime {
    /// Full year, wire value + 1900
    pub year: u16,
    /// Time zone nibble
    pub tz: u8,
    /// Month 1-12
    pub month: u8,
    /// Day of month
    pub day: u8,
    /// Hour
    pub hour: u8,
    /// Minute
    pub minute: u8,
    /// Second
    pub second: u8,
    /// Millisecond
    pub millisecond: u16,
}

impl std::fmt::Display for DateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tz = match self.tz {
            0 => " STD",
            1 => " DST",
            2 => " GMT",
            _ => "",
        };
        write!(
            f,
            "{}-{:02}-{:02} {:02}:{:02}:{:02}.{:03}{}",
            self.year, self.month, self.day, self.hour, self.minute, self.second,
            self.millisecond, tz
        )
    }
}

/// Code 2, IEEE single precision big-endian
pub fn fsingl(ld: &mut LogicalData) -> Result<f32> {
    let by = ld.read_chunk(4)?;
    Ok(f32::from_be_bytes([by[0], by[1], by[2], by[3]]))
}

/// Code 5, IBM 360 single precision: sign bit, base-16 exponent biased by 64,
/// 24-bit fraction
pub fn isingl(ld: &mut LogicalData) -> Result<f32> {
    let by = ld.read_chunk(4)?;
    let sign = by[0] & 0x80 != 0;
    let exp = i32::from(by[0] & 0x7f);
    let mantissa = (u32::from(by[1]) << 16) | (u32::from(by[2]) << 8) | u32::from(by[3]);
    let m = f64::from(mantissa) / f64::from(0x100_0000);
    let value = m * 16f64.powi(exp - 64);
    Ok(if sign { -value as f32 } else { value as f32 })
}

/// Code 6, VAX single precision: split sign/exponent/fraction with the
/// 16-bit words swapped relative to IEEE
pub fn vsingl(ld: &mut LogicalData) -> Result<f32> {
    let by = ld.read_chunk(4)?;
    let sign = by[1] & 0x80 != 0;
    let mantissa = (u32::from(by[0] & 0x7f) << 16) | (u32::from(by[3]) << 8) | u32::from(by[2]);
    let exp = (u32::from(by[1] & 0x7f) << 1) | (u32::from(by[0] & 0x80) >> 7);
    if exp == 0 && !sign {
        // Fraction is arbitrary for the true zero encoding.
        return Ok(0.0);
    }
    let m = f64::from(mantissa) / f64::from(1u32 << 23);
    let value = (0.5 + m) * 2f64.powi(exp as i32 - 128);
    Ok(if sign { -value as f32 } else { value as f32 })
}

/// Code 7, IEEE double precision big-endian
pub fn fdoubl(ld: &mut LogicalData) -> Result<f64> {
    let by = ld.read_chunk(8)?;
    Ok(f64::from_be_bytes([
        by[0], by[1], by[2], by[3], by[4], by[5], by[6], by[7],
    ]))
}

/// Code 12, signed 1-byte integer
pub fn sshort(ld: &mut LogicalData) -> Result<i8> {
    Ok(ld.read_byte()? as i8)
}

/// Code 13, signed 2-byte big-endian integer
pub fn snorm(ld: &mut LogicalData) -> Result<i16> {
    let by = ld.read_chunk(2)?;
    Ok(i16::from_be_bytes([by[0], by[1]]))
}

/// Code 14, signed 4-byte big-endian integer
pub fn slong(ld: &mut LogicalData) -> Result<i32> {
    let by = ld.read_chunk(4)?;
    Ok(i32::from_be_bytes([by[0], by[1], by[2], by[3]]))
}

/// Code 15, unsigned 1-byte integer
pub fn ushort(ld: &mut LogicalData) -> Result<u8> {
    ld.read_byte()
}

/// Code 16, unsigned 2-byte big-endian integer
pub fn unorm(ld: &mut LogicalData) -> Result<u16> {
    let by = ld.read_chunk(2)?;
    Ok(u16::from_be_bytes([by[0], by[1]]))
}

/// Code 17, unsigned 4-byte big-endian integer
pub fn ulong(ld: &mut LogicalData) -> Result<u32> {
    let by = ld.read_chunk(4)?;
    Ok(u32::from_be_bytes([by[0], by[1], by[2], by[3]]))
}

/// Code 18, variable-length unsigned integer.
///
/// The top two bits of the first byte select the width: `10` is two bytes,
/// `11` is four bytes, anything else one byte. The selector bits are masked
/// out of the value, so the range is 0 to 2^30 - 1.
pub fn uvari(ld: &mut LogicalData) -> Result<u32> {
    let first = ld.read_byte()?;
    match first & 0xc0 {
        0x80 => {
            let mut value = u32::from(first & 0x7f);
            value <<= 8;
            value |= u32::from(ld.read_byte()?);
            Ok(value)
        }
        0xc0 => {
            let mut value = u32::from(first & 0x3f);
            for _ in 0..3 {
                value <<= 8;
                value |= u32::from(ld.read_byte()?);
            }
            Ok(value)
        }
        _ => Ok(u32::from(first)),
    }
}

/// Number of bytes a UVARI at `offset` would consume, or 0 when the first
/// byte is beyond the end. Never panics on truncated input.
pub fn uvari_len(by: &[u8], offset: usize) -> usize {
    match by.get(offset) {
        None => 0,
        Some(first) => match first & 0xc0 {
            0x80 => 2,
            0xc0 => 4,
            _ => 1,
        },
    }
}

fn pascal_string(ld: &mut LogicalData) -> Result<Bytes> {
    let size = usize::from(ld.read_byte()?);
    ld.read_chunk(size)
}

/// Code 19, length-prefixed identifier, up to 255 bytes
pub fn ident(ld: &mut LogicalData) -> Result<Bytes> {
    pascal_string(ld)
}

/// Number of bytes an IDENT at `offset` would consume, or 0 when the length
/// byte is beyond the end
pub fn ident_len(by: &[u8], offset: usize) -> usize {
    match by.get(offset) {
        None => 0,
        Some(length) => 1 + usize::from(*length),
    }
}

/// Code 20, UVARI-length-prefixed string, up to 2^30 - 1 bytes
pub fn ascii(ld: &mut LogicalData) -> Result<Bytes> {
    let size = uvari(ld)? as usize;
    ld.read_chunk(size)
}

/// Code 21, calendar timestamp, 8 bytes
pub fn dtime(ld: &mut LogicalData) -> Result<DateTime> {
    let year = u16::from(ushort(ld)?) + 1900;
    let tz_month = ld.read_byte()?;
    Ok(DateTime {
        year,
        tz: (tz_month >> 4) & 0x0f,
        month: tz_month & 0x0f,
        day: ushort(ld)?,
        hour: ushort(ld)?,
        minute: ushort(ld)?,
        second: ushort(ld)?,
        millisecond: unorm(ld)?,
    })
}

/// Code 22, ORIGIN, an alias for UVARI
pub fn origin(ld: &mut LogicalData) -> Result<u32> {
    uvari(ld)
}

/// Code 23, OBNAME: ORIGIN + USHORT copy + IDENT, read in that fixed order
pub fn obname(ld: &mut LogicalData) -> Result<ObjectName> {
    let origin = origin(ld)?;
    let copy = ushort(ld)?;
    let identifier = ident(ld)?;
    Ok(ObjectName {
        origin,
        copy,
        identifier: identifier.to_vec(),
    })
}

/// Number of bytes an OBNAME at `offset` would consume, or 0 when any of its
/// three parts is beyond the end
pub fn obname_len(by: &[u8], offset: usize) -> usize {
    let origin_len = uvari_len(by, offset);
    if origin_len == 0 {
        return 0;
    }
    // Copy number is a USHORT.
    let head = origin_len + 1;
    if by.len() < offset + head {
        return 0;
    }
    let ident_len = ident_len(by, offset + head);
    if ident_len == 0 {
        return 0;
    }
    head + ident_len
}

/// Code 24, OBJREF: an IDENT object type plus an OBNAME
pub fn objref(ld: &mut LogicalData) -> Result<ObjectReference> {
    let object_type = ident(ld)?;
    let name = obname(ld)?;
    Ok(ObjectReference { object_type, name })
}

/// Code 26, boolean status byte
pub fn status(ld: &mut LogicalData) -> Result<bool> {
    Ok(ld.read_byte()? != 0)
}

/// Code 27, units expression. [RP66V1 Appendix B, B.27] restricts the
/// character set; offending producers are common so a violation only warns.
pub fn units(ld: &mut LogicalData) -> Result<Bytes> {
    let value = pascal_string(ld)?;
    if !value.iter().all(|&c| {
        c.is_ascii_alphanumeric() || matches!(c, b' ' | b'-' | b'.' | b'/' | b'(' | b')' | b'%')
    }) {
        warn!(
            "UNITS {:?} contains characters outside the RP66V1 allowed set",
            String::from_utf8_lossy(&value)
        );
    }
    Ok(value)
}

/// Decode one value of the given Representation Code from the Logical Data.
///
/// Unsupported and out-of-range codes are a single structurally-enforced
/// error path, not a lookup miss.
pub fn decode(rep_code: u8, ld: &mut LogicalData) -> Result<Value> {
    match rep_code {
        RC_FSINGL => Ok(Value::Single(fsingl(ld)?)),
        RC_ISINGL => Ok(Value::Single(isingl(ld)?)),
        RC_VSINGL => Ok(Value::Single(vsingl(ld)?)),
        RC_FDOUBL => Ok(Value::Double(fdoubl(ld)?)),
        RC_SSHORT => Ok(Value::Int(i64::from(sshort(ld)?))),
        RC_SNORM => Ok(Value::Int(i64::from(snorm(ld)?))),
        RC_SLONG => Ok(Value::Int(i64::from(slong(ld)?))),
        RC_USHORT => Ok(Value::Uint(u64::from(ushort(ld)?))),
        RC_UNORM => Ok(Value::Uint(u64::from(unorm(ld)?))),
        RC_ULONG => Ok(Value::Uint(u64::from(ulong(ld)?))),
        RC_UVARI => Ok(Value::Uint(u64::from(uvari(ld)?))),
        RC_IDENT => Ok(Value::Ident(ident(ld)?)),
        RC_ASCII => Ok(Value::Ascii(ascii(ld)?)),
        RC_DTIME => Ok(Value::DateTime(dtime(ld)?)),
        RC_ORIGIN => Ok(Value::Uint(u64::from(origin(ld)?))),
        RC_OBNAME => Ok(Value::Name(obname(ld)?)),
        RC_OBJREF => Ok(Value::Reference(objref(ld)?)),
        RC_STATUS => Ok(Value::Status(status(ld)?)),
        RC_UNITS => Ok(Value::Units(units(ld)?)),
        other => Err(DlisError::UnsupportedRepCode(other)),
    }
}

/// Encode a UVARI in its shortest form. Values above 2^30 - 1 do not fit.
pub fn encode_uvari(value: u32, out: &mut Vec<u8>) -> Result<()> {
    if value < 0x80 {
        out.push(value as u8);
    } else if value < 0x4000 {
        out.extend_from_slice(&(value as u16 | 0x8000).to_be_bytes());
    } else if value < 0x4000_0000 {
        out.extend_from_slice(&(value | 0xc000_0000).to_be_bytes());
    } else {
        return Err(DlisError::Schema(format!("UVARI value {value} out of range")));
    }
    Ok(())
}

/// Encode an IDENT. Identifiers longer than 255 bytes do not fit.
pub fn encode_ident(value: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let length = u8::try_from(value.len())
        .map_err(|_| DlisError::Schema(format!("IDENT length {} out of range", value.len())))?;
    out.push(length);
    out.extend_from_slice(value);
    Ok(())
}

/// Encode a fixed-width numeric value, the inverse of `decode` for the
/// round-trippable codes. Test and fixture support.
pub fn encode_fixed(rep_code: u8, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match (rep_code, value) {
        (RC_FSINGL, Value::Single(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (RC_FDOUBL, Value::Double(v)) => out.extend_from_slice(&v.to_be_bytes()),
        (RC_SSHORT, Value::Int(v)) => out.push(*v as i8 as u8),
        (RC_SNORM, Value::Int(v)) => out.extend_from_slice(&(*v as i16).to_be_bytes()),
        (RC_SLONG, Value::Int(v)) => out.extend_from_slice(&(*v as i32).to_be_bytes()),
        (RC_USHORT, Value::Uint(v)) => out.push(*v as u8),
        (RC_UNORM, Value::Uint(v)) => out.extend_from_slice(&(*v as u16).to_be_bytes()),
        (RC_ULONG, Value::Uint(v)) => out.extend_from_slice(&(*v as u32).to_be_bytes()),
        (code, _) => return Err(DlisError::NotFixedLength(code)),
    }
    Ok(())
}
