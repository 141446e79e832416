//! Owned, bounds-checked byte buffer with a forward-only read cursor
//!
//! One `LogicalData` holds the reassembled payload of exactly one Logical
//! Record. All consuming reads fail with an EOF-kind error when fewer bytes
//! remain than requested; nothing here panics on truncated input.

use crate::error::DlisError;
use crate::Result;
use bytes::Bytes;

/// Logical Data of one Logical Record with a read cursor over it
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalData {
    bytes: Bytes,
    index: usize,
}

impl LogicalData {
    /// Wrap a complete Logical Record payload
    pub fn new(bytes: Bytes) -> Self {
        Self { bytes, index: 0 }
    }

    /// Wrap a byte slice, copying it
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(Bytes::copy_from_slice(bytes))
    }

    /// Total payload length, independent of the cursor
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if the payload is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Current cursor index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of unread bytes
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.index
    }

    /// Return the next byte without advancing the cursor.
    ///
    /// The EFLR parser relies on this to decide whether the next component is
    /// a Template Attribute or the start of the first Object.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.remaining() == 0 {
            return Err(DlisError::Eof {
                wanted: 1,
                remaining: 0,
            });
        }
        Ok(self.bytes[self.index])
    }

    /// Read one byte and advance the cursor
    pub fn read_byte(&mut self) -> Result<u8> {
        let byte = self.peek_byte()?;
        self.index += 1;
        Ok(byte)
    }

    /// Read `length` bytes and advance the cursor.
    ///
    /// The returned `Bytes` shares the underlying buffer, no copy.
    pub fn read_chunk(&mut self, length: usize) -> Result<Bytes> {
        if self.remaining() < length {
            return Err(DlisError::Eof {
                wanted: length,
                remaining: self.remaining(),
            });
        }
        let chunk = self.bytes.slice(self.index..self.index + length);
        self.index += length;
        Ok(chunk)
    }

    /// Advance the cursor by `length` bytes without returning them
    pub fn skip(&mut self, length: usize) -> Result<()> {
        if self.remaining() < length {
            return Err(DlisError::Eof {
                wanted: length,
                remaining: self.remaining(),
            });
        }
        self.index += length;
        Ok(())
    }

    /// Reset the cursor to the start of the payload
    pub fn rewind(&mut self) {
        self.index = 0;
    }

    /// View the unread bytes without advancing the cursor
    pub fn view_remaining(&self) -> &[u8] {
        &self.bytes[self.index..]
    }

    /// The whole payload, independent of the cursor
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}
