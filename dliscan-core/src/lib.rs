//! # Dliscan Core
//!
//! A decoder for RP66V1 (DLIS), the self-describing binary format used to
//! store well-logging measurements. Turns a raw byte stream into typed,
//! queryable records and numeric channel arrays.
//!
//! ## Modules
//!
//! - `constants`: Format constants and segment attribute bits
//! - `logical_data`: Bounds-checked byte cursor over one Logical Record
//! - `repcode`: Representation Code codec, the primitive wire types
//! - `descriptor`: Component Descriptor bit-flag layer
//! - `framing`: Visible Record / segment reading and record reassembly
//! - `eflr`: Set/Template/Object parser for explicitly formatted records
//! - `iflr`: FDATA preamble for indirectly formatted records
//! - `logpass`: Frame/Channel model materializing numeric curves

#![warn(missing_docs)]

pub mod constants;
pub mod descriptor;
pub mod eflr;
pub mod error;
pub mod framing;
pub mod iflr;
pub mod logical_data;
pub mod logpass;
pub mod repcode;

// Re-export commonly used types
pub use eflr::ExplicitlyFormattedLogicalRecord;
pub use error::DlisError;
pub use framing::{RawLogicalRecord, RecordReader, StorageUnitLabel};
pub use iflr::IndirectlyFormattedLogicalRecord;
pub use logical_data::LogicalData;
pub use logpass::{FrameArray, FrameChannel, LogPass};
pub use repcode::{ObjectName, Value};

/// Result type alias for DLIS decode operations
pub type Result<T> = std::result::Result<T, DlisError>;
