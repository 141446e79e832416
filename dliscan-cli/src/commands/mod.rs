//! Subcommand implementations and shared rendering helpers.

pub mod curves;
pub mod dump;
pub mod scan;

use dliscan_core::repcode::Value;

/// Render a decoded value for table output. Strings come out quoted,
/// non-printable string payloads fall back to hex.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::Single(v) => format!("{v}"),
        Value::Double(v) => format!("{v}"),
        Value::Int(v) => format!("{v}"),
        Value::Uint(v) => format!("{v}"),
        Value::Ident(b) | Value::Ascii(b) | Value::Units(b) => render_bytes(b),
        Value::DateTime(dt) => format!("{dt}"),
        Value::Name(name) => format!("{name}"),
        Value::Reference(r) => format!("OBJREF: {} {}", render_bytes(&r.object_type), r.name),
        Value::Status(v) => format!("{v}"),
    }
}

/// A decoded value as JSON, preserving numeric types where possible
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Single(v) => serde_json::json!(v),
        Value::Double(v) => serde_json::json!(v),
        Value::Int(v) => serde_json::json!(v),
        Value::Uint(v) => serde_json::json!(v),
        Value::Status(v) => serde_json::json!(v),
        other => serde_json::json!(render_value(other)),
    }
}

fn render_bytes(by: &[u8]) -> String {
    if by.iter().all(|&b| (0x20..0x7f).contains(&b)) {
        format!("'{}'", String::from_utf8_lossy(by))
    } else {
        format!("0x{}", hex::encode(by))
    }
}
