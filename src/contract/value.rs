use std::fmt;

use alloy::dyn_abi::DynSolValue;
use alloy::primitives::{Address, B256};

/// A single decoded event argument.
///
/// Topic words and unpacked data values both end up here. Every variant
/// renders through `Display`.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedValue {
    Text(String),
    Address(Address),
    /// Raw 32-byte topic word of an indexed argument with no fixed-width mapping.
    Word(B256),
    Abi(DynSolValue),
}

impl From<DynSolValue> for DecodedValue {
    fn from(value: DynSolValue) -> Self {
        match value {
            DynSolValue::String(s) => DecodedValue::Text(s),
            DynSolValue::Address(addr) => DecodedValue::Address(addr),
            other => DecodedValue::Abi(other),
        }
    }
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Text(s) => f.write_str(s),
            DecodedValue::Address(addr) => f.write_str(&addr.to_checksum(None)),
            DecodedValue::Word(word) => write!(f, "0x{}", hex::encode(word)),
            DecodedValue::Abi(value) => f.write_str(&render_abi(value)),
        }
    }
}

/// Canonical display string used for the stored argument columns.
pub fn format_value(value: &DecodedValue) -> String {
    value.to_string()
}

fn render_abi(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Bytes(bytes) => format!("0x{}", hex::encode(bytes)),
        DynSolValue::Address(addr) => addr.to_checksum(None),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            let rendered: Vec<String> = items.iter().map(render_abi).collect();
            format!("[{}]", rendered.join(", "))
        }
        DynSolValue::Tuple(items) => {
            let rendered: Vec<String> = items.iter().map(render_abi).collect();
            format!("({})", rendered.join(", "))
        }
        _ => format!("{:?}", value),
    }
}
