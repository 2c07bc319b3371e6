//! Attribute codec
//!
//! Encoding and decoding between semantic values and wire attributes.
//!
//! Integer payloads are stored little-endian regardless of host byte
//! order, so the on-wire representation is identical across hosts. The
//! decode side reverses the conversion and validates payload shape
//! instead of reinterpreting memory blindly.

use std::collections::BTreeMap;

use bytes::Bytes;

use crate::error::{OrbitError, Result};

use super::{AttrType, Value, WireAttribute};

/// Integer payloads are always exactly this many bytes.
pub const INT64_PAYLOAD_LEN: usize = 8;

// =============================================================================
// Single-value Encoding/Decoding
// =============================================================================

/// Encode one named value into its wire form
pub fn encode(name: &str, value: &Value) -> WireAttribute {
    match value {
        Value::Text(text) => WireAttribute {
            name: name.to_string(),
            datatype: AttrType::String,
            value: Bytes::copy_from_slice(text.as_bytes()),
            map_key: None,
        },
        Value::Int(num) => WireAttribute {
            name: name.to_string(),
            datatype: AttrType::Int64,
            value: Bytes::copy_from_slice(&num.to_le_bytes()),
            map_key: None,
        },
        Value::TextMapEntry { key, value } => WireAttribute {
            name: name.to_string(),
            datatype: AttrType::MapStringString,
            value: Bytes::copy_from_slice(value.as_bytes()),
            map_key: Some(Bytes::copy_from_slice(key.as_bytes())),
        },
        Value::IntMapEntry { key, value } => WireAttribute {
            name: name.to_string(),
            datatype: AttrType::MapStringInt64,
            value: Bytes::copy_from_slice(&value.to_le_bytes()),
            map_key: Some(Bytes::copy_from_slice(key.as_bytes())),
        },
    }
}

/// Decode one wire attribute back into its named value
pub fn decode(attr: &WireAttribute) -> Result<(String, Value)> {
    let value = match attr.datatype {
        AttrType::String => Value::Text(decode_text(&attr.name, &attr.value)?),
        AttrType::Int64 => Value::Int(decode_int(&attr.name, &attr.value)?),
        AttrType::MapStringString => Value::TextMapEntry {
            key: decode_text(&attr.name, map_key(attr)?)?,
            value: decode_text(&attr.name, &attr.value)?,
        },
        AttrType::MapStringInt64 => Value::IntMapEntry {
            key: decode_text(&attr.name, map_key(attr)?)?,
            value: decode_int(&attr.name, &attr.value)?,
        },
    };

    Ok((attr.name.clone(), value))
}

fn decode_text(name: &str, payload: &[u8]) -> Result<String> {
    String::from_utf8(payload.to_vec()).map_err(|_| {
        OrbitError::Codec(format!("attribute '{name}': payload is not valid UTF-8"))
    })
}

fn decode_int(name: &str, payload: &[u8]) -> Result<u64> {
    let bytes: [u8; INT64_PAYLOAD_LEN] = payload.try_into().map_err(|_| {
        OrbitError::Codec(format!(
            "attribute '{name}': integer payload is {} bytes (expected {})",
            payload.len(),
            INT64_PAYLOAD_LEN
        ))
    })?;

    Ok(u64::from_le_bytes(bytes))
}

fn map_key(attr: &WireAttribute) -> Result<&Bytes> {
    attr.map_key.as_ref().ok_or_else(|| {
        OrbitError::Codec(format!(
            "attribute '{}': map-typed attribute without a map key",
            attr.name
        ))
    })
}

// =============================================================================
// Bulk Helpers
// =============================================================================
//
// Used by the request builders to fold whole caller maps into one combined
// wire-attribute list. Empty maps append nothing; whether the combined list
// may be empty is the builders' concern.

/// Append encodings of a string-valued attribute map
pub fn extend_strings(out: &mut Vec<WireAttribute>, attrs: &BTreeMap<String, String>) {
    for (name, value) in attrs {
        out.push(encode(name, &Value::Text(value.clone())));
    }
}

/// Append encodings of an integer-valued attribute map
pub fn extend_ints(out: &mut Vec<WireAttribute>, attrs: &BTreeMap<String, u64>) {
    for (name, value) in attrs {
        out.push(encode(name, &Value::Int(*value)));
    }
}

/// Append encodings of keyed string-map entries, one per attribute name
pub fn extend_map_strings(
    out: &mut Vec<WireAttribute>,
    pairs: &BTreeMap<String, (String, String)>,
) {
    for (name, (key, value)) in pairs {
        out.push(encode(
            name,
            &Value::TextMapEntry {
                key: key.clone(),
                value: value.clone(),
            },
        ));
    }
}

/// Append encodings of keyed integer-map entries, one per attribute name
pub fn extend_map_ints(out: &mut Vec<WireAttribute>, pairs: &BTreeMap<String, (String, u64)>) {
    for (name, (key, value)) in pairs {
        out.push(encode(
            name,
            &Value::IntMapEntry {
                key: key.clone(),
                value: *value,
            },
        ));
    }
}
