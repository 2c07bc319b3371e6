//! Attribute definitions
//!
//! Semantic values as callers supply them, and their tagged wire form.

use bytes::Bytes;

/// Wire type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttrType {
    String = 0x01,
    Int64 = 0x02,
    MapStringString = 0x03,
    MapStringInt64 = 0x04,
}

/// A typed attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// UTF-8 string
    Text(String),

    /// Unsigned 64-bit integer
    Int(u64),

    /// One entry of a string-keyed string map
    TextMapEntry { key: String, value: String },

    /// One entry of a string-keyed integer map
    IntMapEntry { key: String, value: u64 },
}

/// The tagged binary form of one named value exchanged with the engine.
///
/// Payloads are owned buffers, never borrowed stack storage: the request
/// builders batch many wire attributes into one request, and every payload
/// must outlive the bridge call that references it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireAttribute {
    /// Attribute name, unique within one request's attribute set
    pub name: String,

    /// Type tag governing payload interpretation
    pub datatype: AttrType,

    /// Value payload; exactly 8 little-endian bytes for integer tags
    pub value: Bytes,

    /// Inner map key, present exactly for the map-typed tags
    pub map_key: Option<Bytes>,
}
