//! Attribute Codec Tests
//!
//! Tests verify:
//! - Round-trip laws for every value type
//! - Little-endian integer payloads regardless of host byte order
//! - Map entries carrying the inner key separately
//! - Decode rejection of malformed payloads
//! - Bulk helpers appending nothing for empty maps

use std::collections::BTreeMap;

use orbitkv::attribute::{
    self, AttrType, Value, WireAttribute, INT64_PAYLOAD_LEN,
};

// =============================================================================
// Round-trip Laws
// =============================================================================

#[test]
fn test_int_round_trip() {
    for value in [0u64, 1, 30, 0xDEAD_BEEF, u64::MAX] {
        let attr = attribute::encode("age", &Value::Int(value));
        let (name, decoded) = attribute::decode(&attr).unwrap();
        assert_eq!(name, "age");
        assert_eq!(decoded, Value::Int(value));
    }
}

#[test]
fn test_string_round_trip() {
    let attr = attribute::encode("name", &Value::Text("alice".to_string()));
    let (name, decoded) = attribute::decode(&attr).unwrap();
    assert_eq!(name, "name");
    assert_eq!(decoded, Value::Text("alice".to_string()));
}

#[test]
fn test_map_entry_round_trip() {
    let value = Value::IntMapEntry {
        key: "visits".to_string(),
        value: 7,
    };
    let attr = attribute::encode("counters", &value);
    let (name, decoded) = attribute::decode(&attr).unwrap();
    assert_eq!(name, "counters");
    assert_eq!(decoded, value);
}

// =============================================================================
// Wire Shape
// =============================================================================

#[test]
fn test_int_payload_is_little_endian() {
    let attr = attribute::encode("n", &Value::Int(0x0102_0304_0506_0708));
    assert_eq!(attr.datatype, AttrType::Int64);
    assert_eq!(
        attr.value.as_ref(),
        &[0x08, 0x07, 0x06, 0x05, 0x04, 0x03, 0x02, 0x01]
    );
}

#[test]
fn test_int_payload_is_exactly_eight_bytes() {
    let attr = attribute::encode("n", &Value::Int(1));
    assert_eq!(attr.value.len(), INT64_PAYLOAD_LEN);
}

#[test]
fn test_string_payload_is_raw_bytes() {
    let attr = attribute::encode("name", &Value::Text("alice".to_string()));
    assert_eq!(attr.datatype, AttrType::String);
    assert_eq!(attr.value.as_ref(), b"alice");
    assert!(attr.map_key.is_none());
}

#[test]
fn test_map_entry_carries_inner_key_separately() {
    let attr = attribute::encode(
        "tags",
        &Value::TextMapEntry {
            key: "color".to_string(),
            value: "red".to_string(),
        },
    );
    assert_eq!(attr.datatype, AttrType::MapStringString);
    assert_eq!(attr.map_key.as_deref(), Some(b"color".as_ref()));
    assert_eq!(attr.value.as_ref(), b"red");
}

// =============================================================================
// Decode Rejection
// =============================================================================

#[test]
fn test_decode_rejects_short_int_payload() {
    let attr = WireAttribute {
        name: "n".to_string(),
        datatype: AttrType::Int64,
        value: bytes::Bytes::from_static(&[1, 2, 3]),
        map_key: None,
    };
    assert!(attribute::decode(&attr).is_err());
}

#[test]
fn test_decode_rejects_invalid_utf8() {
    let attr = WireAttribute {
        name: "name".to_string(),
        datatype: AttrType::String,
        value: bytes::Bytes::from_static(&[0xFF, 0xFE]),
        map_key: None,
    };
    assert!(attribute::decode(&attr).is_err());
}

#[test]
fn test_decode_rejects_map_attr_without_key() {
    let attr = WireAttribute {
        name: "tags".to_string(),
        datatype: AttrType::MapStringString,
        value: bytes::Bytes::from_static(b"red"),
        map_key: None,
    };
    assert!(attribute::decode(&attr).is_err());
}

// =============================================================================
// Bulk Helpers
// =============================================================================

#[test]
fn test_extend_empty_maps_append_nothing() {
    let mut out = Vec::new();
    attribute::extend_strings(&mut out, &BTreeMap::new());
    attribute::extend_ints(&mut out, &BTreeMap::new());
    attribute::extend_map_strings(&mut out, &BTreeMap::new());
    attribute::extend_map_ints(&mut out, &BTreeMap::new());
    assert!(out.is_empty());
}

#[test]
fn test_extend_combines_families_in_order() {
    let mut strings = BTreeMap::new();
    strings.insert("name".to_string(), "alice".to_string());
    let mut ints = BTreeMap::new();
    ints.insert("age".to_string(), 30);

    let mut out = Vec::new();
    attribute::extend_strings(&mut out, &strings);
    attribute::extend_ints(&mut out, &ints);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].name, "name");
    assert_eq!(out[0].datatype, AttrType::String);
    assert_eq!(out[1].name, "age");
    assert_eq!(out[1].datatype, AttrType::Int64);
}
