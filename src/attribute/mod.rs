//! Attribute Module
//!
//! Typed attribute values and their tagged wire form.
//!
//! ## Wire Attribute Layout
//!
//! ```text
//! ┌──────────┬──────────┬─────────────┬──────────────────┐
//! │   Name   │ Tag (1)  │  Map Key?   │     Payload      │
//! └──────────┴──────────┴─────────────┴──────────────────┘
//! ```
//!
//! ### Type Tags
//! - 0x01: STRING            - payload: raw bytes
//! - 0x02: INT64             - payload: 8 bytes, little-endian
//! - 0x03: MAP_STRING_STRING - map key: raw bytes, payload: raw bytes
//! - 0x04: MAP_STRING_INT64  - map key: raw bytes, payload: 8 bytes LE
//!
//! Map-typed attributes carry one (attribute name, inner map key) entry
//! each; a whole caller map becomes one wire attribute per inner entry.

mod types;
mod codec;

pub use types::{AttrType, Value, WireAttribute};
pub use codec::{
    decode, encode, extend_ints, extend_map_ints, extend_map_strings, extend_strings,
    INT64_PAYLOAD_LEN,
};
