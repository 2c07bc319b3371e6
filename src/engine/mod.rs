//! Engine Boundary
//!
//! The asynchronous engine interface this client drives.
//!
//! The engine is a multiplexed, id-tagged event loop: each submitted
//! request receives an operation handle, and [`EngineDriver::advance`]
//! reports completed operations one at a time. This client never keeps
//! more than one operation in flight, so the next completion must
//! correlate the request just submitted.
//!
//! Engines report raw `u32` status codes. Classification and band
//! validation belong to [`crate::status`]: the engine side of this
//! boundary is untrusted, and a corrupted code must be caught before it
//! reaches a caller.

mod memory;

pub use memory::MemoryEngine;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::attribute::WireAttribute;

// =============================================================================
// Correlation and Completion Types
// =============================================================================

/// Correlation id for one submitted operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpHandle(pub i64);

/// Outcome of handing one request to the engine
#[derive(Debug)]
pub enum Submit {
    /// The request was queued; its completion will carry this handle
    Queued(OpHandle),

    /// The request never entered the pipeline; the raw status says why
    Rejected(u32),
}

/// One step of the engine's event loop
#[derive(Debug)]
pub enum LoopStep {
    /// Some operation finished
    Completed(Completion),

    /// The loop itself failed; no operation finished
    Failed(u32),
}

/// A completed operation as reported by the event loop
#[derive(Debug)]
pub struct Completion {
    /// Handle of the operation that finished
    pub handle: OpHandle,

    /// The operation's own outcome, raw and unclassified
    pub status: u32,

    /// Attribute batch, for reads and search rows
    pub batch: Option<AttrBatch>,
}

// =============================================================================
// Request Shapes
// =============================================================================

/// Selector for the attribute-carrying update verbs.
///
/// Every update shares one request shape (space, key, attribute list);
/// the selector picks the store-side transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateVerb {
    Put,
    AtomicAdd,
    AtomicSub,
    AtomicMul,
    AtomicDiv,
    AtomicRem,
    BitAnd,
    BitOr,
    BitXor,
    StringPrepend,
    StringAppend,
    ListLpush,
    ListRpush,
    SetAdd,
    SetRemove,
    SetIntersect,
    SetUnion,
    MapAdd,
    MapRemove,
    MapAddNum,
    MapSubNum,
    MapMulNum,
    MapDivNum,
    MapRemNum,
    MapBitAnd,
    MapBitOr,
    MapBitXor,
    MapStringPrepend,
    MapStringAppend,
}

impl UpdateVerb {
    /// Verb name for logs and error messages
    pub fn name(self) -> &'static str {
        match self {
            UpdateVerb::Put => "put",
            UpdateVerb::AtomicAdd => "atomic_add",
            UpdateVerb::AtomicSub => "atomic_sub",
            UpdateVerb::AtomicMul => "atomic_mul",
            UpdateVerb::AtomicDiv => "atomic_div",
            UpdateVerb::AtomicRem => "atomic_rem",
            UpdateVerb::BitAnd => "bit_and",
            UpdateVerb::BitOr => "bit_or",
            UpdateVerb::BitXor => "bit_xor",
            UpdateVerb::StringPrepend => "string_prepend",
            UpdateVerb::StringAppend => "string_append",
            UpdateVerb::ListLpush => "list_lpush",
            UpdateVerb::ListRpush => "list_rpush",
            UpdateVerb::SetAdd => "set_add",
            UpdateVerb::SetRemove => "set_remove",
            UpdateVerb::SetIntersect => "set_intersect",
            UpdateVerb::SetUnion => "set_union",
            UpdateVerb::MapAdd => "map_add",
            UpdateVerb::MapRemove => "map_remove",
            UpdateVerb::MapAddNum => "map_add_num",
            UpdateVerb::MapSubNum => "map_sub_num",
            UpdateVerb::MapMulNum => "map_mul_num",
            UpdateVerb::MapDivNum => "map_div_num",
            UpdateVerb::MapRemNum => "map_rem_num",
            UpdateVerb::MapBitAnd => "map_bit_and",
            UpdateVerb::MapBitOr => "map_bit_or",
            UpdateVerb::MapBitXor => "map_bit_xor",
            UpdateVerb::MapStringPrepend => "map_string_prepend",
            UpdateVerb::MapStringAppend => "map_string_append",
        }
    }
}

/// One range predicate of a search; bounds are inclusive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    pub attr: String,
    pub lower: u64,
    pub upper: u64,
}

// =============================================================================
// Attribute Batches
// =============================================================================

/// An engine-owned batch of result attributes.
///
/// The batch owns its attributes and releases them when dropped, on every
/// exit path of the decode loop (normal, early return, or panic unwind).
/// Engines that account for live batches attach a tracking guard.
#[derive(Debug)]
pub struct AttrBatch {
    attrs: Vec<WireAttribute>,
    _release: Option<ReleaseGuard>,
}

impl AttrBatch {
    /// A batch with no release accounting
    pub fn new(attrs: Vec<WireAttribute>) -> Self {
        Self {
            attrs,
            _release: None,
        }
    }

    /// A batch counted against `live`: incremented now, decremented on drop
    pub fn tracked(attrs: Vec<WireAttribute>, live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self {
            attrs,
            _release: Some(ReleaseGuard(live)),
        }
    }

    /// The batch's attributes
    pub fn attrs(&self) -> &[WireAttribute] {
        &self.attrs
    }

    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }
}

#[derive(Debug)]
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

// =============================================================================
// The Driver Trait
// =============================================================================

/// The asynchronous engine driven by this client.
///
/// Methods take `&mut self`: one client owns one engine, which renders the
/// one-outstanding-operation contract statically. Callers needing
/// concurrency use independent engines.
pub trait EngineDriver {
    /// Submit an asynchronous read of one record
    fn get(&mut self, space: &str, key: &[u8]) -> Submit;

    /// Submit an attribute-carrying update selected by `verb`
    fn update(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        attrs: &[WireAttribute],
    ) -> Submit;

    /// Submit a put applied only if every `cond` attribute matches
    fn cond_put(
        &mut self,
        space: &str,
        key: &[u8],
        cond: &[WireAttribute],
        attrs: &[WireAttribute],
    ) -> Submit;

    /// Submit a record deletion
    fn delete(&mut self, space: &str, key: &[u8]) -> Submit;

    /// Submit a search. Each matching row completes separately, followed
    /// by a terminal search-done completion under the same handle.
    fn search(&mut self, space: &str, eq: &[WireAttribute], ranges: &[RangeQuery]) -> Submit;

    /// Advance the event loop and report the next completion.
    /// `None` waits indefinitely.
    fn advance(&mut self, timeout: Option<Duration>) -> LoopStep;
}
