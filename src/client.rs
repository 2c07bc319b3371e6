//! Client Facade
//!
//! Blocking operations over the store, one engine per client.
//!
//! ## Concurrency Model
//!
//! Strictly synchronous: each public call submits one asynchronous request
//! and drives the engine until that request completes. The client owns its
//! engine exclusively and every verb takes `&mut self`, so no two
//! operations are ever in flight on one connection; callers that need
//! concurrency use independent clients. A hung engine hangs the caller:
//! there is no per-call timeout, no cancellation, and no retry.
//!
//! ## Request Pipeline
//!
//! Every attribute-carrying verb runs one shared pipeline: encode the
//! caller's typed maps into a combined wire-attribute list (condition
//! attributes first where applicable), reject an empty list, submit
//! through the bridge, classify the resulting status.

use std::collections::BTreeMap;

use tracing::debug;

use crate::assembler::{self, Row, SearchAssembler};
use crate::attribute::{self, WireAttribute};
use crate::bridge;
use crate::engine::{EngineDriver, RangeQuery, UpdateVerb};
use crate::error::{OrbitError, Result};
use crate::status::Status;

// =============================================================================
// Caller-facing Attribute Maps
// =============================================================================

/// String-valued attributes keyed by name
pub type StringAttrs = BTreeMap<String, String>;

/// Integer-valued attributes keyed by name
pub type IntAttrs = BTreeMap<String, u64>;

/// One (map key, value) entry per string-map attribute name
pub type StringMapEntries = BTreeMap<String, (String, String)>;

/// One (map key, value) entry per integer-map attribute name
pub type IntMapEntries = BTreeMap<String, (String, u64)>;

/// Inclusive (lower, upper) bounds per integer attribute name
pub type RangePredicates = BTreeMap<String, (u64, u64)>;

// =============================================================================
// The Client
// =============================================================================

/// Synchronous client over one exclusively-owned engine
pub struct Client<E: EngineDriver> {
    engine: E,
}

impl<E: EngineDriver> Client<E> {
    /// Wrap an engine. The client takes ownership: the engine serves this
    /// client's operations and nothing else.
    pub fn new(engine: E) -> Self {
        Self { engine }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Fetch one record's scalar attributes.
    ///
    /// `Ok(None)` means the record does not exist.
    pub fn get(&mut self, space: &str, key: &[u8]) -> Result<Option<Row>> {
        debug!(space, "get");
        let (status, batch) = bridge::execute(&mut self.engine, |e| e.get(space, key));
        if status.is_success() {
            let row = match &batch {
                Some(batch) => assembler::fold_row(batch)?,
                None => Row::default(),
            };
            Ok(Some(row))
        } else if status == Status::NOT_FOUND {
            Ok(None)
        } else {
            Err(OrbitError::Op(status))
        }
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Store string and integer attributes under `key`, creating the
    /// record if needed
    pub fn put(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::Put, space, key, strings, ints)
    }

    /// Apply the value attributes only if every condition attribute
    /// matches the stored record.
    ///
    /// `Ok(false)` means the predicate did not hold. Both the condition
    /// set and the value set must be non-empty.
    pub fn cond_put(
        &mut self,
        space: &str,
        key: &[u8],
        cond_strings: &StringAttrs,
        cond_ints: &IntAttrs,
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<bool> {
        let cond = scalar_attrs(cond_strings, cond_ints);
        let attrs = scalar_attrs(strings, ints);
        if cond.is_empty() {
            return Err(OrbitError::EmptyAttrs("cond_put condition"));
        }
        if attrs.is_empty() {
            return Err(OrbitError::EmptyAttrs("cond_put"));
        }

        debug!(space, "cond_put");
        let (status, _) =
            bridge::execute(&mut self.engine, |e| e.cond_put(space, key, &cond, &attrs));
        if status.is_success() {
            Ok(true)
        } else if status == Status::COND_FAILED {
            Ok(false)
        } else {
            Err(OrbitError::Op(status))
        }
    }

    /// Delete one record.
    ///
    /// `Ok(false)` means the record did not exist. The only mutation verb
    /// with no attribute payload.
    pub fn delete(&mut self, space: &str, key: &[u8]) -> Result<bool> {
        debug!(space, "delete");
        let (status, _) = bridge::execute(&mut self.engine, |e| e.delete(space, key));
        if status.is_success() {
            Ok(true)
        } else if status == Status::NOT_FOUND {
            Ok(false)
        } else {
            Err(OrbitError::Op(status))
        }
    }

    // =========================================================================
    // Atomic Integer Updates
    // =========================================================================

    /// Add each delta to its attribute's stored value
    pub fn atomic_add(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::AtomicAdd, space, key, ints)
    }

    /// Subtract each delta from its attribute's stored value
    pub fn atomic_sub(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::AtomicSub, space, key, ints)
    }

    /// Multiply each attribute's stored value by its operand
    pub fn atomic_mul(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::AtomicMul, space, key, ints)
    }

    /// Divide each attribute's stored value by its operand
    pub fn atomic_div(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::AtomicDiv, space, key, ints)
    }

    /// Reduce each attribute's stored value modulo its operand
    pub fn atomic_rem(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::AtomicRem, space, key, ints)
    }

    /// Bitwise-and each attribute's stored value with its operand
    pub fn bit_and(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::BitAnd, space, key, ints)
    }

    /// Bitwise-or each attribute's stored value with its operand
    pub fn bit_or(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::BitOr, space, key, ints)
    }

    /// Bitwise-xor each attribute's stored value with its operand
    pub fn bit_xor(&mut self, space: &str, key: &[u8], ints: &IntAttrs) -> Result<()> {
        self.update_ints(UpdateVerb::BitXor, space, key, ints)
    }

    // =========================================================================
    // String Mutation
    // =========================================================================

    /// Prepend each operand to its attribute's stored string
    pub fn string_prepend(&mut self, space: &str, key: &[u8], strings: &StringAttrs) -> Result<()> {
        self.update_strings(UpdateVerb::StringPrepend, space, key, strings)
    }

    /// Append each operand to its attribute's stored string
    pub fn string_append(&mut self, space: &str, key: &[u8], strings: &StringAttrs) -> Result<()> {
        self.update_strings(UpdateVerb::StringAppend, space, key, strings)
    }

    // =========================================================================
    // Lists and Sets
    // =========================================================================

    /// Push each value onto the left end of its attribute's list
    pub fn list_lpush(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::ListLpush, space, key, strings, ints)
    }

    /// Push each value onto the right end of its attribute's list
    pub fn list_rpush(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::ListRpush, space, key, strings, ints)
    }

    /// Add each value to its attribute's set
    pub fn set_add(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::SetAdd, space, key, strings, ints)
    }

    /// Remove each value from its attribute's set
    pub fn set_remove(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::SetRemove, space, key, strings, ints)
    }

    /// Intersect each attribute's set with its operand
    pub fn set_intersect(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::SetIntersect, space, key, strings, ints)
    }

    /// Union each attribute's set with its operand
    pub fn set_union(
        &mut self,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.update_scalars(UpdateVerb::SetUnion, space, key, strings, ints)
    }

    // =========================================================================
    // Keyed Maps
    // =========================================================================

    /// Insert one (map key, value) entry into each named map attribute
    pub fn map_add(
        &mut self,
        space: &str,
        key: &[u8],
        string_pairs: &StringMapEntries,
        int_pairs: &IntMapEntries,
    ) -> Result<()> {
        self.update_map_entries(UpdateVerb::MapAdd, space, key, string_pairs, int_pairs)
    }

    /// Remove one map key from each named map attribute
    pub fn map_remove(
        &mut self,
        space: &str,
        key: &[u8],
        string_pairs: &StringMapEntries,
        int_pairs: &IntMapEntries,
    ) -> Result<()> {
        self.update_map_entries(UpdateVerb::MapRemove, space, key, string_pairs, int_pairs)
    }

    /// Add each delta to one keyed entry of its map attribute
    pub fn map_add_num(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapAddNum, space, key, pairs)
    }

    /// Subtract each delta from one keyed entry of its map attribute
    pub fn map_sub_num(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapSubNum, space, key, pairs)
    }

    /// Multiply one keyed entry of each map attribute by its operand
    pub fn map_mul_num(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapMulNum, space, key, pairs)
    }

    /// Divide one keyed entry of each map attribute by its operand
    pub fn map_div_num(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapDivNum, space, key, pairs)
    }

    /// Reduce one keyed entry of each map attribute modulo its operand
    pub fn map_rem_num(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapRemNum, space, key, pairs)
    }

    /// Bitwise-and one keyed entry of each map attribute with its operand
    pub fn map_bit_and(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapBitAnd, space, key, pairs)
    }

    /// Bitwise-or one keyed entry of each map attribute with its operand
    pub fn map_bit_or(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapBitOr, space, key, pairs)
    }

    /// Bitwise-xor one keyed entry of each map attribute with its operand
    pub fn map_bit_xor(&mut self, space: &str, key: &[u8], pairs: &IntMapEntries) -> Result<()> {
        self.update_map_ints(UpdateVerb::MapBitXor, space, key, pairs)
    }

    /// Prepend each operand to one keyed entry of its map attribute
    pub fn map_string_prepend(
        &mut self,
        space: &str,
        key: &[u8],
        pairs: &StringMapEntries,
    ) -> Result<()> {
        self.update_map_strings(UpdateVerb::MapStringPrepend, space, key, pairs)
    }

    /// Append each operand to one keyed entry of its map attribute
    pub fn map_string_append(
        &mut self,
        space: &str,
        key: &[u8],
        pairs: &StringMapEntries,
    ) -> Result<()> {
        self.update_map_strings(UpdateVerb::MapStringAppend, space, key, pairs)
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Stream every record matching all equality and range predicates,
    /// appending one row per record to `rows`.
    ///
    /// At least one predicate is required. Rows completed before a
    /// mid-stream failure stay in `rows`; the failure status is the
    /// call's error.
    pub fn search(
        &mut self,
        space: &str,
        eq_strings: &StringAttrs,
        eq_ints: &IntAttrs,
        ranges: &RangePredicates,
        rows: &mut Vec<Row>,
    ) -> Result<()> {
        let eq = scalar_attrs(eq_strings, eq_ints);
        let range_queries: Vec<RangeQuery> = ranges
            .iter()
            .map(|(attr, &(lower, upper))| RangeQuery {
                attr: attr.clone(),
                lower,
                upper,
            })
            .collect();
        if eq.is_empty() && range_queries.is_empty() {
            return Err(OrbitError::EmptyAttrs("search"));
        }

        debug!(
            space,
            eq = eq.len(),
            ranges = range_queries.len(),
            "search"
        );

        let mut assembler = SearchAssembler::new();
        let status = bridge::execute_stream(
            &mut self.engine,
            |e| e.search(space, &eq, &range_queries),
            &mut assembler,
        )?;

        // Completed rows stay observable even when the stream failed.
        rows.extend(assembler.into_rows());

        if status.is_success() {
            Ok(())
        } else {
            Err(OrbitError::Op(status))
        }
    }

    /// Stream every record whose integer attribute `attr` lies in
    /// `[lower, upper]`
    pub fn range_search(
        &mut self,
        space: &str,
        attr: &str,
        lower: u64,
        upper: u64,
        rows: &mut Vec<Row>,
    ) -> Result<()> {
        let mut ranges = RangePredicates::new();
        ranges.insert(attr.to_string(), (lower, upper));
        self.search(space, &StringAttrs::new(), &IntAttrs::new(), &ranges, rows)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// The engine this client drives
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Mutable access to the engine
    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Consume the client, returning its engine
    pub fn into_engine(self) -> E {
        self.engine
    }

    // =========================================================================
    // Shared Pipeline
    // =========================================================================

    fn update_scalars(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
        ints: &IntAttrs,
    ) -> Result<()> {
        self.run_update(verb, space, key, scalar_attrs(strings, ints))
    }

    fn update_strings(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        strings: &StringAttrs,
    ) -> Result<()> {
        let mut attrs = Vec::with_capacity(strings.len());
        attribute::extend_strings(&mut attrs, strings);
        self.run_update(verb, space, key, attrs)
    }

    fn update_ints(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        ints: &IntAttrs,
    ) -> Result<()> {
        let mut attrs = Vec::with_capacity(ints.len());
        attribute::extend_ints(&mut attrs, ints);
        self.run_update(verb, space, key, attrs)
    }

    fn update_map_entries(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        string_pairs: &StringMapEntries,
        int_pairs: &IntMapEntries,
    ) -> Result<()> {
        let mut attrs = Vec::with_capacity(string_pairs.len() + int_pairs.len());
        attribute::extend_map_strings(&mut attrs, string_pairs);
        attribute::extend_map_ints(&mut attrs, int_pairs);
        self.run_update(verb, space, key, attrs)
    }

    fn update_map_strings(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        pairs: &StringMapEntries,
    ) -> Result<()> {
        let mut attrs = Vec::with_capacity(pairs.len());
        attribute::extend_map_strings(&mut attrs, pairs);
        self.run_update(verb, space, key, attrs)
    }

    fn update_map_ints(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        pairs: &IntMapEntries,
    ) -> Result<()> {
        let mut attrs = Vec::with_capacity(pairs.len());
        attribute::extend_map_ints(&mut attrs, pairs);
        self.run_update(verb, space, key, attrs)
    }

    /// One pipeline for every attribute-carrying verb: guard against an
    /// empty attribute list, submit through the bridge, classify.
    fn run_update(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        attrs: Vec<WireAttribute>,
    ) -> Result<()> {
        if attrs.is_empty() {
            return Err(OrbitError::EmptyAttrs(verb.name()));
        }

        debug!(space, verb = verb.name(), attrs = attrs.len(), "update");
        let (status, _) =
            bridge::execute(&mut self.engine, |e| e.update(verb, space, key, &attrs));
        if status.is_success() {
            Ok(())
        } else {
            Err(OrbitError::Op(status))
        }
    }
}

fn scalar_attrs(strings: &StringAttrs, ints: &IntAttrs) -> Vec<WireAttribute> {
    let mut attrs = Vec::with_capacity(strings.len() + ints.len());
    attribute::extend_strings(&mut attrs, strings);
    attribute::extend_ints(&mut attrs, ints);
    attrs
}
