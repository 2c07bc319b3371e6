//! Result Assembler
//!
//! Folds decoded attribute batches into caller-facing rows.
//!
//! ## Streaming state machine
//!
//! ```text
//! AwaitingRow ──success completion──► row opened, filled, closed ──► AwaitingRow
//! AwaitingRow ──search-done────────► Done
//! AwaitingRow ──other status───────► Failed
//! ```
//!
//! One completion event carries exactly one row's attributes; rows are
//! never split across completions, so each successful event opens and
//! closes one row. Rows completed before a failure stay observable.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::attribute::{self, Value};
use crate::engine::AttrBatch;
use crate::error::Result;
use crate::status::Status;

// =============================================================================
// Rows
// =============================================================================

/// One record's scalar attributes, partitioned by value family
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    /// String-valued attributes keyed by name
    pub strings: BTreeMap<String, String>,

    /// Integer-valued attributes keyed by name
    pub ints: BTreeMap<String, u64>,
}

impl Row {
    /// Insert one decoded value under `name`.
    ///
    /// Duplicate names are last-write-wins. Map-typed values are not part
    /// of a row's scalar view and are skipped.
    fn insert(&mut self, name: String, value: Value) {
        match value {
            Value::Text(text) => {
                self.strings.insert(name, text);
            }
            Value::Int(num) => {
                self.ints.insert(name, num);
            }
            Value::TextMapEntry { .. } | Value::IntMapEntry { .. } => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty() && self.ints.is_empty()
    }
}

/// Fold one flat attribute batch into a row
pub fn fold_row(batch: &AttrBatch) -> Result<Row> {
    let mut row = Row::default();
    for attr in batch.attrs() {
        let (name, value) = attribute::decode(attr)?;
        row.insert(name, value);
    }
    Ok(row)
}

// =============================================================================
// Streaming Assembly
// =============================================================================

/// What the stream should do after absorbing one completion event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStep {
    /// Keep driving the loop
    Continue,

    /// The stream terminated; every row is complete
    Done,

    /// The stream failed; prior rows stay complete, this status is the
    /// call's outcome
    Abort(Status),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    AwaitingRow,
    Done,
    Failed,
}

/// Reconstructs a sequence of rows from interleaved search completions
#[derive(Debug)]
pub struct SearchAssembler {
    rows: Vec<Row>,
    state: StreamState,
}

impl SearchAssembler {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            state: StreamState::AwaitingRow,
        }
    }

    /// Absorb one completion event
    pub fn absorb(&mut self, status: Status, batch: Option<&AttrBatch>) -> Result<StreamStep> {
        assert_eq!(
            self.state,
            StreamState::AwaitingRow,
            "search stream already terminated"
        );

        if status.is_search_done() {
            self.state = StreamState::Done;
            return Ok(StreamStep::Done);
        }

        if !status.is_success() {
            self.state = StreamState::Failed;
            return Ok(StreamStep::Abort(status));
        }

        // One successful completion is exactly one row.
        let row = match batch {
            Some(batch) => fold_row(batch)?,
            None => Row::default(),
        };
        self.rows.push(row);
        Ok(StreamStep::Continue)
    }

    /// Rows completed so far
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }
}

impl Default for SearchAssembler {
    fn default() -> Self {
        Self::new()
    }
}
