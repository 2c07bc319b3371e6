//! Status codes
//!
//! Every completed operation reports its outcome as a single code drawn
//! from the band the store reserves for its status vocabulary. A code
//! outside that band can only come from a corrupted exchange with the
//! engine, so classification halts rather than letting it propagate.

use std::fmt;
use std::ops::Range;

/// Reserved status-code band. Every code the engine emits must fall here.
pub const STATUS_BAND: Range<u32> = 8448..8576;

/// Outcome classifier for one completed operation.
///
/// A thin wrapper over the raw code rather than a closed enum: the band
/// admits codes this client has not named yet, and callers compare
/// outcomes by identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(u32);

impl Status {
    // -------------------------------------------------------------------------
    // Terminal, non-error outcomes
    // -------------------------------------------------------------------------
    /// The operation completed as requested.
    pub const SUCCESS: Status = Status(8448);

    /// The addressed record does not exist.
    pub const NOT_FOUND: Status = Status(8449);

    /// A search stream delivered its last row.
    pub const SEARCH_DONE: Status = Status(8450);

    /// A conditional update's predicate did not hold.
    pub const COND_FAILED: Status = Status(8451);

    // -------------------------------------------------------------------------
    // Failure outcomes
    // -------------------------------------------------------------------------
    /// The named space is not known to the store.
    pub const UNKNOWN_SPACE: Status = Status(8512);

    /// An attribute name is not part of the addressed space.
    pub const UNKNOWN_ATTR: Status = Status(8513);

    /// A verb was applied to an attribute of a different value family.
    pub const WRONG_TYPE: Status = Status(8514);

    /// The same attribute appeared twice in one request.
    pub const DUPLICATE_ATTR: Status = Status(8515);

    /// Division or remainder by zero.
    pub const ARITHMETIC_FAULT: Status = Status(8516);

    /// The request never reached the engine's pipeline.
    pub const CONNECT_FAILED: Status = Status(8517);

    /// The engine's event loop is no longer serviced.
    pub const DISCONNECTED: Status = Status(8518);

    /// A bounded loop step elapsed without a completion.
    pub const TIMEOUT: Status = Status(8519);

    /// The store failed internally while applying the operation.
    pub const SERVER_ERROR: Status = Status(8520);

    /// The event loop was driven with no operation outstanding.
    pub const NONE_PENDING: Status = Status(8521);

    /// Classify a raw engine code.
    ///
    /// Panics when the code falls outside [`STATUS_BAND`]. This check runs
    /// on every status on every path (submit-time, loop, and completion):
    /// an out-of-band value is protocol corruption, not a failure a caller
    /// could handle.
    pub fn from_raw(raw: u32) -> Status {
        assert!(
            STATUS_BAND.contains(&raw),
            "status code {raw} outside reserved band {STATUS_BAND:?}"
        );
        Status(raw)
    }

    /// The raw code, as an engine reports it.
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Whether this is the plain success outcome.
    pub fn is_success(self) -> bool {
        self == Status::SUCCESS
    }

    /// Whether this is the terminal status of a search stream.
    pub fn is_search_done(self) -> bool {
        self == Status::SEARCH_DONE
    }

    fn name(self) -> Option<&'static str> {
        match self {
            Status::SUCCESS => Some("SUCCESS"),
            Status::NOT_FOUND => Some("NOT_FOUND"),
            Status::SEARCH_DONE => Some("SEARCH_DONE"),
            Status::COND_FAILED => Some("COND_FAILED"),
            Status::UNKNOWN_SPACE => Some("UNKNOWN_SPACE"),
            Status::UNKNOWN_ATTR => Some("UNKNOWN_ATTR"),
            Status::WRONG_TYPE => Some("WRONG_TYPE"),
            Status::DUPLICATE_ATTR => Some("DUPLICATE_ATTR"),
            Status::ARITHMETIC_FAULT => Some("ARITHMETIC_FAULT"),
            Status::CONNECT_FAILED => Some("CONNECT_FAILED"),
            Status::DISCONNECTED => Some("DISCONNECTED"),
            Status::TIMEOUT => Some("TIMEOUT"),
            Status::SERVER_ERROR => Some("SERVER_ERROR"),
            Status::NONE_PENDING => Some("NONE_PENDING"),
            _ => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} ({})", name, self.0),
            None => write!(f, "status {}", self.0),
        }
    }
}
