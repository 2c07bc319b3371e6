//! In-memory engine
//!
//! An in-process [`EngineDriver`] with real asynchronous mechanics:
//! requests are queued to a worker thread, and completions come back
//! through the event loop one at a time. Stands in for a networked engine
//! in tests, benches, and the CLI.
//!
//! ## Semantics
//! - Records live in provisioned spaces; other spaces report UNKNOWN_SPACE
//! - Update verbs other than put on a missing record report NOT_FOUND
//! - An attribute name sticks to its first value family; cross-family
//!   verbs report WRONG_TYPE
//! - Arithmetic wraps; division or remainder by zero reports
//!   ARITHMETIC_FAULT
//! - Each request applies atomically: a failing attribute leaves the
//!   record untouched

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use parking_lot::RwLock;
use tracing::trace;

use crate::attribute::{self, Value, WireAttribute};
use crate::config::Config;
use crate::error::Result;
use crate::status::Status;

use super::{
    AttrBatch, Completion, EngineDriver, LoopStep, OpHandle, RangeQuery, Submit, UpdateVerb,
};

// =============================================================================
// Storage Model
// =============================================================================

/// Stored attribute families for one record
#[derive(Debug, Default, Clone)]
struct Record {
    strings: BTreeMap<String, String>,
    ints: BTreeMap<String, u64>,
    string_lists: BTreeMap<String, Vec<String>>,
    int_lists: BTreeMap<String, Vec<u64>>,
    string_sets: BTreeMap<String, BTreeSet<String>>,
    int_sets: BTreeMap<String, BTreeSet<u64>>,
    string_maps: BTreeMap<String, BTreeMap<String, String>>,
    int_maps: BTreeMap<String, BTreeMap<String, u64>>,
}

/// Value families an attribute name can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Str,
    Int,
    StrList,
    IntList,
    StrSet,
    IntSet,
    StrMap,
    IntMap,
}

type Space = BTreeMap<Vec<u8>, Record>;
type Store = BTreeMap<String, Space>;

// =============================================================================
// Worker Protocol
// =============================================================================

enum Request {
    Get {
        handle: OpHandle,
        space: String,
        key: Vec<u8>,
    },
    Update {
        handle: OpHandle,
        verb: UpdateVerb,
        space: String,
        key: Vec<u8>,
        attrs: Vec<WireAttribute>,
    },
    CondPut {
        handle: OpHandle,
        space: String,
        key: Vec<u8>,
        cond: Vec<WireAttribute>,
        attrs: Vec<WireAttribute>,
    },
    Delete {
        handle: OpHandle,
        space: String,
        key: Vec<u8>,
    },
    Search {
        handle: OpHandle,
        space: String,
        eq: Vec<WireAttribute>,
        ranges: Vec<RangeQuery>,
    },
}

/// A completion plus whether it is its operation's last
struct Delivery {
    completion: Completion,
    last: bool,
}

// =============================================================================
// Engine Front End
// =============================================================================

/// In-process engine backed by a worker thread
pub struct MemoryEngine {
    requests: Option<Sender<Request>>,
    deliveries: Receiver<Delivery>,
    worker: Option<JoinHandle<()>>,
    store: Arc<RwLock<Store>>,
    live_batches: Arc<AtomicUsize>,
    next_handle: i64,
    in_flight: usize,
}

impl MemoryEngine {
    /// Open an engine with the given config, spawning its worker thread
    pub fn open(config: Config) -> Result<Self> {
        let store: Arc<RwLock<Store>> = Arc::new(RwLock::new(
            config
                .spaces
                .iter()
                .map(|name| (name.clone(), Space::new()))
                .collect(),
        ));
        let live_batches = Arc::new(AtomicUsize::new(0));

        let (request_tx, request_rx) = channel::unbounded();
        let (delivery_tx, delivery_rx) = channel::unbounded();

        let worker = Worker {
            store: Arc::clone(&store),
            live_batches: Arc::clone(&live_batches),
            delay: config.completion_delay,
            deliveries: delivery_tx,
        };

        let handle = thread::Builder::new()
            .name("orbitkv-engine".to_string())
            .spawn(move || worker.run(request_rx))?;

        Ok(Self {
            requests: Some(request_tx),
            deliveries: delivery_rx,
            worker: Some(handle),
            store,
            live_batches,
            next_handle: 1,
            in_flight: 0,
        })
    }

    /// Create `space` if it does not exist yet
    pub fn create_space(&self, space: &str) {
        self.store.write().entry(space.to_string()).or_default();
    }

    /// Number of records currently stored in `space`
    pub fn space_len(&self, space: &str) -> Option<usize> {
        self.store.read().get(space).map(|records| records.len())
    }

    /// Attribute batches handed out and not yet released
    pub fn outstanding_batches(&self) -> usize {
        self.live_batches.load(Ordering::SeqCst)
    }

    /// Operations submitted over this engine's lifetime
    pub fn submitted_ops(&self) -> u64 {
        (self.next_handle - 1) as u64
    }

    fn next_handle(&self) -> OpHandle {
        OpHandle(self.next_handle)
    }

    fn submit(&mut self, request: Request) -> Submit {
        let handle = OpHandle(self.next_handle);

        let sent = match &self.requests {
            Some(requests) => requests.send(request).is_ok(),
            None => false,
        };

        if !sent {
            return Submit::Rejected(Status::CONNECT_FAILED.raw());
        }

        self.next_handle += 1;
        self.in_flight += 1;
        trace!(handle = handle.0, "request queued");
        Submit::Queued(handle)
    }
}

impl EngineDriver for MemoryEngine {
    fn get(&mut self, space: &str, key: &[u8]) -> Submit {
        self.submit(Request::Get {
            handle: self.next_handle(),
            space: space.to_string(),
            key: key.to_vec(),
        })
    }

    fn update(
        &mut self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        attrs: &[WireAttribute],
    ) -> Submit {
        self.submit(Request::Update {
            handle: self.next_handle(),
            verb,
            space: space.to_string(),
            key: key.to_vec(),
            attrs: attrs.to_vec(),
        })
    }

    fn cond_put(
        &mut self,
        space: &str,
        key: &[u8],
        cond: &[WireAttribute],
        attrs: &[WireAttribute],
    ) -> Submit {
        self.submit(Request::CondPut {
            handle: self.next_handle(),
            space: space.to_string(),
            key: key.to_vec(),
            cond: cond.to_vec(),
            attrs: attrs.to_vec(),
        })
    }

    fn delete(&mut self, space: &str, key: &[u8]) -> Submit {
        self.submit(Request::Delete {
            handle: self.next_handle(),
            space: space.to_string(),
            key: key.to_vec(),
        })
    }

    fn search(&mut self, space: &str, eq: &[WireAttribute], ranges: &[RangeQuery]) -> Submit {
        self.submit(Request::Search {
            handle: self.next_handle(),
            space: space.to_string(),
            eq: eq.to_vec(),
            ranges: ranges.to_vec(),
        })
    }

    fn advance(&mut self, timeout: Option<Duration>) -> LoopStep {
        if self.in_flight == 0 {
            return LoopStep::Failed(Status::NONE_PENDING.raw());
        }

        let delivery = match timeout {
            None => match self.deliveries.recv() {
                Ok(delivery) => delivery,
                Err(_) => return LoopStep::Failed(Status::DISCONNECTED.raw()),
            },
            Some(limit) => match self.deliveries.recv_timeout(limit) {
                Ok(delivery) => delivery,
                Err(RecvTimeoutError::Timeout) => {
                    return LoopStep::Failed(Status::TIMEOUT.raw());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return LoopStep::Failed(Status::DISCONNECTED.raw());
                }
            },
        };

        if delivery.last {
            self.in_flight -= 1;
        }

        LoopStep::Completed(delivery.completion)
    }
}

impl Drop for MemoryEngine {
    fn drop(&mut self) {
        // Closing the request channel stops the worker.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

// =============================================================================
// Worker
// =============================================================================

struct Worker {
    store: Arc<RwLock<Store>>,
    live_batches: Arc<AtomicUsize>,
    delay: Option<Duration>,
    deliveries: Sender<Delivery>,
}

impl Worker {
    fn run(self, requests: Receiver<Request>) {
        for request in requests.iter() {
            if let Some(delay) = self.delay {
                thread::sleep(delay);
            }
            self.serve(request);
        }
        trace!("engine worker stopped");
    }

    fn serve(&self, request: Request) {
        match request {
            Request::Get { handle, space, key } => {
                let (status, batch) = self.serve_get(&space, &key);
                self.deliver(handle, status, batch, true);
            }
            Request::Update {
                handle,
                verb,
                space,
                key,
                attrs,
            } => {
                let status = self.serve_update(verb, &space, &key, &attrs);
                self.deliver(handle, status, None, true);
            }
            Request::CondPut {
                handle,
                space,
                key,
                cond,
                attrs,
            } => {
                let status = self.serve_cond_put(&space, &key, &cond, &attrs);
                self.deliver(handle, status, None, true);
            }
            Request::Delete { handle, space, key } => {
                let status = self.serve_delete(&space, &key);
                self.deliver(handle, status, None, true);
            }
            Request::Search {
                handle,
                space,
                eq,
                ranges,
            } => self.serve_search(handle, &space, &eq, &ranges),
        }
    }

    fn deliver(&self, handle: OpHandle, status: Status, batch: Option<AttrBatch>, last: bool) {
        let _ = self.deliveries.send(Delivery {
            completion: Completion {
                handle,
                status: status.raw(),
                batch,
            },
            last,
        });
    }

    fn serve_get(&self, space: &str, key: &[u8]) -> (Status, Option<AttrBatch>) {
        let store = self.store.read();
        let Some(records) = store.get(space) else {
            return (Status::UNKNOWN_SPACE, None);
        };
        let Some(record) = records.get(key) else {
            return (Status::NOT_FOUND, None);
        };
        (Status::SUCCESS, Some(self.batch_for(record)))
    }

    fn serve_update(
        &self,
        verb: UpdateVerb,
        space: &str,
        key: &[u8],
        attrs: &[WireAttribute],
    ) -> Status {
        if has_duplicate_names(attrs) {
            return Status::DUPLICATE_ATTR;
        }
        let decoded = match decode_all(attrs) {
            Ok(decoded) => decoded,
            Err(status) => return status,
        };

        let mut store = self.store.write();
        let Some(records) = store.get_mut(space) else {
            return Status::UNKNOWN_SPACE;
        };

        let record = if verb == UpdateVerb::Put {
            records.entry(key.to_vec()).or_default()
        } else {
            match records.get_mut(key) {
                Some(record) => record,
                None => return Status::NOT_FOUND,
            }
        };

        apply_all(verb, record, decoded)
    }

    fn serve_cond_put(
        &self,
        space: &str,
        key: &[u8],
        cond: &[WireAttribute],
        attrs: &[WireAttribute],
    ) -> Status {
        if has_duplicate_names(cond) || has_duplicate_names(attrs) {
            return Status::DUPLICATE_ATTR;
        }
        let cond_decoded = match decode_all(cond) {
            Ok(decoded) => decoded,
            Err(status) => return status,
        };
        let decoded = match decode_all(attrs) {
            Ok(decoded) => decoded,
            Err(status) => return status,
        };

        let mut store = self.store.write();
        let Some(records) = store.get_mut(space) else {
            return Status::UNKNOWN_SPACE;
        };
        let Some(record) = records.get_mut(key) else {
            return Status::NOT_FOUND;
        };

        for (name, value) in &cond_decoded {
            let holds = match value {
                Value::Text(text) => record.strings.get(name) == Some(text),
                Value::Int(num) => record.ints.get(name) == Some(num),
                _ => return Status::WRONG_TYPE,
            };
            if !holds {
                return Status::COND_FAILED;
            }
        }

        apply_all(UpdateVerb::Put, record, decoded)
    }

    fn serve_delete(&self, space: &str, key: &[u8]) -> Status {
        let mut store = self.store.write();
        let Some(records) = store.get_mut(space) else {
            return Status::UNKNOWN_SPACE;
        };
        match records.remove(key) {
            Some(_) => Status::SUCCESS,
            None => Status::NOT_FOUND,
        }
    }

    fn serve_search(&self, handle: OpHandle, space: &str, eq: &[WireAttribute], ranges: &[RangeQuery]) {
        let eq_decoded = match decode_all(eq) {
            Ok(decoded) => decoded,
            Err(status) => {
                self.deliver(handle, status, None, true);
                return;
            }
        };

        let store = self.store.read();
        let Some(records) = store.get(space) else {
            self.deliver(handle, Status::UNKNOWN_SPACE, None, true);
            return;
        };

        // One completion per matching row, in key order, then the terminal
        // search-done completion under the same handle.
        for record in records.values() {
            if matches(record, &eq_decoded, ranges) {
                self.deliver(handle, Status::SUCCESS, Some(self.batch_for(record)), false);
            }
        }
        self.deliver(handle, Status::SEARCH_DONE, None, true);
    }

    fn batch_for(&self, record: &Record) -> AttrBatch {
        let mut attrs = Vec::with_capacity(record.strings.len() + record.ints.len());
        attribute::extend_strings(&mut attrs, &record.strings);
        attribute::extend_ints(&mut attrs, &record.ints);
        AttrBatch::tracked(attrs, Arc::clone(&self.live_batches))
    }
}

// =============================================================================
// Verb Application
// =============================================================================

fn decode_all(attrs: &[WireAttribute]) -> std::result::Result<Vec<(String, Value)>, Status> {
    attrs
        .iter()
        .map(|attr| attribute::decode(attr).map_err(|_| Status::SERVER_ERROR))
        .collect()
}

fn has_duplicate_names(attrs: &[WireAttribute]) -> bool {
    // Scalar attributes are unique by name, map attributes by (name, key).
    let mut seen = BTreeSet::new();
    attrs
        .iter()
        .any(|attr| !seen.insert((attr.name.clone(), attr.map_key.clone())))
}

/// Apply every attribute or none: a failure leaves the record untouched
fn apply_all(verb: UpdateVerb, record: &mut Record, decoded: Vec<(String, Value)>) -> Status {
    let mut updated = record.clone();
    for (name, value) in decoded {
        let status = apply(verb, &mut updated, &name, value);
        if status != Status::SUCCESS {
            return status;
        }
    }
    *record = updated;
    Status::SUCCESS
}

fn apply(verb: UpdateVerb, record: &mut Record, name: &str, value: Value) -> Status {
    use UpdateVerb::*;

    match (verb, value) {
        (Put, Value::Text(text)) => put_string(record, name, text),
        (Put, Value::Int(num)) => put_int(record, name, num),

        (AtomicAdd, Value::Int(num)) => int_arith(record, name, |v| Some(v.wrapping_add(num))),
        (AtomicSub, Value::Int(num)) => int_arith(record, name, |v| Some(v.wrapping_sub(num))),
        (AtomicMul, Value::Int(num)) => int_arith(record, name, |v| Some(v.wrapping_mul(num))),
        (AtomicDiv, Value::Int(num)) => int_arith(record, name, |v| v.checked_div(num)),
        (AtomicRem, Value::Int(num)) => int_arith(record, name, |v| v.checked_rem(num)),
        (BitAnd, Value::Int(num)) => int_arith(record, name, |v| Some(v & num)),
        (BitOr, Value::Int(num)) => int_arith(record, name, |v| Some(v | num)),
        (BitXor, Value::Int(num)) => int_arith(record, name, |v| Some(v ^ num)),

        (StringPrepend, Value::Text(text)) => {
            string_mutate(record, name, |v| format!("{text}{v}"))
        }
        (StringAppend, Value::Text(text)) => {
            string_mutate(record, name, |v| format!("{v}{text}"))
        }

        (ListLpush, Value::Text(text)) => with_family(record, name, Family::StrList, |r| {
            r.string_lists.entry(name.to_string()).or_default().insert(0, text);
        }),
        (ListLpush, Value::Int(num)) => with_family(record, name, Family::IntList, |r| {
            r.int_lists.entry(name.to_string()).or_default().insert(0, num);
        }),
        (ListRpush, Value::Text(text)) => with_family(record, name, Family::StrList, |r| {
            r.string_lists.entry(name.to_string()).or_default().push(text);
        }),
        (ListRpush, Value::Int(num)) => with_family(record, name, Family::IntList, |r| {
            r.int_lists.entry(name.to_string()).or_default().push(num);
        }),

        (SetAdd, Value::Text(text)) => with_family(record, name, Family::StrSet, |r| {
            r.string_sets.entry(name.to_string()).or_default().insert(text);
        }),
        (SetAdd, Value::Int(num)) => with_family(record, name, Family::IntSet, |r| {
            r.int_sets.entry(name.to_string()).or_default().insert(num);
        }),
        (SetRemove, Value::Text(text)) => with_family(record, name, Family::StrSet, |r| {
            r.string_sets.entry(name.to_string()).or_default().remove(&text);
        }),
        (SetRemove, Value::Int(num)) => with_family(record, name, Family::IntSet, |r| {
            r.int_sets.entry(name.to_string()).or_default().remove(&num);
        }),
        (SetIntersect, Value::Text(text)) => with_family(record, name, Family::StrSet, |r| {
            r.string_sets.entry(name.to_string()).or_default().retain(|e| e == &text);
        }),
        (SetIntersect, Value::Int(num)) => with_family(record, name, Family::IntSet, |r| {
            r.int_sets.entry(name.to_string()).or_default().retain(|e| e == &num);
        }),
        (SetUnion, Value::Text(text)) => with_family(record, name, Family::StrSet, |r| {
            r.string_sets.entry(name.to_string()).or_default().insert(text);
        }),
        (SetUnion, Value::Int(num)) => with_family(record, name, Family::IntSet, |r| {
            r.int_sets.entry(name.to_string()).or_default().insert(num);
        }),

        (MapAdd, Value::TextMapEntry { key, value }) => {
            with_family(record, name, Family::StrMap, |r| {
                r.string_maps.entry(name.to_string()).or_default().insert(key, value);
            })
        }
        (MapAdd, Value::IntMapEntry { key, value }) => {
            with_family(record, name, Family::IntMap, |r| {
                r.int_maps.entry(name.to_string()).or_default().insert(key, value);
            })
        }
        (MapRemove, Value::TextMapEntry { key, .. }) => {
            with_family(record, name, Family::StrMap, |r| {
                r.string_maps.entry(name.to_string()).or_default().remove(&key);
            })
        }
        (MapRemove, Value::IntMapEntry { key, .. }) => {
            with_family(record, name, Family::IntMap, |r| {
                r.int_maps.entry(name.to_string()).or_default().remove(&key);
            })
        }

        (MapAddNum, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v.wrapping_add(value)))
        }
        (MapSubNum, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v.wrapping_sub(value)))
        }
        (MapMulNum, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v.wrapping_mul(value)))
        }
        (MapDivNum, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| v.checked_div(value))
        }
        (MapRemNum, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| v.checked_rem(value))
        }
        (MapBitAnd, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v & value))
        }
        (MapBitOr, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v | value))
        }
        (MapBitXor, Value::IntMapEntry { key, value }) => {
            map_int_arith(record, name, key, |v| Some(v ^ value))
        }

        (MapStringPrepend, Value::TextMapEntry { key, value }) => {
            map_string_mutate(record, name, key, |v| format!("{value}{v}"))
        }
        (MapStringAppend, Value::TextMapEntry { key, value }) => {
            map_string_mutate(record, name, key, |v| format!("{v}{value}"))
        }

        // Verb and value family do not combine.
        _ => Status::WRONG_TYPE,
    }
}

fn family_of(record: &Record, name: &str) -> Option<Family> {
    if record.strings.contains_key(name) {
        Some(Family::Str)
    } else if record.ints.contains_key(name) {
        Some(Family::Int)
    } else if record.string_lists.contains_key(name) {
        Some(Family::StrList)
    } else if record.int_lists.contains_key(name) {
        Some(Family::IntList)
    } else if record.string_sets.contains_key(name) {
        Some(Family::StrSet)
    } else if record.int_sets.contains_key(name) {
        Some(Family::IntSet)
    } else if record.string_maps.contains_key(name) {
        Some(Family::StrMap)
    } else if record.int_maps.contains_key(name) {
        Some(Family::IntMap)
    } else {
        None
    }
}

fn conflicts(record: &Record, name: &str, family: Family) -> bool {
    family_of(record, name).map_or(false, |f| f != family)
}

fn with_family(
    record: &mut Record,
    name: &str,
    family: Family,
    mutate: impl FnOnce(&mut Record),
) -> Status {
    if conflicts(record, name, family) {
        return Status::WRONG_TYPE;
    }
    mutate(record);
    Status::SUCCESS
}

fn put_string(record: &mut Record, name: &str, text: String) -> Status {
    with_family(record, name, Family::Str, |r| {
        r.strings.insert(name.to_string(), text);
    })
}

fn put_int(record: &mut Record, name: &str, num: u64) -> Status {
    with_family(record, name, Family::Int, |r| {
        r.ints.insert(name.to_string(), num);
    })
}

fn int_arith(record: &mut Record, name: &str, op: impl FnOnce(u64) -> Option<u64>) -> Status {
    if conflicts(record, name, Family::Int) {
        return Status::WRONG_TYPE;
    }
    let slot = record.ints.entry(name.to_string()).or_insert(0);
    match op(*slot) {
        Some(value) => {
            *slot = value;
            Status::SUCCESS
        }
        None => Status::ARITHMETIC_FAULT,
    }
}

fn string_mutate(record: &mut Record, name: &str, op: impl FnOnce(&str) -> String) -> Status {
    if conflicts(record, name, Family::Str) {
        return Status::WRONG_TYPE;
    }
    let slot = record.strings.entry(name.to_string()).or_default();
    let updated = op(slot);
    *slot = updated;
    Status::SUCCESS
}

fn map_int_arith(
    record: &mut Record,
    name: &str,
    key: String,
    op: impl FnOnce(u64) -> Option<u64>,
) -> Status {
    if conflicts(record, name, Family::IntMap) {
        return Status::WRONG_TYPE;
    }
    let map = record.int_maps.entry(name.to_string()).or_default();
    let slot = map.entry(key).or_insert(0);
    match op(*slot) {
        Some(value) => {
            *slot = value;
            Status::SUCCESS
        }
        None => Status::ARITHMETIC_FAULT,
    }
}

fn map_string_mutate(
    record: &mut Record,
    name: &str,
    key: String,
    op: impl FnOnce(&str) -> String,
) -> Status {
    if conflicts(record, name, Family::StrMap) {
        return Status::WRONG_TYPE;
    }
    let map = record.string_maps.entry(name.to_string()).or_default();
    let slot = map.entry(key).or_default();
    let updated = op(slot);
    *slot = updated;
    Status::SUCCESS
}

fn matches(record: &Record, eq: &[(String, Value)], ranges: &[RangeQuery]) -> bool {
    for (name, value) in eq {
        let holds = match value {
            Value::Text(text) => record.strings.get(name) == Some(text),
            Value::Int(num) => record.ints.get(name) == Some(num),
            _ => false,
        };
        if !holds {
            return false;
        }
    }
    for range in ranges {
        match record.ints.get(&range.attr) {
            Some(value) if (range.lower..=range.upper).contains(value) => {}
            _ => return false,
        }
    }
    true
}
