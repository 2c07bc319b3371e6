//! Search and Result Assembly Tests
//!
//! Tests verify:
//! - Range search over stored rows, in delivery order
//! - Equality search predicates
//! - One completion equals one row, with no attribute bleed
//! - Mid-stream errors truncate the stream but keep completed rows
//! - Predicate and resource accounting rules

mod common;

use orbitkv::assembler::{SearchAssembler, StreamStep};
use orbitkv::attribute::{self, Value};
use orbitkv::client::{IntAttrs, RangePredicates, StringAttrs};
use orbitkv::engine::{AttrBatch, OpHandle, Submit};
use orbitkv::{Client, Config, MemoryEngine, OrbitError, Status};

use common::ScriptedEngine;

fn seeded_client() -> Client<MemoryEngine> {
    let config = Config::builder().space("space1").build();
    let mut client = Client::new(MemoryEngine::open(config).unwrap());

    for (key, name, age) in [
        (b"key1".as_ref(), "alice", 25u64),
        (b"key2".as_ref(), "bob", 50),
        (b"key3".as_ref(), "carol", 30),
    ] {
        let mut strings = StringAttrs::new();
        strings.insert("name".to_string(), name.to_string());
        let mut ints = IntAttrs::new();
        ints.insert("age".to_string(), age);
        client.put("space1", key, &strings, &ints).unwrap();
    }

    client
}

// =============================================================================
// Range Search
// =============================================================================

#[test]
fn test_range_search_yields_matching_rows_in_delivery_order() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    client
        .range_search("space1", "age", 20, 40, &mut rows)
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].ints.get("age"), Some(&25));
    assert_eq!(rows[1].ints.get("age"), Some(&30));
}

#[test]
fn test_range_bounds_are_inclusive() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    client
        .range_search("space1", "age", 25, 30, &mut rows)
        .unwrap();

    assert_eq!(rows.len(), 2);
}

#[test]
fn test_range_search_with_no_matches_yields_no_rows() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    client
        .range_search("space1", "age", 100, 200, &mut rows)
        .unwrap();

    assert!(rows.is_empty());
}

// =============================================================================
// Equality Search
// =============================================================================

#[test]
fn test_equality_search_on_string_attribute() {
    let mut client = seeded_client();

    let mut eq = StringAttrs::new();
    eq.insert("name".to_string(), "bob".to_string());

    let mut rows = Vec::new();
    client
        .search("space1", &eq, &IntAttrs::new(), &RangePredicates::new(), &mut rows)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ints.get("age"), Some(&50));
}

#[test]
fn test_combined_equality_and_range_predicates() {
    let mut client = seeded_client();

    let mut eq = StringAttrs::new();
    eq.insert("name".to_string(), "alice".to_string());
    let mut ranges = RangePredicates::new();
    ranges.insert("age".to_string(), (20, 60));

    let mut rows = Vec::new();
    client
        .search("space1", &eq, &IntAttrs::new(), &ranges, &mut rows)
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].strings.get("name").map(String::as_str),
        Some("alice")
    );
}

#[test]
fn test_search_requires_at_least_one_predicate() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    let err = client
        .search(
            "space1",
            &StringAttrs::new(),
            &IntAttrs::new(),
            &RangePredicates::new(),
            &mut rows,
        )
        .unwrap_err();

    assert!(matches!(err, OrbitError::EmptyAttrs(_)));
}

#[test]
fn test_search_unknown_space_is_an_error() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    let err = client
        .range_search("nowhere", "age", 0, 10, &mut rows)
        .unwrap_err();
    assert_eq!(err.status(), Some(Status::UNKNOWN_SPACE));
    assert!(rows.is_empty());
}

#[test]
fn test_search_batches_released() {
    let mut client = seeded_client();

    let mut rows = Vec::new();
    client
        .range_search("space1", "age", 0, 100, &mut rows)
        .unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(client.engine().outstanding_batches(), 0);
}

// =============================================================================
// Stream Assembly
// =============================================================================

fn row_batch(name: &str, age: u64) -> AttrBatch {
    AttrBatch::new(vec![
        attribute::encode("name", &Value::Text(name.to_string())),
        attribute::encode("age", &Value::Int(age)),
    ])
}

#[test]
fn test_assembler_builds_one_row_per_completion() {
    let mut assembler = SearchAssembler::new();

    for (name, age) in [("alice", 25u64), ("bob", 50), ("carol", 30)] {
        let step = assembler
            .absorb(Status::SUCCESS, Some(&row_batch(name, age)))
            .unwrap();
        assert_eq!(step, StreamStep::Continue);
    }
    let step = assembler.absorb(Status::SEARCH_DONE, None).unwrap();
    assert_eq!(step, StreamStep::Done);

    let rows = assembler.into_rows();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].ints.get("age"), Some(&25));
    assert_eq!(rows[1].ints.get("age"), Some(&50));
    assert_eq!(rows[2].ints.get("age"), Some(&30));
}

#[test]
fn test_no_attributes_bleed_across_row_boundaries() {
    let mut assembler = SearchAssembler::new();

    let first = AttrBatch::new(vec![attribute::encode(
        "name",
        &Value::Text("alice".to_string()),
    )]);
    let second = AttrBatch::new(vec![attribute::encode("age", &Value::Int(30))]);

    assembler.absorb(Status::SUCCESS, Some(&first)).unwrap();
    assembler.absorb(Status::SUCCESS, Some(&second)).unwrap();
    assembler.absorb(Status::SEARCH_DONE, None).unwrap();

    let rows = assembler.into_rows();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].ints.is_empty());
    assert!(rows[1].strings.is_empty());
}

#[test]
fn test_error_after_first_row_truncates_the_stream() {
    let mut assembler = SearchAssembler::new();

    assembler
        .absorb(Status::SUCCESS, Some(&row_batch("alice", 25)))
        .unwrap();
    let step = assembler.absorb(Status::SERVER_ERROR, None).unwrap();

    assert_eq!(step, StreamStep::Abort(Status::SERVER_ERROR));
    assert_eq!(assembler.rows().len(), 1);
}

// =============================================================================
// Mid-stream Failure Through the Facade
// =============================================================================

#[test]
fn test_mid_stream_error_keeps_completed_rows_and_reports_the_error() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(9)));

    let row = engine.completion(
        9,
        Status::SUCCESS.raw(),
        Some(vec![attribute::encode("age", &Value::Int(25))]),
    );
    engine.queue_step(row);
    let failure = engine.completion(9, Status::SERVER_ERROR.raw(), None);
    engine.queue_step(failure);

    let mut client = Client::new(engine);
    let mut rows = Vec::new();
    let err = client
        .range_search("space1", "age", 0, 100, &mut rows)
        .unwrap_err();

    assert_eq!(err.status(), Some(Status::SERVER_ERROR));
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].ints.get("age"), Some(&25));
    assert_eq!(client.engine().outstanding_batches(), 0);
}
