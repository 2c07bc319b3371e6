//! Operation Bridge Tests
//!
//! Tests verify:
//! - Submit-time rejection short-circuits the event loop
//! - Loop failure becomes the call's status
//! - The completion's own status is what comes back
//! - Handle correlation and status-band invariants halt on violation
//! - Attribute batches are released on every exit path

mod common;

use orbitkv::attribute::{self, Value};
use orbitkv::bridge;
use orbitkv::engine::{EngineDriver, LoopStep, OpHandle, Submit};
use orbitkv::Status;

use common::ScriptedEngine;

// =============================================================================
// Status Plumbing
// =============================================================================

#[test]
fn test_submit_rejection_short_circuits_the_loop() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Rejected(Status::CONNECT_FAILED.raw()));
    // No loop steps scripted: touching the loop would panic.

    let (status, batch) = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
    assert_eq!(status, Status::CONNECT_FAILED);
    assert!(batch.is_none());
}

#[test]
fn test_loop_failure_becomes_the_call_status() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(1)));
    engine.queue_step(LoopStep::Failed(Status::DISCONNECTED.raw()));

    let (status, _) = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
    assert_eq!(status, Status::DISCONNECTED);
}

#[test]
fn test_completion_status_is_returned_not_loop_status() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(7)));
    let step = engine.completion(7, Status::NOT_FOUND.raw(), None);
    engine.queue_step(step);

    let (status, _) = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
    assert_eq!(status, Status::NOT_FOUND);
}

#[test]
fn test_matching_handle_round_trip() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(42)));
    let attrs = vec![attribute::encode("age", &Value::Int(30))];
    let step = engine.completion(42, Status::SUCCESS.raw(), Some(attrs));
    engine.queue_step(step);

    let (status, batch) = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
    assert_eq!(status, Status::SUCCESS);
    assert_eq!(batch.unwrap().len(), 1);
}

// =============================================================================
// Invariant Violations
// =============================================================================

#[test]
#[should_panic(expected = "completion correlates a different operation")]
fn test_mismatched_handle_panics() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(1)));
    let step = engine.completion(2, Status::SUCCESS.raw(), None);
    engine.queue_step(step);

    let _ = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
}

#[test]
#[should_panic(expected = "outside reserved band")]
fn test_out_of_band_rejection_status_panics() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Rejected(1));

    let _ = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
}

#[test]
#[should_panic(expected = "outside reserved band")]
fn test_out_of_band_completion_status_panics() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(1)));
    let step = engine.completion(1, 9000, None);
    engine.queue_step(step);

    let _ = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
}

#[test]
#[should_panic(expected = "outside reserved band")]
fn test_out_of_band_loop_status_panics() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(1)));
    engine.queue_step(LoopStep::Failed(0));

    let _ = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
}

// =============================================================================
// Batch Release
// =============================================================================

#[test]
fn test_batch_released_after_normal_completion() {
    let mut engine = ScriptedEngine::new();
    engine.queue_submit(Submit::Queued(OpHandle(3)));
    let attrs = vec![attribute::encode("name", &Value::Text("alice".to_string()))];
    let step = engine.completion(3, Status::SUCCESS.raw(), Some(attrs));
    engine.queue_step(step);

    let (status, batch) = bridge::execute(&mut engine, |e| e.get("space1", b"k"));
    assert_eq!(status, Status::SUCCESS);
    assert_eq!(engine.outstanding_batches(), 1);

    drop(batch);
    assert_eq!(engine.outstanding_batches(), 0);
}
