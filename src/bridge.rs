//! Operation Bridge
//!
//! Submits one asynchronous request and drives the engine's event loop
//! until that request completes.
//!
//! ## Single-flight contract
//! The client never pipelines: at most one operation is outstanding per
//! engine, so the next completion surfaced by the loop must correlate the
//! request just submitted. A mismatched handle is a protocol-invariant
//! violation and halts rather than being absorbed. Every status crossing
//! this boundary is band-validated by [`Status::from_raw`], on the submit
//! path, the loop-failure path, and the completion path alike.

use tracing::trace;

use crate::assembler::{SearchAssembler, StreamStep};
use crate::engine::{AttrBatch, EngineDriver, LoopStep, Submit};
use crate::error::Result;
use crate::status::Status;

/// Submit one request and block until its completion.
///
/// Returns the completed operation's own status together with its
/// attribute batch. The loop status only says whether some completion
/// occurred; the per-operation outcome is what callers classify.
pub fn execute<E, F>(engine: &mut E, submit: F) -> (Status, Option<AttrBatch>)
where
    E: EngineDriver,
    F: FnOnce(&mut E) -> Submit,
{
    let handle = match submit(engine) {
        // Nothing was queued; the submit-time status is the outcome.
        Submit::Rejected(raw) => return (Status::from_raw(raw), None),
        Submit::Queued(handle) => handle,
    };

    trace!(handle = handle.0, "operation submitted");

    match engine.advance(None) {
        LoopStep::Failed(raw) => (Status::from_raw(raw), None),
        LoopStep::Completed(completion) => {
            assert_eq!(
                completion.handle, handle,
                "completion correlates a different operation"
            );
            let status = Status::from_raw(completion.status);
            trace!(handle = handle.0, %status, "operation completed");
            (status, completion.batch)
        }
    }
}

/// Submit a streaming search and drive the loop until the stream ends.
///
/// Row completions are fed to the assembler as they arrive; each batch is
/// released when its loop iteration ends. The terminal search-done status
/// maps to plain success; any other non-success status aborts the stream
/// and becomes the call's status.
pub fn execute_stream<E, F>(
    engine: &mut E,
    submit: F,
    assembler: &mut SearchAssembler,
) -> Result<Status>
where
    E: EngineDriver,
    F: FnOnce(&mut E) -> Submit,
{
    let handle = match submit(engine) {
        Submit::Rejected(raw) => return Ok(Status::from_raw(raw)),
        Submit::Queued(handle) => handle,
    };

    trace!(handle = handle.0, "search submitted");

    loop {
        match engine.advance(None) {
            LoopStep::Failed(raw) => return Ok(Status::from_raw(raw)),
            LoopStep::Completed(completion) => {
                assert_eq!(
                    completion.handle, handle,
                    "completion correlates a different operation"
                );
                let status = Status::from_raw(completion.status);
                match assembler.absorb(status, completion.batch.as_ref())? {
                    StreamStep::Continue => {}
                    StreamStep::Done => {
                        trace!(handle = handle.0, rows = assembler.rows().len(), "search done");
                        return Ok(Status::SUCCESS);
                    }
                    StreamStep::Abort(status) => return Ok(status),
                }
            }
        }
    }
}
