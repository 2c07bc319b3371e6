//! Shared test fixtures
//!
//! A scripted engine: submit results and loop steps are replayed from
//! queues, so tests can point the bridge at arbitrary engine behavior,
//! including misbehavior a real engine must never exhibit.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use orbitkv::attribute::WireAttribute;
use orbitkv::engine::{
    AttrBatch, Completion, EngineDriver, LoopStep, OpHandle, RangeQuery, Submit, UpdateVerb,
};

/// Replays canned submit results and loop steps
pub struct ScriptedEngine {
    submits: VecDeque<Submit>,
    steps: VecDeque<LoopStep>,
    pub submit_calls: usize,
    pub live_batches: Arc<AtomicUsize>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self {
            submits: VecDeque::new(),
            steps: VecDeque::new(),
            submit_calls: 0,
            live_batches: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn queue_submit(&mut self, submit: Submit) {
        self.submits.push_back(submit);
    }

    pub fn queue_step(&mut self, step: LoopStep) {
        self.steps.push_back(step);
    }

    /// A completion whose batch (if any) is tracked against this engine's
    /// live-batch counter
    pub fn completion(
        &self,
        handle: i64,
        status: u32,
        attrs: Option<Vec<WireAttribute>>,
    ) -> LoopStep {
        LoopStep::Completed(Completion {
            handle: OpHandle(handle),
            status,
            batch: attrs.map(|attrs| AttrBatch::tracked(attrs, Arc::clone(&self.live_batches))),
        })
    }

    pub fn outstanding_batches(&self) -> usize {
        self.live_batches.load(Ordering::SeqCst)
    }

    fn next_submit(&mut self) -> Submit {
        self.submit_calls += 1;
        self.submits.pop_front().expect("unscripted submit")
    }
}

impl EngineDriver for ScriptedEngine {
    fn get(&mut self, _space: &str, _key: &[u8]) -> Submit {
        self.next_submit()
    }

    fn update(
        &mut self,
        _verb: UpdateVerb,
        _space: &str,
        _key: &[u8],
        _attrs: &[WireAttribute],
    ) -> Submit {
        self.next_submit()
    }

    fn cond_put(
        &mut self,
        _space: &str,
        _key: &[u8],
        _cond: &[WireAttribute],
        _attrs: &[WireAttribute],
    ) -> Submit {
        self.next_submit()
    }

    fn delete(&mut self, _space: &str, _key: &[u8]) -> Submit {
        self.next_submit()
    }

    fn search(&mut self, _space: &str, _eq: &[WireAttribute], _ranges: &[RangeQuery]) -> Submit {
        self.next_submit()
    }

    fn advance(&mut self, _timeout: Option<Duration>) -> LoopStep {
        self.steps.pop_front().expect("unscripted loop step")
    }
}
