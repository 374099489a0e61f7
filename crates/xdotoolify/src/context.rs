// Copyright 2026 Paul Adamson
// Licensed under the Apache License, Version 2.0
//
// Execution context - safe/unsafe mode stack and nested-run bookkeeping
//
// One `ExecutionContext` exists per top-level `execute` call. While a `run`
// callback is being awaited its `RunScope` is installed as a task-local, so
// every chain built or executed by that future joins the same invocation tree
// no matter which `Page` handle it came from. Independent top-level chains
// never share one, so concurrent chains cannot see each other's modes.
//
// Work moved onto another task with `tokio::spawn` leaves the tree.

use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Stack of execution modes (`true` = unsafe) for one invocation tree.
#[derive(Clone, Default)]
pub(crate) struct ExecutionContext {
    frames: Arc<Mutex<Vec<bool>>>,
}

impl ExecutionContext {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Pushes a frame. An unsafe frame is rejected while any enclosing frame is safe.
    pub(crate) fn enter(&self, unsafe_mode: bool) -> Result<FrameGuard> {
        let mut frames = self.frames.lock();
        if unsafe_mode && frames.iter().any(|unsafe_frame| !unsafe_frame) {
            return Err(Error::UnsafeWithinSafe);
        }
        frames.push(unsafe_mode);
        Ok(FrameGuard {
            frames: Arc::clone(&self.frames),
        })
    }

    pub(crate) fn depth(&self) -> usize {
        self.frames.lock().len()
    }
}

/// Pops its frame when dropped, on success and failure alike.
pub(crate) struct FrameGuard {
    frames: Arc<Mutex<Vec<bool>>>,
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.frames.lock().pop();
    }
}

tokio::task_local! {
    static CURRENT_RUN: RunScope;
}

/// Scope of one `Run` action: the shared mode stack plus a ledger of the
/// chains its callback opened.
#[derive(Clone)]
pub(crate) struct RunScope {
    context: ExecutionContext,
    ledger: Arc<RunLedger>,
}

#[derive(Default)]
struct RunLedger {
    opened: AtomicUsize,
    executed: AtomicUsize,
    require_check: AtomicBool,
}

impl RunScope {
    pub(crate) fn new(context: ExecutionContext) -> Self {
        Self {
            context,
            ledger: Arc::default(),
        }
    }

    /// Scope of the `run` callback the current future is executing, if any.
    pub(crate) fn current() -> Option<RunScope> {
        CURRENT_RUN.try_with(RunScope::clone).ok()
    }

    /// Awaits `future` with this scope installed as the current one.
    pub(crate) async fn run_within<F: Future>(self, future: F) -> F::Output {
        CURRENT_RUN.scope(self, future).await
    }

    pub(crate) fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub(crate) fn chain_opened(&self) {
        self.ledger.opened.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn chain_executed(&self) {
        self.ledger.executed.fetch_add(1, Ordering::SeqCst);
    }

    /// Number of chains opened in this scope that never reached `execute`.
    pub(crate) fn unexecuted(&self) -> usize {
        let opened = self.ledger.opened.load(Ordering::SeqCst);
        opened.saturating_sub(self.ledger.executed.load(Ordering::SeqCst))
    }

    /// Hands a pending require-check marker to the chain that owns this run.
    pub(crate) fn defer_require_check(&self) {
        self.ledger.require_check.store(true, Ordering::SeqCst);
    }

    pub(crate) fn take_require_check(&self) -> bool {
        self.ledger.require_check.swap(false, Ordering::SeqCst)
    }
}
