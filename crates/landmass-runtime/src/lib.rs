//! Runtime job queue and executors (slim, engine-only).
//!
//! Work runs wherever the [`Executor`] puts it; completions always come back
//! through one FIFO and are dispatched on the thread that owns the queue.
#![forbid(unsafe_code)]

mod executor;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, unbounded};
use thiserror::Error;

pub use executor::{CooperativeExecutor, Executor, InlineExecutor, Job, RayonExecutor};

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum JobError {
    #[error("job panicked: {0}")]
    Panicked(String),
}

/// Submit refused because `max_in_flight` jobs are already outstanding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("work queue saturated ({in_flight} of {cap} in flight)")]
pub struct Saturated {
    pub in_flight: usize,
    pub cap: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub rejected: usize,
    pub in_flight: usize,
}

#[derive(Default)]
struct Counters {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    failed: AtomicUsize,
    rejected: AtomicUsize,
    in_flight: AtomicUsize,
}

type Callback<C> = Box<dyn FnOnce(&mut C, &WorkQueue<C>) + Send>;

struct Completion<C> {
    failed: bool,
    callback: Callback<C>,
}

/// Background work with main-thread callbacks.
///
/// A job counts as in flight from `submit` until its callback is dispatched by
/// [`WorkQueue::drain_and_dispatch`].
pub struct WorkQueue<C> {
    executor: Arc<dyn Executor>,
    done_tx: Sender<Completion<C>>,
    done_rx: Receiver<Completion<C>>,
    counters: Arc<Counters>,
    max_in_flight: Option<usize>,
}

impl<C: 'static> WorkQueue<C> {
    pub fn new(executor: Arc<dyn Executor>) -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            executor,
            done_tx,
            done_rx,
            counters: Arc::new(Counters::default()),
            max_in_flight: None,
        }
    }

    pub fn with_max_in_flight(mut self, cap: Option<usize>) -> Self {
        self.max_in_flight = cap;
        self
    }

    pub fn set_max_in_flight(&mut self, cap: Option<usize>) {
        self.max_in_flight = cap;
    }

    pub fn max_in_flight(&self) -> Option<usize> {
        self.max_in_flight
    }

    /// Runs `work` on the executor; `on_result` later runs inside
    /// `drain_and_dispatch` with the owner's context. Never blocks.
    pub fn submit<R, W, F>(&self, work: W, on_result: F) -> Result<(), Saturated>
    where
        R: Send + 'static,
        W: FnOnce() -> R + Send + 'static,
        F: FnOnce(&mut C, &WorkQueue<C>, Result<R, JobError>) + Send + 'static,
    {
        let in_flight = self.counters.in_flight.load(Ordering::Relaxed);
        if let Some(cap) = self.max_in_flight
            && in_flight >= cap
        {
            self.counters.rejected.fetch_add(1, Ordering::Relaxed);
            log::trace!(target: "runtime", "submit rejected: {in_flight}/{cap} in flight");
            return Err(Saturated { in_flight, cap });
        }
        self.counters.in_flight.fetch_add(1, Ordering::Relaxed);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);

        let tx = self.done_tx.clone();
        let counters = Arc::clone(&self.counters);
        self.executor.execute(Box::new(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(work)).map_err(|payload| {
                let msg = panic_message(&*payload);
                log::error!(target: "runtime", "job panicked: {msg}");
                JobError::Panicked(msg)
            });
            let completion = Completion {
                failed: result.is_err(),
                callback: Box::new(move |ctx: &mut C, queue: &WorkQueue<C>| {
                    on_result(ctx, queue, result)
                }),
            };
            if tx.send(completion).is_err() {
                // Owner is gone; nobody will dispatch this.
                counters.in_flight.fetch_sub(1, Ordering::Relaxed);
            }
        }));
        Ok(())
    }

    /// Dispatches the completions queued when the call starts, in completion
    /// order. Completions produced meanwhile wait for the next call.
    pub fn drain_and_dispatch(&self, ctx: &mut C) -> usize {
        let queued = self.done_rx.len();
        let mut dispatched = 0;
        while dispatched < queued {
            let Ok(done) = self.done_rx.try_recv() else {
                break;
            };
            self.counters.in_flight.fetch_sub(1, Ordering::Relaxed);
            self.counters.completed.fetch_add(1, Ordering::Relaxed);
            if done.failed {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            (done.callback)(ctx, self);
            dispatched += 1;
        }
        dispatched
    }

    /// Completions waiting for the next drain.
    pub fn pending_completions(&self) -> usize {
        self.done_rx.len()
    }

    pub fn in_flight(&self) -> usize {
        self.counters.in_flight.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            rejected: self.counters.rejected.load(Ordering::Relaxed),
            in_flight: self.counters.in_flight.load(Ordering::Relaxed),
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
