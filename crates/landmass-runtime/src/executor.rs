use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Where submitted work actually runs.
pub trait Executor: Send + Sync {
    fn execute(&self, job: Job);
}

/// Background workers on a dedicated, named rayon pool.
pub struct RayonExecutor {
    pool: ThreadPool,
    workers: usize,
}

impl RayonExecutor {
    /// `threads == 0` picks the available parallelism.
    pub fn new(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let workers = if threads == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            threads
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("landmass-worker-{i}"))
            .build()?;
        log::info!(target: "runtime", "worker pool started with {workers} thread(s)");
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Executor for RayonExecutor {
    fn execute(&self, job: Job) {
        self.pool.spawn(job);
    }
}

/// Runs each job on the submitting thread before `execute` returns.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn execute(&self, job: Job) {
        job();
    }
}

/// Parks jobs until the host calls [`CooperativeExecutor::run_pending`].
/// For hosts without threads, and for tests that need to order completions.
pub struct CooperativeExecutor {
    tx: Sender<Job>,
    rx: Receiver<Job>,
}

impl Default for CooperativeExecutor {
    fn default() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl CooperativeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Runs the jobs parked at call time, oldest first. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        self.run_at_most(self.rx.len())
    }

    /// Runs up to `max` parked jobs, oldest first.
    pub fn run_at_most(&self, max: usize) -> usize {
        let mut ran = 0;
        while ran < max {
            match self.rx.try_recv() {
                Ok(job) => {
                    job();
                    ran += 1;
                }
                Err(_) => break,
            }
        }
        ran
    }
}

impl Executor for CooperativeExecutor {
    fn execute(&self, job: Job) {
        // Both ends live in `self`, so the send cannot fail.
        let _ = self.tx.send(job);
    }
}
