use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use landmass_runtime::{
    CooperativeExecutor, InlineExecutor, JobError, QueueStats, RayonExecutor, Saturated, WorkQueue,
};

#[derive(Default)]
struct Sink {
    seen: Vec<u32>,
    errors: Vec<JobError>,
}

fn pump_until<C: 'static>(q: &WorkQueue<C>, ctx: &mut C, want: usize) -> usize {
    let deadline = Instant::now() + Duration::from_secs(10);
    let mut total = 0;
    while total < want && Instant::now() < deadline {
        total += q.drain_and_dispatch(ctx);
        if total < want {
            thread::sleep(Duration::from_millis(1));
        }
    }
    total
}

#[test]
fn k_jobs_yield_k_callbacks_on_rayon() {
    let exec = Arc::new(RayonExecutor::new(4).expect("pool"));
    let q: WorkQueue<Sink> = WorkQueue::new(exec);
    for i in 0..64u32 {
        q.submit(move || i * 2, |s: &mut Sink, _, r| s.seen.push(r.unwrap()))
            .unwrap();
    }
    let mut sink = Sink::default();
    assert_eq!(pump_until(&q, &mut sink, 64), 64);
    sink.seen.sort_unstable();
    assert_eq!(sink.seen, (0..64).map(|i| i * 2).collect::<Vec<_>>());
    let stats = q.stats();
    assert_eq!(stats.submitted, 64);
    assert_eq!(stats.completed, 64);
    assert_eq!(stats.in_flight, 0);
}

#[test]
fn empty_drain_is_noop() {
    let q: WorkQueue<Sink> = WorkQueue::new(Arc::new(InlineExecutor));
    let mut sink = Sink::default();
    assert_eq!(q.drain_and_dispatch(&mut sink), 0);
    assert_eq!(q.stats(), QueueStats::default());
}

#[test]
fn inline_results_wait_for_drain() {
    let q: WorkQueue<Sink> = WorkQueue::new(Arc::new(InlineExecutor));
    q.submit(|| 7u32, |s: &mut Sink, _, r| s.seen.push(r.unwrap())).unwrap();
    assert_eq!(q.pending_completions(), 1);
    assert_eq!(q.in_flight(), 1);
    let mut sink = Sink::default();
    assert!(sink.seen.is_empty());
    assert_eq!(q.drain_and_dispatch(&mut sink), 1);
    assert_eq!(sink.seen, vec![7]);
    assert_eq!(q.in_flight(), 0);
}

#[test]
fn callbacks_dispatch_in_completion_order() {
    let exec = Arc::new(CooperativeExecutor::new());
    let q: WorkQueue<Sink> = WorkQueue::new(exec.clone());
    for i in 0..5u32 {
        q.submit(move || i, |s: &mut Sink, _, r| s.seen.push(r.unwrap())).unwrap();
    }
    assert_eq!(exec.pending(), 5);
    assert_eq!(q.pending_completions(), 0);

    assert_eq!(exec.run_at_most(3), 3);
    let mut sink = Sink::default();
    assert_eq!(q.drain_and_dispatch(&mut sink), 3);
    assert_eq!(sink.seen, vec![0, 1, 2]);

    assert_eq!(exec.run_pending(), 2);
    assert_eq!(q.drain_and_dispatch(&mut sink), 2);
    assert_eq!(sink.seen, vec![0, 1, 2, 3, 4]);
}

#[test]
fn follow_up_submits_wait_for_next_drain() {
    let q: WorkQueue<Sink> = WorkQueue::new(Arc::new(InlineExecutor));
    q.submit(
        || 1u32,
        |s: &mut Sink, q: &WorkQueue<Sink>, r| {
            s.seen.push(r.unwrap());
            q.submit(|| 2u32, |s: &mut Sink, _, r| s.seen.push(r.unwrap()))
                .unwrap();
        },
    )
    .unwrap();
    let mut sink = Sink::default();
    assert_eq!(q.drain_and_dispatch(&mut sink), 1);
    assert_eq!(sink.seen, vec![1]);
    assert_eq!(q.drain_and_dispatch(&mut sink), 1);
    assert_eq!(sink.seen, vec![1, 2]);
    assert_eq!(q.drain_and_dispatch(&mut sink), 0);
}

#[test]
fn panicking_job_reports_error() {
    let q: WorkQueue<Sink> = WorkQueue::new(Arc::new(InlineExecutor));
    q.submit(
        || -> u32 { panic!("height map exploded") },
        |s: &mut Sink, _, r| match r {
            Ok(v) => s.seen.push(v),
            Err(e) => s.errors.push(e),
        },
    )
    .unwrap();
    q.submit(|| 3u32, |s: &mut Sink, _, r| s.seen.push(r.unwrap())).unwrap();
    let mut sink = Sink::default();
    assert_eq!(q.drain_and_dispatch(&mut sink), 2);
    assert_eq!(sink.errors, vec![JobError::Panicked("height map exploded".into())]);
    assert_eq!(sink.seen, vec![3]);
    let stats = q.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 2);
}

#[test]
fn panic_on_worker_thread_is_contained() {
    let q: WorkQueue<Sink> = WorkQueue::new(Arc::new(RayonExecutor::new(2).expect("pool")));
    q.submit(
        || -> u32 { panic!("boom {}", 42) },
        |s: &mut Sink, _, r| s.errors.push(r.unwrap_err()),
    )
    .unwrap();
    let mut sink = Sink::default();
    assert_eq!(pump_until(&q, &mut sink, 1), 1);
    assert_eq!(sink.errors, vec![JobError::Panicked("boom 42".into())]);
}

#[test]
fn saturated_queue_rejects_without_blocking() {
    let exec = Arc::new(CooperativeExecutor::new());
    let q: WorkQueue<Sink> = WorkQueue::new(exec.clone()).with_max_in_flight(Some(2));
    let push = |q: &WorkQueue<Sink>, v: u32| {
        q.submit(move || v, |s: &mut Sink, _, r| s.seen.push(r.unwrap()))
    };
    assert!(push(&q, 1).is_ok());
    assert!(push(&q, 2).is_ok());
    assert_eq!(push(&q, 3), Err(Saturated { in_flight: 2, cap: 2 }));
    assert_eq!(q.stats().rejected, 1);

    exec.run_pending();
    // Completed but not yet dispatched still counts.
    assert!(push(&q, 4).is_err());
    let mut sink = Sink::default();
    assert_eq!(q.drain_and_dispatch(&mut sink), 2);
    assert!(push(&q, 5).is_ok());
    assert_eq!(q.stats().rejected, 2);
    assert_eq!(q.stats().in_flight, 1);
}
