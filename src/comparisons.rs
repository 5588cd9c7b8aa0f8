//! Latency comparisons against a `BinaryHeap` with lazy cancellation.
//!
//! Run with `cargo test --release comparisons -- --ignored --nocapture`.

use hdrhistogram::Histogram;
use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashSet},
    time::{Duration, Instant},
};

use crate::{ManualClock, TimerHeap};

const WARMUP: u64 = 10_000;
const ITERATIONS: u64 = 100_000;
const BACKGROUND: u64 = 1_000;

// ============================================================
// BinaryHeap Baseline
// ============================================================

/// Cancelled ids are remembered and skipped when they reach the top, so
/// cancel is O(1) but dead entries stay in the heap until their deadline.
struct LazyHeap {
    heap: BinaryHeap<Reverse<(Instant, u32)>>,
    cancelled: HashSet<u32>,
    sequence: u32,
}

impl LazyHeap {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            cancelled: HashSet::new(),
            sequence: 0,
        }
    }

    fn insert(&mut self, when: Instant) -> u32 {
        self.sequence = self.sequence.wrapping_add(1);
        self.heap.push(Reverse((when, self.sequence)));
        self.sequence
    }

    fn cancel(&mut self, id: u32) {
        self.cancelled.insert(id);
    }

    fn poll(&mut self, now: Instant) -> usize {
        let mut fired = 0;
        while let Some(Reverse((when, id))) = self.heap.peek().copied() {
            if when > now {
                break;
            }
            self.heap.pop();
            if !self.cancelled.remove(&id) {
                fired += 1;
            }
        }
        fired
    }
}

fn print_histogram(name: &str, hist: &Histogram<u64>) {
    println!("\n=== {} ===", name);
    println!("  count:  {}", hist.len());
    println!("  min:    {} ns", hist.min());
    println!("  max:    {} ns", hist.max());
    println!("  mean:   {:.1} ns", hist.mean());
    println!("  p50:    {} ns", hist.value_at_quantile(0.50));
    println!("  p99:    {} ns", hist.value_at_quantile(0.99));
    println!("  p99.9:  {} ns", hist.value_at_quantile(0.999));
}

fn populated_timer_heap(epoch: Instant) -> (TimerHeap<ManualClock>, ManualClock) {
    let clock = ManualClock::starting_at(epoch);
    let mut timers = TimerHeap::with_clock_and_capacity(clock.clone(), BACKGROUND as usize);
    for i in 0..BACKGROUND {
        timers.insert(Duration::from_secs(3600 + i), |_, _, _| None);
    }
    (timers, clock)
}

fn populated_lazy_heap(epoch: Instant) -> LazyHeap {
    let mut heap = LazyHeap::new();
    for i in 0..BACKGROUND {
        heap.insert(epoch + Duration::from_secs(3600 + i));
    }
    heap
}

// ============================================================
// Latency Tests
// ============================================================

#[test]
#[ignore]
fn hdr_insert_cancel_latency_timer_heap() {
    let epoch = Instant::now();
    let (mut timers, _clock) = populated_timer_heap(epoch);

    let mut insert_hist = Histogram::<u64>::new(3).unwrap();
    let mut cancel_hist = Histogram::<u64>::new(3).unwrap();

    for i in 0..WARMUP {
        let id = timers.insert(Duration::from_millis((i % 500) + 10), |_, _, _| None);
        timers.remove_timer(id);
    }

    for i in 0..ITERATIONS {
        let delay = Duration::from_millis((i % 500) + 10);

        let start = Instant::now();
        let id = timers.insert(delay, |_, _, _| None);
        insert_hist.record(start.elapsed().as_nanos() as u64).unwrap();

        let start = Instant::now();
        timers.remove_timer(id);
        cancel_hist.record(start.elapsed().as_nanos() as u64).unwrap();
    }

    print_histogram("TimerHeap Insert", &insert_hist);
    print_histogram("TimerHeap Cancel", &cancel_hist);
}

#[test]
#[ignore]
fn hdr_insert_cancel_latency_lazy_heap() {
    let epoch = Instant::now();
    let mut heap = populated_lazy_heap(epoch);

    let mut insert_hist = Histogram::<u64>::new(3).unwrap();
    let mut cancel_hist = Histogram::<u64>::new(3).unwrap();

    for i in 0..WARMUP {
        let id = heap.insert(epoch + Duration::from_millis((i % 500) + 10));
        heap.cancel(id);
    }

    for i in 0..ITERATIONS {
        let when = epoch + Duration::from_millis((i % 500) + 10);

        let start = Instant::now();
        let id = heap.insert(when);
        insert_hist.record(start.elapsed().as_nanos() as u64).unwrap();

        let start = Instant::now();
        heap.cancel(id);
        cancel_hist.record(start.elapsed().as_nanos() as u64).unwrap();
    }

    print_histogram("LazyHeap Insert", &insert_hist);
    print_histogram("LazyHeap Cancel", &cancel_hist);
    println!("  dead entries left in heap: {}", heap.heap.len() as u64 - BACKGROUND);
}

#[test]
#[ignore]
fn hdr_dispatch_periodic_timer_heap() {
    let epoch = Instant::now();
    let (mut timers, clock) = populated_timer_heap(epoch);

    let period = crate::MIN_RESCHEDULE_DELAY;
    for _ in 0..64 {
        timers.insert(period, move |_, _, _| Some(period));
    }

    let mut hist = Histogram::<u64>::new(3).unwrap();

    for _ in 0..WARMUP {
        clock.advance(period);
        timers.dispatch_due();
    }

    for _ in 0..ITERATIONS {
        clock.advance(period);

        let start = Instant::now();
        let fired = timers.dispatch_due();
        hist.record(start.elapsed().as_nanos() as u64).unwrap();

        assert_eq!(fired, 64);
    }

    print_histogram("TimerHeap Dispatch 64 Periodic", &hist);
}

#[test]
#[ignore]
fn hdr_poll_after_cancel_storm_lazy_heap() {
    let epoch = Instant::now();
    let mut heap = LazyHeap::new();
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for round in 0..ITERATIONS / 100 {
        let base = epoch + Duration::from_millis(round);
        let ids: Vec<_> = (0..100).map(|_| heap.insert(base)).collect();
        for id in ids {
            heap.cancel(id);
        }

        let start = Instant::now();
        let fired = heap.poll(base);
        hist.record(start.elapsed().as_nanos() as u64).unwrap();

        assert_eq!(fired, 0);
    }

    print_histogram("LazyHeap Poll After 100 Cancels", &hist);
}

#[test]
#[ignore]
fn hdr_dispatch_after_cancel_storm_timer_heap() {
    let epoch = Instant::now();
    let clock = ManualClock::starting_at(epoch);
    let mut timers = TimerHeap::with_clock(clock.clone());
    let mut hist = Histogram::<u64>::new(3).unwrap();

    for _ in 0..ITERATIONS / 100 {
        let ids: Vec<_> = (0..100)
            .map(|_| timers.insert(Duration::ZERO, |_, _, _| None))
            .collect();
        for id in ids {
            timers.remove_timer(id);
        }

        let start = Instant::now();
        let fired = timers.dispatch_due();
        hist.record(start.elapsed().as_nanos() as u64).unwrap();

        assert_eq!(fired, 0);
        clock.advance(Duration::from_millis(1));
    }

    print_histogram("TimerHeap Dispatch After 100 Cancels", &hist);
}
