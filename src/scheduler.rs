use std::{
    cmp::Reverse,
    fmt,
    time::{Duration, Instant},
};

use tracing::{debug, trace, warn};

use crate::{
    Clock, MonotonicClock, Timer, TimerId,
    heap::{pop_heap_by_key, push_heap_by_key, remove_heap_by_key},
};

/// Shortest delay a timer may ask to be rescheduled by.
pub const MIN_RESCHEDULE_DELAY: Duration = Duration::from_millis(5);

/// Deadline offset used when `base + delay` does not fit in an [`Instant`].
const FAR_FUTURE: Duration = Duration::from_secs(60 * 60 * 24 * 365 * 30);

/// `base + delay`, or `base + FAR_FUTURE` when that overflows.
#[inline]
fn saturating_deadline(base: Instant, delay: Duration) -> Option<Instant> {
    base.checked_add(delay).or_else(|| base.checked_add(FAR_FUTURE))
}

struct Node<C: Clock> {
    id: TimerId,
    deadline: Instant,
    timer: Box<dyn Timer<C>>,
}

impl<C: Clock> Node<C> {
    /// Heap key: earliest deadline at the root.
    #[inline(always)]
    fn priority(&self) -> Reverse<Instant> {
        Reverse(self.deadline)
    }
}

/// Single-threaded deadline scheduler.
///
/// Timers live in a binary min-heap keyed on their absolute deadline. The
/// driving loop is left to the caller:
///
/// ```no_run
/// use std::time::Duration;
/// use timerheap::TimerHeap;
///
/// let mut timers = TimerHeap::new();
/// timers.insert(Duration::from_millis(500), |_, id, _| {
///     println!("timer {id} fired");
///     Some(Duration::from_millis(500))
/// });
///
/// while let Some(wait) = timers.peek_next_wait() {
///     std::thread::sleep(wait);
///     timers.dispatch_due();
/// }
/// ```
///
/// Cancellation is O(n) to find the timer by id, then O(log n) to take it
/// out of the heap.
pub struct TimerHeap<C: Clock = MonotonicClock> {
    storage: Vec<Node<C>>,
    clock: C,
    id_counter: u32,
}

impl Default for TimerHeap<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerHeap<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_clock_and_capacity(MonotonicClock, capacity)
    }
}

impl<C: Clock> TimerHeap<C> {
    pub fn with_clock(clock: C) -> Self {
        Self::with_clock_and_capacity(clock, 0)
    }

    pub fn with_clock_and_capacity(clock: C, capacity: usize) -> Self {
        Self {
            storage: Vec::with_capacity(capacity),
            clock,
            id_counter: 0,
        }
    }

    #[inline]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Number of pending timers.
    #[inline]
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// Schedule `timer` to fire `delay` from now.
    ///
    /// A delay too large for [`Instant`] schedules the timer far in the
    /// future instead.
    pub fn insert<F>(&mut self, delay: Duration, timer: F) -> TimerId
    where
        F: FnMut(&mut TimerHeap<C>, TimerId, Instant) -> Option<Duration> + 'static,
    {
        self.insert_timer(delay, timer)
    }

    /// [`insert`](Self::insert) for any [`Timer`] implementation.
    pub fn insert_timer<T>(&mut self, delay: Duration, timer: T) -> TimerId
    where
        T: Timer<C> + 'static,
    {
        let now = self.clock.now();
        let deadline = saturating_deadline(now, delay).unwrap_or(now);
        let id = self.next_id();
        trace!(%id, ?delay, "inserting timer");

        self.push_node(Node {
            id,
            deadline,
            timer: Box::new(timer),
        });

        id
    }

    /// How long the caller may sleep before the next timer is due.
    ///
    /// `None` when nothing is pending, `Some(Duration::ZERO)` when a timer is
    /// already due.
    #[inline]
    pub fn peek_next_wait(&self) -> Option<Duration> {
        self.storage
            .first()
            .map(|node| node.deadline.saturating_duration_since(self.clock.now()))
    }

    /// Deadline of the earliest pending timer.
    #[inline]
    pub fn next_deadline(&self) -> Option<Instant> {
        self.storage.first().map(|node| node.deadline)
    }

    /// Fire every timer whose deadline is at or before now.
    ///
    /// Now is read once. Each timer is taken out of the heap before it runs,
    /// so it can insert or cancel timers on this scheduler; anything it
    /// inserts that is already due fires in this same call. A rescheduled
    /// timer moves to `deadline + max(delay, MIN_RESCHEDULE_DELAY)`, counted
    /// from the deadline it was scheduled for rather than from now, so
    /// periodic timers do not drift. A delay too large for [`Instant`] moves
    /// the timer far into the future.
    ///
    /// Returns the number of timers fired.
    pub fn dispatch_due(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0usize;

        while self.storage.first().is_some_and(|node| node.deadline <= now) {
            pop_heap_by_key(&mut self.storage, Node::priority);
            let Some(mut node) = self.storage.pop() else {
                break;
            };

            fired += 1;
            trace!(id = %node.id, "firing timer");

            let Some(delay) = node.timer.fire(self, node.id, node.deadline) else {
                continue;
            };

            match saturating_deadline(node.deadline, delay.max(MIN_RESCHEDULE_DELAY)) {
                Some(deadline) => {
                    node.deadline = deadline;
                    trace!(id = %node.id, ?delay, "rescheduling timer");
                    self.push_node(node);
                }
                None => {
                    warn!(id = %node.id, ?delay, "reschedule deadline overflows, dropping timer");
                }
            }
        }

        if fired > 0 {
            debug!(fired, pending = self.storage.len(), "dispatched due timers");
        }

        fired
    }

    /// Cancel the pending timer with `id`.
    ///
    /// Returns `false` if no such timer is pending. A timer cancelling itself
    /// from inside its own `fire` is not pending and gets `false`; return
    /// `None` from `fire` instead.
    pub fn remove_timer(&mut self, id: TimerId) -> bool {
        let Some(pos) = self.position(id) else {
            debug!(%id, "timer not pending");
            return false;
        };

        remove_heap_by_key(&mut self.storage, pos, Node::priority);
        self.storage.pop();
        debug!(%id, pending = self.storage.len(), "removed timer");
        true
    }

    #[inline]
    pub fn contains(&self, id: TimerId) -> bool {
        self.position(id).is_some()
    }

    /// Deadline the pending timer with `id` will next fire at.
    pub fn deadline_of(&self, id: TimerId) -> Option<Instant> {
        self.position(id).map(|pos| self.storage[pos].deadline)
    }

    /// Drop every pending timer without firing it.
    pub fn clear(&mut self) {
        self.storage.clear();
    }

    #[inline]
    fn position(&self, id: TimerId) -> Option<usize> {
        self.storage.iter().position(|node| node.id == id)
    }

    #[inline]
    fn push_node(&mut self, node: Node<C>) {
        self.storage.push(node);
        push_heap_by_key(&mut self.storage, Node::priority);
    }

    fn next_id(&mut self) -> TimerId {
        loop {
            self.id_counter = self.id_counter.wrapping_add(1);
            match TimerId::new(self.id_counter) {
                Some(id) => return id,
                None => {
                    warn!("timer id counter wrapped, new ids may collide with pending timers");
                }
            }
        }
    }
}

impl<C: Clock + fmt::Debug> fmt::Debug for TimerHeap<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHeap")
            .field("pending", &self.storage.len())
            .field("next_deadline", &self.next_deadline())
            .field("clock", &self.clock)
            .finish()
    }
}
