use std::{
    cell::Cell,
    rc::Rc,
    time::{Duration, Instant},
};

/// Source of monotonic time for a [`TimerHeap`](crate::TimerHeap).
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The process monotonic clock, [`Instant::now`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MonotonicClock;

impl Clock for MonotonicClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same reading, so a caller can keep one copy to drive time
/// while the scheduler owns another. Time never goes backwards: [`set`] to an
/// earlier instant is ignored.
///
/// [`set`]: ManualClock::set
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    /// Start at the current process time.
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(start: Instant) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    /// Move time forward by `by`.
    ///
    /// # Panics
    /// If the new time overflows [`Instant`].
    #[inline]
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    #[inline]
    pub fn set(&self, to: Instant) {
        self.now.set(self.now.get().max(to));
    }
}

impl Clock for ManualClock {
    #[inline(always)]
    fn now(&self) -> Instant {
        self.now.get()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    #[inline(always)]
    fn now(&self) -> Instant {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    #[inline(always)]
    fn now(&self) -> Instant {
        (**self).now()
    }
}
