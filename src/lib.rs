use std::{
    fmt,
    num::NonZeroU32,
    time::{Duration, Instant},
};

pub mod clock;
pub mod heap;
mod scheduler;

#[cfg(test)]
mod comparisons;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use scheduler::{MIN_RESCHEDULE_DELAY, TimerHeap};

/// Zero is reserved and never names a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("timer id 0 is reserved")]
pub struct InvalidTimerId;

/// Identity of a timer scheduled on a [`TimerHeap`].
///
/// A lookup key, not a handle: cancellation always goes back through the
/// scheduler that issued it. Ids are never 0.
///
/// # Uniqueness
///
/// Ids come from a 32-bit counter per scheduler that skips 0 when it wraps.
/// Nothing checks the new id against timers that are still pending, so after
/// 2^32 - 1 insertions a long-lived timer can share its id with a new one,
/// and [`TimerHeap::remove_timer`] will cancel whichever it finds first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(NonZeroU32);

impl TimerId {
    #[inline]
    pub const fn new(raw: u32) -> Option<Self> {
        match NonZeroU32::new(raw) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    #[inline]
    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl TryFrom<u32> for TimerId {
    type Error = InvalidTimerId;

    fn try_from(raw: u32) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or(InvalidTimerId)
    }
}

impl From<TimerId> for u32 {
    fn from(id: TimerId) -> Self {
        id.get()
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Work run when a timer comes due.
///
/// `fire` receives the scheduler that dispatched it, so it may insert or
/// cancel other timers (the firing timer itself is already out of the heap).
/// Return `Some(delay)` to run again at `deadline + delay`, or `None` to
/// drop the timer.
///
/// Any `FnMut(&mut TimerHeap<C>, TimerId, Instant) -> Option<Duration>`
/// closure is a `Timer`.
pub trait Timer<C: Clock = MonotonicClock> {
    fn fire(&mut self, timers: &mut TimerHeap<C>, id: TimerId, deadline: Instant)
    -> Option<Duration>;
}

impl<C, F> Timer<C> for F
where
    C: Clock,
    F: FnMut(&mut TimerHeap<C>, TimerId, Instant) -> Option<Duration>,
{
    #[inline(always)]
    fn fire(
        &mut self,
        timers: &mut TimerHeap<C>,
        id: TimerId,
        deadline: Instant,
    ) -> Option<Duration> {
        self(timers, id, deadline)
    }
}
