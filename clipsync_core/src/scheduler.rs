// Copyright 2026 the Clipsync Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Coalescing of clip updates into paced flushes.
//!
//! Mutations arrive in bursts; each one enqueues work for a consumer. The
//! [`PendingQueue`] keeps a single entry per consumer (the latest work item,
//! at the position of the first enqueue), and the [`FrameScheduler`] decides
//! on each [`Tick`] whether the queue is flushed.
//!
//! # Pacing
//!
//! With [`Pacing::Uncapped`] every tick flushes. With [`Pacing::Fixed`] a
//! tick flushes only when the time since the last flush strictly exceeds the
//! frame interval. The leftover part of the elapsed time is carried over
//! (`last = now - elapsed % interval`) so the average rate stays on target
//! even though ticks do not line up with the interval. The first tick after
//! creation or a pacing change always flushes.
//!
//! # Reentrancy
//!
//! [`FrameScheduler::begin_flush`] hands out the queued work and marks a
//! flush in flight until [`FrameScheduler::finish_flush`]. While in flight,
//! further `begin_flush` calls return `None`; work enqueued meanwhile waits
//! for the next flush.

use alloc::vec::Vec;
use core::fmt;

use crate::config::Pacing;
use crate::id::ElementId;
use crate::time::HostTime;
use crate::timing::Tick;

/// Insertion-ordered, per-consumer pending work.
pub struct PendingQueue<W> {
    entries: Vec<(ElementId, W)>,
}

impl<W> fmt::Debug for PendingQueue<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(id, _)| id))
            .finish()
    }
}

impl<W> Default for PendingQueue<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> PendingQueue<W> {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Queues `work` for `consumer`.
    ///
    /// If the consumer already has pending work it is replaced in place.
    /// Returns `true` in that case.
    pub fn push(&mut self, consumer: ElementId, work: W) -> bool {
        if let Some(slot) = self.entries.iter_mut().find(|(id, _)| *id == consumer) {
            slot.1 = work;
            true
        } else {
            self.entries.push((consumer, work));
            false
        }
    }

    /// Whether `consumer` has pending work.
    #[must_use]
    pub fn contains(&self, consumer: &ElementId) -> bool {
        self.entries.iter().any(|(id, _)| id == consumer)
    }

    /// Number of consumers with pending work.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns all pending work in insertion order.
    pub fn take(&mut self) -> Vec<(ElementId, W)> {
        core::mem::take(&mut self.entries)
    }
}

/// Work handed out by one flush.
#[derive(Debug)]
pub struct Flush<W> {
    /// The tick that triggered the flush.
    pub tick: Tick,
    /// Pending work in insertion order, one entry per consumer.
    pub items: Vec<(ElementId, W)>,
}

/// Paces flushes of a [`PendingQueue`].
pub struct FrameScheduler<W> {
    pacing: Pacing,
    queue: PendingQueue<W>,
    last_flush: Option<HostTime>,
    in_flight: bool,
}

impl<W> fmt::Debug for FrameScheduler<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameScheduler")
            .field("pacing", &self.pacing)
            .field("queue", &self.queue)
            .field("last_flush", &self.last_flush)
            .field("in_flight", &self.in_flight)
            .finish()
    }
}

impl<W> FrameScheduler<W> {
    /// Creates a scheduler with the given pacing.
    #[must_use]
    pub const fn new(pacing: Pacing) -> Self {
        Self {
            pacing,
            queue: PendingQueue::new(),
            last_flush: None,
            in_flight: false,
        }
    }

    /// Current pacing.
    #[must_use]
    pub const fn pacing(&self) -> Pacing {
        self.pacing
    }

    /// Changes the pacing. The next tick flushes regardless of timing.
    pub fn set_pacing(&mut self, pacing: Pacing) {
        self.pacing = pacing;
        self.last_flush = None;
    }

    /// Queues work for `consumer`; see [`PendingQueue::push`].
    pub fn enqueue(&mut self, consumer: ElementId, work: W) -> bool {
        self.queue.push(consumer, work)
    }

    /// Pending work.
    #[must_use]
    pub fn pending(&self) -> &PendingQueue<W> {
        &self.queue
    }

    /// Whether a flush is in flight.
    #[must_use]
    pub const fn is_flushing(&self) -> bool {
        self.in_flight
    }

    /// Host time of the last paced flush (after remainder carry).
    #[must_use]
    pub const fn last_flush(&self) -> Option<HostTime> {
        self.last_flush
    }

    /// Decides whether `tick` flushes and, if so, hands out the queue.
    ///
    /// Returns `None` when a flush is already in flight, when pacing holds
    /// the tick back, or when nothing is queued. Pacing state advances on
    /// every admitted tick, even if the queue is empty.
    pub fn begin_flush(&mut self, tick: &Tick) -> Option<Flush<W>> {
        if self.in_flight || !self.admit(tick.now) || self.queue.is_empty() {
            return None;
        }
        self.in_flight = true;
        Some(Flush {
            tick: *tick,
            items: self.queue.take(),
        })
    }

    /// Ends the flush started by [`begin_flush`](Self::begin_flush).
    pub fn finish_flush(&mut self) {
        self.in_flight = false;
    }

    /// Clears queued work and pacing state.
    pub fn reset(&mut self) {
        self.queue.take();
        self.last_flush = None;
        self.in_flight = false;
    }

    fn admit(&mut self, now: HostTime) -> bool {
        let Pacing::Fixed(rate) = self.pacing else {
            return true;
        };
        let Some(last) = self.last_flush else {
            self.last_flush = Some(now);
            return true;
        };
        let interval = rate.interval();
        let elapsed = now.saturating_duration_since(last);
        if elapsed > interval {
            self.last_flush = Some(now.saturating_sub(elapsed.rem(interval)));
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameRate;
    use crate::time::Duration;

    fn tick(ms: u64, frame_index: u64) -> Tick {
        Tick::new(HostTime(0) + Duration::from_millis(ms), frame_index)
    }

    fn fixed(fps: i64) -> Pacing {
        Pacing::Fixed(FrameRate::new(fps).unwrap())
    }

    /// Runs ticks at the given times, re-enqueueing before each, and returns
    /// the number of flushes.
    fn count_flushes(pacing: Pacing, times_ms: &[u64]) -> usize {
        let mut s = FrameScheduler::new(pacing);
        let mut flushes = 0;
        for (i, &t) in times_ms.iter().enumerate() {
            s.enqueue(ElementId::from("c"), i);
            if s.begin_flush(&tick(t, i as u64)).is_some() {
                flushes += 1;
                s.finish_flush();
            }
        }
        flushes
    }

    #[test]
    fn burst_coalesces_to_latest_in_first_position() {
        let mut s = FrameScheduler::new(Pacing::Uncapped);
        assert!(!s.enqueue(ElementId::from("a"), 1));
        assert!(!s.enqueue(ElementId::from("b"), 2));
        assert!(s.enqueue(ElementId::from("a"), 3));
        assert!(s.enqueue(ElementId::from("a"), 4));
        assert_eq!(s.pending().len(), 2);

        let flush = s.begin_flush(&tick(0, 0)).unwrap();
        let ids: Vec<_> = flush.items.iter().map(|(id, w)| (id.as_str(), *w)).collect();
        assert_eq!(ids, [("a", 4), ("b", 2)]);
        s.finish_flush();
        assert!(s.pending().is_empty());
    }

    #[test]
    fn uncapped_flushes_every_tick() {
        assert_eq!(count_flushes(Pacing::Uncapped, &[0, 1, 2, 3]), 4);
    }

    #[test]
    fn thirty_fps_gates_fast_ticks() {
        // Interval is ~33.3ms.
        assert_eq!(count_flushes(fixed(30), &[0, 10]), 1);
        assert_eq!(count_flushes(fixed(30), &[0, 40]), 2);
        assert_eq!(count_flushes(fixed(30), &[0, 10, 20, 30, 40]), 2);
    }

    #[test]
    fn elapsed_equal_to_interval_does_not_flush() {
        // 20 fps: interval is exactly 50ms.
        assert_eq!(count_flushes(fixed(20), &[0, 50]), 1);
        assert_eq!(count_flushes(fixed(20), &[0, 51]), 2);
    }

    #[test]
    fn remainder_is_carried() {
        let mut s = FrameScheduler::new(fixed(20));
        s.enqueue(ElementId::from("c"), ());
        assert!(s.begin_flush(&tick(0, 0)).is_some());
        s.finish_flush();
        assert_eq!(s.last_flush(), Some(HostTime(0)));

        s.enqueue(ElementId::from("c"), ());
        assert!(s.begin_flush(&tick(70, 1)).is_some());
        s.finish_flush();
        // 70ms elapsed, 20ms over one interval: last = 70 - 20.
        assert_eq!(s.last_flush(), Some(HostTime(50_000)));

        // 101ms is 51ms after the carried timestamp.
        s.enqueue(ElementId::from("c"), ());
        assert!(s.begin_flush(&tick(101, 2)).is_some());
    }

    #[test]
    fn reentrant_flush_is_refused() {
        let mut s = FrameScheduler::new(Pacing::Uncapped);
        s.enqueue(ElementId::from("a"), ());
        let flush = s.begin_flush(&tick(0, 0)).unwrap();
        assert!(s.is_flushing());

        // Work enqueued during the flush waits for the next one.
        s.enqueue(ElementId::from("b"), ());
        assert!(s.begin_flush(&tick(1, 1)).is_none());
        assert_eq!(flush.items.len(), 1);
        s.finish_flush();

        let next = s.begin_flush(&tick(2, 2)).unwrap();
        assert_eq!(next.items[0].0.as_str(), "b");
    }

    #[test]
    fn pacing_change_flushes_next_tick() {
        let mut s = FrameScheduler::new(fixed(10));
        s.enqueue(ElementId::from("a"), ());
        assert!(s.begin_flush(&tick(0, 0)).is_some());
        s.finish_flush();

        s.enqueue(ElementId::from("a"), ());
        assert!(s.begin_flush(&tick(5, 1)).is_none());
        s.set_pacing(fixed(30));
        assert!(s.begin_flush(&tick(6, 2)).is_some());
    }

    #[test]
    fn empty_queue_yields_nothing() {
        let mut s: FrameScheduler<()> = FrameScheduler::new(Pacing::Uncapped);
        assert!(s.begin_flush(&tick(0, 0)).is_none());
        assert!(!s.is_flushing());
    }
}
