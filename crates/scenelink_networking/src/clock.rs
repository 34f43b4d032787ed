//! # Clock Sync
//!
//! Participants share a wrapping `u8` tick clock. The server broadcasts its
//! clock in `Sync` frames. Clients measure round trips with ping/pong and
//! place their clock half a round trip ahead of the server time they
//! received.
//!
//! ```text
//! client ──Ping(t0)──▶ server
//! client ◀──Pong(t0)── server      rtt sample = now - t0
//! client ◀──Sync(ts)── server      target = ts + rtt / 2
//! ```

use std::collections::VecDeque;

/// Round-trip samples kept for the average.
pub const RTT_WINDOW: usize = 5;

/// Drift in ticks that is always corrected.
pub const MAX_DRIFT: u8 = 10;

/// Drift in ticks that is corrected while the link is fast.
pub const MIN_DRIFT: u8 = 3;

/// One-way transit below which the link counts as fast.
pub const FAST_TRANSIT: u8 = 8;

/// Shortest distance between two clock readings on the wrapping clock.
#[must_use]
pub const fn clock_distance(a: u8, b: u8) -> u8 {
    let forward = a.wrapping_sub(b);
    let backward = b.wrapping_sub(a);
    if forward < backward {
        forward
    } else {
        backward
    }
}

/// Round-trip estimate and clock correction for one participant.
#[derive(Clone, Debug, Default)]
pub struct ClockSync {
    samples: VecDeque<u8>,
    rtt: u8,
}

impl ClockSync {
    /// Creates an estimator with no samples; the round trip reads as zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current round-trip estimate in ticks.
    #[must_use]
    pub const fn rtt(&self) -> u8 {
        self.rtt
    }

    /// Samples currently in the window.
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Records a pong received at `now` for a ping sent at `ping_time` and
    /// returns the new estimate. With more than one sample the slowest one
    /// is left out of the average.
    pub fn record_pong(&mut self, now: u8, ping_time: u8) -> u8 {
        if self.samples.len() == RTT_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(now.wrapping_sub(ping_time));

        let count = self.samples.len();
        self.rtt = if count > 1 {
            let sum: usize = self.samples.iter().map(|&s| usize::from(s)).sum();
            let slowest = self.samples.iter().copied().max().map_or(0, usize::from);
            let kept = count - 1;
            u8::try_from((sum - slowest + kept / 2) / kept).unwrap_or(u8::MAX)
        } else {
            self.samples.back().copied().unwrap_or(0)
        };
        self.rtt
    }

    /// Corrected local clock for a received server time, or `None` when the
    /// local clock is close enough to keep.
    #[must_use]
    pub fn adjust(&self, local: u8, server_time: u8) -> Option<u8> {
        let transit = self.rtt / 2;
        let target = server_time.wrapping_add(transit);
        let drift = clock_distance(local, target);
        (drift > MAX_DRIFT || (drift > MIN_DRIFT && transit < FAST_TRANSIT)).then_some(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_distance_wraps() {
        assert_eq!(clock_distance(10, 4), 6);
        assert_eq!(clock_distance(4, 10), 6);
        assert_eq!(clock_distance(2, 250), 8);
        assert_eq!(clock_distance(0, 128), 128);
    }

    #[test]
    fn test_single_sample_is_the_estimate() {
        let mut clock = ClockSync::new();
        assert_eq!(clock.record_pong(3, 250), 9);
        assert_eq!(clock.sample_count(), 1);
    }

    #[test]
    fn test_slowest_sample_dropped() {
        let mut clock = ClockSync::new();
        for (now, sent) in [(4, 0), (6, 0), (40, 0), (5, 0)] {
            clock.record_pong(now, sent);
        }
        // (4 + 6 + 5) / 3
        assert_eq!(clock.rtt(), 5);
    }

    #[test]
    fn test_window_keeps_latest_samples() {
        let mut clock = ClockSync::new();
        for _ in 0..RTT_WINDOW {
            clock.record_pong(100, 0);
        }
        for _ in 0..RTT_WINDOW {
            clock.record_pong(2, 0);
        }
        assert_eq!(clock.sample_count(), RTT_WINDOW);
        assert_eq!(clock.rtt(), 2);
    }

    #[test]
    fn test_adjust_adds_half_round_trip() {
        let mut clock = ClockSync::new();
        clock.record_pong(12, 0);
        assert_eq!(clock.adjust(0, 100), Some(106));
        assert_eq!(clock.adjust(105, 100), None);
    }

    #[test]
    fn test_small_drift_needs_fast_link() {
        let mut fast = ClockSync::new();
        assert_eq!(fast.adjust(95, 100), Some(100));
        assert_eq!(fast.adjust(97, 100), None);
        fast.record_pong(4, 0);
        assert_eq!(fast.adjust(96, 100), Some(102));

        let mut slow = ClockSync::new();
        slow.record_pong(40, 0);
        assert_eq!(slow.adjust(133, 120), None);
        assert_eq!(slow.adjust(120, 120), Some(140));
    }
}
