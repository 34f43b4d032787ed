//! # Tick Loop
//!
//! Fixed-timestep driver for the sync session. Each tick drains inbound
//! frames, lets the application mutate parameters, then flushes updates.

use std::time::{Duration, Instant};

use scenelink_shared::TICK_RATE;

/// Fixed-timestep tick controller.
#[derive(Debug)]
pub struct TickLoop {
    tick_duration: Duration,
    last_tick: Instant,
    accumulator: Duration,
    tick_count: u64,
    stats: TickStats,
}

/// Tick timing statistics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickStats {
    /// Shortest tick observed, in microseconds.
    pub min_tick_us: u64,
    /// Longest tick observed, in microseconds.
    pub max_tick_us: u64,
    /// Rolling average, in microseconds.
    pub avg_tick_us: u64,
    /// Ticks that overran their budget.
    pub late_ticks: u64,
    /// Ticks measured.
    pub total_ticks: u64,
}

impl TickStats {
    fn fresh(budget: Duration) -> Self {
        Self {
            min_tick_us: u64::MAX,
            max_tick_us: 0,
            avg_tick_us: micros(budget),
            late_ticks: 0,
            total_ticks: 0,
        }
    }

    /// Folds one measured tick into the running numbers. The average is an
    /// exponential moving average with weight 1/16.
    fn record(&mut self, took: Duration, budget: Duration) {
        let us = micros(took);
        self.total_ticks += 1;
        self.min_tick_us = self.min_tick_us.min(us);
        self.max_tick_us = self.max_tick_us.max(us);
        self.avg_tick_us = self.avg_tick_us - self.avg_tick_us / 16 + us / 16;
        self.late_ticks += u64::from(took > budget);
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}

/// Below this much remaining budget the loop spins instead of sleeping.
const SPIN_WINDOW: Duration = Duration::from_micros(500);

impl TickLoop {
    /// Creates a loop running `tick_rate` times per second. A rate of zero
    /// is treated as one.
    #[must_use]
    pub fn new(tick_rate: u32) -> Self {
        let budget = Duration::from_secs(1) / tick_rate.max(1);
        Self {
            tick_duration: budget,
            last_tick: Instant::now(),
            accumulator: Duration::ZERO,
            tick_count: 0,
            stats: TickStats::fresh(budget),
        }
    }

    /// True while a tick is due. Call in a loop; a slow frame yields several
    /// catch-up ticks.
    #[must_use]
    pub fn should_tick(&mut self) -> bool {
        let now = Instant::now();
        self.accumulator += now - self.last_tick;
        self.last_tick = now;
        self.accumulator >= self.tick_duration
    }

    /// Consumes one tick of accumulated time and returns the tick start.
    #[must_use]
    pub fn begin_tick(&mut self) -> Instant {
        self.accumulator = self.accumulator.saturating_sub(self.tick_duration);
        self.tick_count += 1;
        Instant::now()
    }

    /// Records the tick started at `start`.
    pub fn end_tick(&mut self, start: Instant) {
        self.stats.record(start.elapsed(), self.tick_duration);
    }

    /// Blocks until the next tick is due.
    pub fn wait_for_next_tick(&self) {
        let Some(remaining) = self.tick_duration.checked_sub(self.last_tick.elapsed()) else {
            return;
        };
        if let Some(sleep) = remaining.checked_sub(SPIN_WINDOW) {
            std::thread::sleep(sleep);
        }
        while self.last_tick.elapsed() < self.tick_duration {
            std::hint::spin_loop();
        }
    }

    /// Ticks executed.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStats {
        &self.stats
    }

    /// Target tick duration.
    #[must_use]
    pub const fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    /// Clears the statistics.
    pub fn reset_stats(&mut self) {
        self.stats = TickStats::fresh(self.tick_duration);
    }
}

impl Default for TickLoop {
    fn default() -> Self {
        Self::new(TICK_RATE)
    }
}
