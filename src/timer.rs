//! Stream poll timers
//!
//! Converts emulated time into stream ticks. Time is measured in timer
//! units, `timer_usec` of them per microsecond; `timer_usec` follows the
//! emulated CPU clock and changes whenever the machine speed changes.

/// Timer units per microsecond when the host clock is used (1 unit = 1 ns)
pub const DEFAULT_TIMER_USEC: u64 = 1000;

/// Fixed-rate timer for one stream
#[derive(Debug, Clone, Copy)]
pub struct PollTimer {
    /// Tick rate in Hz
    freq: u32,
    /// Timer units per tick
    latch: u64,
    /// Timer units left until the next tick
    remaining: u64,
    /// Total ticks issued
    ticks: u64,
}

impl PollTimer {
    /// Create a timer ticking at `freq` Hz
    pub fn new(freq: u32, timer_usec: u64) -> Self {
        let latch = Self::latch_for(freq, timer_usec);
        PollTimer {
            freq,
            latch,
            remaining: latch,
            ticks: 0,
        }
    }

    /// Timer units between two ticks at `freq` Hz
    pub fn latch_for(freq: u32, timer_usec: u64) -> u64 {
        if freq == 0 {
            return u64::MAX;
        }
        let latch = (timer_usec as u128 * 1_000_000) / freq as u128;
        latch.clamp(1, u64::MAX as u128) as u64
    }

    /// Advance by `elapsed` timer units
    ///
    /// Returns the number of ticks that fell due.
    pub fn advance(&mut self, elapsed: u64) -> u64 {
        if elapsed < self.remaining {
            self.remaining -= elapsed;
            return 0;
        }
        let past = elapsed - self.remaining;
        let due = 1 + past / self.latch;
        self.remaining = self.latch - past % self.latch;
        self.ticks += due;
        due
    }

    /// Recompute the latch after a speed change
    ///
    /// The fraction of the current period already elapsed is kept.
    pub fn speed_changed(&mut self, timer_usec: u64) {
        let new_latch = Self::latch_for(self.freq, timer_usec);
        let fraction = self.remaining as f64 / self.latch as f64;
        self.remaining = ((new_latch as f64 * fraction) as u64).clamp(1, new_latch);
        self.latch = new_latch;
    }

    /// Restart the current period
    pub fn reset(&mut self) {
        self.remaining = self.latch;
        self.ticks = 0;
    }

    /// Timer units per tick
    pub fn latch(&self) -> u64 {
        self.latch
    }

    /// Tick rate in Hz
    pub fn freq(&self) -> u32 {
        self.freq
    }

    /// Total ticks since creation or reset
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latch() {
        // 1 unit per microsecond at 50 kHz: one tick every 20 units
        assert_eq!(PollTimer::latch_for(50_000, 1), 20);
        assert_eq!(PollTimer::latch_for(48_000, 48), 1000);
    }

    #[test]
    fn test_advance_counts_due_ticks() {
        let mut timer = PollTimer::new(50_000, 1);
        assert_eq!(timer.advance(19), 0);
        assert_eq!(timer.advance(1), 1);
        assert_eq!(timer.advance(45), 2);
        // 5 units carried over into the next period
        assert_eq!(timer.advance(14), 0);
        assert_eq!(timer.advance(1), 1);
        assert_eq!(timer.ticks(), 4);
    }

    #[test]
    fn test_one_second_of_ticks() {
        let mut timer = PollTimer::new(48_000, 48);
        assert_eq!(timer.advance(48_000_000), 48_000);
    }

    #[test]
    fn test_speed_change_keeps_phase() {
        let mut timer = PollTimer::new(50_000, 1);
        timer.advance(10);
        timer.speed_changed(2);
        assert_eq!(timer.latch(), 40);
        assert_eq!(timer.advance(19), 0);
        assert_eq!(timer.advance(1), 1);
    }
}
