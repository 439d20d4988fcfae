use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClockMode {
    Fixed,
    Manual,
}

/// Game time in milliseconds plus a tick counter. Time only advances on
/// simulated ticks, so paused ticks never age cooldowns or corpses.
#[derive(Debug, Clone)]
pub struct Clock {
    mode: ClockMode,
    now_us: u64,
    tick: u64,
}

impl Clock {
    pub fn new() -> Self {
        Self {
            mode: ClockMode::Fixed,
            now_us: 0,
            tick: 0,
        }
    }

    /// Ticks count but time moves only through [`Clock::advance_ms`].
    pub fn manual() -> Self {
        Self {
            mode: ClockMode::Manual,
            ..Self::new()
        }
    }

    pub fn advance_tick(&mut self, dt: Duration) {
        self.tick = self.tick.saturating_add(1);
        if self.mode == ClockMode::Fixed {
            self.now_us = self.now_us.saturating_add(dt.as_micros() as u64);
        }
    }

    pub fn advance_ms(&mut self, ms: u64) {
        self.now_us = self.now_us.saturating_add(ms.saturating_mul(1000));
    }

    pub fn now_ms(&self) -> u64 {
        self.now_us / 1000
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn elapsed_since(&self, earlier_ms: u64) -> u64 {
        self.now_ms().saturating_sub(earlier_ms)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_accumulates_sub_millisecond_steps() {
        let mut clock = Clock::new();
        for _ in 0..60 {
            clock.advance_tick(Duration::from_secs_f64(1.0 / 60.0));
        }
        assert_eq!(clock.tick(), 60);
        assert!((999..=1000).contains(&clock.now_ms()));
    }

    #[test]
    fn manual_clock_only_moves_when_told() {
        let mut clock = Clock::manual();
        clock.advance_tick(Duration::from_millis(16));
        assert_eq!(clock.now_ms(), 0);
        clock.advance_ms(500);
        assert_eq!(clock.elapsed_since(100), 400);
        assert_eq!(clock.elapsed_since(900), 0);
    }
}
