use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopMetricsSnapshot {
    pub fps: f32,
    pub tps: f32,
    pub frame_time_ms: f32,
    pub dropped_backlog_ms: u64,
}

/// Shared view of the most recent loop metrics window.
#[derive(Clone, Debug, Default)]
pub struct MetricsHandle {
    snapshot: Arc<RwLock<LoopMetricsSnapshot>>,
}

impl MetricsHandle {
    pub fn snapshot(&self) -> LoopMetricsSnapshot {
        match self.snapshot.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn publish(&self, snapshot: LoopMetricsSnapshot) {
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }
}

#[derive(Debug)]
pub(crate) struct MetricsAccumulator {
    window_start: Instant,
    window: Duration,
    frames: u32,
    ticks: u32,
    frame_time_sum: Duration,
    dropped_backlog: Duration,
}

impl MetricsAccumulator {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window_start: Instant::now(),
            window,
            frames: 0,
            ticks: 0,
            frame_time_sum: Duration::ZERO,
            dropped_backlog: Duration::ZERO,
        }
    }

    pub(crate) fn record_frame(&mut self, frame_dt: Duration) {
        self.frames = self.frames.saturating_add(1);
        self.frame_time_sum = self.frame_time_sum.saturating_add(frame_dt);
    }

    pub(crate) fn record_tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
    }

    pub(crate) fn record_dropped_backlog(&mut self, dropped: Duration) {
        self.dropped_backlog = self.dropped_backlog.saturating_add(dropped);
    }

    pub(crate) fn maybe_snapshot(&mut self, now: Instant) -> Option<LoopMetricsSnapshot> {
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed < self.window {
            return None;
        }

        let elapsed_seconds = elapsed.as_secs_f32().max(f32::EPSILON);
        let frame_time_ms = if self.frames == 0 {
            0.0
        } else {
            self.frame_time_sum.as_secs_f32() * 1000.0 / self.frames as f32
        };
        let snapshot = LoopMetricsSnapshot {
            fps: self.frames as f32 / elapsed_seconds,
            tps: self.ticks as f32 / elapsed_seconds,
            frame_time_ms,
            dropped_backlog_ms: self.dropped_backlog.as_millis() as u64,
        };

        self.window_start = now;
        self.frames = 0;
        self.ticks = 0;
        self.frame_time_sum = Duration::ZERO;
        self.dropped_backlog = Duration::ZERO;
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_snapshot_reports_rates_and_backlog() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        for _ in 0..3 {
            accumulator.record_frame(Duration::from_millis(20));
        }
        for _ in 0..6 {
            accumulator.record_tick();
        }
        accumulator.record_dropped_backlog(Duration::from_millis(40));

        let snapshot = accumulator
            .maybe_snapshot(base + Duration::from_secs(1))
            .expect("window elapsed");

        assert!((snapshot.fps - 3.0).abs() < 0.1);
        assert!((snapshot.tps - 6.0).abs() < 0.1);
        assert!((snapshot.frame_time_ms - 20.0).abs() < 0.001);
        assert_eq!(snapshot.dropped_backlog_ms, 40);
    }

    #[test]
    fn no_snapshot_inside_window() {
        let mut accumulator = MetricsAccumulator::new(Duration::from_secs(1));
        let base = Instant::now();
        accumulator.record_tick();
        assert!(accumulator
            .maybe_snapshot(base + Duration::from_millis(300))
            .is_none());
    }

    #[test]
    fn handle_returns_last_published_snapshot() {
        let handle = MetricsHandle::default();
        let published = LoopMetricsSnapshot {
            fps: 58.0,
            tps: 60.0,
            frame_time_ms: 16.5,
            dropped_backlog_ms: 0,
        };
        handle.publish(published);
        assert_eq!(handle.clone().snapshot(), published);
    }
}
