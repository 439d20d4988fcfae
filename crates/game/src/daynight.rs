use std::f32::consts::PI;

use tracing::info;

use crate::config::GameConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayPhase {
    Day,
    TransitionToNight,
    Night,
    TransitionToDay,
}

impl DayPhase {
    fn next(self) -> Self {
        match self {
            Self::Day => Self::TransitionToNight,
            Self::TransitionToNight => Self::Night,
            Self::Night => Self::TransitionToDay,
            Self::TransitionToDay => Self::Day,
        }
    }

    pub fn is_night_side(self) -> bool {
        matches!(self, Self::Night | Self::TransitionToNight)
    }
}

#[derive(Debug, Clone)]
pub struct DayNightCycle {
    phase: DayPhase,
    phase_started_ms: u64,
    elapsed_in_phase_ms: u64,
    day_ms: u64,
    night_ms: u64,
    transition_ms: u64,
    day_radius_px: f32,
    night_radius_px: f32,
    day_ambient: f32,
    night_ambient: f32,
}

impl DayNightCycle {
    pub fn new(config: &GameConfig, now_ms: u64) -> Self {
        Self {
            phase: DayPhase::Day,
            phase_started_ms: now_ms,
            elapsed_in_phase_ms: 0,
            day_ms: config.day_duration_ms.max(1),
            night_ms: config.night_duration_ms.max(1),
            transition_ms: config.transition_duration_ms.max(1),
            day_radius_px: config.day_view_radius_tiles * config.tile_size,
            night_radius_px: config.night_view_radius_tiles * config.tile_size,
            day_ambient: f32::from(config.day_ambient),
            night_ambient: f32::from(config.night_ambient),
        }
    }

    pub fn phase(&self) -> DayPhase {
        self.phase
    }

    pub fn elapsed_in_phase_ms(&self) -> u64 {
        self.elapsed_in_phase_ms
    }

    fn phase_duration(&self, phase: DayPhase) -> u64 {
        match phase {
            DayPhase::Day => self.day_ms,
            DayPhase::Night => self.night_ms,
            DayPhase::TransitionToNight | DayPhase::TransitionToDay => self.transition_ms,
        }
    }

    pub fn update(&mut self, now_ms: u64) {
        loop {
            let duration = self.phase_duration(self.phase);
            if now_ms.saturating_sub(self.phase_started_ms) < duration {
                break;
            }
            self.phase_started_ms += duration;
            self.phase = self.phase.next();
            info!(phase = ?self.phase, at_ms = self.phase_started_ms, "day_phase_changed");
        }
        self.elapsed_in_phase_ms = now_ms.saturating_sub(self.phase_started_ms);
    }

    /// 0 at full day, 1 at full night.
    fn night_factor(&self) -> f32 {
        let t = (self.elapsed_in_phase_ms as f32 / self.transition_ms as f32).clamp(0.0, 1.0);
        let eased = 0.5 - 0.5 * (PI * t).cos();
        match self.phase {
            DayPhase::Day => 0.0,
            DayPhase::Night => 1.0,
            DayPhase::TransitionToNight => eased,
            DayPhase::TransitionToDay => 1.0 - eased,
        }
    }

    pub fn view_radius_px(&self) -> f32 {
        lerp(self.day_radius_px, self.night_radius_px, self.night_factor())
    }

    pub fn ambient_light(&self) -> u8 {
        lerp(self.day_ambient, self.night_ambient, self.night_factor())
            .round()
            .clamp(0.0, 255.0) as u8
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Opacity for a drawable at `distance` from the player, `None` when culled.
pub fn visibility_alpha(distance: f32, view_radius: f32) -> Option<u8> {
    if view_radius <= 0.0 || distance > view_radius {
        return None;
    }
    Some((255.0 * (1.0 - distance / view_radius)).max(0.0) as u8)
}
