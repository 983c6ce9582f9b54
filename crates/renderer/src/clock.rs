//! Animation clock driving the `u_time` builtin.
//!
//! All methods take `now: Instant` instead of sampling the system clock so
//! pause/resume continuity is testable without sleeping.

use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct AnimationClock {
    /// Seconds accumulated up to the current anchor.
    base_seconds: f64,
    /// Wall-clock instant the running segment started.
    anchor: Instant,
    playing: bool,
}

impl AnimationClock {
    pub fn new(now: Instant) -> Self {
        Self {
            base_seconds: 0.0,
            anchor: now,
            playing: true,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Elapsed shader time in seconds.
    pub fn current_time(&self, now: Instant) -> f32 {
        if self.playing {
            (self.base_seconds + now.saturating_duration_since(self.anchor).as_secs_f64()) as f32
        } else {
            self.base_seconds as f32
        }
    }

    /// Freezes `current_time` at its present value.
    pub fn pause(&mut self, now: Instant) {
        if self.playing {
            self.base_seconds +=
                now.saturating_duration_since(self.anchor).as_secs_f64();
            self.playing = false;
        }
    }

    /// Restarts the wall-clock anchor so time continues without a jump.
    pub fn resume(&mut self, now: Instant) {
        if !self.playing {
            self.anchor = now;
            self.playing = true;
        }
    }

    pub fn toggle(&mut self, now: Instant) -> bool {
        if self.playing {
            self.pause(now);
        } else {
            self.resume(now);
        }
        self.playing
    }

    /// Rewinds to zero and restarts the anchor; `playing` is untouched.
    pub fn reset(&mut self, now: Instant) {
        self.base_seconds = 0.0;
        self.anchor = now;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn time_advances_while_playing() {
        let start = Instant::now();
        let clock = AnimationClock::new(start);
        let later = start + Duration::from_millis(1500);
        assert!((clock.current_time(later) - 1.5).abs() < 1e-3);
    }

    #[test]
    fn pause_then_resume_is_continuous() {
        let start = Instant::now();
        let mut clock = AnimationClock::new(start);

        let at_pause = start + Duration::from_secs(2);
        clock.pause(at_pause);
        let frozen = clock.current_time(at_pause + Duration::from_secs(30));
        assert!((frozen - 2.0).abs() < 1e-3);

        let at_resume = at_pause + Duration::from_secs(30);
        clock.resume(at_resume);
        assert!((clock.current_time(at_resume) - frozen).abs() < 1e-3);

        let later = at_resume + Duration::from_secs(1);
        assert!((clock.current_time(later) - 3.0).abs() < 1e-3);
    }

    #[test]
    fn immediate_resume_leaves_time_unchanged() {
        let start = Instant::now();
        let mut clock = AnimationClock::new(start);
        let now = start + Duration::from_secs(5);
        clock.pause(now);
        clock.resume(now);
        assert!((clock.current_time(now) - 5.0).abs() < 1e-3);
    }

    #[test]
    fn reset_zeroes_time_without_touching_playback() {
        let start = Instant::now();
        let mut clock = AnimationClock::new(start);
        let now = start + Duration::from_secs(9);
        clock.reset(now);
        assert!(clock.is_playing());
        assert!(clock.current_time(now).abs() < 1e-6);

        clock.pause(now);
        clock.reset(now);
        assert!(!clock.is_playing());
        assert!(clock.current_time(now).abs() < 1e-6);
    }
}
