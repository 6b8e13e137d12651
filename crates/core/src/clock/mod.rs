//! Render clock that chases the authoritative audio clock.

use tracing::debug;

use crate::ClockConfig;

/// Result of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockSample {
    pub render_time: f64,
    /// Clamped and smoothed frame delta, before the playback rate.
    pub delta: f64,
    /// Audio time minus render time before correction.
    pub deviation: f64,
    pub resynced: bool,
}

#[derive(Debug, Clone)]
pub struct PlaybackClock {
    config: ClockConfig,
    render_time: f64,
    last_timestamp: Option<f64>,
    smoothed_delta: Option<f64>,
}

impl Default for PlaybackClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl PlaybackClock {
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config,
            render_time: 0.0,
            last_timestamp: None,
            smoothed_delta: None,
        }
    }

    pub fn render_time(&self) -> f64 {
        self.render_time
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    /// Advances the render clock to the host frame `timestamp` and reconciles
    /// it with `audio_time`. The audio clock is never modified.
    pub fn tick(&mut self, timestamp: f64, audio_time: f64, rate: f64) -> ClockSample {
        let previous = self.last_timestamp.replace(timestamp);
        let raw = match previous {
            Some(previous) if timestamp > previous => timestamp - previous,
            _ => 0.0,
        };

        let clamped = raw.min(self.config.max_frame_delta_ms);
        // The first tick after a (re)start has no real delta to seed from.
        let delta = if previous.is_some() {
            self.smooth(clamped)
        } else {
            0.0
        };

        self.render_time += delta * rate;

        let deviation = audio_time - self.render_time;
        let resynced = deviation.abs() > self.config.resync_threshold_ms;

        if resynced {
            debug!(deviation, audio_time, "render clock resynced");
            self.render_time = audio_time;
        } else {
            self.render_time += deviation * self.config.correction_factor;
        }

        ClockSample {
            render_time: self.render_time,
            delta,
            deviation,
            resynced,
        }
    }

    fn smooth(&mut self, delta: f64) -> f64 {
        let Some(factor) = self.config.smoothing else {
            return delta;
        };

        let next = match self.smoothed_delta {
            Some(previous) => previous + factor * (delta - previous),
            None => delta,
        };
        self.smoothed_delta = Some(next);
        next
    }

    /// Jumps the render clock, e.g. after a seek.
    pub fn relocate(&mut self, time: f64) {
        self.render_time = time;
    }

    /// Forgets the last frame timestamp so the next tick after a pause does
    /// not see the paused interval as a frame delta.
    pub fn suspend(&mut self) {
        self.last_timestamp = None;
        self.smoothed_delta = None;
    }

    pub fn reset(&mut self) {
        self.render_time = 0.0;
        self.suspend();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn unsmoothed() -> PlaybackClock {
        PlaybackClock::new(ClockConfig {
            smoothing: None,
            ..ClockConfig::default()
        })
    }

    #[test]
    fn first_tick_has_no_delta() {
        let mut clock = PlaybackClock::default();
        let sample = clock.tick(5000.0, 0.0, 1.0);

        assert_eq!(sample.delta, 0.0);
        assert_eq!(sample.render_time, 0.0);
    }

    #[test]
    fn delta_is_clamped() {
        let mut clock = unsmoothed();
        clock.tick(0.0, 0.0, 1.0);

        let sample = clock.tick(5000.0, 100.0, 1.0);
        assert_eq!(sample.delta, 100.0);
        assert_eq!(sample.render_time, 100.0);
    }

    #[test]
    fn snaps_after_audio_jump() {
        let mut clock = unsmoothed();
        clock.tick(0.0, 0.0, 1.0);
        clock.tick(16.0, 16.0, 1.0);

        let sample = clock.tick(32.0, 82.0, 1.0);
        assert!(sample.resynced);
        assert_eq!(sample.render_time, 82.0);
    }

    #[test]
    fn soft_corrects_small_drift() {
        let mut clock = unsmoothed();
        clock.tick(0.0, 0.0, 1.0);

        let sample = clock.tick(10.0, 20.0, 1.0);
        assert!(!sample.resynced);
        assert!((sample.render_time - 11.0).abs() < 1e-9);
    }

    #[test]
    fn rate_scales_advance() {
        let mut clock = unsmoothed();
        clock.tick(0.0, 0.0, 1.5);

        let sample = clock.tick(20.0, 30.0, 1.5);
        assert_eq!(sample.render_time, 30.0);
    }

    #[test]
    fn smoothing_damps_spikes() {
        let mut clock = PlaybackClock::default();
        clock.tick(0.0, 0.0, 1.0);
        clock.tick(16.0, 16.0, 1.0);

        let spike = clock.tick(66.0, 66.0, 1.0);
        assert!(spike.delta < 50.0);
        assert!(spike.delta > 16.0);
    }

    #[test]
    fn suspend_ignores_paused_interval() {
        let mut clock = unsmoothed();
        clock.tick(0.0, 0.0, 1.0);
        clock.suspend();

        let resumed = clock.tick(60_000.0, 0.0, 1.0);
        assert_eq!(resumed.delta, 0.0);
        assert_eq!(resumed.render_time, 0.0);
    }

    proptest! {
        #[test]
        fn stays_within_threshold_of_audio(
            frames in prop::collection::vec((0.0f64..250.0, -60.0f64..60.0), 1..100),
            rate in 0.5f64..2.0,
        ) {
            let config = ClockConfig::default();
            let mut clock = PlaybackClock::new(config.clone());
            let mut timestamp = 0.0;
            let mut audio = 0.0;

            for (frame, jitter) in frames {
                timestamp += frame;
                audio += frame * rate + jitter;

                let sample = clock.tick(timestamp, audio, rate);
                prop_assert!(sample.delta <= config.max_frame_delta_ms);
                prop_assert!((sample.render_time - audio).abs() <= config.resync_threshold_ms);
            }
        }
    }
}
