use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{PlayerError, Result, ScheduledSample};

/// Receives hit sound samples from the scheduler.
pub trait SampleSink {
    fn play_sample(&mut self, sample: &ScheduledSample);
}

/// Facts about a decoded track.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TrackInfo {
    /// Track length in milliseconds, when the decoder knows it.
    pub duration: Option<f64>,
}

/// Host audio engine. Its clock is the single source of truth for playback
/// time; the player only ever reads it.
pub trait AudioBackend: SampleSink {
    fn load(&mut self, bytes: &[u8]) -> Result<TrackInfo>;
    fn play(&mut self, offset: f64) -> Result<()>;
    fn pause(&mut self);
    fn seek(&mut self, time: f64) -> Result<()>;
    /// Current track position in milliseconds.
    fn current_time(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    fn is_playing(&self) -> bool;
}

#[derive(Debug, Default)]
struct SyntheticState {
    position: f64,
    rate: f64,
    playing: bool,
    loaded: bool,
    played: Vec<ScheduledSample>,
}

/// Deterministic audio backend whose clock only moves when told to.
///
/// Clones share the same clock, so a test can keep one handle while the
/// player owns another.
#[derive(Debug, Clone)]
pub struct SyntheticAudio {
    shared: Arc<Mutex<SyntheticState>>,
    duration: Option<f64>,
    reject_input: bool,
}

impl Default for SyntheticAudio {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SyntheticAudio {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            shared: Arc::new(Mutex::new(SyntheticState {
                rate: 1.0,
                ..SyntheticState::default()
            })),
            duration,
            reject_input: false,
        }
    }

    /// A backend that fails to decode anything, for exercising load errors.
    pub fn rejecting_input() -> Self {
        Self {
            reject_input: true,
            ..Self::new(None)
        }
    }

    /// Moves the clock forward by `wall_ms` scaled by the playback rate, if
    /// playing.
    pub fn advance(&self, wall_ms: f64) {
        let mut state = self.lock();

        if state.playing {
            state.position += wall_ms * state.rate;
        }
    }

    /// Moves the clock by `ms` regardless of state, like an engine underrun.
    pub fn jump(&self, ms: f64) {
        self.lock().position += ms;
    }

    pub fn rate(&self) -> f64 {
        self.lock().rate
    }

    /// Samples received so far.
    pub fn played(&self) -> Vec<ScheduledSample> {
        self.lock().played.clone()
    }

    pub fn clear_played(&self) {
        self.lock().played.clear();
    }

    fn lock(&self) -> MutexGuard<'_, SyntheticState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SampleSink for SyntheticAudio {
    fn play_sample(&mut self, sample: &ScheduledSample) {
        self.lock().played.push(sample.clone());
    }
}

impl AudioBackend for SyntheticAudio {
    fn load(&mut self, bytes: &[u8]) -> Result<TrackInfo> {
        if self.reject_input {
            return Err(PlayerError::AudioDecodeFailure(format!(
                "unrecognised stream of {} bytes",
                bytes.len()
            )));
        }

        let mut state = self.lock();
        state.loaded = true;
        state.position = 0.0;
        state.playing = false;

        Ok(TrackInfo {
            duration: self.duration,
        })
    }

    fn play(&mut self, offset: f64) -> Result<()> {
        let mut state = self.lock();

        if !state.loaded {
            return Err(PlayerError::NotReady("play"));
        }

        state.position = offset;
        state.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.lock().playing = false;
    }

    fn seek(&mut self, time: f64) -> Result<()> {
        self.lock().position = time;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.lock().position
    }

    fn set_playback_rate(&mut self, rate: f64) {
        self.lock().rate = rate;
    }

    fn is_playing(&self) -> bool {
        self.lock().playing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_moves_only_while_playing() {
        let mut audio = SyntheticAudio::new(Some(10_000.0));
        let info = audio.load(b"track").unwrap();
        assert_eq!(info.duration, Some(10_000.0));

        audio.advance(100.0);
        assert_eq!(audio.current_time(), 0.0);

        audio.play(500.0).unwrap();
        audio.set_playback_rate(1.5);
        audio.advance(100.0);
        assert_eq!(audio.current_time(), 650.0);

        audio.pause();
        audio.advance(100.0);
        assert_eq!(audio.current_time(), 650.0);
    }

    #[test]
    fn clones_share_the_clock() {
        let mut audio = SyntheticAudio::default();
        let handle = audio.clone();

        audio.load(&[]).unwrap();
        audio.play(0.0).unwrap();
        handle.advance(40.0);
        handle.jump(50.0);

        assert_eq!(audio.current_time(), 90.0);
    }

    #[test]
    fn rejecting_backend_reports_decode_failure() {
        let mut audio = SyntheticAudio::rejecting_input();
        let err = audio.load(b"not audio").unwrap_err();

        assert!(matches!(err, PlayerError::AudioDecodeFailure(_)));
        assert!(matches!(audio.play(0.0), Err(PlayerError::NotReady(_))));
    }
}
