use crate::easing::{progress, Easing};

use super::{circle_visual, CircleVisual, ObjectTiming, HIT_FADE_MS};

/// Autoplay spin speed, roughly 477 rpm.
const SPIN_RADIANS_PER_MS: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinnerVisual {
    pub alpha: f32,
    pub rotation: f32,
    /// Share of the spin completed, in `[0, 1]`.
    pub progress: f32,
    /// Shrinks from 1 to 0 over the spin.
    pub approach_scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldVisual {
    pub head: CircleVisual,
    pub body_alpha: f32,
    pub progress: f32,
}

/// Fade in over the approach, hold until the end, then the post-hit fade.
fn envelope(timing: &ObjectTiming, time: f64) -> f64 {
    if time < timing.start_time {
        progress(time, timing.appear_time(), timing.fade_in)
    } else if time < timing.end_time {
        1.0
    } else {
        1.0 - Easing::OutQuad.apply(progress(time, timing.end_time, HIT_FADE_MS))
    }
}

pub fn spinner_visual(timing: &ObjectTiming, time: f64) -> SpinnerVisual {
    let duration = timing.end_time - timing.start_time;
    let done = progress(time, timing.start_time, duration);
    let spun = (time.min(timing.end_time) - timing.start_time).max(0.0);

    SpinnerVisual {
        alpha: envelope(timing, time) as f32,
        rotation: (spun * SPIN_RADIANS_PER_MS) as f32,
        progress: done as f32,
        approach_scale: (1.0 - done) as f32,
    }
}

pub fn hold_visual(timing: &ObjectTiming, time: f64, hidden: bool) -> HoldVisual {
    HoldVisual {
        head: circle_visual(timing, time, hidden),
        body_alpha: envelope(timing, time) as f32,
        progress: progress(time, timing.start_time, timing.end_time - timing.start_time) as f32,
    }
}
