use crate::easing::{lerp, progress, Easing};

use super::{ObjectTiming, APPROACH_SCALE, HIT_FADE_MS, HIT_SCALE};

const FLASH_IN_MS: f64 = 40.0;
const FLASH_OUT_MS: f64 = 100.0;
const BURST_MS: f64 = 140.0;
const BURST_SCALE: f64 = 1.5;

/// Visual state of a hit circle or slider head.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircleVisual {
    pub alpha: f32,
    pub scale: f32,
    pub approach_scale: f32,
    pub approach_alpha: f32,
    /// Additive flash drawn over the circle right after the hit.
    pub flash_alpha: f32,
    pub burst_alpha: f32,
    pub burst_scale: f32,
}

impl CircleVisual {
    pub const INVISIBLE: Self = Self {
        alpha: 0.0,
        scale: 1.0,
        approach_scale: APPROACH_SCALE as f32,
        approach_alpha: 0.0,
        flash_alpha: 0.0,
        burst_alpha: 0.0,
        burst_scale: 1.0,
    };

    pub fn is_visible(&self) -> bool {
        self.alpha > 0.0
            || self.approach_alpha > 0.0
            || self.flash_alpha > 0.0
            || self.burst_alpha > 0.0
    }
}

pub fn circle_visual(timing: &ObjectTiming, time: f64, hidden: bool) -> CircleVisual {
    let appear = timing.appear_time();

    if time < appear {
        return CircleVisual::INVISIBLE;
    }

    let hidden_factor = if hidden { timing.hidden_factor(time) } else { 1.0 };

    if time < timing.start_time {
        let approach = progress(time, appear, timing.preempt);
        let approach_alpha = if hidden {
            0.0
        } else {
            progress(time, appear, (timing.fade_in * 2.0).min(timing.preempt))
        };

        return CircleVisual {
            alpha: (progress(time, appear, timing.fade_in) * hidden_factor) as f32,
            scale: 1.0,
            approach_scale: lerp(APPROACH_SCALE, 1.0, approach) as f32,
            approach_alpha: approach_alpha as f32,
            ..CircleVisual::INVISIBLE
        };
    }

    let hit = timing.start_time;
    let fade = progress(time, hit, HIT_FADE_MS);

    let flash_alpha = if time < hit + FLASH_IN_MS {
        progress(time, hit, FLASH_IN_MS)
    } else {
        1.0 - Easing::OutQuad.apply(progress(time, hit + FLASH_IN_MS, FLASH_OUT_MS))
    };

    let burst = progress(time, hit, BURST_MS);

    CircleVisual {
        alpha: ((1.0 - Easing::OutQuad.apply(fade)) * hidden_factor) as f32,
        scale: Easing::OutQuad.interpolate(1.0, HIT_SCALE, fade) as f32,
        approach_scale: 1.0,
        approach_alpha: 0.0,
        flash_alpha: flash_alpha as f32,
        burst_alpha: (1.0 - Easing::OutQuad.apply(burst)) as f32,
        burst_scale: Easing::OutQuad.interpolate(1.0, BURST_SCALE, burst) as f32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> ObjectTiming {
        ObjectTiming {
            start_time: 2000.0,
            end_time: 2000.0,
            preempt: 1200.0,
            fade_in: 800.0,
        }
    }

    #[test]
    fn invisible_before_appearing() {
        assert_eq!(circle_visual(&timing(), 700.0, false), CircleVisual::INVISIBLE);
    }

    #[test]
    fn fades_in_and_approaches() {
        let visual = circle_visual(&timing(), 1200.0, false);

        assert!((visual.alpha - 0.5).abs() < 1e-6);
        assert!(visual.approach_scale < 4.0 && visual.approach_scale > 1.0);
        assert_eq!(visual.flash_alpha, 0.0);

        let just_before = circle_visual(&timing(), 1999.0, false);
        assert_eq!(just_before.alpha, 1.0);
        assert!((just_before.approach_scale - 1.0).abs() < 0.01);
    }

    #[test]
    fn hit_grows_and_fades() {
        let at_hit = circle_visual(&timing(), 2000.0, false);
        assert_eq!(at_hit.alpha, 1.0);
        assert_eq!(at_hit.scale, 1.0);
        assert_eq!(at_hit.approach_alpha, 0.0);

        let flash_peak = circle_visual(&timing(), 2040.0, false);
        assert_eq!(flash_peak.flash_alpha, 1.0);

        let done = circle_visual(&timing(), 2240.0, false);
        assert_eq!(done.alpha, 0.0);
        assert!((done.scale - 1.4).abs() < 1e-6);
        assert!(!done.is_visible());
    }

    #[test]
    fn hidden_fades_before_hit_and_drops_approach_circle() {
        let timing = timing();
        // fade-out runs from 1520 to 1880
        let early = circle_visual(&timing, 1500.0, true);
        let normal = circle_visual(&timing, 1500.0, false);
        assert_eq!(early.alpha, normal.alpha);
        assert_eq!(early.approach_alpha, 0.0);

        let mid = circle_visual(&timing, 1700.0, true);
        assert!((mid.alpha - 0.5).abs() < 1e-6);

        assert_eq!(circle_visual(&timing, 1900.0, true).alpha, 0.0);
    }
}
