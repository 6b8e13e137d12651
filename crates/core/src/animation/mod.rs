//! Per-object visual lifecycle.
//!
//! Every visual is a pure function of render time and the values captured
//! when the [`Drawable`] was built, so evaluating the same time twice yields
//! identical output. The only mutable state is the [`Phase`], which tracks
//! when an object became live and when it was armed.

mod circle;
mod slider;
mod spinner;

pub use circle::{circle_visual, CircleVisual};
pub use slider::{slider_visual, ArrowVisual, SliderVisual, TickVisual};
pub use spinner::{hold_visual, spinner_visual, HoldVisual, SpinnerVisual};

use crate::{easing::progress, ComboInfo, DifficultyValues, Mods, Pos2, SliderGeometry};

/// Post-hit fade for circles and slider ends.
pub const HIT_FADE_MS: f64 = 240.0;
pub const HIT_SCALE: f64 = 1.4;
/// Upper bound on how long anything lingers after its end time.
pub const LIVENESS_MS: f64 = 800.0;
pub const APPROACH_SCALE: f64 = 4.0;

/// Hidden fade-out starts this share of preempt before the hit time.
const HIDDEN_FADE_OUT_START: f64 = 0.4;
const HIDDEN_FADE_OUT_DURATION: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmKind {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Approaching,
    Armed(ArmKind),
    Faded,
}

impl Phase {
    pub fn is_live(self) -> bool {
        matches!(self, Self::Approaching | Self::Armed(_))
    }
}

/// Time window of one object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTiming {
    pub start_time: f64,
    pub end_time: f64,
    pub preempt: f64,
    pub fade_in: f64,
}

impl ObjectTiming {
    pub fn new(start_time: f64, end_time: f64, values: &DifficultyValues) -> Self {
        Self {
            start_time,
            end_time: end_time.max(start_time),
            preempt: values.preempt,
            fade_in: values.fade_in,
        }
    }

    pub fn appear_time(&self) -> f64 {
        self.start_time - self.preempt
    }

    /// After this point every visual of the object is fully transparent.
    pub fn life_time_end(&self) -> f64 {
        self.end_time + HIT_FADE_MS
    }

    /// Generous bound used when deciding which objects may still be on screen.
    pub fn liveness_end(&self) -> f64 {
        self.end_time + LIVENESS_MS
    }

    fn hidden_fade_out_start(&self) -> f64 {
        self.start_time - HIDDEN_FADE_OUT_START * self.preempt
    }

    /// Multiplier applied to object alpha under Hidden.
    fn hidden_factor(&self, time: f64) -> f64 {
        1.0 - progress(
            time,
            self.hidden_fade_out_start(),
            HIDDEN_FADE_OUT_DURATION * self.preempt,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DrawableKind {
    Circle,
    Slider(Box<SliderGeometry>),
    Spinner { end_time: f64 },
    Hold { end_time: f64 },
}

impl DrawableKind {
    fn end_time(&self, start_time: f64) -> f64 {
        match self {
            Self::Circle => start_time,
            Self::Slider(geometry) => geometry.end_time,
            Self::Spinner { end_time } | Self::Hold { end_time } => *end_time,
        }
    }
}

/// Frame output of one drawable.
#[derive(Debug, Clone, PartialEq)]
pub enum Visual {
    Circle(CircleVisual),
    Slider(SliderVisual),
    Spinner(SpinnerVisual),
    Hold(HoldVisual),
}

impl Visual {
    pub fn is_visible(&self) -> bool {
        match self {
            Self::Circle(circle) => circle.is_visible(),
            Self::Slider(slider) => slider.is_visible(),
            Self::Spinner(spinner) => spinner.alpha > 0.0,
            Self::Hold(hold) => hold.body_alpha > 0.0 || hold.head.is_visible(),
        }
    }
}

/// Runtime actor wrapping one hit object.
#[derive(Debug, Clone, PartialEq)]
pub struct Drawable {
    pub index: usize,
    pub position: Pos2,
    pub combo: ComboInfo,
    pub radius: f32,
    pub timing: ObjectTiming,
    kind: DrawableKind,
    hidden: bool,
    phase: Phase,
}

impl Drawable {
    pub fn new(
        index: usize,
        start_time: f64,
        position: Pos2,
        combo: ComboInfo,
        kind: DrawableKind,
        values: &DifficultyValues,
        mods: Mods,
    ) -> Self {
        let end_time = kind.end_time(start_time);

        Self {
            index,
            position,
            combo,
            radius: values.radius,
            timing: ObjectTiming::new(start_time, end_time, values),
            kind,
            hidden: mods.contains(Mods::HIDDEN),
            phase: Phase::Idle,
        }
    }

    pub fn kind(&self) -> &DrawableKind {
        &self.kind
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn slider(&self) -> Option<&SliderGeometry> {
        match &self.kind {
            DrawableKind::Slider(geometry) => Some(geometry),
            _ => None,
        }
    }

    /// Advances the phase to `time`. Returns the arm kind on the one call that
    /// moves the object into [`Phase::Armed`].
    pub fn update(&mut self, time: f64) -> Option<ArmKind> {
        let mut armed = None;

        if self.phase == Phase::Idle && time >= self.timing.appear_time() {
            self.phase = Phase::Approaching;
        }

        if self.phase == Phase::Approaching && time >= self.timing.start_time {
            self.phase = Phase::Armed(ArmKind::Hit);
            armed = Some(ArmKind::Hit);
        }

        if matches!(self.phase, Phase::Armed(_))
            && time >= self.timing.life_time_end()
            && !self.visual(time).is_visible()
        {
            self.phase = Phase::Faded;
        }

        armed
    }

    /// Puts the phase where it would be at `time` without arming anything.
    /// Used after seeks in either direction.
    pub fn relocate(&mut self, time: f64) {
        self.phase = if time < self.timing.appear_time() {
            Phase::Idle
        } else if time < self.timing.start_time {
            Phase::Approaching
        } else if time < self.timing.life_time_end() {
            Phase::Armed(ArmKind::Hit)
        } else {
            Phase::Faded
        };
    }

    pub fn visual(&self, time: f64) -> Visual {
        match &self.kind {
            DrawableKind::Circle => Visual::Circle(circle_visual(&self.timing, time, self.hidden)),
            DrawableKind::Slider(geometry) => {
                Visual::Slider(slider_visual(geometry, &self.timing, time, self.hidden))
            }
            DrawableKind::Spinner { .. } => Visual::Spinner(spinner_visual(&self.timing, time)),
            DrawableKind::Hold { .. } => Visual::Hold(hold_visual(&self.timing, time, self.hidden)),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{curve::PathKind, Difficulty, SliderData, TimingState};

    fn values() -> DifficultyValues {
        DifficultyValues::new(&Difficulty::default())
    }

    fn circle(start: f64, mods: Mods) -> Drawable {
        Drawable::new(
            0,
            start,
            Pos2::center(),
            ComboInfo {
                colour_index: 0,
                number: Some(1),
            },
            DrawableKind::Circle,
            &values(),
            mods,
        )
    }

    fn slider(start: f64, mods: Mods) -> Drawable {
        let data = SliderData {
            path_kind: PathKind::Linear,
            control_points: vec![Pos2::ZERO, Pos2::new(280.0, 0.0)],
            repeat_count: 1,
            pixel_length: 280.0,
            edge_sounds: Vec::new(),
            edge_sets: Vec::new(),
        };
        let geometry = SliderGeometry::compute(
            &data,
            start,
            TimingState {
                base_beat_length: 500.0,
                sv_multiplier: 1.0,
            },
            &Difficulty::default(),
            14,
            &crate::CurveConfig::default(),
        );

        Drawable::new(
            0,
            start,
            Pos2::ZERO,
            ComboInfo {
                colour_index: 0,
                number: Some(1),
            },
            DrawableKind::Slider(Box::new(geometry)),
            &values(),
            mods,
        )
    }

    #[test]
    fn walks_through_every_phase() {
        let mut drawable = circle(2000.0, Mods::empty());

        assert_eq!(drawable.update(0.0), None);
        assert_eq!(drawable.phase(), Phase::Idle);

        drawable.update(1000.0);
        assert_eq!(drawable.phase(), Phase::Approaching);

        assert_eq!(drawable.update(2000.0), Some(ArmKind::Hit));
        assert_eq!(drawable.update(2100.0), None);
        assert_eq!(drawable.phase(), Phase::Armed(ArmKind::Hit));

        drawable.update(2240.0);
        assert_eq!(drawable.phase(), Phase::Faded);
    }

    #[test]
    fn arms_once_when_skipping_ahead() {
        let mut drawable = circle(500.0, Mods::empty());

        assert_eq!(drawable.update(10_000.0), Some(ArmKind::Hit));
        assert_eq!(drawable.phase(), Phase::Faded);
        assert_eq!(drawable.update(10_016.0), None);
    }

    #[test]
    fn relocate_rewinds_without_arming() {
        let mut drawable = circle(2000.0, Mods::empty());
        drawable.update(3000.0);

        drawable.relocate(1500.0);
        assert_eq!(drawable.phase(), Phase::Approaching);
        assert_eq!(drawable.update(2000.0), Some(ArmKind::Hit));

        drawable.relocate(2100.0);
        assert_eq!(drawable.phase(), Phase::Armed(ArmKind::Hit));
        assert_eq!(drawable.update(2110.0), None);
    }

    #[test]
    fn slider_lives_until_its_end() {
        let mut drawable = slider(1000.0, Mods::empty());
        let end = drawable.timing.end_time;
        assert!((end - 3000.0).abs() < 1e-6);

        drawable.update(1000.0);
        drawable.update(end);
        assert!(drawable.phase().is_live());

        drawable.update(end + HIT_FADE_MS);
        assert_eq!(drawable.phase(), Phase::Faded);
    }

    #[test]
    fn life_bounds() {
        let drawable = circle(1000.0, Mods::empty());

        assert_eq!(drawable.timing.appear_time(), 1000.0 - 1200.0);
        assert_eq!(drawable.timing.life_time_end(), 1240.0);
        assert_eq!(drawable.timing.liveness_end(), 1800.0);
    }

    proptest! {
        #[test]
        fn visuals_are_deterministic(
            time in -2000.0f64..6000.0,
            hidden in any::<bool>(),
        ) {
            let mods = if hidden { Mods::HIDDEN } else { Mods::empty() };

            for drawable in [circle(1000.0, mods), slider(1000.0, mods)] {
                let first = drawable.visual(time);
                let second = drawable.clone().visual(time);
                prop_assert_eq!(first, second);
            }
        }
    }
}
