use std::f64::consts::TAU;

const ELASTIC_PERIOD: f64 = 0.3;
const ELASTIC_SHIFT: f64 = ELASTIC_PERIOD / 4.0;

/// Named easing curves. Input is always clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Easing {
    #[default]
    Linear,
    InQuad,
    OutQuad,
    OutCubic,
    OutQuint,
    OutElastic,
    OutElasticHalf,
}

impl Easing {
    pub fn apply(self, progress: f64) -> f64 {
        let t = if progress.is_nan() {
            0.0
        } else {
            progress.clamp(0.0, 1.0)
        };

        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => t * (2.0 - t),
            Self::OutCubic => {
                let inv = t - 1.0;
                inv * inv * inv + 1.0
            }
            Self::OutQuint => {
                let inv = t - 1.0;
                inv.powi(5) + 1.0
            }
            Self::OutElastic if t >= 1.0 => 1.0,
            Self::OutElastic => {
                2f64.powf(-10.0 * t) * ((t - ELASTIC_SHIFT) * TAU / ELASTIC_PERIOD).sin() + 1.0
            }
            Self::OutElasticHalf if t >= 1.0 => 1.0,
            Self::OutElasticHalf => {
                2f64.powf(-10.0 * t) * ((0.5 * t - ELASTIC_SHIFT) * TAU / ELASTIC_PERIOD).sin()
                    + 1.0
            }
        }
    }

    /// Eases between `from` and `to`.
    pub fn interpolate(self, from: f64, to: f64, progress: f64) -> f64 {
        lerp(from, to, self.apply(progress))
    }
}

/// Ratio of `time` into the window `[start, start + duration]`, clamped.
/// A non-positive duration acts as a step at `start`.
pub fn progress(time: f64, start: f64, duration: f64) -> f64 {
    if duration <= 0.0 || duration.is_nan() {
        return if time >= start { 1.0 } else { 0.0 };
    }

    ((time - start) / duration).clamp(0.0, 1.0)
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 7] = [
        Easing::Linear,
        Easing::InQuad,
        Easing::OutQuad,
        Easing::OutCubic,
        Easing::OutQuint,
        Easing::OutElastic,
        Easing::OutElasticHalf,
    ];

    #[test]
    fn endpoints_are_fixed() {
        for easing in ALL {
            assert!(easing.apply(0.0).abs() < 1e-9, "{easing:?} at 0");
            assert_eq!(easing.apply(1.0), 1.0, "{easing:?} at 1");
        }
    }

    #[test]
    fn clamps_out_of_range_input() {
        for easing in ALL {
            assert_eq!(easing.apply(-3.0), easing.apply(0.0));
            assert_eq!(easing.apply(7.0), 1.0);
            assert_eq!(easing.apply(f64::NAN), easing.apply(0.0));
        }
    }

    #[test]
    fn out_curves_lead_linear() {
        assert!(Easing::OutQuad.apply(0.5) > 0.5);
        assert!(Easing::OutQuint.apply(0.5) > Easing::OutCubic.apply(0.5));
        assert!(Easing::InQuad.apply(0.5) < 0.5);
    }

    #[test]
    fn elastic_overshoots() {
        let peak = (1..100)
            .map(|i| Easing::OutElastic.apply(i as f64 / 100.0))
            .fold(f64::MIN, f64::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn progress_window() {
        assert_eq!(progress(50.0, 0.0, 100.0), 0.5);
        assert_eq!(progress(-50.0, 0.0, 100.0), 0.0);
        assert_eq!(progress(500.0, 0.0, 100.0), 1.0);
        assert_eq!(progress(10.0, 10.0, 0.0), 1.0);
        assert_eq!(progress(9.0, 10.0, 0.0), 0.0);
        assert!((Easing::Linear.interpolate(1.0, 1.4, 0.5) - 1.2).abs() < 1e-12);
    }
}
