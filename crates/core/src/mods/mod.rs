use bitflags::bitflags;

use crate::{Difficulty, PlayerError, Result};

bitflags! {
    /// Gameplay modifiers that influence what the player renders.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct Mods: u32 {
        const EASY = 1 << 1;
        const HIDDEN = 1 << 3;
        const HARD_ROCK = 1 << 4;
        const DOUBLE_TIME = 1 << 6;
        const HALF_TIME = 1 << 8;
        const NIGHTCORE = 1 << 9;
    }
}

const ACRONYMS: [(&str, Mods); 6] = [
    ("EZ", Mods::EASY),
    ("HD", Mods::HIDDEN),
    ("HR", Mods::HARD_ROCK),
    ("DT", Mods::DOUBLE_TIME),
    ("HT", Mods::HALF_TIME),
    ("NC", Mods::NIGHTCORE),
];

impl Mods {
    /// Parses acronyms such as `"HD,HR"`, `"hddt"` or `"HD HR"`.
    pub fn parse(input: &str) -> Result<Self> {
        let compact: String = input
            .chars()
            .filter(|c| !matches!(c, ',' | '+' | ' ' | '\t'))
            .map(|c| c.to_ascii_uppercase())
            .collect();

        if compact.len() % 2 != 0 {
            return Err(PlayerError::unsupported(format!("mod list `{input}`")));
        }

        let mut mods = Mods::empty();

        for chunk in compact.as_bytes().chunks(2) {
            let acronym = std::str::from_utf8(chunk)
                .map_err(|_| PlayerError::unsupported(format!("mod list `{input}`")))?;

            let (_, flag) = ACRONYMS
                .iter()
                .find(|(name, _)| *name == acronym)
                .ok_or_else(|| PlayerError::unsupported(format!("mod `{acronym}`")))?;

            mods |= *flag;
        }

        Ok(mods)
    }

    pub fn acronyms(self) -> String {
        ACRONYMS
            .iter()
            .filter(|(_, flag)| self.contains(*flag))
            .map(|(name, _)| *name)
            .collect()
    }

    /// Audio speed implied by the rate-changing mods.
    pub fn playback_rate(self) -> f64 {
        if self.intersects(Mods::DOUBLE_TIME | Mods::NIGHTCORE) {
            1.5
        } else if self.contains(Mods::HALF_TIME) {
            0.75
        } else {
            1.0
        }
    }

    /// Applies the difficulty-scaling mods. Rate mods leave the values alone;
    /// they act on the clock instead.
    pub fn apply(self, difficulty: &Difficulty) -> Difficulty {
        let mut adjusted = *difficulty;

        if self.contains(Mods::HARD_ROCK) {
            adjusted.circle_size = (adjusted.circle_size * 1.3).min(10.0);
            adjusted.approach_rate = (adjusted.approach_rate * 1.4).min(10.0);
            adjusted.overall_difficulty = (adjusted.overall_difficulty * 1.4).min(10.0);
            adjusted.hp_drain_rate = (adjusted.hp_drain_rate * 1.4).min(10.0);
        } else if self.contains(Mods::EASY) {
            adjusted.circle_size *= 0.5;
            adjusted.approach_rate *= 0.5;
            adjusted.overall_difficulty *= 0.5;
            adjusted.hp_drain_rate *= 0.5;
        }

        adjusted
    }
}

/// Timing and size values derived from difficulty settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyValues {
    /// Time an object is visible before its hit time.
    pub preempt: f64,
    pub fade_in: f64,
    /// Circle radius in osu!pixels.
    pub radius: f32,
}

impl DifficultyValues {
    pub fn new(difficulty: &Difficulty) -> Self {
        let preempt = preempt(difficulty.approach_rate as f64);

        Self {
            preempt,
            fade_in: 400.0 * (preempt / 450.0).min(1.0),
            radius: (54.4 - 4.48 * difficulty.circle_size).max(1.0),
        }
    }
}

/// Maps AR onto the 1800 / 1200 / 450 ms preempt table.
fn preempt(approach_rate: f64) -> f64 {
    if approach_rate < 5.0 {
        1200.0 + 600.0 * (5.0 - approach_rate) / 5.0
    } else if approach_rate > 5.0 {
        1200.0 - 750.0 * (approach_rate - 5.0) / 5.0
    } else {
        1200.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_acronym_lists() {
        assert_eq!(Mods::parse("HD,HR").unwrap(), Mods::HIDDEN | Mods::HARD_ROCK);
        assert_eq!(Mods::parse("hddt").unwrap(), Mods::HIDDEN | Mods::DOUBLE_TIME);
        assert_eq!(Mods::parse("").unwrap(), Mods::empty());
        assert!(matches!(
            Mods::parse("HD,XX"),
            Err(PlayerError::UnsupportedVariant(_))
        ));
        assert!(Mods::parse("HDH").is_err());
    }

    #[test]
    fn acronyms_round_trip() {
        let mods = Mods::HIDDEN | Mods::NIGHTCORE;
        assert_eq!(Mods::parse(&mods.acronyms()).unwrap(), mods);
    }

    #[test]
    fn rate_mods() {
        assert_eq!(Mods::DOUBLE_TIME.playback_rate(), 1.5);
        assert_eq!(Mods::NIGHTCORE.playback_rate(), 1.5);
        assert_eq!(Mods::HALF_TIME.playback_rate(), 0.75);
        assert_eq!(Mods::HIDDEN.playback_rate(), 1.0);
    }

    #[test]
    fn hard_rock_caps_at_ten() {
        let difficulty = Difficulty {
            approach_rate: 9.0,
            circle_size: 4.0,
            ..Difficulty::default()
        };

        let adjusted = Mods::HARD_ROCK.apply(&difficulty);
        assert_eq!(adjusted.approach_rate, 10.0);
        assert!((adjusted.circle_size - 5.2).abs() < 1e-5);

        let easy = Mods::EASY.apply(&difficulty);
        assert_eq!(easy.approach_rate, 4.5);
    }

    #[test]
    fn preempt_follows_approach_rate_table() {
        let at = |ar: f32| {
            DifficultyValues::new(&Difficulty {
                approach_rate: ar,
                ..Difficulty::default()
            })
        };

        assert_eq!(at(0.0).preempt, 1800.0);
        assert_eq!(at(5.0).preempt, 1200.0);
        assert_eq!(at(10.0).preempt, 450.0);
        assert_eq!(at(10.0).fade_in, 400.0);
        assert!(at(11.0).fade_in < 400.0);
    }

    #[test]
    fn radius_shrinks_with_circle_size() {
        let values = DifficultyValues::new(&Difficulty {
            circle_size: 4.0,
            ..Difficulty::default()
        });
        assert!((values.radius - 36.48).abs() < 1e-4);
    }
}
