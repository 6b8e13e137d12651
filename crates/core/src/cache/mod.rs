//! Versioned per-chart drawable cache.
//!
//! A rebuild produces a complete [`DrawableSet`] before it replaces the
//! current one, so anything iterating the set sees either the old or the new
//! configuration and never a mixture.

use std::ops::Range;

use tracing::debug;

use crate::{
    animation::{Drawable, DrawableKind},
    CurveConfig, Difficulty, DifficultyValues, HitObjectKind, Mods, PreparedChart,
    SliderGeometry, TimingResolver,
};

/// Fingerprint of everything that shapes the drawables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub mods: Mods,
    difficulty: [u64; 6],
}

impl CacheKey {
    pub fn new(mods: Mods, difficulty: &Difficulty) -> Self {
        Self {
            mods,
            difficulty: [
                (difficulty.circle_size as f64).to_bits(),
                (difficulty.approach_rate as f64).to_bits(),
                (difficulty.overall_difficulty as f64).to_bits(),
                (difficulty.hp_drain_rate as f64).to_bits(),
                difficulty.slider_multiplier.to_bits(),
                difficulty.slider_tick_rate.to_bits(),
            ],
        }
    }
}

/// Drawables for one (chart, mods, difficulty) configuration.
#[derive(Debug, Clone)]
pub struct DrawableSet {
    key: CacheKey,
    generation: u64,
    values: DifficultyValues,
    drawables: Vec<Drawable>,
    /// Running maximum of life ends, for binary searching the visible window.
    life_end_max: Vec<f64>,
    /// Time of the previous `update` or `relocate`.
    last_time: Option<f64>,
}

impl DrawableSet {
    pub fn build(
        chart: &PreparedChart,
        mods: Mods,
        config: &CurveConfig,
        generation: u64,
    ) -> Self {
        let difficulty = mods.apply(chart.difficulty());
        let values = DifficultyValues::new(&difficulty);
        let mut resolver = TimingResolver::new(chart.timing_points());

        let drawables: Vec<_> = chart
            .hit_objects()
            .iter()
            .zip(chart.combos())
            .enumerate()
            .map(|(index, (object, combo))| {
                let kind = match &object.kind {
                    HitObjectKind::Circle => DrawableKind::Circle,
                    HitObjectKind::Slider(data) => {
                        let state = resolver.state_at(object.start_time);
                        DrawableKind::Slider(Box::new(SliderGeometry::compute(
                            data,
                            object.start_time,
                            state,
                            &difficulty,
                            chart.format_version(),
                            config,
                        )))
                    }
                    HitObjectKind::Spinner { end_time } => DrawableKind::Spinner {
                        end_time: *end_time,
                    },
                    HitObjectKind::Hold { end_time } => DrawableKind::Hold {
                        end_time: *end_time,
                    },
                };

                Drawable::new(
                    index,
                    object.start_time,
                    object.pos,
                    *combo,
                    kind,
                    &values,
                    mods,
                )
            })
            .collect();

        let life_end_max = drawables
            .iter()
            .scan(f64::NEG_INFINITY, |max, drawable| {
                *max = max.max(drawable.timing.life_time_end());
                Some(*max)
            })
            .collect();

        Self {
            key: CacheKey::new(mods, chart.difficulty()),
            generation,
            values,
            drawables,
            life_end_max,
            last_time: None,
        }
    }

    pub fn key(&self) -> CacheKey {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn values(&self) -> &DifficultyValues {
        &self.values
    }

    pub fn drawables(&self) -> &[Drawable] {
        &self.drawables
    }

    pub fn get(&self, index: usize) -> Option<&Drawable> {
        self.drawables.get(index)
    }

    pub fn len(&self) -> usize {
        self.drawables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.drawables.is_empty()
    }

    /// Latest time at which anything in the set is still visible.
    pub fn last_life_end(&self) -> Option<f64> {
        self.life_end_max.last().copied()
    }

    /// Latest end time of any object.
    pub fn last_end_time(&self) -> Option<f64> {
        self.drawables
            .iter()
            .map(|drawable| drawable.timing.end_time)
            .reduce(f64::max)
    }

    /// Indices of objects that have appeared by `time` and whose life has not
    /// ended before it.
    pub fn window(&self, time: f64) -> Range<usize> {
        let end = self
            .drawables
            .partition_point(|drawable| drawable.timing.appear_time() <= time);
        let start = self.life_end_max.partition_point(|&life_end| life_end < time);

        start..end.max(start)
    }

    /// Advances every object in the window and collects the live ones.
    /// Objects whose whole life fell between the previous update and `time`
    /// are advanced too, so a frame jump still arms them once. Returns how
    /// many objects were armed by this call.
    pub fn update(&mut self, time: f64, visible: &mut Vec<usize>) -> usize {
        visible.clear();
        let window = self.window(time);
        let start = match self.last_time {
            Some(previous) if previous < time => window.start.min(self.window(previous).start),
            _ => window.start,
        };
        self.last_time = Some(time);
        let mut armed = 0;

        for index in start..window.end {
            let drawable = &mut self.drawables[index];

            if drawable.update(time).is_some() {
                armed += 1;
            }

            if drawable.phase().is_live() {
                visible.push(index);
            }
        }

        armed
    }

    /// Re-derives every phase for `time` after a seek.
    pub fn relocate(&mut self, time: f64) {
        self.last_time = Some(time);

        for drawable in &mut self.drawables {
            drawable.relocate(time);
        }
    }
}

/// Owner of the current [`DrawableSet`].
#[derive(Debug, Default)]
pub struct DrawableCache {
    current: Option<DrawableSet>,
    generation: u64,
}

impl DrawableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the cache matches `mods` and the chart difficulty. Returns
    /// `true` when a rebuild happened.
    pub fn ensure(&mut self, chart: &PreparedChart, mods: Mods, config: &CurveConfig) -> bool {
        let key = CacheKey::new(mods, chart.difficulty());

        if self.current.as_ref().is_some_and(|set| set.key == key) {
            return false;
        }

        self.rebuild(chart, mods, config);
        true
    }

    /// Builds a fresh set and swaps it in.
    pub fn rebuild(
        &mut self,
        chart: &PreparedChart,
        mods: Mods,
        config: &CurveConfig,
    ) -> &DrawableSet {
        self.generation += 1;
        let set = DrawableSet::build(chart, mods, config, self.generation);

        debug!(
            generation = self.generation,
            objects = set.len(),
            mods = %mods.acronyms(),
            "rebuilt drawable cache"
        );

        self.current.insert(set)
    }

    pub fn current(&self) -> Option<&DrawableSet> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut DrawableSet> {
        self.current.as_mut()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{animation::Phase, Chart, HitObject, Pos2, TimingPoint};

    fn chart() -> PreparedChart {
        Chart {
            timing_points: vec![TimingPoint::uninherited(0.0, 500.0)],
            hit_objects: vec![
                HitObject::circle(1000.0, Pos2::ZERO),
                HitObject::spinner(1500.0, 4000.0),
                HitObject::circle(4500.0, Pos2::ZERO),
            ],
            ..Chart::default()
        }
        .prepare()
        .unwrap()
    }

    #[test]
    fn rebuilds_only_when_key_changes() {
        let chart = chart();
        let config = CurveConfig::default();
        let mut cache = DrawableCache::new();

        assert!(cache.ensure(&chart, Mods::empty(), &config));
        assert!(!cache.ensure(&chart, Mods::empty(), &config));
        assert_eq!(cache.generation(), 1);

        assert!(cache.ensure(&chart, Mods::HARD_ROCK, &config));
        let set = cache.current().unwrap();
        assert_eq!(set.generation(), 2);
        assert_eq!(set.key().mods, Mods::HARD_ROCK);
        assert!(set.values().preempt < 1200.0);
    }

    #[test]
    fn rate_mods_keep_geometry_but_change_key() {
        let chart = chart();
        let config = CurveConfig::default();
        let mut cache = DrawableCache::new();

        cache.ensure(&chart, Mods::empty(), &config);
        let before = cache.current().unwrap().values().preempt;
        cache.ensure(&chart, Mods::DOUBLE_TIME, &config);

        assert_eq!(cache.generation(), 2);
        assert_eq!(cache.current().unwrap().values().preempt, before);
    }

    #[test]
    fn window_covers_long_objects() {
        let chart = chart();
        let set = DrawableSet::build(&chart, Mods::empty(), &CurveConfig::default(), 1);

        // the spinner is still alive while the first circle has long faded
        assert_eq!(set.window(3500.0), 1..3);
        assert_eq!(set.window(-500.0), 0..0);
        assert_eq!(set.window(10_000.0), 3..3);
        assert_eq!(set.last_end_time(), Some(4500.0));
    }

    #[test]
    fn update_reports_live_objects_and_arms_once() {
        let chart = chart();
        let mut set = DrawableSet::build(&chart, Mods::empty(), &CurveConfig::default(), 1);
        let mut visible = Vec::new();

        assert_eq!(set.update(500.0, &mut visible), 0);
        assert_eq!(visible, vec![0, 1]);

        assert_eq!(set.update(1000.0, &mut visible), 1);
        assert_eq!(set.update(1001.0, &mut visible), 0);

        set.relocate(0.0);
        assert_eq!(set.update(1000.0, &mut visible), 1);
    }

    #[test]
    fn frame_jump_past_a_whole_life_still_arms_once() {
        let chart = chart();
        let mut set = DrawableSet::build(&chart, Mods::empty(), &CurveConfig::default(), 1);
        let mut visible = Vec::new();

        assert_eq!(set.update(900.0, &mut visible), 0);
        // the first circle lives until 1240
        assert_eq!(set.update(1300.0, &mut visible), 1);
        assert_eq!(set.drawables()[0].phase(), Phase::Faded);
        assert_eq!(visible, vec![1]);

        assert_eq!(set.update(1316.0, &mut visible), 0);
    }

    #[test]
    fn seek_forward_does_not_arm_skipped_objects() {
        let chart = chart();
        let mut set = DrawableSet::build(&chart, Mods::empty(), &CurveConfig::default(), 1);
        let mut visible = Vec::new();

        set.update(900.0, &mut visible);
        set.relocate(1300.0);

        assert_eq!(set.update(1316.0, &mut visible), 0);
        assert_eq!(set.drawables()[0].phase(), Phase::Faded);
    }
}
