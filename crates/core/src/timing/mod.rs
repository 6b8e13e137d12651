//! Effective tempo and slider velocity at a point in time.

use crate::TimingPoint;

/// Beat length used before the first uninherited point.
pub const DEFAULT_BEAT_LENGTH: f64 = 600.0;
pub const MIN_SV_MULTIPLIER: f64 = 0.1;
pub const MAX_SV_MULTIPLIER: f64 = 10.0;

/// Tempo and scroll speed in effect at some time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingState {
    /// Milliseconds per beat.
    pub base_beat_length: f64,
    /// Always within `[MIN_SV_MULTIPLIER, MAX_SV_MULTIPLIER]`.
    pub sv_multiplier: f64,
}

impl Default for TimingState {
    fn default() -> Self {
        Self {
            base_beat_length: DEFAULT_BEAT_LENGTH,
            sv_multiplier: 1.0,
        }
    }
}

impl TimingState {
    pub fn bpm(&self) -> f64 {
        60_000.0 / self.base_beat_length
    }

    fn apply(&mut self, point: &TimingPoint) {
        if point.uninherited {
            if point.beat_length > 0.0 && point.beat_length.is_finite() {
                self.base_beat_length = point.beat_length;
                self.sv_multiplier = 1.0;
            }
        } else {
            let multiplier = -100.0 / point.beat_length;

            if multiplier > 0.0 && multiplier.is_finite() {
                self.sv_multiplier = multiplier.clamp(MIN_SV_MULTIPLIER, MAX_SV_MULTIPLIER);
            }
        }
    }
}

/// Forward-walking resolver over a sorted set of timing points.
///
/// Queries in ascending time order cost O(1) amortized. A query earlier than
/// the previous one resets the cursor and replays from the first point.
#[derive(Debug, Clone)]
pub struct TimingResolver {
    points: Vec<TimingPoint>,
    cursor: usize,
    state: TimingState,
    last_query: f64,
    resets: u64,
}

impl TimingResolver {
    pub fn new(points: &[TimingPoint]) -> Self {
        let mut points = points.to_vec();
        points.sort_by(|a, b| {
            a.time
                .total_cmp(&b.time)
                .then_with(|| b.uninherited.cmp(&a.uninherited))
        });

        Self {
            points,
            cursor: 0,
            state: TimingState::default(),
            last_query: f64::NEG_INFINITY,
            resets: 0,
        }
    }

    pub fn state_at(&mut self, time: f64) -> TimingState {
        if time < self.last_query {
            self.reset();
            self.resets += 1;
        }

        self.last_query = time;

        while let Some(point) = self.points.get(self.cursor) {
            if point.time > time {
                break;
            }

            self.state.apply(point);
            self.cursor += 1;
        }

        self.state
    }

    pub fn reset(&mut self) {
        self.cursor = 0;
        self.state = TimingState::default();
        self.last_query = f64::NEG_INFINITY;
    }

    /// Number of timing points consumed so far.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Number of implicit resets caused by backward queries.
    pub fn reset_count(&self) -> u64 {
        self.resets
    }

    pub fn points(&self) -> &[TimingPoint] {
        &self.points
    }
}

/// Last timing point at or before `time`, or the first one when `time`
/// precedes them all. `points` must be sorted.
pub fn timing_point_at(points: &[TimingPoint], time: f64) -> Option<&TimingPoint> {
    let idx = points.partition_point(|point| point.time <= time);

    if idx == 0 {
        points.first()
    } else {
        points.get(idx - 1)
    }
}
