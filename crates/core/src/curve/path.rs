use crate::{CurveConfig, Pos2};

use super::{flatten, PathKind};

/// A flattened slider path, cut or extended to its declared length.
#[derive(Debug, Clone, PartialEq)]
pub struct SliderPath {
    kind: PathKind,
    points: Vec<Pos2>,
    /// Cumulative arc length at every vertex; same length as `points`.
    lengths: Vec<f64>,
}

impl SliderPath {
    pub fn new(
        kind: PathKind,
        control_points: &[Pos2],
        expected_distance: Option<f64>,
        config: &CurveConfig,
    ) -> Self {
        let expected_distance = expected_distance.filter(|d| d.is_finite() && *d > 0.0);
        let mut points: Vec<Pos2> = flatten(kind, control_points, expected_distance, config)
            .into_iter()
            .filter(|point| point.is_finite())
            .collect();

        if points.is_empty() {
            points.push(control_points.first().copied().unwrap_or(Pos2::ZERO));
        }

        let mut path = Self {
            kind,
            lengths: cumulative_lengths(&points),
            points,
        };

        if let Some(expected) = expected_distance {
            path.fit_to(expected);
        }

        path
    }

    pub fn kind(&self) -> PathKind {
        self.kind
    }

    /// Flattened vertices; never empty.
    pub fn points(&self) -> &[Pos2] {
        &self.points
    }

    /// Total length of the path in osu!pixels.
    pub fn distance(&self) -> f64 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    pub fn start_position(&self) -> Pos2 {
        self.points[0]
    }

    pub fn end_position(&self) -> Pos2 {
        self.points[self.points.len() - 1]
    }

    /// Position at `progress` in `[0, 1]` along the path, by arc length.
    pub fn position_at(&self, progress: f64) -> Pos2 {
        let progress = if progress.is_nan() { 0.0 } else { progress.clamp(0.0, 1.0) };
        self.position_at_distance(progress * self.distance())
    }

    pub fn position_at_distance(&self, distance: f64) -> Pos2 {
        if self.points.len() == 1 || distance <= 0.0 {
            return self.points[0];
        }

        let idx = self.lengths.partition_point(|&len| len < distance);

        if idx >= self.points.len() {
            return self.end_position();
        }

        if idx == 0 {
            return self.points[0];
        }

        let (prev_len, next_len) = (self.lengths[idx - 1], self.lengths[idx]);
        let span = next_len - prev_len;

        if span <= f64::EPSILON {
            return self.points[idx];
        }

        let t = ((distance - prev_len) / span) as f32;
        self.points[idx - 1].lerp(self.points[idx], t)
    }

    /// Direction the path travels at `progress`, as a unit vector.
    pub fn direction_at(&self, progress: f64) -> Pos2 {
        let distance = progress.clamp(0.0, 1.0) * self.distance();
        let ahead = self.position_at_distance((distance + 1.0).min(self.distance()));
        let behind = self.position_at_distance((distance - 1.0).max(0.0));

        (ahead - behind).normalize()
    }

    /// Truncates the poly-line at `expected`, or extends its last segment in a
    /// straight line until the length matches.
    fn fit_to(&mut self, expected: f64) {
        let total = self.distance();

        if (total - expected).abs() <= f64::EPSILON {
            return;
        }

        if total > expected {
            let end = self.position_at_distance(expected);
            let keep = self.lengths.partition_point(|&len| len < expected);

            self.points.truncate(keep.max(1));
            self.lengths.truncate(keep.max(1));
            self.points.push(end);
            self.lengths.push(expected);
            return;
        }

        let Some(direction) = self.last_direction() else {
            return;
        };

        let last = self.end_position();
        let extended = last + direction * (expected - total) as f32;
        self.points.push(extended);
        self.lengths.push(expected);
    }

    fn last_direction(&self) -> Option<Pos2> {
        let last = self.end_position();

        self.points
            .iter()
            .rev()
            .skip(1)
            .map(|&point| (last - point).normalize())
            .find(|direction| *direction != Pos2::ZERO)
    }
}

fn cumulative_lengths(points: &[Pos2]) -> Vec<f64> {
    let mut total = 0.0;
    let mut lengths = Vec::with_capacity(points.len());
    lengths.push(0.0);

    for pair in points.windows(2) {
        total += pair[0].distance(pair[1]) as f64;
        lengths.push(total);
    }

    lengths
}
