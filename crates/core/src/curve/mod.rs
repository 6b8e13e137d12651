//! Flattening of slider control points into poly-lines.
//!
//! None of these functions fail: degenerate input yields a best-effort copy of
//! the input so a malformed slider renders oddly instead of halting playback.

mod path;

pub use path::SliderPath;

use std::f64::consts::{PI, TAU};

use crate::{math::distance_to_segment, CurveConfig, Pos2};

/// Determinant below which three arc points count as collinear.
const COLLINEAR_THRESHOLD: f64 = 0.001;
/// Minimum subdivisions per Catmull-Rom segment.
const CATMULL_MIN_DETAIL: usize = 8;
/// Hard cap on bezier subdivision depth, in halvings.
const BEZIER_MAX_DEPTH: u32 = 24;

/// Interpolation used between slider control points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathKind {
    Linear,
    PerfectCurve,
    Bezier,
    Catmull,
}

/// Flattens `points` according to `kind`.
///
/// `distance` is the declared pixel length and only affects two-point linear
/// paths, whose end point is projected along the segment direction.
pub fn flatten(
    kind: PathKind,
    points: &[Pos2],
    distance: Option<f64>,
    config: &CurveConfig,
) -> Vec<Pos2> {
    match points.len() {
        0 => return Vec::new(),
        1 => return points.to_vec(),
        _ => {}
    }

    match kind {
        PathKind::Linear => match (points, distance) {
            ([start, toward], Some(distance)) if distance > 0.0 => {
                linear_segment(*start, *toward, distance).to_vec()
            }
            _ => flatten_linear(points),
        },
        PathKind::PerfectCurve if points.len() == 3 => {
            flatten_perfect(points, config.arc_tolerance, config.max_arc_points)
        }
        PathKind::PerfectCurve | PathKind::Bezier => {
            flatten_bezier_runs(points, config.bezier_tolerance)
        }
        PathKind::Catmull => flatten_catmull(points),
    }
}

/// Poly-line through every control point.
pub fn flatten_linear(points: &[Pos2]) -> Vec<Pos2> {
    points.to_vec()
}

/// Two-point segment from `start` toward `toward`, scaled to `distance`.
pub fn linear_segment(start: Pos2, toward: Pos2, distance: f64) -> [Pos2; 2] {
    let direction = (toward - start).normalize();

    if direction == Pos2::ZERO {
        return [start, toward];
    }

    [start, start + direction * distance as f32]
}

/// Splits the control points at repeated points and flattens each run as an
/// independent bezier curve.
pub fn flatten_bezier_runs(points: &[Pos2], tolerance: f32) -> Vec<Pos2> {
    let mut output = Vec::new();
    let mut start = 0;

    for end in 1..points.len() {
        if points[end] == points[end - 1] && end - start > 1 {
            append_run(&mut output, &flatten_bezier(&points[start..end], tolerance));
            start = end;
        }
    }

    append_run(&mut output, &flatten_bezier(&points[start..], tolerance));

    if output.is_empty() {
        output.extend_from_slice(&points[..points.len().min(1)]);
    }

    output
}

fn append_run(output: &mut Vec<Pos2>, run: &[Pos2]) {
    let skip = match (output.last(), run.first()) {
        (Some(last), Some(first)) if last == first => 1,
        _ => 0,
    };

    output.extend_from_slice(&run[skip.min(run.len())..]);
}

/// Adaptive de Casteljau flattening of a single bezier curve.
///
/// A piece is emitted once every interior control point lies within
/// `tolerance` of its chord; the emitted vertices are exact curve points.
pub fn flatten_bezier(points: &[Pos2], tolerance: f32) -> Vec<Pos2> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let tolerance = if tolerance.is_finite() && tolerance > 0.0 {
        tolerance
    } else {
        CurveConfig::default().bezier_tolerance
    };

    let mut output = vec![points[0]];
    let mut stack = vec![(points.to_vec(), 0_u32)];

    while let Some((piece, depth)) = stack.pop() {
        if depth >= BEZIER_MAX_DEPTH || is_flat_enough(&piece, tolerance) {
            output.push(piece[piece.len() - 1]);
            continue;
        }

        let (left, right) = subdivide(&piece);
        stack.push((right, depth + 1));
        stack.push((left, depth + 1));
    }

    output
}

fn is_flat_enough(points: &[Pos2], tolerance: f32) -> bool {
    if points.iter().any(|point| !point.is_finite()) {
        return true;
    }

    let first = points[0];
    let last = points[points.len() - 1];

    points[1..points.len() - 1]
        .iter()
        .all(|&point| distance_to_segment(point, first, last) <= tolerance)
}

/// Splits a bezier curve at `t = 0.5` into two curves of the same order.
fn subdivide(points: &[Pos2]) -> (Vec<Pos2>, Vec<Pos2>) {
    let count = points.len();
    let mut midpoints = points.to_vec();
    let mut left = Vec::with_capacity(count);
    let mut right = vec![Pos2::ZERO; count];

    for i in 0..count {
        left.push(midpoints[0]);
        right[count - 1 - i] = midpoints[count - 1 - i];

        for j in 0..count - 1 - i {
            midpoints[j] = (midpoints[j] + midpoints[j + 1]) * 0.5;
        }
    }

    (left, right)
}

/// Evaluates a bezier curve at `t` with de Casteljau's algorithm.
pub fn bezier_point(points: &[Pos2], t: f32) -> Pos2 {
    if points.is_empty() {
        return Pos2::ZERO;
    }

    let mut work = points.to_vec();

    for level in (1..work.len()).rev() {
        for i in 0..level {
            work[i] = work[i].lerp(work[i + 1], t);
        }
    }

    work[0]
}

/// Circle through three points, traversed from the first to the third via the
/// second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularArc {
    pub center: Pos2,
    pub radius: f64,
    pub theta_start: f64,
    /// Unsigned angular span of the arc.
    pub theta_range: f64,
    /// `1.0` for counter-clockwise in playfield coordinates, `-1.0` otherwise.
    pub direction: f64,
}

impl CircularArc {
    /// Returns `None` for collinear or non-finite input.
    pub fn from_points(a: Pos2, b: Pos2, c: Pos2) -> Option<Self> {
        let (ax, ay) = (a.x as f64, a.y as f64);
        let (bx, by) = (b.x as f64, b.y as f64);
        let (cx, cy) = (c.x as f64, c.y as f64);

        let det = (by - ay) * (cx - ax) - (bx - ax) * (cy - ay);

        if !det.is_finite() || det.abs() < COLLINEAR_THRESHOLD {
            return None;
        }

        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        let a_sq = ax * ax + ay * ay;
        let b_sq = bx * bx + by * by;
        let c_sq = cx * cx + cy * cy;

        let center_x = (a_sq * (by - cy) + b_sq * (cy - ay) + c_sq * (ay - by)) / d;
        let center_y = (a_sq * (cx - bx) + b_sq * (ax - cx) + c_sq * (bx - ax)) / d;

        let (dax, day) = (ax - center_x, ay - center_y);
        let (dcx, dcy) = (cx - center_x, cy - center_y);

        let radius = (dax * dax + day * day).sqrt();
        let theta_start = day.atan2(dax);
        let mut theta_end = dcy.atan2(dcx);

        while theta_end < theta_start {
            theta_end += TAU;
        }

        let mut direction = 1.0;
        let mut theta_range = theta_end - theta_start;

        // b lies on the clockwise side of a->c: walk the other way round
        let ortho_x = cy - ay;
        let ortho_y = -(cx - ax);

        if ortho_x * (bx - ax) + ortho_y * (by - ay) < 0.0 {
            direction = -1.0;
            theta_range = TAU - theta_range;
        }

        if !radius.is_finite() || !center_x.is_finite() || !center_y.is_finite() {
            return None;
        }

        Some(Self {
            center: Pos2::new(center_x as f32, center_y as f32),
            radius,
            theta_start,
            theta_range,
            direction,
        })
    }

    /// Number of vertices needed so the chord error stays within `tolerance`.
    pub fn point_count(&self, tolerance: f32, max_points: usize) -> usize {
        let tolerance = tolerance as f64;
        let max_points = max_points.max(2);

        if 2.0 * self.radius <= tolerance {
            return 2;
        }

        let step = 2.0 * (1.0 - tolerance / self.radius).acos();

        if step.is_nan() || step <= 0.0 {
            return max_points;
        }

        ((self.theta_range / step).ceil() as usize).clamp(2, max_points)
    }

    pub fn point_at(&self, fraction: f64) -> Pos2 {
        let theta = self.theta_start + self.direction * fraction * self.theta_range;
        let center_x = self.center.x as f64;
        let center_y = self.center.y as f64;

        Pos2::new(
            (center_x + theta.cos() * self.radius) as f32,
            (center_y + theta.sin() * self.radius) as f32,
        )
    }

    pub fn length(&self) -> f64 {
        self.radius * self.theta_range
    }
}

/// Flattens a circular arc through exactly three points. Other point counts
/// are treated as bezier, collinear points as a poly-line.
pub fn flatten_perfect(points: &[Pos2], tolerance: f32, max_points: usize) -> Vec<Pos2> {
    let [a, b, c] = match points {
        [a, b, c] => [*a, *b, *c],
        _ => return flatten_bezier_runs(points, CurveConfig::default().bezier_tolerance),
    };

    let Some(arc) = CircularArc::from_points(a, b, c) else {
        return flatten_linear(points);
    };

    debug_assert!(arc.theta_range <= 2.0 * PI);

    let count = arc.point_count(tolerance, max_points);

    (0..count)
        .map(|i| arc.point_at(i as f64 / (count - 1) as f64))
        .collect()
}

/// Catmull-Rom spline through every control point.
pub fn flatten_catmull(points: &[Pos2]) -> Vec<Pos2> {
    if points.len() < 2 {
        return points.to_vec();
    }

    let last = points.len() - 1;
    let mut output = Vec::new();

    for i in 0..last {
        let v1 = points[i.saturating_sub(1)];
        let v2 = points[i];
        let v3 = points[i + 1];
        let v4 = points[(i + 2).min(last)];

        let detail = ((v2.distance(v3) / 3.0) as usize).max(CATMULL_MIN_DETAIL);

        for step in 0..detail {
            output.push(catmull_point(v1, v2, v3, v4, step as f32 / detail as f32));
        }
    }

    output.push(points[last]);

    output
}

#[inline]
fn catmull_point(p0: Pos2, p1: Pos2, p2: Pos2, p3: Pos2, t: f32) -> Pos2 {
    Pos2::new(
        catmull(p0.x, p1.x, p2.x, p3.x, t),
        catmull(p0.y, p1.y, p2.y, p3.y, t),
    )
}

#[inline]
fn catmull(p0: f32, p1: f32, p2: f32, p3: f32, t: f32) -> f32 {
    let t2 = t * t;
    let t3 = t2 * t;

    0.5 * (2.0 * p1
        + (-p0 + p2) * t
        + (2.0 * p0 - 5.0 * p1 + 4.0 * p2 - p3) * t2
        + (-p0 + 3.0 * p1 - 3.0 * p2 + p3) * t3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn config() -> CurveConfig {
        CurveConfig::default()
    }

    #[test]
    fn linear_projects_to_distance() {
        let points = [Pos2::new(10.0, 10.0), Pos2::new(20.0, 10.0)];
        let path = flatten(PathKind::Linear, &points, Some(150.0), &config());

        assert_eq!(path.len(), 2);
        assert_eq!(path[0], points[0]);
        assert!((path[1].x - 160.0).abs() < 1e-4);
        assert!((path[1].y - 10.0).abs() < 1e-4);
    }

    #[test]
    fn empty_and_single_inputs_degrade() {
        assert!(flatten(PathKind::Bezier, &[], None, &config()).is_empty());

        let single = [Pos2::new(1.0, 2.0)];
        for kind in [
            PathKind::Linear,
            PathKind::PerfectCurve,
            PathKind::Bezier,
            PathKind::Catmull,
        ] {
            assert_eq!(flatten(kind, &single, Some(100.0), &config()), single.to_vec());
        }
    }

    #[test]
    fn bezier_endpoints_are_kept() {
        let points = [Pos2::new(0.0, 0.0), Pos2::new(50.0, 100.0), Pos2::new(100.0, 0.0)];
        let path = flatten_bezier(&points, 0.08);

        assert!(path.len() > 3);
        assert_eq!(path[0], points[0]);
        assert_eq!(*path.last().unwrap(), points[2]);
    }

    #[test]
    fn bezier_runs_split_at_repeated_points() {
        let points = [
            Pos2::new(0.0, 0.0),
            Pos2::new(100.0, 0.0),
            Pos2::new(100.0, 0.0),
            Pos2::new(100.0, 100.0),
        ];
        let path = flatten_bezier_runs(&points, 0.08);

        // two straight runs meeting at the corner
        assert_eq!(
            path,
            vec![Pos2::new(0.0, 0.0), Pos2::new(100.0, 0.0), Pos2::new(100.0, 100.0)]
        );
    }

    #[test]
    fn perfect_collinear_falls_back_to_linear() {
        let points = [Pos2::new(0.0, 0.0), Pos2::new(50.0, 0.0), Pos2::new(100.0, 0.0)];
        assert_eq!(flatten_perfect(&points, 0.1, 1000), points.to_vec());
    }

    #[test]
    fn perfect_arc_follows_middle_point() {
        // upper half circle around (50, 0) with radius 50
        let points = [Pos2::new(0.0, 0.0), Pos2::new(50.0, -50.0), Pos2::new(100.0, 0.0)];
        let arc = CircularArc::from_points(points[0], points[1], points[2]).unwrap();

        assert!((arc.radius - 50.0).abs() < 1e-6);
        assert!((arc.theta_range - PI).abs() < 1e-6);
        assert!((arc.length() - 50.0 * PI).abs() < 1e-4);

        let path = flatten_perfect(&points, 0.1, 1000);
        assert!(path.iter().all(|p| p.y <= 1e-3));
        assert!((path.last().unwrap().x - 100.0).abs() < 1e-3);
    }

    #[test]
    fn tiny_radius_is_capped() {
        let arc = CircularArc {
            center: Pos2::ZERO,
            radius: 0.051,
            theta_start: 0.0,
            theta_range: PI,
            direction: 1.0,
        };

        assert!(arc.point_count(0.1, 1000) <= 1000);
        assert_eq!(arc.point_count(0.2, 1000), 2);
    }

    #[test]
    fn catmull_passes_through_control_points() {
        let points = [Pos2::new(0.0, 0.0), Pos2::new(60.0, 30.0), Pos2::new(120.0, 0.0)];
        let path = flatten_catmull(&points);

        assert!(path.len() >= 2 * CATMULL_MIN_DETAIL + 1);
        assert_eq!(path[0], points[0]);
        assert!(path.iter().any(|p| p.distance(points[1]) < 1e-4));
        assert_eq!(*path.last().unwrap(), points[2]);
    }

    proptest! {
        #[test]
        fn arc_points_lie_on_circle(
            cx in -200.0f32..200.0,
            cy in -200.0f32..200.0,
            radius in 5.0f32..300.0,
            start in 0.0f32..6.0,
            sweep_a in 0.3f32..1.5,
            sweep_b in 0.3f32..1.5,
            clockwise in any::<bool>(),
        ) {
            let center = Pos2::new(cx, cy);
            let on_circle = |theta: f32| center + Pos2::new(theta.cos(), theta.sin()) * radius;
            let mut points = [
                on_circle(start),
                on_circle(start + sweep_a),
                on_circle(start + sweep_a + sweep_b),
            ];
            if clockwise {
                points.reverse();
            }

            let arc = CircularArc::from_points(points[0], points[1], points[2]).unwrap();
            prop_assert!((arc.radius - radius as f64).abs() < 1e-2);
            prop_assert_eq!(arc.direction < 0.0, clockwise);
            prop_assert!((arc.theta_range - (sweep_a + sweep_b) as f64).abs() < 1e-3);

            let path = flatten_perfect(&points, 0.1, 1000);
            let tolerance = 1e-2 * (1.0 + arc.radius / 100.0);

            for point in &path {
                let distance = point.distance(arc.center) as f64;
                prop_assert!((distance - arc.radius).abs() < tolerance);
            }

            prop_assert!((path[0].distance(points[0]) as f64) < tolerance);
            prop_assert!((path[path.len() - 1].distance(points[2]) as f64) < tolerance);

            // the arc bends through the middle control point, not the long way round
            let through_middle = path
                .windows(2)
                .map(|pair| distance_to_segment(points[1], pair[0], pair[1]))
                .fold(f32::INFINITY, f32::min);
            prop_assert!(through_middle < 0.2, "middle point missed by {through_middle}");
        }

        #[test]
        fn bezier_stays_within_tolerance(
            coords in proptest::collection::vec((0.0f32..512.0, 0.0f32..384.0), 3..6),
        ) {
            let points: Vec<Pos2> = coords.into_iter().map(|(x, y)| Pos2::new(x, y)).collect();
            let tolerance = 0.08;
            let path = flatten_bezier(&points, tolerance);

            // every dense sample of the true curve lies close to the poly-line
            for i in 0..=400 {
                let sample = bezier_point(&points, i as f32 / 400.0);
                let nearest = path
                    .windows(2)
                    .map(|pair| distance_to_segment(sample, pair[0], pair[1]))
                    .fold(f32::INFINITY, f32::min);

                prop_assert!(nearest <= tolerance + 0.02, "deviation {nearest}");
            }
        }
    }
}
