use std::ops;

/// Width of the playfield in osu!pixels.
pub const PLAYFIELD_WIDTH: f32 = 512.0;
/// Height of the playfield in osu!pixels.
pub const PLAYFIELD_HEIGHT: f32 = 384.0;

/// Point or vector on the playfield.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pos2 {
    pub x: f32,
    pub y: f32,
}

impl Pos2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Centre of the playfield.
    #[inline]
    pub const fn center() -> Self {
        Self::new(PLAYFIELD_WIDTH / 2.0, PLAYFIELD_HEIGHT / 2.0)
    }

    #[inline]
    pub fn length_squared(self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.length_squared().sqrt()
    }

    #[inline]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn distance(self, other: Self) -> f32 {
        (self - other).length()
    }

    /// Unit vector in the same direction, or zero for a zero-length vector.
    #[inline]
    pub fn normalize(self) -> Self {
        let len = self.length();

        if len <= f32::EPSILON {
            Self::ZERO
        } else {
            self / len
        }
    }

    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// Angle of the vector in radians, measured from the positive x axis.
    #[inline]
    pub fn angle(self) -> f32 {
        self.y.atan2(self.x)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl ops::Add for Pos2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl ops::AddAssign for Pos2 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl ops::Sub for Pos2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl ops::Mul<f32> for Pos2 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl ops::Div<f32> for Pos2 {
    type Output = Self;

    #[inline]
    fn div(self, rhs: f32) -> Self::Output {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl ops::Neg for Pos2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self::Output {
        Self::new(-self.x, -self.y)
    }
}

/// Perpendicular distance of `point` to the infinite line through `a` and `b`.
/// Falls back to the distance to `a` when the line is degenerate.
pub fn distance_to_line(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let chord = b - a;
    let len = chord.length();

    if len <= f32::EPSILON {
        return point.distance(a);
    }

    ((point - a).x * chord.y - (point - a).y * chord.x).abs() / len
}

/// Distance of `point` to the closed segment `a..b`.
pub fn distance_to_segment(point: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_squared();

    if len_sq <= f32::EPSILON {
        return point.distance(a);
    }

    let t = ((point - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    point.distance(a + ab * t)
}

/// Length of a poly-line.
pub fn polyline_length(points: &[Pos2]) -> f64 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]) as f64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_handles_zero_vector() {
        assert_eq!(Pos2::ZERO.normalize(), Pos2::ZERO);
        let unit = Pos2::new(3.0, 4.0).normalize();
        assert!((unit.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn line_distance() {
        let d = distance_to_line(Pos2::new(5.0, 3.0), Pos2::ZERO, Pos2::new(10.0, 0.0));
        assert!((d - 3.0).abs() < 1e-6);

        let degenerate = distance_to_line(Pos2::new(3.0, 4.0), Pos2::ZERO, Pos2::ZERO);
        assert!((degenerate - 5.0).abs() < 1e-6);
    }

    #[test]
    fn segment_distance_clamps_to_endpoints() {
        let a = Pos2::ZERO;
        let b = Pos2::new(10.0, 0.0);

        assert!((distance_to_segment(Pos2::new(5.0, 2.0), a, b) - 2.0).abs() < 1e-6);
        assert!((distance_to_segment(Pos2::new(13.0, 4.0), a, b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn polyline_length_sums_segments() {
        let points = [Pos2::ZERO, Pos2::new(3.0, 4.0), Pos2::new(3.0, 10.0)];
        assert!((polyline_length(&points) - 11.0).abs() < 1e-9);
        assert_eq!(polyline_length(&points[..1]), 0.0);
    }
}
