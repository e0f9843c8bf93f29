use std::ops::{Add, AddAssign, Mul, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn horizontal_length(self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }

    pub fn distance(self, other: Self) -> f32 {
        (other - self).length()
    }

    pub fn lerp(self, target: Self, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        self + (target - self) * t
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Moves `current` toward `target` by at most `max_step`, never overshooting.
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let max_step = max_step.max(0.0);
    let diff = target - current;
    if diff.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_moves_fraction_of_gap() {
        let from = Vec3::new(0.0, 0.0, 0.0);
        let to = Vec3::new(10.0, -10.0, 5.0);
        let mid = from.lerp(to, 0.2);
        assert!((mid.x - 2.0).abs() < 0.0001);
        assert!((mid.y + 2.0).abs() < 0.0001);
        assert!((mid.z - 1.0).abs() < 0.0001);
    }

    #[test]
    fn lerp_clamps_factor() {
        let to = Vec3::new(1.0, 2.0, 3.0);
        assert_eq!(Vec3::ZERO.lerp(to, 4.0), to);
        assert_eq!(Vec3::ZERO.lerp(to, -1.0), Vec3::ZERO);
    }

    #[test]
    fn approach_never_overshoots() {
        assert_eq!(approach(0.0, 1.0, 5.0), 1.0);
        assert!((approach(0.0, 10.0, 2.5) - 2.5).abs() < 0.0001);
        assert!((approach(3.0, -10.0, 1.0) - 2.0).abs() < 0.0001);
        assert_eq!(approach(2.0, 2.0, 0.0), 2.0);
    }

    #[test]
    fn horizontal_length_ignores_height() {
        assert!((Vec3::new(3.0, 100.0, 4.0).horizontal_length() - 5.0).abs() < 0.0001);
    }
}
