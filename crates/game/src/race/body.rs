use std::f32::consts::PI;

use engine::Vec3;

const MIN_HEADING_SPEED: f32 = 0.05;

/// The slice of a physics body the motion controller drives. Velocity is the only actuation
/// channel; position is read back after integration.
pub(crate) trait RigidBody {
    fn position(&self) -> Vec3;
    fn rotation(&self) -> f32;
    fn linear_velocity(&self) -> Vec3;
    fn set_linear_velocity(&mut self, velocity: Vec3);
    fn integrate(&mut self, dt: f32);
    /// Moves the body without simulating the path and zeroes its velocity.
    fn teleport(&mut self, position: Vec3);
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SimpleBody {
    position: Vec3,
    velocity: Vec3,
    heading: f32,
    gravity: f32,
}

impl SimpleBody {
    pub(crate) fn new(position: Vec3, gravity: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            heading: 0.0,
            gravity,
        }
    }
}

impl RigidBody for SimpleBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn rotation(&self) -> f32 {
        self.heading
    }

    fn linear_velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_linear_velocity(&mut self, velocity: Vec3) {
        if velocity.is_finite() {
            self.velocity = velocity;
        }
    }

    fn integrate(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.velocity.y -= self.gravity * dt;
        self.position += self.velocity * dt;
        // Yaw follows the sign of forward travel and holds while the body is near rest.
        if self.velocity.z > MIN_HEADING_SPEED {
            self.heading = 0.0;
        } else if self.velocity.z < -MIN_HEADING_SPEED {
            self.heading = PI;
        }
        if self.position.y < 0.0 {
            self.position.y = 0.0;
            if self.velocity.y < 0.0 {
                self.velocity.y = 0.0;
            }
        }
    }

    fn teleport(&mut self, position: Vec3) {
        self.position = position;
        self.velocity = Vec3::ZERO;
        self.heading = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resting_body_stays_on_floor() {
        let mut body = SimpleBody::new(Vec3::ZERO, 9.81);
        for _ in 0..60 {
            body.integrate(1.0 / 60.0);
        }
        assert_eq!(body.position().y, 0.0);
        assert_eq!(body.linear_velocity().y, 0.0);
    }

    #[test]
    fn launched_body_rises_then_lands() {
        let mut body = SimpleBody::new(Vec3::ZERO, 9.81);
        body.set_linear_velocity(Vec3::new(0.0, 5.0, 2.0));

        let mut peak = 0.0f32;
        for _ in 0..120 {
            body.integrate(1.0 / 60.0);
            peak = peak.max(body.position().y);
        }

        assert!(peak > 1.0);
        assert_eq!(body.position().y, 0.0);
        assert!(body.position().z > 0.0);
    }

    #[test]
    fn non_finite_velocity_is_ignored() {
        let mut body = SimpleBody::new(Vec3::ZERO, 9.81);
        body.set_linear_velocity(Vec3::new(f32::NAN, 0.0, 0.0));
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn teleport_clears_velocity() {
        let mut body = SimpleBody::new(Vec3::ZERO, 9.81);
        body.set_linear_velocity(Vec3::new(1.0, 1.0, 1.0));
        body.teleport(Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(body.position(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(body.linear_velocity(), Vec3::ZERO);
    }

    #[test]
    fn heading_follows_direction_of_travel() {
        let mut body = SimpleBody::new(Vec3::ZERO, 9.81);
        assert_eq!(body.rotation(), 0.0);

        body.set_linear_velocity(Vec3::new(0.0, 0.0, -3.0));
        body.integrate(1.0 / 60.0);
        assert_eq!(body.rotation(), PI);

        body.set_linear_velocity(Vec3::new(0.5, 0.0, 0.0));
        body.integrate(1.0 / 60.0);
        assert_eq!(body.rotation(), PI);

        body.set_linear_velocity(Vec3::new(0.0, 0.0, 2.0));
        body.integrate(1.0 / 60.0);
        assert_eq!(body.rotation(), 0.0);

        body.set_linear_velocity(Vec3::new(0.0, 0.0, -2.0));
        body.integrate(1.0 / 60.0);
        body.teleport(Vec3::ZERO);
        assert_eq!(body.rotation(), 0.0);
    }
}
