use engine::{approach, PlayerPose, Transform, Vec3};
use tracing::{debug, warn};

use super::body::RigidBody;
use super::detector::{ActionEventDetector, ActionIntent, GestureFlags};
use super::game_state::TransformWriter;
use super::tuning::MotionTuning;
use super::PlayerId;

const APEX_VERTICAL_SPEED_TOLERANCE: f32 = 0.1;
const MIN_REPORTED_MOVE: f32 = 1e-4;
// `air_control` is the per-tick blend at this rate; other rates scale it to match.
const AIR_CONTROL_REFERENCE_HZ: f32 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) enum JumpPhase {
    #[default]
    Idle,
    Launching { elapsed: f32 },
    Airborne { elapsed: f32 },
    Settling,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct PlayerMotionState {
    pub(crate) current_speed: f32,
    pub(crate) is_grounded: bool,
    pub(crate) is_crouching: bool,
    pub(crate) jump_cooldown: f32,
    pub(crate) jump_phase: JumpPhase,
    pub(crate) ground_check_timer: f32,
    pub(crate) detector: ActionEventDetector,
}

impl PlayerMotionState {
    fn new(tuning: &MotionTuning) -> Self {
        Self {
            // Due immediately so the first tick knows whether it stands on the floor.
            ground_check_timer: tuning.ground_check_interval,
            ..Self::default()
        }
    }

    pub(crate) fn is_jumping(&self) -> bool {
        matches!(
            self.jump_phase,
            JumpPhase::Launching { .. } | JumpPhase::Airborne { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum MotionEvent {
    Moved { player: PlayerId, distance: f32 },
    JumpLaunched { player: PlayerId },
}

#[derive(Debug)]
pub(crate) struct MotionController<B: RigidBody> {
    player: PlayerId,
    body: Option<B>,
    writer: TransformWriter,
    tuning: MotionTuning,
    lane_x: f32,
    state: PlayerMotionState,
    gestures: GestureFlags,
    events: Vec<MotionEvent>,
    missing_body_warned: bool,
}

impl<B: RigidBody> MotionController<B> {
    pub(crate) fn new(
        body: Option<B>,
        writer: TransformWriter,
        tuning: MotionTuning,
        lane_x: f32,
    ) -> Self {
        let state = PlayerMotionState::new(&tuning);
        Self {
            player: writer.player(),
            body,
            writer,
            tuning,
            lane_x,
            state,
            gestures: GestureFlags::default(),
            events: Vec::new(),
            missing_body_warned: false,
        }
    }

    pub(crate) fn player(&self) -> PlayerId {
        self.player
    }

    pub(crate) fn state(&self) -> &PlayerMotionState {
        &self.state
    }

    #[cfg(test)]
    pub(crate) fn body(&self) -> Option<&B> {
        self.body.as_ref()
    }

    pub(crate) fn gestures(&self) -> GestureFlags {
        self.gestures
    }

    pub(crate) fn observe_pose(&mut self, pose: Option<&PlayerPose>) -> ActionIntent {
        let intent = self.state.detector.observe(pose);
        self.gestures = intent.gestures;
        intent
    }

    pub(crate) fn drain_events(&mut self) -> std::vec::Drain<'_, MotionEvent> {
        self.events.drain(..)
    }

    pub(crate) fn reset(&mut self, start: Vec3) {
        self.state = PlayerMotionState::new(&self.tuning);
        self.gestures = GestureFlags::default();
        self.events.clear();
        if let Some(body) = self.body.as_mut() {
            body.teleport(start);
            self.writer.publish(Transform {
                position: body.position(),
                rotation_radians: body.rotation(),
            });
        }
    }

    pub(crate) fn tick(&mut self, dt: f32, intent: ActionIntent) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        let Some(body) = self.body.as_mut() else {
            if !self.missing_body_warned {
                self.missing_body_warned = true;
                warn!(player = %self.player, "motion_tick_skipped_without_body");
            }
            return;
        };
        let tuning = &self.tuning;
        let state = &mut self.state;
        let start = body.position();

        state.jump_cooldown = (state.jump_cooldown - dt).max(0.0);
        advance_jump_phase(state, body, tuning, dt);

        state.ground_check_timer += dt;
        if state.ground_check_timer >= tuning.ground_check_interval {
            state.ground_check_timer = 0.0;
            state.is_grounded = is_grounded(body, tuning);
        }

        state.is_crouching = intent.crouch;
        state.current_speed = next_speed(state.current_speed, &intent, tuning, dt);
        if state.is_crouching && state.is_grounded {
            state.current_speed = clamp_to_crawl(state.current_speed, tuning);
        }
        let output_speed = if state.is_crouching {
            state.current_speed * tuning.crouch_speed_factor
        } else {
            state.current_speed
        };

        if intent.jump_requested
            && state.jump_cooldown <= 0.0
            && state.is_grounded
            && !state.is_jumping()
        {
            let velocity = body.linear_velocity();
            body.set_linear_velocity(Vec3::new(
                velocity.x,
                tuning.jump_impulse,
                output_speed * tuning.jump_forward_factor,
            ));
            state.jump_phase = JumpPhase::Launching { elapsed: 0.0 };
            state.jump_cooldown = tuning.jump_cooldown;
            state.is_grounded = false;
            self.events.push(MotionEvent::JumpLaunched {
                player: self.player,
            });
            debug!(player = %self.player, speed = state.current_speed, "jump_launched");
        }

        let lane_correction = -(body.position().x - self.lane_x) * tuning.lane_gain;
        let velocity = body.linear_velocity();
        if state.is_jumping() {
            // Vertical and lateral velocity belong to the jump until the window closes.
        } else if state.is_grounded {
            body.set_linear_velocity(Vec3::new(lane_correction, velocity.y, output_speed));
        } else {
            let air = tuning.air_control.clamp(0.0, 1.0);
            let blend = 1.0 - (1.0 - air).powf(dt * AIR_CONTROL_REFERENCE_HZ);
            body.set_linear_velocity(Vec3::new(
                lane_correction * air,
                velocity.y,
                velocity.z + (output_speed - velocity.z) * blend,
            ));
        }

        body.integrate(dt);

        let end = body.position();
        self.writer.publish(Transform {
            position: end,
            rotation_radians: body.rotation(),
        });
        let distance = (end - start).horizontal_length();
        if distance > MIN_REPORTED_MOVE {
            self.events.push(MotionEvent::Moved {
                player: self.player,
                distance,
            });
        }
    }
}

fn advance_jump_phase<B: RigidBody>(
    state: &mut PlayerMotionState,
    body: &mut B,
    tuning: &MotionTuning,
    dt: f32,
) {
    state.jump_phase = match state.jump_phase {
        JumpPhase::Idle => JumpPhase::Idle,
        JumpPhase::Launching { elapsed } => {
            let elapsed = elapsed + dt;
            if elapsed < tuning.jump_boost_delay {
                JumpPhase::Launching { elapsed }
            } else {
                let velocity = body.linear_velocity();
                // A late check after the body already turned downward skips the boost.
                if velocity.y >= -APEX_VERTICAL_SPEED_TOLERANCE {
                    let direction = travel_direction(state.current_speed, tuning);
                    body.set_linear_velocity(Vec3::new(
                        velocity.x,
                        velocity.y,
                        velocity.z + tuning.jump_boost * direction,
                    ));
                }
                JumpPhase::Airborne { elapsed }
            }
        }
        JumpPhase::Airborne { elapsed } => {
            let elapsed = elapsed + dt;
            if elapsed < tuning.jump_window {
                JumpPhase::Airborne { elapsed }
            } else {
                JumpPhase::Settling
            }
        }
        JumpPhase::Settling if state.is_grounded => JumpPhase::Idle,
        JumpPhase::Settling => JumpPhase::Settling,
    };
}

fn travel_direction(current_speed: f32, tuning: &MotionTuning) -> f32 {
    if current_speed > tuning.stop_epsilon {
        1.0
    } else if current_speed < -tuning.stop_epsilon {
        -1.0
    } else {
        0.0
    }
}

fn is_grounded<B: RigidBody>(body: &B, tuning: &MotionTuning) -> bool {
    let vertical = body.linear_velocity().y;
    vertical.abs() < tuning.ground_max_vertical_speed
        && body.position().y < tuning.ground_max_height
        && vertical > -tuning.ground_fall_tolerance
}

fn next_speed(current: f32, intent: &ActionIntent, tuning: &MotionTuning, dt: f32) -> f32 {
    let max_speed = if intent.run {
        tuning.run_speed
    } else {
        tuning.walk_speed
    };
    let target = intent.movement.sign() * max_speed;

    if target == 0.0 {
        let next = approach(current, 0.0, tuning.deceleration * dt);
        return if next.abs() < tuning.stop_epsilon {
            0.0
        } else {
            next
        };
    }

    let same_direction = current == 0.0 || current.signum() == target.signum();
    let rate = if same_direction && target.abs() < current.abs() {
        tuning.deceleration
    } else {
        tuning.acceleration
    };
    approach(current, target, rate * dt)
}

fn clamp_to_crawl(current: f32, tuning: &MotionTuning) -> f32 {
    let magnitude = current
        .abs()
        .clamp(tuning.crawl_min_speed, tuning.crawl_max_speed);
    if current < 0.0 {
        -magnitude
    } else {
        magnitude
    }
}
