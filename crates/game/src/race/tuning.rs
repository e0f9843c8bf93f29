use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

use super::PlayerId;

pub(crate) const TUNING_ENV_VAR: &str = "POSERACE_TUNING";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MotionTuning {
    pub(crate) walk_speed: f32,
    pub(crate) run_speed: f32,
    pub(crate) acceleration: f32,
    pub(crate) deceleration: f32,
    pub(crate) stop_epsilon: f32,
    pub(crate) crouch_speed_factor: f32,
    pub(crate) crawl_min_speed: f32,
    pub(crate) crawl_max_speed: f32,
    pub(crate) lane_gain: f32,
    pub(crate) air_control: f32,
    pub(crate) jump_impulse: f32,
    pub(crate) jump_forward_factor: f32,
    pub(crate) jump_boost: f32,
    pub(crate) jump_boost_delay: f32,
    pub(crate) jump_window: f32,
    pub(crate) jump_cooldown: f32,
    pub(crate) ground_check_interval: f32,
    pub(crate) ground_max_vertical_speed: f32,
    pub(crate) ground_max_height: f32,
    pub(crate) ground_fall_tolerance: f32,
    pub(crate) gravity: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            walk_speed: 4.0,
            run_speed: 8.0,
            acceleration: 12.0,
            deceleration: 16.0,
            stop_epsilon: 0.05,
            crouch_speed_factor: 0.6,
            crawl_min_speed: 2.0,
            crawl_max_speed: 3.5,
            lane_gain: 5.0,
            air_control: 0.3,
            jump_impulse: 7.5,
            jump_forward_factor: 0.5,
            jump_boost: 3.0,
            jump_boost_delay: 0.15,
            jump_window: 0.30,
            jump_cooldown: 0.8,
            ground_check_interval: 0.075,
            ground_max_vertical_speed: 0.5,
            ground_max_height: 1.2,
            ground_fall_tolerance: 0.25,
            gravity: 9.81,
        }
    }
}

impl MotionTuning {
    fn fields(&self) -> [(&'static str, f32); 21] {
        [
            ("walk_speed", self.walk_speed),
            ("run_speed", self.run_speed),
            ("acceleration", self.acceleration),
            ("deceleration", self.deceleration),
            ("stop_epsilon", self.stop_epsilon),
            ("crouch_speed_factor", self.crouch_speed_factor),
            ("crawl_min_speed", self.crawl_min_speed),
            ("crawl_max_speed", self.crawl_max_speed),
            ("lane_gain", self.lane_gain),
            ("air_control", self.air_control),
            ("jump_impulse", self.jump_impulse),
            ("jump_forward_factor", self.jump_forward_factor),
            ("jump_boost", self.jump_boost),
            ("jump_boost_delay", self.jump_boost_delay),
            ("jump_window", self.jump_window),
            ("jump_cooldown", self.jump_cooldown),
            ("ground_check_interval", self.ground_check_interval),
            ("ground_max_vertical_speed", self.ground_max_vertical_speed),
            ("ground_max_height", self.ground_max_height),
            ("ground_fall_tolerance", self.ground_fall_tolerance),
            ("gravity", self.gravity),
        ]
    }

    fn validate(&self) -> Result<(), (&'static str, &'static str)> {
        for (field, value) in self.fields() {
            if !value.is_finite() {
                return Err((field, "must be finite"));
            }
            if value < 0.0 {
                return Err((field, "must not be negative"));
            }
        }
        if self.crawl_min_speed > self.crawl_max_speed {
            return Err(("crawl_min_speed", "must not exceed crawl_max_speed"));
        }
        if self.jump_boost_delay > self.jump_window {
            return Err(("jump_boost_delay", "must not exceed jump_window"));
        }
        if self.air_control > 1.0 {
            return Err(("air_control", "must not exceed 1"));
        }
        if self.ground_fall_tolerance >= self.ground_max_vertical_speed {
            return Err((
                "ground_fall_tolerance",
                "must be below ground_max_vertical_speed",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub(crate) enum TuningError {
    #[error("failed to read tuning file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse tuning file {path} at {field_path}: {message}")]
    Parse {
        path: PathBuf,
        field_path: String,
        message: String,
    },
    #[error("invalid tuning value in {path}: {field} {reason}")]
    Invalid {
        path: PathBuf,
        field: &'static str,
        reason: &'static str,
    },
}

pub(crate) fn load_tuning(path: &Path) -> Result<MotionTuning, TuningError> {
    let raw = fs::read_to_string(path).map_err(|source| TuningError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deserializer = serde_json::Deserializer::from_str(&raw);
    let tuning: MotionTuning =
        serde_path_to_error::deserialize(&mut deserializer).map_err(|error| {
            TuningError::Parse {
                path: path.to_path_buf(),
                field_path: error.path().to_string(),
                message: error.inner().to_string(),
            }
        })?;
    tuning
        .validate()
        .map_err(|(field, reason)| TuningError::Invalid {
            path: path.to_path_buf(),
            field,
            reason,
        })?;
    Ok(tuning)
}

/// Reads the optional tuning file named by `POSERACE_TUNING`. Any problem falls back to the
/// defaults with a warning; a bad tuning file never blocks startup.
pub(crate) fn tuning_from_env() -> MotionTuning {
    match env::var(TUNING_ENV_VAR) {
        Ok(value) if value.trim().is_empty() => MotionTuning::default(),
        Ok(value) => match load_tuning(Path::new(value.trim())) {
            Ok(tuning) => {
                info!(path = value.trim(), "tuning_loaded");
                tuning
            }
            Err(error) => {
                warn!(error = %error, "tuning_load_failed");
                MotionTuning::default()
            }
        },
        Err(env::VarError::NotPresent) => MotionTuning::default(),
        Err(error) => {
            warn!(
                env_var = TUNING_ENV_VAR,
                error = %error,
                "unable to read tuning env var; using defaults"
            );
            MotionTuning::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RaceConfig {
    pub(crate) start_z: f32,
    pub(crate) finish_z: f32,
    pub(crate) finish_tolerance: f32,
    pub(crate) poll_interval: Duration,
    pub(crate) lane_x: [f32; 2],
    pub(crate) replica_lerp: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            start_z: 0.0,
            finish_z: 100.0,
            finish_tolerance: 0.5,
            poll_interval: Duration::from_millis(16),
            lane_x: [-2.0, 2.0],
            replica_lerp: 0.2,
        }
    }
}

impl RaceConfig {
    pub(crate) fn lane_for(&self, player: PlayerId) -> f32 {
        self.lane_x[player.index()]
    }

    pub(crate) fn trigger_z(&self) -> f32 {
        self.finish_z - self.finish_tolerance
    }
}
