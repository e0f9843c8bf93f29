use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const PLAYER_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseAction {
    #[default]
    None,
    Run,
    Jump,
    Crouch,
    MountainClimber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HeadAngles {
    #[serde(deserialize_with = "required_nullable")]
    pub pitch: Option<f32>,
    #[serde(deserialize_with = "required_nullable")]
    pub yaw: Option<f32>,
    #[serde(deserialize_with = "required_nullable")]
    pub roll: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmAngles {
    #[serde(deserialize_with = "required_nullable")]
    pub shoulder_angle: Option<f32>,
    #[serde(deserialize_with = "required_nullable")]
    pub elbow_angle: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmsAngles {
    pub left: ArmAngles,
    pub right: ArmAngles,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerPose {
    #[serde(default, deserialize_with = "nullable_action")]
    pub action: PoseAction,
    pub speed: f32,
    pub head: HeadAngles,
    pub arms: ArmsAngles,
}

/// One validated update from the pose feed. Only constructed through [`decode_pose_frame`]
/// on the receive path, so every instance holds exactly two players and finite numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoseFrame {
    pub players: [PlayerPose; PLAYER_COUNT],
    pub timestamp: f64,
}

#[derive(Debug, Deserialize)]
struct WirePoseFrame {
    players: Vec<PlayerPose>,
    timestamp: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameDecodeError {
    #[error("invalid pose frame json at {path}: {message}")]
    Json { path: String, message: String },
    #[error("pose frame must carry exactly {PLAYER_COUNT} players, got {actual}")]
    PlayerCount { actual: usize },
    #[error("non-finite number at {path}")]
    NonFinite { path: String },
    #[error("negative speed at {path}")]
    NegativeSpeed { path: String },
}

pub fn decode_pose_frame(raw: &str) -> Result<PoseFrame, FrameDecodeError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let wire = serde_path_to_error::deserialize::<_, WirePoseFrame>(&mut deserializer).map_err(
        |error| {
            let path = error.path().to_string();
            FrameDecodeError::Json {
                path: if path.is_empty() { ".".to_string() } else { path },
                message: error.into_inner().to_string(),
            }
        },
    )?;

    let actual = wire.players.len();
    let players: [PlayerPose; PLAYER_COUNT] = wire
        .players
        .try_into()
        .map_err(|_| FrameDecodeError::PlayerCount { actual })?;

    let frame = PoseFrame {
        players,
        timestamp: wire.timestamp,
    };
    validate_frame(&frame)?;
    Ok(frame)
}

fn validate_frame(frame: &PoseFrame) -> Result<(), FrameDecodeError> {
    if !frame.timestamp.is_finite() {
        return Err(FrameDecodeError::NonFinite {
            path: "timestamp".to_string(),
        });
    }

    for (index, player) in frame.players.iter().enumerate() {
        let base = format!("players[{index}]");
        if !player.speed.is_finite() {
            return Err(FrameDecodeError::NonFinite {
                path: format!("{base}.speed"),
            });
        }
        if player.speed < 0.0 {
            return Err(FrameDecodeError::NegativeSpeed {
                path: format!("{base}.speed"),
            });
        }

        let leaves = [
            ("head.pitch", player.head.pitch),
            ("head.yaw", player.head.yaw),
            ("head.roll", player.head.roll),
            ("arms.left.shoulder_angle", player.arms.left.shoulder_angle),
            ("arms.left.elbow_angle", player.arms.left.elbow_angle),
            ("arms.right.shoulder_angle", player.arms.right.shoulder_angle),
            ("arms.right.elbow_angle", player.arms.right.elbow_angle),
        ];
        for (leaf, value) in leaves {
            if matches!(value, Some(angle) if !angle.is_finite()) {
                return Err(FrameDecodeError::NonFinite {
                    path: format!("{base}.{leaf}"),
                });
            }
        }
    }

    Ok(())
}

// A present key whose value may be null. Unlike a plain `Option` field, a missing key is an error.
fn required_nullable<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<f32>::deserialize(deserializer)
}

fn nullable_action<'de, D>(deserializer: D) -> Result<PoseAction, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<PoseAction>::deserialize(deserializer).map(Option::unwrap_or_default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn player_json(action: Value) -> Value {
        json!({
            "player": 1,
            "action": action,
            "speed": 8.5,
            "head": { "pitch": 3.0, "yaw": null, "roll": -1.5 },
            "arms": {
                "left": { "shoulder_angle": 120.0, "elbow_angle": 170.0 },
                "right": { "shoulder_angle": null, "elbow_angle": null }
            },
            "timestamp": 1_700_000_000.25
        })
    }

    fn frame_json(players: Vec<Value>) -> String {
        json!({
            "players": players,
            "timestamp": 1_700_000_000.5,
            "debug": { "left_reps": { "run": 3 } }
        })
        .to_string()
    }

    #[test]
    fn decodes_upstream_frame_and_ignores_extra_fields() {
        let raw = frame_json(vec![player_json(json!("run")), player_json(json!("jump"))]);
        let frame = decode_pose_frame(&raw).expect("frame");

        assert_eq!(frame.players[0].action, PoseAction::Run);
        assert_eq!(frame.players[1].action, PoseAction::Jump);
        assert_eq!(frame.players[0].head.yaw, None);
        assert_eq!(frame.players[0].arms.left.shoulder_angle, Some(120.0));
        assert!((frame.timestamp - 1_700_000_000.5).abs() < 0.001);
    }

    #[test]
    fn null_or_absent_action_decodes_as_none() {
        let mut absent = player_json(json!(null));
        absent
            .as_object_mut()
            .expect("object")
            .remove("action")
            .expect("action key");
        let raw = frame_json(vec![player_json(json!(null)), absent]);
        let frame = decode_pose_frame(&raw).expect("frame");

        assert_eq!(frame.players[0].action, PoseAction::None);
        assert_eq!(frame.players[1].action, PoseAction::None);
    }

    #[test]
    fn mountain_climber_uses_snake_case_label() {
        let raw = frame_json(vec![
            player_json(json!("mountain_climber")),
            player_json(json!("crouch")),
        ]);
        let frame = decode_pose_frame(&raw).expect("frame");
        assert_eq!(frame.players[0].action, PoseAction::MountainClimber);
        assert_eq!(frame.players[1].action, PoseAction::Crouch);
    }

    #[test]
    fn rejects_wrong_player_count() {
        let one = frame_json(vec![player_json(json!("run"))]);
        assert_eq!(
            decode_pose_frame(&one),
            Err(FrameDecodeError::PlayerCount { actual: 1 })
        );

        let three = frame_json(vec![
            player_json(json!("run")),
            player_json(json!("run")),
            player_json(json!("run")),
        ]);
        assert_eq!(
            decode_pose_frame(&three),
            Err(FrameDecodeError::PlayerCount { actual: 3 })
        );
    }

    #[test]
    fn rejects_non_numeric_leaf_with_path() {
        let mut bad = player_json(json!("run"));
        bad["speed"] = json!("fast");
        let raw = frame_json(vec![player_json(json!("run")), bad]);

        match decode_pose_frame(&raw) {
            Err(FrameDecodeError::Json { path, .. }) => assert_eq!(path, "players[1].speed"),
            other => panic!("expected json error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_leaf_field() {
        let mut bad = player_json(json!("run"));
        bad["head"]
            .as_object_mut()
            .expect("head")
            .remove("pitch")
            .expect("pitch");
        let raw = frame_json(vec![bad, player_json(json!("run"))]);

        assert!(matches!(
            decode_pose_frame(&raw),
            Err(FrameDecodeError::Json { .. })
        ));
    }

    #[test]
    fn rejects_unrecognized_action_label() {
        let raw = frame_json(vec![
            player_json(json!("cartwheel")),
            player_json(json!("run")),
        ]);
        assert!(matches!(
            decode_pose_frame(&raw),
            Err(FrameDecodeError::Json { .. })
        ));
    }

    #[test]
    fn rejects_nan_and_infinity_literals() {
        let nan = r#"{"players":[{"action":"run","speed":NaN,"head":{"pitch":null,"yaw":null,"roll":null},"arms":{"left":{"shoulder_angle":null,"elbow_angle":null},"right":{"shoulder_angle":null,"elbow_angle":null}}}],"timestamp":1.0}"#;
        assert!(decode_pose_frame(nan).is_err());

        let infinity = nan.replace("NaN", "Infinity");
        assert!(decode_pose_frame(&infinity).is_err());
    }

    #[test]
    fn rejects_overflowing_angle_as_non_finite() {
        let mut bad = player_json(json!("run"));
        bad["arms"]["right"]["elbow_angle"] = json!(1e300);
        let raw = frame_json(vec![player_json(json!("run")), bad]);

        assert_eq!(
            decode_pose_frame(&raw),
            Err(FrameDecodeError::NonFinite {
                path: "players[1].arms.right.elbow_angle".to_string()
            })
        );
    }

    #[test]
    fn rejects_negative_speed() {
        let mut bad = player_json(json!("run"));
        bad["speed"] = json!(-1.0);
        let raw = frame_json(vec![bad, player_json(json!("run"))]);

        assert_eq!(
            decode_pose_frame(&raw),
            Err(FrameDecodeError::NegativeSpeed {
                path: "players[0].speed".to_string()
            })
        );
    }

    #[test]
    fn rejects_non_json_text() {
        assert!(matches!(
            decode_pose_frame("not json"),
            Err(FrameDecodeError::Json { .. })
        ));
    }

    #[test]
    fn serialized_frame_decodes_back() {
        let raw = frame_json(vec![player_json(json!("crouch")), player_json(json!(null))]);
        let frame = decode_pose_frame(&raw).expect("frame");
        let encoded = serde_json::to_string(&frame).expect("encode");
        assert_eq!(decode_pose_frame(&encoded), Ok(frame));
    }
}
