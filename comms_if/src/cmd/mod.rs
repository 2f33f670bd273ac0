//! # Motion command module
//!
//! This module provides the motion command interface. Producers (serial frame parsers, HTTP
//! handlers, the vision decision policy) hand the motion core raw [`MotionCommand`] frames, which
//! are only a kind code plus a byte payload. The core decodes these into the typed [`MotionCmd`]
//! before acting on them.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Kind codes used in raw command frames.
pub mod kind {
    pub const STOP: u8 = 0x00;
    pub const WALK: u8 = 0x01;
    pub const TURN: u8 = 0x02;
    pub const GESTURE: u8 = 0x03;
    pub const EXPRESSION: u8 = 0x04;
    pub const PLAY: u8 = 0x05;
    pub const FACE_TRACE: u8 = 0x06;
    pub const SINGLE_SERVO: u8 = 0x07;
    pub const TRACKING_TURN: u8 = 0x08;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A raw motion command frame, as produced by any transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// The kind code of the command, see [`kind`].
    pub kind: u8,

    /// Kind specific payload
    pub params: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// A decoded motion command.
///
/// In JSON (used by command scripts) the command is tagged by its `type`, for example
/// `{"type": "WALK", "direction": "forward"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MotionCmd {
    /// Stop everything and return all joints home. Always accepted.
    Stop,

    /// Start the walking gait in the given direction.
    Walk { direction: WalkDir },

    /// Start a discrete body turn.
    Turn { direction: TurnDir },

    /// Play the named gesture.
    Gesture { name: String },

    /// Play the named expression.
    Expression { name: String },

    /// Play any action by name.
    Play { name: String },

    /// Start continuous face tracking with the head.
    FaceTrace,

    /// Drive a single joint directly, bypassing the action system.
    SingleServo {
        /// Index of the joint, see `eqpt::JointId`
        joint: u8,

        /// Units: degrees
        angle_deg: u16,
    },

    /// A body turn requested by the face tracker when the head runs out of travel.
    TrackingTurn { direction: TurnDir },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WalkDir {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnDir {
    Left,
    Right,
}

/// Possible parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CmdParseError {
    #[error("Unknown command kind 0x{0:02x}")]
    UnknownKind(u8),

    #[error("Command of kind 0x{0:02x} has a malformed payload: {1}")]
    MalformedPayload(u8, String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MotionCommand {
    /// Create a new command frame with the given kind and payload.
    pub fn new(kind: u8, params: Vec<u8>) -> Self {
        Self { kind, params }
    }

    /// The stop command frame.
    pub fn stop() -> Self {
        Self::new(kind::STOP, vec![])
    }

    /// True if this frame is a stop command, regardless of the payload.
    pub fn is_stop(&self) -> bool {
        self.kind == kind::STOP
    }
}

impl MotionCmd {
    /// Decode a raw command frame.
    pub fn decode(cmd: &MotionCommand) -> Result<Self, CmdParseError> {
        match cmd.kind {
            kind::STOP => Ok(MotionCmd::Stop),
            kind::WALK => Ok(MotionCmd::Walk {
                direction: match first_byte(cmd)? {
                    0 => WalkDir::Forward,
                    1 => WalkDir::Backward,
                    b => return Err(malformed(cmd, format!("invalid walk direction {}", b))),
                },
            }),
            kind::TURN => Ok(MotionCmd::Turn {
                direction: turn_dir(cmd)?,
            }),
            kind::GESTURE => Ok(MotionCmd::Gesture {
                name: action_name(cmd)?,
            }),
            kind::EXPRESSION => Ok(MotionCmd::Expression {
                name: action_name(cmd)?,
            }),
            kind::PLAY => Ok(MotionCmd::Play {
                name: action_name(cmd)?,
            }),
            kind::FACE_TRACE => Ok(MotionCmd::FaceTrace),
            kind::SINGLE_SERVO => {
                if cmd.params.len() != 3 {
                    return Err(malformed(
                        cmd,
                        format!("expected 3 bytes, found {}", cmd.params.len()),
                    ));
                }
                Ok(MotionCmd::SingleServo {
                    joint: cmd.params[0],
                    angle_deg: LittleEndian::read_u16(&cmd.params[1..3]),
                })
            }
            kind::TRACKING_TURN => Ok(MotionCmd::TrackingTurn {
                direction: turn_dir(cmd)?,
            }),
            k => Err(CmdParseError::UnknownKind(k)),
        }
    }

    /// Encode the command into a raw frame.
    pub fn encode(&self) -> MotionCommand {
        match self {
            MotionCmd::Stop => MotionCommand::stop(),
            MotionCmd::Walk { direction } => MotionCommand::new(
                kind::WALK,
                vec![match direction {
                    WalkDir::Forward => 0,
                    WalkDir::Backward => 1,
                }],
            ),
            MotionCmd::Turn { direction } => {
                MotionCommand::new(kind::TURN, vec![turn_dir_byte(*direction)])
            }
            MotionCmd::Gesture { name } => {
                MotionCommand::new(kind::GESTURE, name.as_bytes().to_vec())
            }
            MotionCmd::Expression { name } => {
                MotionCommand::new(kind::EXPRESSION, name.as_bytes().to_vec())
            }
            MotionCmd::Play { name } => MotionCommand::new(kind::PLAY, name.as_bytes().to_vec()),
            MotionCmd::FaceTrace => MotionCommand::new(kind::FACE_TRACE, vec![]),
            MotionCmd::SingleServo { joint, angle_deg } => {
                let mut params = vec![*joint, 0, 0];
                LittleEndian::write_u16(&mut params[1..3], *angle_deg);
                MotionCommand::new(kind::SINGLE_SERVO, params)
            }
            MotionCmd::TrackingTurn { direction } => {
                MotionCommand::new(kind::TRACKING_TURN, vec![turn_dir_byte(*direction)])
            }
        }
    }

    /// Parse a command from its JSON representation.
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn malformed(cmd: &MotionCommand, reason: String) -> CmdParseError {
    CmdParseError::MalformedPayload(cmd.kind, reason)
}

fn first_byte(cmd: &MotionCommand) -> Result<u8, CmdParseError> {
    match cmd.params.first() {
        Some(b) => Ok(*b),
        None => Err(malformed(cmd, String::from("payload is empty"))),
    }
}

fn turn_dir(cmd: &MotionCommand) -> Result<TurnDir, CmdParseError> {
    match first_byte(cmd)? {
        0 => Ok(TurnDir::Left),
        1 => Ok(TurnDir::Right),
        b => Err(malformed(cmd, format!("invalid turn direction {}", b))),
    }
}

fn turn_dir_byte(direction: TurnDir) -> u8 {
    match direction {
        TurnDir::Left => 0,
        TurnDir::Right => 1,
    }
}

fn action_name(cmd: &MotionCommand) -> Result<String, CmdParseError> {
    let name = std::str::from_utf8(&cmd.params)
        .map_err(|e| malformed(cmd, format!("action name is not UTF-8: {}", e)))?
        .trim();

    if name.is_empty() {
        return Err(malformed(cmd, String::from("action name is empty")));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_frames() {
        assert_eq!(MotionCmd::decode(&MotionCommand::stop()), Ok(MotionCmd::Stop));
        assert_eq!(
            MotionCmd::decode(&MotionCommand::new(kind::WALK, vec![1])),
            Ok(MotionCmd::Walk {
                direction: WalkDir::Backward
            })
        );
        assert_eq!(
            MotionCmd::decode(&MotionCommand::new(kind::GESTURE, b"happy".to_vec())),
            Ok(MotionCmd::Gesture {
                name: String::from("happy")
            })
        );

        // 0x012c = 300, little endian
        assert_eq!(
            MotionCmd::decode(&MotionCommand::new(kind::SINGLE_SERVO, vec![2, 0x2c, 0x01])),
            Ok(MotionCmd::SingleServo {
                joint: 2,
                angle_deg: 300
            })
        );
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            MotionCmd::decode(&MotionCommand::new(0x42, vec![])),
            Err(CmdParseError::UnknownKind(0x42))
        );

        for bad in [
            MotionCommand::new(kind::WALK, vec![]),
            MotionCommand::new(kind::TURN, vec![7]),
            MotionCommand::new(kind::PLAY, vec![]),
            MotionCommand::new(kind::PLAY, vec![0xff, 0xfe]),
            MotionCommand::new(kind::SINGLE_SERVO, vec![1, 2]),
        ]
        .iter()
        {
            match MotionCmd::decode(bad) {
                Err(CmdParseError::MalformedPayload(k, _)) => assert_eq!(k, bad.kind),
                r => panic!("Expected malformed payload for {:?}, got {:?}", bad, r),
            }
        }
    }

    #[test]
    fn test_encode_single_servo() {
        let cmd = MotionCmd::SingleServo {
            joint: 3,
            angle_deg: 135,
        };
        assert_eq!(cmd.encode().params, vec![3, 135, 0]);
        assert_eq!(MotionCmd::decode(&cmd.encode()), Ok(cmd));
    }

    #[test]
    fn test_json() {
        assert_eq!(
            MotionCmd::from_json(r#"{"type": "TURN", "direction": "left"}"#).unwrap(),
            MotionCmd::Turn {
                direction: TurnDir::Left
            }
        );
        assert_eq!(
            MotionCmd::from_json(r#"{"type": "FACE_TRACE"}"#).unwrap(),
            MotionCmd::FaceTrace
        );
        assert!(MotionCmd::from_json(r#"{"type": "DANCE"}"#).is_err());
    }
}
