//! Motion executable parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::{dispatcher, face_track, mixer, servo_ctrl};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Contents of `motion_exec.toml`. Any missing table takes its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MotionExecParams {
    pub mixer: mixer::Params,

    pub dispatcher: dispatcher::Params,

    pub face_track: face_track::Params,

    pub servo: servo_ctrl::Params,
}
