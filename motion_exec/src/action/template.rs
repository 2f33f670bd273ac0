//! # Action templates
//!
//! Immutable descriptions of named motion patterns. A template is shared between the action
//! library and any number of running instances through an `Arc`.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f32::consts::PI;

use comms_if::eqpt::{JointId, NUM_JOINTS};
use serde::{Deserialize, Serialize};

use crate::calib::Calibration;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Amplitudes and offsets smaller than this are treated as "not driving the joint".
///
/// Units: degrees
pub const GAIT_CLAIM_EPS_DEG: f32 = 0.01;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Sinusoidal waveform parameters, indexed by [`JointId`].
///
/// `angle(t) = home + offset + amplitude * sin(2 pi t + phase)` for `t` in `[0, 1)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitParams {
    /// Units: degrees
    #[serde(default)]
    pub amplitude: [f32; NUM_JOINTS],

    /// Units: degrees
    #[serde(default)]
    pub offset: [f32; NUM_JOINTS],

    /// Units: radians
    #[serde(default)]
    pub phase: [f32; NUM_JOINTS],
}

/// A single pose in a keyframe sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time taken to move from the previous pose to this one.
    ///
    /// Units: milliseconds
    pub transition_ms: u32,

    /// Absolute target angle of each joint, clamped to the calibration limits when played.
    ///
    /// Units: degrees
    pub positions: [f32; NUM_JOINTS],
}

/// An immutable, named action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionTemplate {
    /// Unique name the action is requested by
    pub name: String,

    pub category: ActionCategory,

    /// Atomic actions cannot be interrupted or joined by any command other than STOP.
    pub is_atomic: bool,

    /// Number of times the action is played. 0 loops until stopped instead of retiring at
    /// `cycle_ms * default_repeat_count`.
    pub default_repeat_count: u32,

    pub kind: ActionKind,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The trajectory generator of an action.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionKind {
    /// Periodic sinusoidal waveform on each joint
    GaitPeriodic { period_ms: u32, params: GaitParams },

    /// Cosine eased interpolation through a list of poses
    KeyframeSequence { frames: Vec<Keyframe> },
}

/// What kind of behaviour the action is, which decides how it interacts with head tracking and
/// output smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    Gesture,
    Expression,
    Locomotion,
    Turn,
    TrackingTurn,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TemplateError {
    #[error("Action {0} is a gait with a zero period")]
    ZeroPeriod(String),

    #[error("Action {0} is a keyframe sequence with no frames")]
    NoFrames(String),

    #[error("Action {0} contains a non-finite value")]
    NotFinite(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionCategory {
    /// Whole body motions freeze head tracking and use the body motion filter alpha while they
    /// run.
    pub fn is_body_motion(self) -> bool {
        matches!(
            self,
            ActionCategory::Locomotion | ActionCategory::Turn | ActionCategory::TrackingTurn
        )
    }

    /// Discrete body turns cannot run alongside continuous head tracking.
    pub fn is_turn(self) -> bool {
        matches!(self, ActionCategory::Turn | ActionCategory::TrackingTurn)
    }
}

impl GaitParams {
    /// Parameters which drive no joint at all.
    pub fn zero() -> Self {
        Self {
            amplitude: [0.0; NUM_JOINTS],
            offset: [0.0; NUM_JOINTS],
            phase: [0.0; NUM_JOINTS],
        }
    }

    /// True if the waveform moves the joint away from home.
    pub fn claims(&self, joint: JointId) -> bool {
        let i = joint.index();
        self.amplitude[i].abs() > GAIT_CLAIM_EPS_DEG || self.offset[i].abs() > GAIT_CLAIM_EPS_DEG
    }

    /// Angle of the joint at phase `t` within the cycle, clamped to the joint's limits.
    pub fn angle(&self, joint: JointId, t: f32, calib: &Calibration) -> f32 {
        let i = joint.index();
        calib.clamp(
            joint,
            calib.home(joint)
                + self.offset[i]
                + self.amplitude[i] * (2.0 * PI * t + self.phase[i]).sin(),
        )
    }
}

impl ActionTemplate {
    /// Check the template can be played.
    pub fn validate(&self) -> Result<(), TemplateError> {
        let finite = |a: &[f32]| a.iter().all(|v| v.is_finite());

        match &self.kind {
            ActionKind::GaitPeriodic { period_ms, params } => {
                if *period_ms == 0 {
                    return Err(TemplateError::ZeroPeriod(self.name.clone()));
                }
                if !(finite(&params.amplitude) && finite(&params.offset) && finite(&params.phase))
                {
                    return Err(TemplateError::NotFinite(self.name.clone()));
                }
            }
            ActionKind::KeyframeSequence { frames } => {
                if frames.is_empty() {
                    return Err(TemplateError::NoFrames(self.name.clone()));
                }
                if !frames.iter().all(|f| finite(&f.positions)) {
                    return Err(TemplateError::NotFinite(self.name.clone()));
                }
            }
        }

        Ok(())
    }

    pub fn is_body_motion(&self) -> bool {
        self.category.is_body_motion()
    }

    /// True if the action plays forever until stopped.
    pub fn loops(&self) -> bool {
        self.default_repeat_count == 0
    }

    /// Length of a single repeat of the action.
    ///
    /// Units: milliseconds
    pub fn cycle_ms(&self) -> u64 {
        match &self.kind {
            ActionKind::GaitPeriodic { period_ms, .. } => *period_ms as u64,
            ActionKind::KeyframeSequence { frames } => {
                frames.iter().map(|f| f.transition_ms as u64).sum()
            }
        }
    }

    /// Total duration of the action, or `None` if it loops until stopped.
    ///
    /// Units: milliseconds
    pub fn duration_ms(&self) -> Option<u64> {
        if self.loops() {
            None
        } else {
            Some(self.cycle_ms() * self.default_repeat_count as u64)
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Phase within the cycle, in `[0, 1)`, after `elapsed_ms` of a waveform with the given period.
pub fn cycle_phase(elapsed_ms: u64, period_ms: u32) -> f32 {
    if period_ms == 0 {
        return 0.0;
    }
    (elapsed_ms % period_ms as u64) as f32 / period_ms as f32
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
