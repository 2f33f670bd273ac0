//! # Running action instances

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::eqpt::{JointId, NUM_JOINTS};
use util::maths::{clamp, ease_cosine};

use super::{cycle_phase, ActionCategory, ActionKind, ActionTemplate, Keyframe};
use crate::calib::Calibration;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// A keyframe sequence only drives joints which some frame moves further than this from home.
///
/// Units: degrees
pub const KEYFRAME_CLAIM_EPS_DEG: f32 = 0.5;

// ------------------------------------------------------------------------------------------------
// TYPES
// ------------------------------------------------------------------------------------------------

/// One tick's worth of joint demands. `None` means no generator has written the joint yet.
pub type JointFrame = [Option<f32>; NUM_JOINTS];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A template being played.
#[derive(Debug, Clone)]
pub struct ActionInstance {
    template: Arc<ActionTemplate>,

    /// Units: milliseconds
    start_ms: u64,

    remaining_repeats: u32,

    claims: [bool; NUM_JOINTS],

    /// Only present for keyframe sequences
    keyframe: Option<KeyframeState>,

    finished: bool,
}

#[derive(Debug, Clone)]
struct KeyframeState {
    frame_index: usize,

    /// Units: milliseconds
    frame_start_ms: u64,

    /// Pose the current transition started from.
    ///
    /// Units: degrees
    start_positions: [f32; NUM_JOINTS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ActionInstance {
    /// Start playing the template at `now_ms`.
    pub fn new(template: Arc<ActionTemplate>, now_ms: u64, calib: &Calibration) -> Self {
        let mut claims = [false; NUM_JOINTS];
        let mut keyframe = None;
        let mut finished = false;

        match &template.kind {
            ActionKind::GaitPeriodic { params, .. } => {
                for joint in JointId::ALL.iter() {
                    claims[joint.index()] = params.claims(*joint);
                }
            }
            ActionKind::KeyframeSequence { frames } => {
                for joint in JointId::ALL.iter() {
                    let home = calib.home(*joint);
                    claims[joint.index()] = frames
                        .iter()
                        .any(|f| (f.positions[joint.index()] - home).abs() > KEYFRAME_CLAIM_EPS_DEG);
                }

                finished = frames.is_empty();
                keyframe = Some(KeyframeState {
                    frame_index: 0,
                    frame_start_ms: now_ms,
                    start_positions: calib.homes(),
                });
            }
        }

        Self {
            remaining_repeats: template.default_repeat_count,
            template,
            start_ms: now_ms,
            claims,
            keyframe,
            finished,
        }
    }

    pub fn template(&self) -> &Arc<ActionTemplate> {
        &self.template
    }

    pub fn name(&self) -> &str {
        &self.template.name
    }

    pub fn category(&self) -> ActionCategory {
        self.template.category
    }

    pub fn is_atomic(&self) -> bool {
        self.template.is_atomic
    }

    /// Repeats left to play, including the current one. Always 0 for looping actions.
    pub fn remaining_repeats(&self) -> u32 {
        self.remaining_repeats
    }

    /// True if this instance drives the joint.
    pub fn claims(&self, joint: JointId) -> bool {
        self.claims[joint.index()]
    }

    /// True once the instance has played all of its repeats.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Evaluate the instance at `now_ms`, writing every claimed joint that is still free in
    /// `frame`. Keyframe progress advances even if every claimed joint was already written.
    pub fn sample(&mut self, now_ms: u64, calib: &Calibration, frame: &mut JointFrame) {
        let template = Arc::clone(&self.template);

        match &template.kind {
            ActionKind::GaitPeriodic { period_ms, params } => {
                let elapsed = now_ms.saturating_sub(self.start_ms);
                let t = cycle_phase(elapsed, *period_ms);

                for joint in JointId::ALL.iter() {
                    let i = joint.index();
                    if self.claims[i] && frame[i].is_none() {
                        frame[i] = Some(params.angle(*joint, t, calib));
                    }
                }

                // A repeat count of 0 never retires, only STOP removes it
                if !template.loops() && *period_ms > 0 {
                    let cycles = elapsed / *period_ms as u64;
                    let total = template.default_repeat_count as u64;
                    self.remaining_repeats = total.saturating_sub(cycles) as u32;
                    self.finished = cycles >= total;
                }
            }
            ActionKind::KeyframeSequence { frames } => {
                self.sample_keyframes(frames, template.loops(), now_ms, calib, frame)
            }
        }
    }

    fn sample_keyframes(
        &mut self,
        frames: &[Keyframe],
        loops: bool,
        now_ms: u64,
        calib: &Calibration,
        frame: &mut JointFrame,
    ) {
        let state = match self.keyframe.as_mut() {
            Some(s) => s,
            None => return,
        };

        // A finished sequence holds its final pose until it is retired
        let target = match frames.get(state.frame_index) {
            Some(f) if !self.finished => f,
            _ => {
                for joint in JointId::ALL.iter() {
                    let i = joint.index();
                    if self.claims[i] && frame[i].is_none() {
                        frame[i] = Some(calib.clamp(*joint, state.start_positions[i]));
                    }
                }
                return;
            }
        };

        let linear = if target.transition_ms == 0 {
            1.0
        } else {
            let elapsed = now_ms.saturating_sub(state.frame_start_ms);
            clamp(elapsed as f32 / target.transition_ms as f32, 0.0, 1.0)
        };
        let eased = ease_cosine(linear);

        for joint in JointId::ALL.iter() {
            let i = joint.index();
            if self.claims[i] && frame[i].is_none() {
                let start = state.start_positions[i];
                let angle = if linear >= 1.0 {
                    target.positions[i]
                } else {
                    start + (target.positions[i] - start) * eased
                };
                frame[i] = Some(calib.clamp(*joint, angle));
            }
        }

        if linear < 1.0 {
            return;
        }

        // Frame complete, the next transition starts from this frame's pose
        state.start_positions = target.positions;
        state.frame_start_ms += target.transition_ms as u64;
        state.frame_index += 1;

        if state.frame_index >= frames.len() {
            if loops {
                state.frame_index = 0;
            } else {
                self.remaining_repeats = self.remaining_repeats.saturating_sub(1);
                if self.remaining_repeats == 0 {
                    self.finished = true;
                } else {
                    state.frame_index = 0;
                }
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
