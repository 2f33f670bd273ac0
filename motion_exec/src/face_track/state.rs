//! Implementations for the FaceTracker state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::cmd::TurnDir;
use comms_if::eqpt::FaceLocation;
use log::{debug, info};
use serde::Serialize;
use util::{maths::clamp, module::State};

use super::{FaceTrackError, FaceTrackInitError, Params, PdController};
use crate::motion_core::SharedState;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// The pan offset counts as saturated within this distance of its limit.
///
/// Units: degrees
const SATURATION_EPS_DEG: f32 = 1e-3;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Face tracking module state
pub struct FaceTracker {
    params: Params,

    shared: Arc<SharedState>,

    initialised: bool,

    pan_ctrl: PdController,
    tilt_ctrl: PdController,

    /// Units: degrees
    pan_offset_deg: f32,

    /// Units: degrees
    tilt_offset_deg: f32,

    locked: bool,

    last_face: Option<FaceLocation>,

    /// Units: milliseconds
    last_face_ms: u64,

    /// Units: milliseconds
    last_turn_ms: Option<u64>,
}

/// Input data to the face tracker.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    /// Units: milliseconds
    pub now_ms: u64,

    /// The newest face location, or `None` if nothing new arrived since the last tick.
    pub face: Option<FaceLocation>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OutputData {
    /// Body turn to request, if the head has run out of travel
    pub turn: Option<TurnDir>,

    /// Units: degrees
    pub pan_offset_deg: f32,

    /// Units: degrees
    pub tilt_offset_deg: f32,
}

/// Status report for face tracker processing.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StatusReport {
    pub locked: bool,

    pub pan_saturated: bool,

    /// Why the tracker is not locked on
    pub lock_loss: Option<LockLoss>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockLoss {
    /// Face tracking is switched off
    Inactive,

    /// A body motion is running
    Frozen,

    NoFace,

    /// The face is smaller than the minimum size
    TooSmall,

    /// No face location has arrived recently
    Timeout,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl FaceTracker {
    pub fn new(shared: Arc<SharedState>) -> Self {
        let params = Params::default();
        Self {
            pan_ctrl: PdController::new(params.pan_kp, params.pan_kd),
            tilt_ctrl: PdController::new(params.tilt_kp, params.tilt_kd),
            params,
            shared,
            initialised: false,
            pan_offset_deg: 0.0,
            tilt_offset_deg: 0.0,
            locked: false,
            last_face: None,
            last_face_ms: 0,
            last_turn_ms: None,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Why the tracker cannot lock on this tick, if it can't.
    fn lock_loss(&self, now_ms: u64) -> Option<LockLoss> {
        let active = self.shared.lock_running().head().is_active();

        if !active {
            return Some(LockLoss::Inactive);
        }
        if self.shared.head_frozen() {
            return Some(LockLoss::Frozen);
        }

        match self.last_face {
            None => Some(LockLoss::NoFace),
            Some(f) if !f.detected => Some(LockLoss::NoFace),
            Some(f) if f.w < self.params.min_face_size_px || f.h < self.params.min_face_size_px => {
                Some(LockLoss::TooSmall)
            }
            Some(_) if now_ms.saturating_sub(self.last_face_ms) > self.params.face_timeout_ms => {
                Some(LockLoss::Timeout)
            }
            Some(_) => None,
        }
    }

    /// Reset the controllers and centre the head.
    fn lose_lock(&mut self, reason: LockLoss) {
        if self.locked {
            info!("Lost face lock: {:?}", reason);
        }
        self.locked = false;

        self.pan_ctrl.reset();
        self.tilt_ctrl.reset();
        self.pan_offset_deg = 0.0;
        self.tilt_offset_deg = 0.0;

        // Also clears anything written after a STOP deactivated the head
        self.shared.lock_running().head_mut().set_offsets(0.0, 0.0);
    }

    fn cooldown_elapsed(&self, now_ms: u64) -> bool {
        match self.last_turn_ms {
            Some(t) => now_ms.saturating_sub(t) >= self.params.turn_cooldown_ms,
            None => true,
        }
    }

    fn deadzone(&self, error_px: f32) -> f32 {
        if error_px.abs() < self.params.deadzone_px {
            0.0
        } else {
            error_px
        }
    }
}

impl State for FaceTracker {
    type InitData = Params;
    type InitError = FaceTrackInitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = FaceTrackError;

    /// Initialise the face tracker with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        let p = &init_data;

        if p.screen_width_px == 0 || p.screen_height_px == 0 {
            return Err(FaceTrackInitError::InvalidScreen);
        }
        for (name, value) in [
            ("period_ms", p.period_ms as f32),
            ("max_step_deg", p.max_step_deg),
            ("pan_range_deg", p.pan_range_deg),
            ("tilt_range_deg", p.tilt_range_deg),
        ]
        .iter()
        {
            if !(*value > 0.0) {
                return Err(FaceTrackInitError::NotPositive(*name));
            }
        }
        if !(p.turn_unsaturate_deg >= 0.0 && p.turn_unsaturate_deg < p.pan_range_deg) {
            return Err(FaceTrackInitError::UnsaturateTooLarge);
        }

        self.pan_ctrl = PdController::new(p.pan_kp, p.pan_kd);
        self.tilt_ctrl = PdController::new(p.tilt_kp, p.tilt_kd);
        self.params = init_data;
        self.initialised = true;

        Ok(())
    }

    /// Perform one face tracking tick.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !self.initialised {
            return Err(FaceTrackError::NotInitialised);
        }

        let now_ms = input_data.now_ms;
        if let Some(f) = input_data.face {
            self.last_face = Some(f);
            self.last_face_ms = now_ms;
        }

        let mut report = StatusReport::default();
        let mut output = OutputData {
            turn: None,
            pan_offset_deg: 0.0,
            tilt_offset_deg: 0.0,
        };

        // ---- LOCK ----

        let face = match (self.lock_loss(now_ms), self.last_face) {
            (None, Some(f)) => f,
            (reason, _) => {
                let reason = reason.unwrap_or(LockLoss::NoFace);
                self.lose_lock(reason);
                report.lock_loss = Some(reason);
                return Ok((output, report));
            }
        };

        if !self.locked {
            info!("Locked on to face at {:?}", face.centre());
            self.locked = true;
        }
        report.locked = true;

        // ---- CONTROL ----

        let (face_cx, face_cy) = face.centre();
        let pan_error = self.deadzone(self.params.screen_width_px as f32 / 2.0 - face_cx);
        let tilt_error = self.deadzone(face_cy - self.params.screen_height_px as f32 / 2.0);

        let max_step = self.params.max_step_deg;
        let pan_step = clamp(self.pan_ctrl.get(pan_error), -max_step, max_step);
        let tilt_step = clamp(self.tilt_ctrl.get(tilt_error), -max_step, max_step);

        let pan_range = self.params.pan_range_deg;
        let tilt_range = self.params.tilt_range_deg;
        self.pan_offset_deg = clamp(self.pan_offset_deg + pan_step, -pan_range, pan_range);
        self.tilt_offset_deg = clamp(self.tilt_offset_deg + tilt_step, -tilt_range, tilt_range);

        // ---- TRACKING TURNS AND OUTPUT ----

        report.pan_saturated = self.pan_offset_deg.abs() >= pan_range - SATURATION_EPS_DEG;

        {
            // Decided and written under one guard so a STOP can't deactivate the head in between
            let mut set = self.shared.lock_running();
            let active = set.head().is_active();

            if active && report.pan_saturated && !set.has_turn() && self.cooldown_elapsed(now_ms) {
                let dir = if self.pan_offset_deg > 0.0 {
                    TurnDir::Left
                } else {
                    TurnDir::Right
                };
                info!("Head out of travel, requesting a {:?} tracking turn", dir);

                output.turn = Some(dir);
                self.last_turn_ms = Some(now_ms);
                self.pan_offset_deg -=
                    self.pan_offset_deg.signum() * self.params.turn_unsaturate_deg;
            }

            if active {
                set.head_mut()
                    .set_offsets(self.pan_offset_deg, self.tilt_offset_deg);
            }
        }

        debug!(
            "Face error ({:.1}, {:.1}) px, offsets ({:.2}, {:.2}) deg",
            pan_error, tilt_error, self.pan_offset_deg, self.tilt_offset_deg
        );

        output.pan_offset_deg = self.pan_offset_deg;
        output.tilt_offset_deg = self.tilt_offset_deg;

        Ok((output, report))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
