//! # Head tracking generator
//!
//! The head tracker is a gait with zero amplitude whose pan and tilt offsets are steered by the
//! face tracking controller. It exists for the whole lifetime of the core and is only ever
//! switched on or off.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::JointId;

use super::{cycle_phase, GaitParams, JointFrame};
use crate::calib::Calibration;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

pub const HEAD_TRACK_NAME: &str = "head_track";

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HeadTrack {
    active: bool,

    /// Units: milliseconds
    period_ms: u32,

    /// Units: milliseconds
    start_ms: u64,

    params: GaitParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl HeadTrack {
    pub fn new(period_ms: u32) -> Self {
        Self {
            active: false,
            period_ms,
            start_ms: 0,
            params: GaitParams::zero(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Switch tracking on. Returns `false` if it was already on, in which case nothing changes.
    pub fn activate(&mut self, now_ms: u64) -> bool {
        if self.active {
            return false;
        }
        self.active = true;
        self.start_ms = now_ms;
        true
    }

    /// Switch tracking off and centre the head.
    pub fn deactivate(&mut self) {
        self.active = false;
        self.set_offsets(0.0, 0.0);
    }

    /// Set the pan and tilt offsets from home.
    ///
    /// Units: degrees
    pub fn set_offsets(&mut self, pan_deg: f32, tilt_deg: f32) {
        self.params.offset[JointId::HeadPan.index()] = pan_deg;
        self.params.offset[JointId::HeadTilt.index()] = tilt_deg;
    }

    /// Current `(pan, tilt)` offsets.
    ///
    /// Units: degrees
    pub fn offsets(&self) -> (f32, f32) {
        (
            self.params.offset[JointId::HeadPan.index()],
            self.params.offset[JointId::HeadTilt.index()],
        )
    }

    /// Write the pan and tilt joints into `frame` if tracking is active. While active the head
    /// joints belong to the tracker even when it is centred.
    pub fn sample(&self, now_ms: u64, calib: &Calibration, frame: &mut JointFrame) {
        if !self.active {
            return;
        }

        let t = cycle_phase(now_ms.saturating_sub(self.start_ms), self.period_ms);

        for joint in [JointId::HeadPan, JointId::HeadTilt].iter() {
            let i = joint.index();
            if frame[i].is_none() {
                frame[i] = Some(self.params.angle(*joint, t, calib));
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::NUM_JOINTS;

    #[test]
    fn test_head_track() {
        let calib = Calibration::neutral();
        let mut head = HeadTrack::new(1000);
        let mut frame: JointFrame = [None; NUM_JOINTS];

        head.set_offsets(20.0, -10.0);
        head.sample(0, &calib, &mut frame);
        assert_eq!(frame, [None; NUM_JOINTS]);

        assert!(head.activate(0));
        assert!(!head.activate(50));
        head.sample(123, &calib, &mut frame);
        assert_eq!(frame[JointId::HeadPan.index()], Some(110.0));
        assert_eq!(frame[JointId::HeadTilt.index()], Some(80.0));
        assert_eq!(frame[JointId::LeftEar.index()], None);

        // Centred but still active keeps hold of the head
        let mut frame: JointFrame = [None; NUM_JOINTS];
        head.set_offsets(0.0, 0.0);
        head.sample(200, &calib, &mut frame);
        assert_eq!(frame[JointId::HeadPan.index()], Some(90.0));

        head.set_offsets(5.0, 5.0);
        head.deactivate();
        assert!(!head.is_active());
        assert_eq!(head.offsets(), (0.0, 0.0));
    }
}
