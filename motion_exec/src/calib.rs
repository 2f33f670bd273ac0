//! # Calibration table
//!
//! Per-joint home trim and hard limits, plus the explicit mapping from joints to servo channels.
//! Both are loaded once at start-up and never change afterwards.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::{JointId, NUM_JOINTS};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Neutral angle to which the home trim is added.
///
/// Units: degrees
pub const HOME_BASELINE_DEG: f32 = 90.0;

/// Number of channels on the servo driver board.
pub const NUM_CHANNELS: u8 = 16;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Calibration parameters as stored in `calib.toml`, all arrays are indexed by [`JointId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibParams {
    /// Trim added to the 90 degree baseline to get the home angle.
    ///
    /// Units: degrees
    pub home_trim_deg: [f32; NUM_JOINTS],

    /// Units: degrees
    pub min_deg: [f32; NUM_JOINTS],

    /// Units: degrees
    pub max_deg: [f32; NUM_JOINTS],

    /// Servo channel each joint is wired to.
    pub channel: [u8; NUM_JOINTS],
}

/// Calibration of a single joint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationEntry {
    pub home_trim: f32,
    pub min: f32,
    pub max: f32,
}

/// Validated calibration for all joints.
#[derive(Debug, Clone)]
pub struct Calibration {
    entries: [CalibrationEntry; NUM_JOINTS],
}

/// Mapping from joint to servo channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    channels: [u8; NUM_JOINTS],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibError {
    #[error("Calibration of {joint} must satisfy min <= home <= max, found {min} <= {home} <= {max}")]
    InvalidLimits {
        joint: JointId,
        min: f32,
        home: f32,
        max: f32,
    },

    #[error("{0} is mapped to channel {1} which does not exist on the driver")]
    InvalidChannel(JointId, u8),

    #[error("Channel {0} is mapped to more than one joint")]
    DuplicateChannel(u8),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CalibrationEntry {
    /// Calibrated home angle.
    pub fn home(&self) -> f32 {
        HOME_BASELINE_DEG + self.home_trim
    }

    /// Clamp the angle into this joint's limits.
    pub fn clamp(&self, angle: f32) -> f32 {
        util::maths::clamp(angle, self.min, self.max)
    }
}

impl Calibration {
    /// Build a calibration from per-joint entries, checking that every home lies within its
    /// joint's limits.
    pub fn new(entries: [CalibrationEntry; NUM_JOINTS]) -> Result<Self, CalibError> {
        for joint in JointId::ALL.iter() {
            let e = &entries[joint.index()];
            let home = e.home();
            if !(e.min <= home && home <= e.max) {
                return Err(CalibError::InvalidLimits {
                    joint: *joint,
                    min: e.min,
                    home,
                    max: e.max,
                });
            }
        }

        Ok(Self { entries })
    }

    /// Build the calibration and channel map from the parameter file contents.
    pub fn from_params(params: &CalibParams) -> Result<(Self, ChannelMap), CalibError> {
        let mut entries = [CalibrationEntry {
            home_trim: 0.0,
            min: 0.0,
            max: 180.0,
        }; NUM_JOINTS];

        for i in 0..NUM_JOINTS {
            entries[i] = CalibrationEntry {
                home_trim: params.home_trim_deg[i],
                min: params.min_deg[i],
                max: params.max_deg[i],
            };
        }

        Ok((Self::new(entries)?, ChannelMap::new(params.channel)?))
    }

    /// A calibration with no trim and the full 0 to 180 degree range on every joint.
    pub fn neutral() -> Self {
        Self {
            entries: [CalibrationEntry {
                home_trim: 0.0,
                min: 0.0,
                max: 180.0,
            }; NUM_JOINTS],
        }
    }

    /// Calibrated home angle of the joint.
    pub fn home(&self, joint: JointId) -> f32 {
        self.entries[joint.index()].home()
    }

    /// Home angles of all joints.
    pub fn homes(&self) -> [f32; NUM_JOINTS] {
        let mut homes = [0f32; NUM_JOINTS];
        for (h, e) in homes.iter_mut().zip(self.entries.iter()) {
            *h = e.home();
        }
        homes
    }

    /// Clamp an angle into the joint's limits.
    pub fn clamp(&self, joint: JointId, angle: f32) -> f32 {
        self.entries[joint.index()].clamp(angle)
    }

    /// True if the angle lies within the joint's limits.
    pub fn in_limits(&self, joint: JointId, angle: f32) -> bool {
        let e = &self.entries[joint.index()];
        e.min <= angle && angle <= e.max
    }
}

impl ChannelMap {
    pub fn new(channels: [u8; NUM_JOINTS]) -> Result<Self, CalibError> {
        let mut used = [false; NUM_CHANNELS as usize];

        for joint in JointId::ALL.iter() {
            let c = channels[joint.index()];
            if c >= NUM_CHANNELS {
                return Err(CalibError::InvalidChannel(*joint, c));
            }
            if used[c as usize] {
                return Err(CalibError::DuplicateChannel(c));
            }
            used[c as usize] = true;
        }

        Ok(Self { channels })
    }

    /// Joint `i` on channel `i`.
    pub fn identity() -> Self {
        let mut channels = [0u8; NUM_JOINTS];
        for (i, c) in channels.iter_mut().enumerate() {
            *c = i as u8;
        }
        Self { channels }
    }

    /// Servo channel the joint is wired to.
    pub fn channel(&self, joint: JointId) -> u8 {
        self.channels[joint.index()]
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn params() -> CalibParams {
        let mut channel = [0u8; NUM_JOINTS];
        for (i, c) in channel.iter_mut().enumerate() {
            // Reverse the wiring to make sure nothing assumes identity
            *c = (NUM_JOINTS - 1 - i) as u8;
        }

        CalibParams {
            home_trim_deg: [0.0; NUM_JOINTS],
            min_deg: [10.0; NUM_JOINTS],
            max_deg: [170.0; NUM_JOINTS],
            channel,
        }
    }

    #[test]
    fn test_from_params() {
        let mut p = params();
        p.home_trim_deg[JointId::HeadTilt.index()] = -5.0;

        let (calib, map) = Calibration::from_params(&p).unwrap();

        assert_eq!(calib.home(JointId::HeadTilt), 85.0);
        assert_eq!(calib.home(JointId::HeadPan), 90.0);
        assert_eq!(calib.clamp(JointId::HeadPan, 200.0), 170.0);
        assert_eq!(calib.clamp(JointId::HeadPan, -20.0), 10.0);
        assert_eq!(map.channel(JointId::LeftEar), (NUM_JOINTS - 1) as u8);
        assert_eq!(map.channel(JointId::RightAnkle), 0);
    }

    #[test]
    fn test_shipped_calib() {
        let p: CalibParams = util::params::parse(include_str!("../../params/calib.toml")).unwrap();
        let (calib, map) = Calibration::from_params(&p).unwrap();

        assert_eq!(calib.home(JointId::LeftEar), 93.0);
        assert_eq!(calib.home(JointId::RightEar), 88.0);
        assert_eq!(map, ChannelMap::identity());

        // The head must be able to reach the full face tracking range
        assert!(calib.in_limits(JointId::HeadPan, 20.0));
        assert!(calib.in_limits(JointId::HeadPan, 160.0));
        assert!(calib.in_limits(JointId::HeadTilt, 50.0));
        assert!(calib.in_limits(JointId::HeadTilt, 130.0));
    }

    #[test]
    fn test_invalid_limits() {
        let mut p = params();
        p.home_trim_deg[JointId::LeftKnee.index()] = 85.0;

        match Calibration::from_params(&p) {
            Err(CalibError::InvalidLimits { joint, .. }) => assert_eq!(joint, JointId::LeftKnee),
            r => panic!("Expected invalid limits, got {:?}", r),
        }
    }

    #[test]
    fn test_invalid_channels() {
        let mut p = params();
        p.channel[0] = 16;
        assert_eq!(
            Calibration::from_params(&p).unwrap_err(),
            CalibError::InvalidChannel(JointId::LeftEar, 16)
        );

        let mut p = params();
        p.channel[0] = p.channel[1];
        assert_eq!(
            Calibration::from_params(&p).unwrap_err(),
            CalibError::DuplicateChannel(p.channel[1])
        );
    }
}
