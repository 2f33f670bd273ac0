//! # Joint identifiers

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of actuated joints on the robot.
pub const NUM_JOINTS: usize = 14;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// IDs of all joints available to the robot.
///
/// The discriminant is the joint's index into every per-joint array used by the motion core.
/// It is *not* the servo channel, the mapping from joint to channel is part of the calibration.
#[derive(Serialize, Deserialize, Debug, Hash, Eq, PartialEq, Copy, Clone, PartialOrd, Ord)]
pub enum JointId {
    LeftEar = 0,
    RightEar,
    HeadPan,
    HeadTilt,
    LeftShoulder,
    LeftElbow,
    RightShoulder,
    RightElbow,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    RightHip,
    RightKnee,
    RightAnkle,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointId {
    /// All joints in index order.
    pub const ALL: [JointId; NUM_JOINTS] = [
        JointId::LeftEar,
        JointId::RightEar,
        JointId::HeadPan,
        JointId::HeadTilt,
        JointId::LeftShoulder,
        JointId::LeftElbow,
        JointId::RightShoulder,
        JointId::RightElbow,
        JointId::LeftHip,
        JointId::LeftKnee,
        JointId::LeftAnkle,
        JointId::RightHip,
        JointId::RightKnee,
        JointId::RightAnkle,
    ];

    /// Index of this joint into per-joint arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Get the joint at the given index, or `None` if the index is out of range.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }
}

impl std::fmt::Display for JointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_index_mapping() {
        for (i, joint) in JointId::ALL.iter().enumerate() {
            assert_eq!(joint.index(), i);
            assert_eq!(JointId::from_index(i as u8), Some(*joint));
        }

        assert_eq!(JointId::from_index(NUM_JOINTS as u8), None);
        assert_eq!(JointId::from_index(255), None);
    }
}
