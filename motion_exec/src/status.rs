//! # Motion status snapshot

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A point in time view of the motion core, suitable for saving into the session.
#[derive(Debug, Clone, Serialize)]
pub struct MotionStatus {
    pub timestamp: DateTime<Utc>,

    /// Names of the running actions, in insertion order
    pub active_actions: Vec<String>,

    pub face_tracking: bool,

    pub head_frozen: bool,

    pub body_moving: bool,

    pub manual_override: bool,

    pub filter_alpha: f32,

    /// Pan and tilt offsets of the head tracker.
    ///
    /// Units: degrees
    pub head_offsets_deg: (f32, f32),

    /// Number of STOPs since start up
    pub stop_epoch: u64,
}

impl MotionStatus {
    /// True if nothing is running and no joint is held.
    pub fn is_idle(&self) -> bool {
        self.active_actions.is_empty() && !self.face_tracking && !self.manual_override
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_serialise() {
        let status = MotionStatus {
            timestamp: Utc::now(),
            active_actions: vec![String::from("walk_forward")],
            face_tracking: true,
            head_frozen: true,
            body_moving: true,
            manual_override: false,
            filter_alpha: 0.3,
            head_offsets_deg: (12.0, -4.0),
            stop_epoch: 2,
        };
        assert!(!status.is_idle());

        let json: serde_json::Value = serde_json::to_value(&status).unwrap();
        assert_eq!(json["active_actions"][0], "walk_forward");
        assert_eq!(json["head_offsets_deg"][1], -4.0);
        assert_eq!(json["stop_epoch"], 2);
    }
}
