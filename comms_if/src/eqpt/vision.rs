//! # Vision data
//!
//! Data produced by the vision pipeline which the motion core consumes.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Location of the most prominent face in the camera frame.
///
/// Units: pixels, origin at the top left of the frame.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,

    /// False if no face was found in the frame, in which case the box is meaningless.
    pub detected: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FaceLocation {
    /// A location reporting that no face is visible.
    pub fn lost() -> Self {
        Self::default()
    }

    /// Centre of the bounding box.
    pub fn centre(&self) -> (f32, f32) {
        (
            self.x as f32 + self.w as f32 / 2.0,
            self.y as f32 + self.h as f32 / 2.0,
        )
    }
}
