//! # Equipment Interface
//!
//! This module defines the interface structures describing the robot's equipment: the joints
//! that can be actuated and the data the vision pipeline provides.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod joint;
pub mod vision;

// ------------------------------------------------------------------------------------------------
// REEXPORTS
// ------------------------------------------------------------------------------------------------

pub use joint::{JointId, NUM_JOINTS};
pub use vision::FaceLocation;
