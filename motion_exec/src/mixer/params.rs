//! Parameters structure for the mixer

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the mixer.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Units: milliseconds
    pub period_ms: u64,

    /// Output filter alpha used when no body motion is running, can be changed at runtime.
    pub default_filter_alpha: f32,

    /// Output filter alpha used while a locomotion or turn action runs. Lower is smoother.
    pub body_motion_filter_alpha: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            period_ms: 20,
            default_filter_alpha: 0.3,
            body_motion_filter_alpha: 0.15,
        }
    }
}
