//! Parameters structure for the face tracker

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the face tracker.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Units: milliseconds
    pub period_ms: u64,

    /// Maximum number of face locations waiting to be processed
    pub queue_len: usize,

    /// Period of the head tracker's gait.
    ///
    /// Units: milliseconds
    pub head_period_ms: u32,

    // ---- CAMERA ----

    /// Units: pixels
    pub screen_width_px: u16,

    /// Units: pixels
    pub screen_height_px: u16,

    /// Faces narrower or shorter than this are ignored.
    ///
    /// Units: pixels
    pub min_face_size_px: u16,

    /// Lock is lost if no face location arrives for this long.
    ///
    /// Units: milliseconds
    pub face_timeout_ms: u64,

    // ---- CONTROL ----

    /// Errors smaller than this are treated as zero.
    ///
    /// Units: pixels
    pub deadzone_px: f32,

    pub pan_kp: f32,
    pub pan_kd: f32,
    pub tilt_kp: f32,
    pub tilt_kd: f32,

    /// Largest change of either offset in one tick.
    ///
    /// Units: degrees
    pub max_step_deg: f32,

    /// Units: degrees
    pub pan_range_deg: f32,

    /// Units: degrees
    pub tilt_range_deg: f32,

    // ---- TRACKING TURNS ----

    /// Minimum time between two tracking turns.
    ///
    /// Units: milliseconds
    pub turn_cooldown_ms: u64,

    /// How far the pan offset is pulled back from its limit when a turn is requested.
    ///
    /// Units: degrees
    pub turn_unsaturate_deg: f32,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            period_ms: 50,
            queue_len: 4,
            head_period_ms: 1000,
            screen_width_px: 640,
            screen_height_px: 480,
            min_face_size_px: 20,
            face_timeout_ms: 1000,
            deadzone_px: 5.0,
            pan_kp: 0.05,
            pan_kd: 0.02,
            tilt_kp: 0.04,
            tilt_kd: 0.02,
            max_step_deg: 3.0,
            pan_range_deg: 70.0,
            tilt_range_deg: 40.0,
            turn_cooldown_ms: 3000,
            turn_unsaturate_deg: 20.0,
        }
    }
}
