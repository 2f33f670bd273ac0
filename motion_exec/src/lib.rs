//! # Motion library.
//!
//! The motion choreography core of the desk robot. Discrete commands start and stop named actions
//! (gaits, gestures, expressions), which the mixer blends into one angle per joint at a fixed
//! rate, while the face tracker steers the head independently.
//!
//! The `motion_exec` binary wires this library to a servo backend and a command script.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Action model - templates, running instances and the action library
pub mod action;

/// Joint calibration and the joint to servo channel map
pub mod calib;

/// Dispatcher - turns commands into running actions
pub mod dispatcher;

/// Face tracking controller - steers the head towards the detected face
pub mod face_track;

/// Per joint output smoothing
pub mod filter;

/// Mixer - blends every running action into one angle per joint each tick
pub mod mixer;

/// Scheduler owning the shared state and the worker threads
pub mod motion_core;

/// Parameters of the motion executable
pub mod params;

/// Servo driver interface and backends
pub mod servo_ctrl;

/// Serialisable status snapshots
pub mod status;
