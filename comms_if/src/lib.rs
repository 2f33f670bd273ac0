//! # Communications interface crate.
//!
//! Provides the interface types shared between the motion core and the producers that feed it
//! (serial frame parsers, HTTP handlers, vision pipelines, scripts).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Motion commands, both as raw frames and as the decoded typed form.
pub mod cmd;

/// Equipment definitions (joints, vision data)
pub mod eqpt;
