//! # Dispatcher
//!
//! Turns motion commands into changes of the running set. Commands are handled one at a time in
//! the order they were queued. STOP is always honoured; everything else is subject to the one
//! instance per action rule and to any atomic action which is running.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::JointId;
use serde::Serialize;

use crate::servo_ctrl::ServoError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Reasons a command was not acted on.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DispatchError {
    #[error("Unknown command kind 0x{0:02x}")]
    UnknownCommand(u8),

    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    #[error("No action named \"{0}\"")]
    UnknownAction(String),

    #[error("Action \"{0}\" is already running")]
    AlreadyActive(String),

    #[error("Cannot start \"{requested}\" while atomic action \"{running}\" is running")]
    BlockedByAtomic { requested: String, running: String },

    #[error("There is no joint with index {0}")]
    InvalidJoint(u8),

    #[error("{angle_deg} degrees is outside the limits of {joint}")]
    InvalidAngle { joint: JointId, angle_deg: u16 },

    #[error("Could not drive the servo: {0}")]
    ServoFailed(#[from] ServoError),
}

/// What a successfully handled command did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DispatchOutcome {
    /// A new instance of the named action was started
    Started(String),

    /// Everything was stopped, with the number of instances removed
    Stopped(usize),

    TrackingActivated,

    /// Face tracking was already running
    TrackingUnchanged,

    ManualSet { joint: JointId, angle_deg: u16 },

    /// The command was queued before the latest STOP and has been thrown away
    Discarded,
}
