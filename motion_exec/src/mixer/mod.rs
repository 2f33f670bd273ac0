//! # Mixer
//!
//! The fixed rate loop which samples every running generator, resolves which one drives each
//! joint, smooths the result and sends it to the servos.

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

use crate::filter::FilterError;
use crate::servo_ctrl::ServoError;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MixerInitError {
    #[error("Invalid filter alpha: {0}")]
    InvalidAlpha(#[from] FilterError),

    #[error("The mixer period must be greater than zero")]
    ZeroPeriod,
}

#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    #[error("The mixer has not been initialised")]
    NotInitialised,

    #[error("{num_failed} servo writes failed, first on {joint}: {error}")]
    ServoWrite {
        num_failed: usize,
        joint: JointId,
        error: ServoError,
    },
}
