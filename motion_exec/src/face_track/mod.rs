//! # Face tracking controller
//!
//! Steers the head tracker's pan and tilt offsets towards the detected face. When the head runs
//! out of pan travel the controller asks for a short body turn in the same direction.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod controller;
mod params;
mod state;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use controller::*;
pub use params::*;
pub use state::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FaceTrackInitError {
    #[error("The screen must have a non-zero size")]
    InvalidScreen,

    #[error("Parameter {0} must be positive")]
    NotPositive(&'static str),

    #[error("The turn unsaturate distance must be less than the pan range")]
    UnsaturateTooLarge,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FaceTrackError {
    #[error("The face tracker has not been initialised")]
    NotInitialised,
}
