//! # Servo Controller Module
//!
//! This module provides a unified servo control interface which can abstract over different types
//! of servo driver boards. The motion core only ever sets the angle of a channel.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod params;

/// [`ServoDriver`] implementation for the Adafruit PCA9685 16 channel servo driver board.
pub mod pca9685;

/// [`ServoDriver`] implementation which only records the demands, for hosts without hardware.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use params::*;
pub use pca9685::Pca9685Driver;
pub use sim::{SimAngles, SimServoDriver};

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing servo driver boards.
pub trait ServoDriver {
    /// Set the angle of the servo on the given channel.
    ///
    /// ## Arguments
    /// - `channel` - The board channel the servo is connected to
    /// - `angle_deg` - The angle to move to, in degrees
    fn set_angle(&mut self, channel: u8, angle_deg: u16) -> Result<(), ServoError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ServoError {
    #[error("An I2C error occured: {0}")]
    I2c(String),

    #[error("Channel {0} does not exist on the driver")]
    InvalidChannel(u8),

    #[error("Angle {0} is outside the range of the servo")]
    InvalidAngle(u16),

    #[error("The driver rejected the demand")]
    InvalidInputData,
}
