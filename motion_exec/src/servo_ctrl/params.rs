//! Parameters for the servo driver backends

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Which driver to use
    pub backend: ServoBackend,

    // ---- PCA9685 ----

    /// I2C address of the board
    pub i2c_address: u8,

    /// PWM frequency the servos expect
    ///
    /// Units: hertz
    pub pwm_freq_hz: f32,

    /// Pulse width at 0 degrees
    ///
    /// Units: microseconds
    pub min_pulse_us: f32,

    /// Pulse width at `max_angle_deg`
    ///
    /// Units: microseconds
    pub max_pulse_us: f32,

    /// Units: degrees
    pub max_angle_deg: u16,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServoBackend {
    /// Record demands in memory only
    Sim,

    /// PCA9685 board on the I2C bus
    Pca9685,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            backend: ServoBackend::Sim,
            i2c_address: 0x40,
            pwm_freq_hz: 50.0,
            min_pulse_us: 500.0,
            max_pulse_us: 2500.0,
            max_angle_deg: 180,
        }
    }
}
