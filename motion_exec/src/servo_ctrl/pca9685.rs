//! [`ServoDriver`] implementation for the PCA9685 driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::fmt::Debug;

use embedded_hal::blocking::i2c::{Write, WriteRead};
use log::debug;
use pwm_pca9685::{Address, Channel, Pca9685};
use util::maths::lin_map;

use super::{Params, ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of counts in one PWM period
const MAX_PWM: u16 = 4096;

/// Frequency of the board's internal oscillator
///
/// Units: hertz
const OSC_FREQ_HZ: f32 = 25_000_000.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A PCA9685 board driving positional servos.
pub struct Pca9685Driver<I2C> {
    pwm: Pca9685<I2C>,

    /// Units: microseconds
    period_us: f32,

    /// Units: microseconds
    min_pulse_us: f32,

    /// Units: microseconds
    max_pulse_us: f32,

    max_angle_deg: u16,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, E> Pca9685Driver<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    /// Configure the board on the given bus and enable its outputs.
    pub fn new(i2c: I2C, params: &Params) -> Result<Self, ServoError> {
        let mut pwm = Pca9685::new(i2c, Address::from(params.i2c_address)).map_err(map_err)?;

        let prescale = prescale(params.pwm_freq_hz);
        debug!(
            "PCA9685 at 0x{:02x}, {} Hz (prescale {})",
            params.i2c_address, params.pwm_freq_hz, prescale
        );

        pwm.set_prescale(prescale).map_err(map_err)?;
        pwm.enable().map_err(map_err)?;

        Ok(Self {
            pwm,
            period_us: 1e6 / params.pwm_freq_hz,
            min_pulse_us: params.min_pulse_us,
            max_pulse_us: params.max_pulse_us,
            max_angle_deg: params.max_angle_deg,
        })
    }

    /// Number of PWM counts the output is high for at the given angle.
    fn off_count(&self, angle_deg: u16) -> u16 {
        pulse_counts(
            angle_deg,
            self.max_angle_deg,
            (self.min_pulse_us, self.max_pulse_us),
            self.period_us,
        )
    }
}

impl<I2C, E> ServoDriver for Pca9685Driver<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>,
    E: Debug,
{
    fn set_angle(&mut self, channel: u8, angle_deg: u16) -> Result<(), ServoError> {
        if angle_deg > self.max_angle_deg {
            return Err(ServoError::InvalidAngle(angle_deg));
        }

        let channel_id = to_channel(channel)?;
        let off = self.off_count(angle_deg);

        self.pwm
            .set_channel_on_off(channel_id, 0, off)
            .map_err(map_err)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn map_err<E: Debug>(e: pwm_pca9685::Error<E>) -> ServoError {
    match e {
        pwm_pca9685::Error::I2C(e) => ServoError::I2c(format!("{:?}", e)),
        pwm_pca9685::Error::InvalidInputData => ServoError::InvalidInputData,
    }
}

/// Prescale register value for the given output frequency.
fn prescale(freq_hz: f32) -> u8 {
    let p = (OSC_FREQ_HZ / (MAX_PWM as f32 * freq_hz)).round() - 1.0;
    util::maths::clamp(p, 3.0, 255.0) as u8
}

/// Map an angle linearly onto a pulse width, then into PWM counts.
fn pulse_counts(angle_deg: u16, max_angle_deg: u16, pulse_range_us: (f32, f32), period_us: f32) -> u16 {
    let pulse_us = lin_map(
        (0.0, max_angle_deg as f32),
        pulse_range_us,
        angle_deg as f32,
    );

    let counts = (pulse_us / period_us * MAX_PWM as f32).round();
    util::maths::clamp(counts, 0.0, (MAX_PWM - 1) as f32) as u16
}

fn to_channel(channel: u8) -> Result<Channel, ServoError> {
    Ok(match channel {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        c => return Err(ServoError::InvalidChannel(c)),
    })
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
