//! Simulated servo driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::{Arc, Mutex};

use log::trace;

use super::{ServoDriver, ServoError};
use crate::calib::NUM_CHANNELS;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Driver which keeps the last angle demanded on each channel.
#[derive(Debug, Default)]
pub struct SimServoDriver {
    angles: SimAngles,
}

/// Handle onto the angles recorded by a [`SimServoDriver`], which stays readable after the driver
/// has been handed to the motion core.
#[derive(Debug, Default, Clone)]
pub struct SimAngles(Arc<Mutex<SimRecord>>);

#[derive(Debug, Default)]
struct SimRecord {
    angles: [Option<u16>; NUM_CHANNELS as usize],
    num_writes: usize,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimServoDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angles(&self) -> SimAngles {
        self.angles.clone()
    }
}

impl ServoDriver for SimServoDriver {
    fn set_angle(&mut self, channel: u8, angle_deg: u16) -> Result<(), ServoError> {
        if channel >= NUM_CHANNELS {
            return Err(ServoError::InvalidChannel(channel));
        }

        trace!("ch{:02} -> {}", channel, angle_deg);

        let mut rec = match self.angles.0.lock() {
            Ok(r) => r,
            Err(p) => p.into_inner(),
        };
        rec.angles[channel as usize] = Some(angle_deg);
        rec.num_writes += 1;

        Ok(())
    }
}

impl SimAngles {
    /// Last angle written to the channel.
    pub fn get(&self, channel: u8) -> Option<u16> {
        self.with(|r| r.angles.get(channel as usize).copied().flatten())
    }

    /// Total number of writes across all channels.
    pub fn num_writes(&self) -> usize {
        self.with(|r| r.num_writes)
    }

    fn with<T>(&self, f: impl FnOnce(&SimRecord) -> T) -> T {
        match self.0.lock() {
            Ok(r) => f(&r),
            Err(p) => f(&p.into_inner()),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_driver() {
        let mut driver = SimServoDriver::new();
        let angles = driver.angles();

        assert_eq!(angles.get(3), None);
        driver.set_angle(3, 120).unwrap();
        driver.set_angle(3, 95).unwrap();
        assert_eq!(angles.get(3), Some(95));
        assert_eq!(angles.num_writes(), 2);

        assert_eq!(driver.set_angle(16, 90), Err(ServoError::InvalidChannel(16)));
        assert_eq!(angles.get(200), None);
    }
}
