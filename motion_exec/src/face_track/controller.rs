//! # PD controller

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A proportional-derivative controller evaluated once per fixed tick.
#[derive(Debug, Serialize, Clone)]
pub struct PdController {
    /// Proportional gain
    k_p: f32,

    /// Derivative gain, per tick
    k_d: f32,

    /// Previous error
    prev_error: Option<f32>,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl PdController {
    /// Create a new controller with the given gains.
    pub fn new(k_p: f32, k_d: f32) -> Self {
        Self {
            k_p,
            k_d,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error.
    ///
    /// The derivative term is zero on the first call after creation or a reset.
    pub fn get(&mut self, error: f32) -> f32 {
        let d = match self.prev_error {
            Some(p) => error - p,
            None => 0.0,
        };
        self.prev_error = Some(error);

        self.k_p * error + self.k_d * d
    }

    /// Forget the previous error.
    pub fn reset(&mut self) {
        self.prev_error = None;
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pd() {
        let mut pd = PdController::new(0.5, 2.0);

        assert_eq!(pd.get(10.0), 5.0);
        // 0.5 * 12 + 2 * (12 - 10)
        assert_eq!(pd.get(12.0), 10.0);
        assert_eq!(pd.get(12.0), 6.0);

        pd.reset();
        assert_eq!(pd.get(-4.0), -2.0);
    }
}
