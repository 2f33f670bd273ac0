//! # Output filter
//!
//! Exponential smoothing applied to every joint's final angle before it reaches the servo
//! driver, limiting how quickly a joint can slew.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::NUM_JOINTS;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// First order exponential smoothing filter.
#[derive(Debug, Clone, Copy)]
pub struct OutputFilter {
    alpha: f32,
    prev: Option<f32>,
}

/// One [`OutputFilter`] per joint, sharing a common alpha.
#[derive(Debug, Clone)]
pub struct JointFilters {
    alpha: f32,
    filters: [OutputFilter; NUM_JOINTS],
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum FilterError {
    #[error("Filter alpha must be between 0.0 and 1.0, found {0}")]
    InvalidAlpha(f32),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl OutputFilter {
    pub fn new(alpha: f32) -> Result<Self, FilterError> {
        let mut f = Self {
            alpha: 1.0,
            prev: None,
        };
        f.set_alpha(alpha)?;
        Ok(f)
    }

    /// Filter the target angle.
    ///
    /// `filtered = alpha * target + (1 - alpha) * previous`, the first call returns the target
    /// unchanged.
    pub fn apply(&mut self, target: f32) -> f32 {
        let filtered = match self.prev {
            Some(p) => self.alpha * target + (1.0 - self.alpha) * p,
            None => target,
        };
        self.prev = Some(filtered);
        filtered
    }

    /// Set the smoothing factor, which must lie within `[0, 1]`. On error the filter is not
    /// modified.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), FilterError> {
        validate_alpha(alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Force the filter's state, the next output will start from this value.
    pub fn reset(&mut self, value: f32) {
        self.prev = Some(value);
    }
}

impl JointFilters {
    pub fn new(alpha: f32) -> Result<Self, FilterError> {
        let f = OutputFilter::new(alpha)?;
        Ok(Self {
            alpha,
            filters: [f; NUM_JOINTS],
        })
    }

    /// Filter all joint targets in place.
    pub fn apply(&mut self, targets: &mut [f32; NUM_JOINTS]) {
        for (t, f) in targets.iter_mut().zip(self.filters.iter_mut()) {
            *t = f.apply(*t);
        }
    }

    /// Change the alpha of every filter. Does nothing if the alpha is unchanged.
    pub fn set_alpha(&mut self, alpha: f32) -> Result<(), FilterError> {
        validate_alpha(alpha)?;

        if alpha == self.alpha {
            return Ok(());
        }

        for f in self.filters.iter_mut() {
            f.set_alpha(alpha)?;
        }
        self.alpha = alpha;

        Ok(())
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Force the state of a single joint's filter.
    pub fn reset(&mut self, joint_index: usize, value: f32) {
        if let Some(f) = self.filters.get_mut(joint_index) {
            f.reset(value);
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Check that a filter alpha is within `[0, 1]`. NaN is rejected.
pub fn validate_alpha(alpha: f32) -> Result<(), FilterError> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(())
    } else {
        Err(FilterError::InvalidAlpha(alpha))
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_first_call_passes_through() {
        let mut f = OutputFilter::new(0.2).unwrap();
        assert_eq!(f.apply(120.0), 120.0);
        assert!((f.apply(90.0) - 114.0).abs() < 1e-4);
    }

    #[test]
    fn test_converges() {
        let mut f = OutputFilter::new(0.3).unwrap();
        f.apply(0.0);

        let mut prev = 0.0;
        for _ in 0..100 {
            let v = f.apply(100.0);
            // Monotonic approach, never overshooting
            assert!(v >= prev && v <= 100.0);
            prev = v;
        }
        assert!((prev - 100.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_alpha() {
        let mut f = OutputFilter::new(0.5).unwrap();

        for a in [-0.1f32, 1.1, f32::NAN].iter() {
            assert!(f.set_alpha(*a).is_err());
            assert_eq!(f.alpha(), 0.5);
        }

        assert!(OutputFilter::new(2.0).is_err());
        assert!(f.set_alpha(0.0).is_ok());
        assert!(f.set_alpha(1.0).is_ok());
    }

    #[test]
    fn test_joint_filters() {
        let mut filters = JointFilters::new(1.0).unwrap();
        let mut targets = [45.0; NUM_JOINTS];
        filters.apply(&mut targets);
        assert_eq!(targets, [45.0; NUM_JOINTS]);

        filters.set_alpha(0.5).unwrap();
        filters.reset(0, 0.0);
        let mut targets = [90.0; NUM_JOINTS];
        filters.apply(&mut targets);
        assert_eq!(targets[0], 45.0);
        assert_eq!(targets[1], 67.5);

        assert_eq!(filters.set_alpha(-1.0), Err(FilterError::InvalidAlpha(-1.0)));
        assert_eq!(filters.alpha(), 0.5);
    }
}
