//! General time utility functions

use chrono;
use std::thread;
use std::time::{Duration, Instant};

/// Number of nanoseconds in a second
pub const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Convert a duration into a number of seconds, or `None` if overflow
pub fn duration_to_seconds(duration: chrono::Duration) -> Option<f64> {
    duration
        .num_nanoseconds()
        .map(|ns| ns as f64 / NANOS_PER_SECOND as f64)
}

/// Sleep for whatever remains of a cycle of length `period` which began at `cycle_start`.
///
/// Returns `Err` with the overrun duration if the cycle has already lasted longer than the
/// period, in which case no sleep is performed.
pub fn wait_for_next_cycle(cycle_start: Instant, period: Duration) -> Result<(), Duration> {
    let cycle_dur = Instant::now() - cycle_start;

    match period.checked_sub(cycle_dur) {
        Some(d) => {
            thread::sleep(d);
            Ok(())
        }
        None => Err(cycle_dur - period),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_duration_to_seconds() {
        assert_eq!(
            duration_to_seconds(chrono::Duration::milliseconds(1500)),
            Some(1.5)
        );
    }

    #[test]
    fn test_wait_for_next_cycle_overrun() {
        let start = Instant::now() - Duration::from_millis(50);
        match wait_for_next_cycle(start, Duration::from_millis(20)) {
            Err(overrun) => assert!(overrun >= Duration::from_millis(30)),
            Ok(_) => panic!("Expected an overrun"),
        }
    }
}
