//! Parameters structure for the dispatcher

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters for the dispatcher.
#[derive(Debug, Clone, Deserialize)]
pub struct Params {
    /// Maximum number of commands waiting to be dispatched
    pub queue_len: usize,

    /// Time after a STOP during which joints settle at home before the next command is handled
    ///
    /// Units: milliseconds
    pub stop_settle_ms: u64,

    /// Time idle joints are held after a single servo command
    ///
    /// Units: milliseconds
    pub manual_override_ms: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            queue_len: 16,
            stop_settle_ms: 300,
            manual_override_ms: 5000,
        }
    }
}
