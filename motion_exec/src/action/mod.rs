//! # Action model
//!
//! Actions are named motion patterns. Each is either a periodic gait, in which every joint follows
//! a sinusoid about its home position, or a sequence of keyframes which are moved between with a
//! cosine ease. Templates are immutable and shared, a running [`ActionInstance`] only holds the
//! state needed to evaluate its template at a given time.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod head_track;
mod instance;
mod library;
mod running_set;
mod template;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use head_track::*;
pub use instance::*;
pub use library::*;
pub use running_set::*;
pub use template::*;

/// The action library shipped in the parameters directory, for tests which need real actions.
#[cfg(test)]
pub(crate) const SHIPPED_ACTIONS: &str = include_str!("../../../params/actions.toml");
