//! Module interfaces
//!
//! Each cyclic module in `motion_exec` (the mixer, the face tracker) implements [`State`], which
//! lets the tick tasks and the benchmarks drive every module the same way.

// ---------------------------------------------------------------------------
// MODULE STATE
// ---------------------------------------------------------------------------

/// A module that is initialised once and then processed every tick.
pub trait State {
    /// Parameters the module is initialised with
    type InitData;
    type InitError;

    /// Per-tick input, always carrying the tick time
    type InputData;
    /// Per-tick output
    type OutputData;
    /// Diagnostics from a single tick.
    type StatusReport;
    type ProcError;

    /// Validate the parameters and prepare the module for processing.
    ///
    /// Processing a module which has not been initialised is an error.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError>;

    /// Run a single tick.
    ///
    /// Returns the tick's output alongside a report on how it went.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>;
}
