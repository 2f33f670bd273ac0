//! Worker thread bodies

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use comms_if::cmd::{MotionCmd, MotionCommand, TurnDir};
use comms_if::eqpt::FaceLocation;
use log::{debug, error, info, trace, warn};
use util::{module::State, time::wait_for_next_cycle};

use super::queue::{QueueSender, Stamped};
use super::SharedState;
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::face_track::{self, FaceTracker};
use crate::mixer::{self, Mixer};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How often the dispatcher checks for shutdown while its queue is empty.
const RECV_POLL: Duration = Duration::from_millis(100);

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Apply queued commands as they arrive.
pub(super) fn dispatcher_task(
    dispatcher: Dispatcher,
    shared: Arc<SharedState>,
    cmd_rx: Receiver<Stamped<MotionCommand>>,
    run: Arc<AtomicBool>,
) {
    info!("Dispatcher started");

    while run.load(Ordering::Relaxed) {
        let stamped = match cmd_rx.recv_timeout(RECV_POLL) {
            Ok(s) => s,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // Joints return home before anything new starts after a STOP
        if let Some(delay) = settle_delay(shared.now_ms(), shared.settle_until_ms()) {
            thread::sleep(delay);
        }

        match dispatcher.handle_raw(&stamped.item, stamped.epoch, shared.now_ms()) {
            Ok(DispatchOutcome::Discarded) => (),
            Ok(outcome) => debug!("{:?}", outcome),
            Err(e) => warn!("Command 0x{:02x} rejected: {}", stamped.item.kind, e),
        }
    }

    info!("Dispatcher stopped");
}

/// Run the mixer at its fixed period.
pub(super) fn mixer_task(mut mixer: Mixer, shared: Arc<SharedState>, run: Arc<AtomicBool>) {
    let period = Duration::from_millis(mixer.params().period_ms);

    info!("Mixer started, period {} ms", mixer.params().period_ms);

    while run.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        match mixer.proc(&mixer::InputData {
            now_ms: shared.now_ms(),
        }) {
            Ok((output, report)) => trace!("Mixer {:?} {:?}", output.angles_deg, report),
            Err(e) => error!("Mixer error: {}", e),
        }

        if let Err(overrun) = wait_for_next_cycle(cycle_start, period) {
            warn!("Mixer cycle overran by {:.6} s", overrun.as_secs_f64());
        }
    }

    info!("Mixer stopped");
}

/// Run the face tracker at its fixed period, feeding tracking turns back into the command
/// queue.
pub(super) fn face_track_task(
    mut tracker: FaceTracker,
    shared: Arc<SharedState>,
    face_rx: Receiver<Stamped<FaceLocation>>,
    cmd_tx: QueueSender<MotionCommand>,
    run: Arc<AtomicBool>,
) {
    let period = Duration::from_millis(tracker.params().period_ms);

    info!("Face tracker started, period {} ms", tracker.params().period_ms);

    while run.load(Ordering::Relaxed) {
        let cycle_start = Instant::now();

        // Everything this tick decides belongs to the epoch read here
        let epoch = shared.stop_epoch();
        let face = latest_face(&face_rx, epoch);

        match tracker.proc(&face_track::InputData {
            now_ms: shared.now_ms(),
            face,
        }) {
            Ok((output, _)) => {
                if let Some(direction) = output.turn {
                    if !request_turn(&cmd_tx, direction, epoch) {
                        warn!("Tracking turn {:?} dropped", direction);
                    }
                }
            }
            Err(e) => error!("Face tracker error: {}", e),
        }

        if let Err(overrun) = wait_for_next_cycle(cycle_start, period) {
            warn!("Face tracker cycle overran by {:.6} s", overrun.as_secs_f64());
        }
    }

    info!("Face tracker stopped");
}

/// Time left until the settle window following the last STOP closes.
fn settle_delay(now_ms: u64, settle_until_ms: u64) -> Option<Duration> {
    if now_ms < settle_until_ms {
        Some(Duration::from_millis(settle_until_ms - now_ms))
    } else {
        None
    }
}

/// Drain the face queue, keeping only the newest location queued during `epoch`.
fn latest_face(face_rx: &Receiver<Stamped<FaceLocation>>, epoch: u64) -> Option<FaceLocation> {
    face_rx
        .try_iter()
        .filter(|s| s.epoch == epoch)
        .last()
        .map(|s| s.item)
}

/// Queue a tracking turn decided during `epoch`. A STOP since then makes the dispatcher discard
/// it.
fn request_turn(
    cmd_tx: &QueueSender<MotionCommand>,
    direction: TurnDir,
    epoch: u64,
) -> bool {
    cmd_tx.try_push(MotionCmd::TrackingTurn { direction }.encode(), epoch)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
