//! # Motion core
//!
//! Owns the shared state and the three worker threads:
//!
//! - `dispatcher`: blocks on the command queue and applies each command to the running set.
//! - `mixer`: samples the running set every tick and writes one angle per joint to the servos.
//! - `face_track`: steers the head towards the latest face location every tick.
//!
//! Producers talk to the core through a [`MotionHandle`], which is cheap to clone and can be
//! sent to any thread.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod queue;
mod shared;
mod tasks;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use chrono::Utc;
use comms_if::cmd::{MotionCmd, MotionCommand};
use comms_if::eqpt::{FaceLocation, JointId};
use log::{debug, info, warn};
use util::module::State;

use crate::action::{ActionRegistry, HeadTrack};
use crate::calib::{Calibration, ChannelMap};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::face_track::{FaceTrackInitError, FaceTracker};
use crate::filter::FilterError;
use crate::mixer::{Mixer, MixerInitError};
use crate::params::MotionExecParams;
use crate::servo_ctrl::ServoDriver;
use crate::status::MotionStatus;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use queue::{bounded, QueueSender, Stamped};
pub use shared::SharedState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The running motion core.
pub struct MotionCore {
    handle: MotionHandle,

    run: Arc<AtomicBool>,

    threads: Vec<JoinHandle<()>>,
}

/// Interface to a running motion core.
#[derive(Clone)]
pub struct MotionHandle {
    shared: Arc<SharedState>,
    dispatcher: Dispatcher,
    cmd_tx: QueueSender<MotionCommand>,
    face_tx: QueueSender<FaceLocation>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum MotionCoreError {
    #[error("Invalid default filter alpha: {0}")]
    InvalidAlpha(#[from] FilterError),

    #[error("Could not initialise the mixer: {0}")]
    MixerInitError(#[from] MixerInitError),

    #[error("Could not initialise the face tracker: {0}")]
    FaceTrackInitError(#[from] FaceTrackInitError),

    #[error("Could not spawn the {0} thread: {1}")]
    SpawnFailed(&'static str, std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl MotionCore {
    /// Build the shared state, initialise every module and start the worker threads.
    pub fn start(
        params: &MotionExecParams,
        calib: Calibration,
        channels: ChannelMap,
        driver: Box<dyn ServoDriver + Send>,
        registry: Arc<dyn ActionRegistry>,
    ) -> Result<Self, MotionCoreError> {
        let shared = Arc::new(SharedState::new(
            calib,
            channels,
            driver,
            HeadTrack::new(params.face_track.head_period_ms),
            params.mixer.default_filter_alpha,
            params.dispatcher.stop_settle_ms,
        )?);

        let mut mixer = Mixer::new(Arc::clone(&shared));
        mixer.init(params.mixer.clone())?;

        let mut tracker = FaceTracker::new(Arc::clone(&shared));
        tracker.init(params.face_track.clone())?;

        let (cmd_tx, cmd_rx) = bounded("command", params.dispatcher.queue_len);
        let (face_tx, face_rx) = bounded("face location", params.face_track.queue_len);

        let handle = MotionHandle {
            dispatcher: Dispatcher::new(
                params.dispatcher.clone(),
                Arc::clone(&shared),
                registry,
            ),
            shared: Arc::clone(&shared),
            cmd_tx: cmd_tx.clone(),
            face_tx,
        };

        let run = Arc::new(AtomicBool::new(true));
        let mut core = Self {
            handle,
            run,
            threads: Vec::with_capacity(3),
        };

        let (d, s, r) = (
            core.handle.dispatcher.clone(),
            Arc::clone(&shared),
            Arc::clone(&core.run),
        );
        core.spawn("dispatcher", move || tasks::dispatcher_task(d, s, cmd_rx, r))?;

        let (s, r) = (Arc::clone(&shared), Arc::clone(&core.run));
        core.spawn("mixer", move || tasks::mixer_task(mixer, s, r))?;

        let (s, r) = (Arc::clone(&shared), Arc::clone(&core.run));
        core.spawn("face_track", move || {
            tasks::face_track_task(tracker, s, face_rx, cmd_tx, r)
        })?;

        info!("Motion core started");

        Ok(core)
    }

    pub fn handle(&self) -> &MotionHandle {
        &self.handle
    }

    /// Stop the worker threads and wait for them to exit.
    pub fn shutdown(mut self) {
        info!("Shutting down the motion core");
        self.stop_threads();
    }

    fn spawn<F>(&mut self, name: &'static str, f: F) -> Result<(), MotionCoreError>
    where
        F: FnOnce() + Send + 'static,
    {
        match thread::Builder::new().name(name.into()).spawn(f) {
            Ok(jh) => {
                self.threads.push(jh);
                Ok(())
            }
            Err(e) => {
                // Don't leave the threads which did start running
                self.stop_threads();
                Err(MotionCoreError::SpawnFailed(name, e))
            }
        }
    }

    fn stop_threads(&mut self) {
        self.run.store(false, Ordering::Relaxed);

        for jh in self.threads.drain(..) {
            let name = jh.thread().name().unwrap_or("-").to_string();
            if jh.join().is_err() {
                warn!("The {} thread panicked", name);
            }
        }
    }
}

impl Drop for MotionCore {
    fn drop(&mut self) {
        self.stop_threads();
    }
}

impl MotionHandle {
    /// Queue a raw command for the dispatcher.
    ///
    /// STOP is applied immediately and discards everything already queued. Returns `false` if
    /// the queue is full.
    pub fn queue_command(&self, cmd: MotionCommand) -> bool {
        if cmd.is_stop() {
            self.shared.stop(self.shared.now_ms());
            return true;
        }

        self.cmd_tx.try_push(cmd, self.shared.stop_epoch())
    }

    /// Queue the latest face location for the tracker. Returns `false` if the queue is full.
    pub fn queue_face_location(&self, face: FaceLocation) -> bool {
        self.face_tx.try_push(face, self.shared.stop_epoch())
    }

    /// True while a locomotion or turn action runs.
    pub fn is_body_moving(&self) -> bool {
        self.shared.lock_running().has_body_motion()
    }

    pub fn is_face_tracking_active(&self) -> bool {
        self.shared.lock_running().head().is_active()
    }

    /// True if no action runs, the head isn't tracking and no joint is held manually.
    pub fn is_idle(&self) -> bool {
        let quiet = {
            let set = self.shared.lock_running();
            set.is_empty() && !set.head().is_active()
        };
        quiet && !self.shared.manual_active(self.shared.now_ms())
    }

    /// Drive a single joint directly, bypassing the queue.
    pub fn set_single_servo(&self, joint: JointId, angle_deg: u16) -> Result<(), DispatchError> {
        let cmd = MotionCmd::SingleServo {
            joint: joint.index() as u8,
            angle_deg,
        };
        let outcome = self.dispatcher.handle(&cmd, self.shared.now_ms())?;
        debug!("{:?}", outcome);

        Ok(())
    }

    /// Set the output filter alpha used while no body motion runs.
    pub fn set_filter_alpha(&self, alpha: f32) -> Result<(), FilterError> {
        self.shared.set_default_alpha(alpha)?;
        info!("Default filter alpha set to {}", alpha);
        Ok(())
    }

    pub fn status(&self) -> MotionStatus {
        let now_ms = self.shared.now_ms();
        let set = self.shared.lock_running();

        MotionStatus {
            timestamp: Utc::now(),
            active_actions: set.names(),
            face_tracking: set.head().is_active(),
            head_frozen: self.shared.head_frozen(),
            body_moving: set.has_body_motion(),
            manual_override: self.shared.manual_active(now_ms),
            filter_alpha: self.shared.default_alpha(),
            head_offsets_deg: set.head().offsets(),
            stop_epoch: self.shared.stop_epoch(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
