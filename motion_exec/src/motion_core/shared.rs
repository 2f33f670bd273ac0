//! # Shared state
//!
//! Everything the dispatcher, mixer and face tracker threads need to see. The running set lives
//! behind a single mutex which is only held for one traversal or mutation at a time. Flags which
//! are read every tick are atomics.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use comms_if::eqpt::{JointId, NUM_JOINTS};
use log::info;

use crate::action::{HeadTrack, JointFrame, RunningSet};
use crate::calib::{Calibration, ChannelMap};
use crate::filter::{validate_alpha, FilterError};
use crate::servo_ctrl::{ServoDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct SharedState {
    running: Mutex<RunningSet>,

    calib: Calibration,

    channels: ChannelMap,

    driver: Mutex<Box<dyn ServoDriver + Send>>,

    manual: Mutex<ManualOverride>,

    /// Incremented by every STOP. Queued items carry the epoch they were queued in and are
    /// discarded if it is no longer current.
    stop_epoch: AtomicU64,

    /// Set while a whole body motion runs, during which face tracking is suspended.
    head_frozen: AtomicBool,

    /// Units: milliseconds since the core started
    settle_until_ms: AtomicU64,

    /// Units: milliseconds
    stop_settle_ms: u64,

    /// `f32` bits of the default filter alpha
    default_alpha: AtomicU32,

    epoch: Instant,
}

/// Joints driven directly with single servo commands.
#[derive(Debug, Default)]
struct ManualOverride {
    /// Units: milliseconds since the core started
    until_ms: Option<u64>,

    /// Angles written since the mixer last looked
    pending: JointFrame,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SharedState {
    pub fn new(
        calib: Calibration,
        channels: ChannelMap,
        driver: Box<dyn ServoDriver + Send>,
        head: HeadTrack,
        default_alpha: f32,
        stop_settle_ms: u64,
    ) -> Result<Self, FilterError> {
        validate_alpha(default_alpha)?;

        Ok(Self {
            running: Mutex::new(RunningSet::new(head)),
            calib,
            channels,
            driver: Mutex::new(driver),
            manual: Mutex::new(ManualOverride::default()),
            stop_epoch: AtomicU64::new(0),
            head_frozen: AtomicBool::new(false),
            settle_until_ms: AtomicU64::new(0),
            stop_settle_ms,
            default_alpha: AtomicU32::new(default_alpha.to_bits()),
            epoch: Instant::now(),
        })
    }

    /// Milliseconds since the shared state was created.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn calib(&self) -> &Calibration {
        &self.calib
    }

    pub fn channels(&self) -> &ChannelMap {
        &self.channels
    }

    /// Lock the running set. A poisoned lock is recovered, the set is always left consistent
    /// between mutations.
    pub fn lock_running(&self) -> MutexGuard<'_, RunningSet> {
        match self.running.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }

    // ---- STOP ----

    pub fn stop_epoch(&self) -> u64 {
        self.stop_epoch.load(Ordering::SeqCst)
    }

    /// Stop everything. Returns the number of instances removed.
    pub fn stop(&self, now_ms: u64) -> usize {
        let mut set = self.lock_running();
        self.stop_locked(&mut set, now_ms)
    }

    /// Stop everything while already holding the running set lock.
    pub(crate) fn stop_locked(&self, set: &mut RunningSet, now_ms: u64) -> usize {
        let cleared = set.clear();

        let epoch = self.stop_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.head_frozen.store(false, Ordering::SeqCst);
        self.clear_manual();
        self.settle_until_ms
            .store(now_ms + self.stop_settle_ms, Ordering::SeqCst);

        info!("STOP: cleared {} actions, now in epoch {}", cleared, epoch);

        cleared
    }

    /// End of the settle window following the last STOP.
    pub fn settle_until_ms(&self) -> u64 {
        self.settle_until_ms.load(Ordering::SeqCst)
    }

    // ---- HEAD FREEZE ----

    pub fn head_frozen(&self) -> bool {
        self.head_frozen.load(Ordering::SeqCst)
    }

    pub fn set_head_frozen(&self, frozen: bool) {
        self.head_frozen.store(frozen, Ordering::SeqCst);
    }

    // ---- FILTER ----

    pub fn default_alpha(&self) -> f32 {
        f32::from_bits(self.default_alpha.load(Ordering::SeqCst))
    }

    pub fn set_default_alpha(&self, alpha: f32) -> Result<(), FilterError> {
        validate_alpha(alpha)?;
        self.default_alpha.store(alpha.to_bits(), Ordering::SeqCst);
        Ok(())
    }

    // ---- MANUAL OVERRIDE ----

    /// Record a manually commanded angle and hold every idle joint until `until_ms`.
    pub fn arm_manual(&self, joint: JointId, angle_deg: f32, until_ms: u64) {
        let mut m = self.lock_manual();
        m.pending[joint.index()] = Some(angle_deg);
        m.until_ms = Some(until_ms);
    }

    /// End the hold window. Angles the mixer has not seen yet are kept so its filters still
    /// start from where the servos really are.
    pub fn end_manual_hold(&self) {
        self.lock_manual().until_ms = None;
    }

    /// End the hold window and forget any pending angles.
    fn clear_manual(&self) {
        let mut m = self.lock_manual();
        m.until_ms = None;
        m.pending = [None; NUM_JOINTS];
    }

    pub fn manual_active(&self, now_ms: u64) -> bool {
        matches!(self.lock_manual().until_ms, Some(t) if now_ms < t)
    }

    /// Take the angles written manually since the last call.
    pub fn take_manual_pending(&self) -> JointFrame {
        std::mem::replace(&mut self.lock_manual().pending, [None; NUM_JOINTS])
    }

    fn lock_manual(&self) -> MutexGuard<'_, ManualOverride> {
        match self.manual.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }

    // ---- SERVOS ----

    /// Lock the servo driver. Must never be held while taking the running set lock.
    pub fn lock_driver(&self) -> MutexGuard<'_, Box<dyn ServoDriver + Send>> {
        match self.driver.lock() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        }
    }

    /// Send an angle to the servo of the given joint.
    pub fn write_servo(&self, joint: JointId, angle_deg: u16) -> Result<(), ServoError> {
        self.lock_driver()
            .set_angle(self.channels.channel(joint), angle_deg)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::servo_ctrl::SimServoDriver;

    fn shared() -> SharedState {
        SharedState::new(
            Calibration::neutral(),
            ChannelMap::identity(),
            Box::new(SimServoDriver::new()),
            HeadTrack::new(1000),
            0.3,
            250,
        )
        .unwrap()
    }

    #[test]
    fn test_stop() {
        let s = shared();
        s.lock_running().head_mut().activate(0);
        s.set_head_frozen(true);
        s.arm_manual(JointId::LeftEar, 45.0, 5000);

        assert_eq!(s.stop(1000), 0);
        assert_eq!(s.stop_epoch(), 1);
        assert!(!s.lock_running().head().is_active());
        assert!(!s.head_frozen());
        assert!(!s.manual_active(1001));
        assert_eq!(s.take_manual_pending(), [None; NUM_JOINTS]);
        assert_eq!(s.settle_until_ms(), 1250);

        // Idempotent apart from the epoch
        assert_eq!(s.stop(2000), 0);
        assert_eq!(s.stop_epoch(), 2);
    }

    #[test]
    fn test_manual() {
        let s = shared();
        s.arm_manual(JointId::LeftEar, 45.0, 5000);

        assert!(s.manual_active(4999));
        assert!(!s.manual_active(5000));

        let pending = s.take_manual_pending();
        assert_eq!(pending[JointId::LeftEar.index()], Some(45.0));
        assert_eq!(s.take_manual_pending(), [None; NUM_JOINTS]);
    }

    #[test]
    fn test_end_manual_hold() {
        let s = shared();
        s.arm_manual(JointId::LeftEar, 45.0, 5000);

        s.end_manual_hold();
        assert!(!s.manual_active(100));
        assert_eq!(s.take_manual_pending()[JointId::LeftEar.index()], Some(45.0));
    }

    #[test]
    fn test_default_alpha() {
        let s = shared();
        assert_eq!(s.default_alpha(), 0.3);
        assert!(s.set_default_alpha(1.5).is_err());
        assert_eq!(s.default_alpha(), 0.3);
        s.set_default_alpha(0.8).unwrap();
        assert_eq!(s.default_alpha(), 0.8);
    }
}
