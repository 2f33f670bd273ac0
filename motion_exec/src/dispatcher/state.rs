//! Implementation of the dispatcher

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::cmd::{CmdParseError, MotionCmd, MotionCommand, TurnDir, WalkDir};
use comms_if::eqpt::JointId;
use log::{debug, info};

use super::{DispatchError, DispatchOutcome, Params};
use crate::action::{ActionInstance, ActionRegistry, RunningSet};
use crate::motion_core::SharedState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Applies commands to the shared running set. Cheap to clone, every clone acts on the same
/// state.
#[derive(Clone)]
pub struct Dispatcher {
    params: Params,
    shared: Arc<SharedState>,
    registry: Arc<dyn ActionRegistry>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Dispatcher {
    pub fn new(params: Params, shared: Arc<SharedState>, registry: Arc<dyn ActionRegistry>) -> Self {
        Self {
            params,
            shared,
            registry,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Handle a command issued now.
    pub fn handle(&self, cmd: &MotionCmd, now_ms: u64) -> Result<DispatchOutcome, DispatchError> {
        self.handle_stamped(cmd, self.shared.stop_epoch(), now_ms)
    }

    /// Decode and handle a raw command frame which was queued during `epoch`.
    pub fn handle_raw(
        &self,
        raw: &MotionCommand,
        epoch: u64,
        now_ms: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        let cmd = MotionCmd::decode(raw).map_err(|e| match e {
            CmdParseError::UnknownKind(k) => DispatchError::UnknownCommand(k),
            e => DispatchError::MalformedCommand(e.to_string()),
        })?;

        self.handle_stamped(&cmd, epoch, now_ms)
    }

    /// Handle a command which was queued during `epoch`. If a STOP has happened since then the
    /// command is discarded.
    pub fn handle_stamped(
        &self,
        cmd: &MotionCmd,
        epoch: u64,
        now_ms: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        debug!("Dispatching {:?}", cmd);

        // Resolve before taking the lock, the registry never changes
        let named = action_name(cmd).map(|n| (self.registry.get(&n), n));

        let mut set = self.shared.lock_running();

        if epoch != self.shared.stop_epoch() && !matches!(cmd, MotionCmd::Stop) {
            debug!("Discarding {:?} queued before the last STOP", cmd);
            return Ok(DispatchOutcome::Discarded);
        }

        match cmd {
            MotionCmd::Stop => Ok(DispatchOutcome::Stopped(
                self.shared.stop_locked(&mut set, now_ms),
            )),
            MotionCmd::FaceTrace => self.face_trace(&mut set, now_ms),
            MotionCmd::SingleServo { joint, angle_deg } => {
                self.single_servo(&set, *joint, *angle_deg, now_ms)
            }
            _ => match named {
                Some((template, name)) => {
                    check_free(&set, &name)?;

                    let template = template.ok_or(DispatchError::UnknownAction(name))?;

                    // Any action takes the robot back from manual control
                    self.shared.end_manual_hold();

                    if template.is_body_motion() {
                        self.shared.set_head_frozen(true);
                    }

                    info!("Starting {}", template.name);
                    let name = template.name.clone();
                    set.push(ActionInstance::new(template, now_ms, self.shared.calib()));

                    Ok(DispatchOutcome::Started(name))
                }
                // Every other command has a name
                None => Err(DispatchError::MalformedCommand(format!("{:?}", cmd))),
            },
        }
    }

    fn face_trace(
        &self,
        set: &mut RunningSet,
        now_ms: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        check_atomic(set, "face_trace")?;

        // A discrete turn cannot run while the head is tracking
        if set.has_turn() {
            info!("Stopping the current turn to start face tracking");
            self.shared.stop_locked(set, now_ms);
        }

        if set.head_mut().activate(now_ms) {
            info!("Face tracking activated");
            Ok(DispatchOutcome::TrackingActivated)
        } else {
            Ok(DispatchOutcome::TrackingUnchanged)
        }
    }

    fn single_servo(
        &self,
        set: &RunningSet,
        joint_index: u8,
        angle_deg: u16,
        now_ms: u64,
    ) -> Result<DispatchOutcome, DispatchError> {
        check_atomic(set, "single_servo")?;

        let joint = JointId::from_index(joint_index).ok_or(DispatchError::InvalidJoint(joint_index))?;

        if !self.shared.calib().in_limits(joint, angle_deg as f32) {
            return Err(DispatchError::InvalidAngle { joint, angle_deg });
        }

        self.shared.write_servo(joint, angle_deg)?;
        self.shared.arm_manual(
            joint,
            angle_deg as f32,
            now_ms + self.params.manual_override_ms,
        );

        debug!("Manually set {} to {}", joint, angle_deg);

        Ok(DispatchOutcome::ManualSet { joint, angle_deg })
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Name of the action a command starts, if it starts one.
pub fn action_name(cmd: &MotionCmd) -> Option<String> {
    match cmd {
        MotionCmd::Walk { direction } => Some(String::from(match direction {
            WalkDir::Forward => "walk_forward",
            WalkDir::Backward => "walk_backward",
        })),
        MotionCmd::Turn { direction } => Some(String::from(match direction {
            TurnDir::Left => "turn_left",
            TurnDir::Right => "turn_right",
        })),
        MotionCmd::TrackingTurn { direction } => Some(String::from(match direction {
            TurnDir::Left => "tracking_turn_left",
            TurnDir::Right => "tracking_turn_right",
        })),
        MotionCmd::Gesture { name } | MotionCmd::Expression { name } | MotionCmd::Play { name } => {
            Some(name.clone())
        }
        MotionCmd::Stop | MotionCmd::FaceTrace | MotionCmd::SingleServo { .. } => None,
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn check_atomic(set: &RunningSet, requested: &str) -> Result<(), DispatchError> {
    match set.atomic() {
        Some(a) => Err(DispatchError::BlockedByAtomic {
            requested: String::from(requested),
            running: a.name().to_string(),
        }),
        None => Ok(()),
    }
}

fn check_free(set: &RunningSet, name: &str) -> Result<(), DispatchError> {
    if set.is_running(name) {
        return Err(DispatchError::AlreadyActive(name.to_string()));
    }
    check_atomic(set, name)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::{ActionLibrary, HeadTrack, SHIPPED_ACTIONS};
    use crate::calib::{Calibration, ChannelMap};
    use crate::servo_ctrl::{SimAngles, SimServoDriver};
    use comms_if::cmd::kind;

    fn dispatcher() -> (Dispatcher, Arc<SharedState>, SimAngles) {
        let driver = SimServoDriver::new();
        let angles = driver.angles();

        let shared = Arc::new(
            SharedState::new(
                Calibration::neutral(),
                ChannelMap::identity(),
                Box::new(driver),
                HeadTrack::new(1000),
                0.3,
                300,
            )
            .unwrap(),
        );
        let lib = ActionLibrary::from_toml_str(SHIPPED_ACTIONS).unwrap();

        (
            Dispatcher::new(Params::default(), Arc::clone(&shared), Arc::new(lib)),
            shared,
            angles,
        )
    }

    fn gesture(name: &str) -> MotionCmd {
        MotionCmd::Gesture {
            name: String::from(name),
        }
    }

    #[test]
    fn test_dedup() {
        let (d, shared, _) = dispatcher();
        let walk = MotionCmd::Walk {
            direction: WalkDir::Forward,
        };

        assert_eq!(
            d.handle(&walk, 0),
            Ok(DispatchOutcome::Started(String::from("walk_forward")))
        );
        assert_eq!(
            d.handle(&walk, 10),
            Err(DispatchError::AlreadyActive(String::from("walk_forward")))
        );
        assert_eq!(shared.lock_running().instances().len(), 1);
        assert!(shared.head_frozen());

        // A different action runs alongside
        assert!(d.handle(&gesture("wave"), 20).is_ok());
        assert_eq!(shared.lock_running().names(), vec!["walk_forward", "wave"]);
    }

    #[test]
    fn test_atomic() {
        let (d, shared, _) = dispatcher();

        assert!(d.handle(&gesture("bow"), 0).is_ok());

        let blocked = vec![
            gesture("wave"),
            MotionCmd::Walk {
                direction: WalkDir::Backward,
            },
            MotionCmd::Turn {
                direction: TurnDir::Left,
            },
            MotionCmd::FaceTrace,
            MotionCmd::SingleServo {
                joint: 0,
                angle_deg: 90,
            },
            MotionCmd::Expression {
                name: String::from("happy"),
            },
        ];
        for cmd in blocked.iter() {
            match d.handle(cmd, 100) {
                Err(DispatchError::BlockedByAtomic { running, .. }) => assert_eq!(running, "bow"),
                r => panic!("{:?} should have been blocked, got {:?}", cmd, r),
            }
        }

        // Requesting the atomic action again is a duplicate
        assert_eq!(
            d.handle(&gesture("bow"), 100),
            Err(DispatchError::AlreadyActive(String::from("bow")))
        );

        assert_eq!(d.handle(&MotionCmd::Stop, 200), Ok(DispatchOutcome::Stopped(1)));
        assert!(shared.lock_running().is_empty());
        assert!(d.handle(&gesture("wave"), 300).is_ok());
    }

    #[test]
    fn test_stop_idle() {
        let (d, shared, _) = dispatcher();

        for i in 0..3 {
            assert_eq!(d.handle(&MotionCmd::Stop, i), Ok(DispatchOutcome::Stopped(0)));
        }
        assert!(shared.lock_running().is_empty());
        assert!(!shared.lock_running().head().is_active());
    }

    #[test]
    fn test_stale_epoch() {
        let (d, shared, _) = dispatcher();
        let epoch = shared.stop_epoch();

        shared.stop(0);

        assert_eq!(
            d.handle_stamped(&gesture("wave"), epoch, 10),
            Ok(DispatchOutcome::Discarded)
        );
        assert!(shared.lock_running().is_empty());
    }

    #[test]
    fn test_unknown() {
        let (d, shared, _) = dispatcher();

        assert_eq!(
            d.handle(&gesture("moonwalk"), 0),
            Err(DispatchError::UnknownAction(String::from("moonwalk")))
        );
        assert_eq!(
            d.handle_raw(&MotionCommand::new(0x42, vec![]), shared.stop_epoch(), 0),
            Err(DispatchError::UnknownCommand(0x42))
        );
        match d.handle_raw(&MotionCommand::new(kind::WALK, vec![]), shared.stop_epoch(), 0) {
            Err(DispatchError::MalformedCommand(_)) => (),
            r => panic!("Expected malformed command, got {:?}", r),
        }
        assert!(shared.lock_running().is_empty());
    }

    #[test]
    fn test_face_trace() {
        let (d, shared, _) = dispatcher();

        assert!(d
            .handle(
                &MotionCmd::Turn {
                    direction: TurnDir::Left
                },
                0
            )
            .is_ok());
        assert!(d.handle(&gesture("wave"), 0).is_ok());

        // Tracking replaces the turn, which stops everything
        assert_eq!(
            d.handle(&MotionCmd::FaceTrace, 100),
            Ok(DispatchOutcome::TrackingActivated)
        );
        assert!(shared.lock_running().is_empty());
        assert!(shared.lock_running().head().is_active());
        assert!(!shared.head_frozen());

        assert_eq!(
            d.handle(&MotionCmd::FaceTrace, 200),
            Ok(DispatchOutcome::TrackingUnchanged)
        );
    }

    #[test]
    fn test_single_servo() {
        let (d, shared, angles) = dispatcher();
        let ear = JointId::LeftEar.index() as u8;

        assert_eq!(
            d.handle(
                &MotionCmd::SingleServo {
                    joint: ear,
                    angle_deg: 45
                },
                1000
            ),
            Ok(DispatchOutcome::ManualSet {
                joint: JointId::LeftEar,
                angle_deg: 45
            })
        );
        assert_eq!(angles.get(ear), Some(45));
        assert!(shared.manual_active(5999));
        assert!(!shared.manual_active(6000));

        assert_eq!(
            d.handle(
                &MotionCmd::SingleServo {
                    joint: 14,
                    angle_deg: 45
                },
                1000
            ),
            Err(DispatchError::InvalidJoint(14))
        );
        assert_eq!(
            d.handle(
                &MotionCmd::SingleServo {
                    joint: ear,
                    angle_deg: 181
                },
                1000
            ),
            Err(DispatchError::InvalidAngle {
                joint: JointId::LeftEar,
                angle_deg: 181
            })
        );
        assert_eq!(angles.num_writes(), 1);

        // Starting an action cancels the override
        assert!(d.handle(&gesture("wave"), 2000).is_ok());
        assert!(!shared.manual_active(2001));
    }
}
