//! Implementations for the Mixer state structure

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::eqpt::{JointId, NUM_JOINTS};
use log::{debug, info, warn};
use serde::Serialize;
use util::{maths::clamp, module::State};

use super::{MixerError, MixerInitError, Params};
use crate::filter::{validate_alpha, JointFilters};
use crate::motion_core::SharedState;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Mixer module state
pub struct Mixer {
    params: Params,

    shared: Arc<SharedState>,

    /// `None` until initialised
    filters: Option<JointFilters>,

    /// Last filtered angle of every joint, held while under manual control.
    ///
    /// Units: degrees
    last_deg: [f32; NUM_JOINTS],
}

/// Input data to the mixer.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Current time, on the same clock as the dispatcher's.
    ///
    /// Units: milliseconds
    pub now_ms: u64,
}

/// Angles sent to the servos this tick.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputData {
    /// Units: degrees
    pub angles_deg: [u16; NUM_JOINTS],
}

/// Status report for mixer processing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    /// Number of action instances still running after this tick
    pub num_active: usize,

    /// Names of the actions which completed this tick
    pub retired: Vec<String>,

    pub body_motion: bool,

    /// True if idle joints were held for a manual override
    pub manual_hold: bool,

    pub filter_alpha: f32,
}

// ------------------------------------------------------------------------------------------------
// IMPLEMENTATIONS
// ------------------------------------------------------------------------------------------------

impl Mixer {
    pub fn new(shared: Arc<SharedState>) -> Self {
        Self {
            params: Params::default(),
            last_deg: shared.calib().homes(),
            shared,
            filters: None,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl State for Mixer {
    type InitData = Params;
    type InitError = MixerInitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = MixerError;

    /// Initialise the mixer with its parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        if init_data.period_ms == 0 {
            return Err(MixerInitError::ZeroPeriod);
        }
        validate_alpha(init_data.body_motion_filter_alpha)?;

        self.filters = Some(JointFilters::new(init_data.default_filter_alpha)?);
        self.last_deg = self.shared.calib().homes();
        self.params = init_data;

        Ok(())
    }

    /// Perform one mixer tick.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let filters = self.filters.as_mut().ok_or(MixerError::NotInitialised)?;
        let shared = &self.shared;
        let calib = shared.calib();
        let now_ms = input_data.now_ms;

        let mut report = StatusReport::default();

        // ---- EVALUATE GENERATORS ----

        let frame = {
            let mut set = shared.lock_running();

            let frame = set.sample(now_ms, calib);

            report.retired = set
                .retire_finished()
                .iter()
                .map(|t| t.name.clone())
                .collect();
            report.num_active = set.instances().len();
            report.body_motion = set.has_body_motion();

            // Released under the lock so a body motion starting now can't be missed
            if !report.body_motion && shared.head_frozen() {
                debug!("Body motion complete, releasing the head");
                shared.set_head_frozen(false);
            }

            frame
        };

        for name in report.retired.iter() {
            info!("{} complete", name);
        }

        // ---- MANUAL OVERRIDE ----

        for (i, angle) in shared.take_manual_pending().iter().enumerate() {
            if let Some(a) = angle {
                self.last_deg[i] = *a;
                filters.reset(i, *a);
            }
        }
        report.manual_hold = shared.manual_active(now_ms);

        // ---- RESOLVE AND FILTER ----

        report.filter_alpha = if report.body_motion {
            self.params.body_motion_filter_alpha
        } else {
            shared.default_alpha()
        };
        if let Err(e) = filters.set_alpha(report.filter_alpha) {
            warn!("Keeping filter alpha {}: {}", filters.alpha(), e);
        }

        let mut targets = [0f32; NUM_JOINTS];
        for joint in JointId::ALL.iter() {
            let i = joint.index();
            targets[i] = match frame[i] {
                Some(a) => a,
                None if report.manual_hold => self.last_deg[i],
                None => calib.home(*joint),
            };
        }

        filters.apply(&mut targets);
        self.last_deg = targets;

        // ---- OUTPUT ----

        let mut output = OutputData {
            angles_deg: [0; NUM_JOINTS],
        };
        for (a, t) in output.angles_deg.iter_mut().zip(targets.iter()) {
            *a = clamp(t.round(), 0.0, u16::MAX as f32) as u16;
        }

        let mut num_failed = 0;
        let mut first_err = None;
        {
            let mut driver = shared.lock_driver();
            for joint in JointId::ALL.iter() {
                let channel = shared.channels().channel(*joint);
                if let Err(e) = driver.set_angle(channel, output.angles_deg[joint.index()]) {
                    num_failed += 1;
                    first_err.get_or_insert((*joint, e));
                }
            }
        }

        match first_err {
            Some((joint, error)) => Err(MixerError::ServoWrite {
                num_failed,
                joint,
                error,
            }),
            None => Ok((output, report)),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::{
        ActionInstance, ActionLibrary, ActionRegistry, HeadTrack, JointFrame, SHIPPED_ACTIONS,
    };
    use crate::calib::{Calibration, ChannelMap};
    use crate::dispatcher::{self, Dispatcher};
    use crate::servo_ctrl::{SimAngles, SimServoDriver};
    use comms_if::cmd::{MotionCmd, WalkDir};

    const PERIOD_MS: u64 = 20;

    struct Rig {
        shared: Arc<SharedState>,
        dispatcher: Dispatcher,
        mixer: Mixer,
        angles: SimAngles,
    }

    fn rig() -> Rig {
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
        let dispatcher = Dispatcher::new(
            dispatcher::Params::default(),
            Arc::clone(&shared),
            Arc::new(lib),
        );

        let mut mixer = Mixer::new(Arc::clone(&shared));
        mixer.init(Params::default()).unwrap();

        Rig {
            shared,
            dispatcher,
            mixer,
            angles,
        }
    }

    impl Rig {
        /// Tick the mixer over `(from, to]`, returning the last output and every report.
        fn run(&mut self, from_ms: u64, to_ms: u64) -> (OutputData, Vec<StatusReport>) {
            let mut reports = Vec::new();
            let mut out = None;
            let mut now_ms = from_ms + PERIOD_MS;
            while now_ms <= to_ms {
                let (o, r) = self.mixer.proc(&InputData { now_ms }).unwrap();
                out = Some(o);
                reports.push(r);
                now_ms += PERIOD_MS;
            }
            (out.unwrap(), reports)
        }
    }

    #[test]
    fn test_not_initialised() {
        let r = rig();
        let mut mixer = Mixer::new(Arc::clone(&r.shared));
        assert!(matches!(
            mixer.proc(&InputData { now_ms: 0 }),
            Err(MixerError::NotInitialised)
        ));

        let mut bad = Params::default();
        bad.body_motion_filter_alpha = 1.2;
        assert!(mixer.init(bad).is_err());
    }

    #[test]
    fn test_idle_is_home() {
        let mut r = rig();
        let (out, _) = r.run(0, 100);

        assert_eq!(out.angles_deg, [90; NUM_JOINTS]);
        assert_eq!(r.angles.get(JointId::RightAnkle.index() as u8), Some(90));
        assert_eq!(r.angles.num_writes(), 5 * NUM_JOINTS);
    }

    #[test]
    fn test_walk_retired() {
        let mut r = rig();
        r.dispatcher
            .handle(
                &MotionCmd::Walk {
                    direction: WalkDir::Forward,
                },
                0,
            )
            .unwrap();

        // Mid walk the legs are moving and smoothed with the body motion alpha
        let (out, reports) = r.run(0, 3000);
        assert!(reports.iter().all(|r| r.body_motion && r.filter_alpha == 0.15));
        assert_ne!(out.angles_deg[JointId::LeftHip.index()], 90);

        let (_, reports) = r.run(3000, 5980);
        assert!(reports.iter().all(|r| r.retired.is_empty()));

        // Retired on the tick the fourth cycle ends
        let (_, reports) = r.run(5980, 6000);
        assert_eq!(reports[0].retired, vec![String::from("walk_forward")]);
        assert_eq!(reports[0].num_active, 0);
        assert_eq!(reports[0].filter_alpha, 0.3);
        assert!(!r.shared.head_frozen());

        // Joints settle back home
        let (out, _) = r.run(6000, 7000);
        assert_eq!(out.angles_deg, [90; NUM_JOINTS]);
    }

    #[test]
    fn test_happy_eased() {
        let calib = Calibration::neutral();
        let lib = ActionLibrary::from_toml_str(SHIPPED_ACTIONS).unwrap();
        let happy = lib.get("happy").unwrap();

        let target = match &happy.kind {
            crate::action::ActionKind::KeyframeSequence { frames } => {
                frames[0].positions[JointId::HeadTilt.index()]
            }
            _ => panic!("happy should be a keyframe sequence"),
        };
        let home = calib.home(JointId::HeadTilt);
        assert!(target > home);

        let mut inst = ActionInstance::new(happy, 0, &calib);
        let mut frame: JointFrame = [None; NUM_JOINTS];
        inst.sample(300, &calib, &mut frame);
        let tilt = frame[JointId::HeadTilt.index()].unwrap();

        let linear = home + (target - home) * 300.0 / 700.0;
        assert!(tilt > home && tilt < target);
        assert!((tilt - linear).abs() > 0.5);
    }

    #[test]
    fn test_head_first() {
        let mut r = rig();

        r.dispatcher.handle(&MotionCmd::FaceTrace, 0).unwrap();
        r.shared.lock_running().head_mut().set_offsets(0.0, -20.0);
        r.dispatcher
            .handle(
                &MotionCmd::Gesture {
                    name: String::from("nod"),
                },
                0,
            )
            .unwrap();

        let mut alpha_one = Params::default();
        alpha_one.default_filter_alpha = 1.0;
        r.mixer.init(alpha_one).unwrap();
        r.shared.set_default_alpha(1.0).unwrap();

        // The nod wants the tilt at 110 degrees but the tracker owns the head
        let (out, _) = r.run(0, 300);
        assert_eq!(out.angles_deg[JointId::HeadTilt.index()], 70);
    }

    #[test]
    fn test_manual_hold_and_expiry() {
        let mut r = rig();
        let ear = JointId::LeftEar.index();

        r.dispatcher
            .handle(
                &MotionCmd::SingleServo {
                    joint: ear as u8,
                    angle_deg: 45,
                },
                0,
            )
            .unwrap();

        let (out, reports) = r.run(0, 4980);
        assert!(reports.iter().all(|r| r.manual_hold));
        assert_eq!(out.angles_deg[ear], 45);
        assert_eq!(r.angles.get(ear as u8), Some(45));

        let (out, reports) = r.run(4980, 6000);
        assert!(!reports[0].manual_hold);
        assert_eq!(out.angles_deg[ear], 90);
    }

    #[test]
    fn test_manual_cancelled_before_tick() {
        let mut r = rig();
        let ear = JointId::LeftEar.index();
        r.run(0, 80);

        r.dispatcher
            .handle(
                &MotionCmd::SingleServo {
                    joint: ear as u8,
                    angle_deg: 45,
                },
                100,
            )
            .unwrap();
        r.dispatcher
            .handle(
                &MotionCmd::Gesture {
                    name: String::from("nod"),
                },
                105,
            )
            .unwrap();

        // The hold has ended but the ear still slews back from where it was put
        let (out, reports) = r.run(100, 120);
        assert!(!reports[0].manual_hold);
        let a = out.angles_deg[ear];
        assert!(a >= 55 && a <= 62, "Ear jumped to {}", a);
        assert_eq!(r.angles.get(ear as u8), Some(a));
    }

    #[test]
    fn test_stop_returns_home() {
        let mut r = rig();
        r.dispatcher
            .handle(
                &MotionCmd::Expression {
                    name: String::from("happy"),
                },
                0,
            )
            .unwrap();

        let (out, _) = r.run(0, 1000);
        assert_ne!(out.angles_deg[JointId::HeadTilt.index()], 90);

        r.shared.stop(1000);
        let (out, reports) = r.run(1000, 2000);
        assert!(reports.iter().all(|r| r.num_active == 0));
        assert_eq!(out.angles_deg, [90; NUM_JOINTS]);
    }
}
