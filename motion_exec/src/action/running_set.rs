//! # Running set
//!
//! The head tracker plus every running action instance, in the order they were started. This is
//! the state shared by the dispatcher, mixer and face tracker behind a single lock.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::sync::Arc;

use comms_if::eqpt::NUM_JOINTS;
use log::debug;

use super::{ActionInstance, ActionTemplate, HeadTrack, JointFrame};
use crate::calib::Calibration;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RunningSet {
    head: HeadTrack,
    instances: Vec<ActionInstance>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl RunningSet {
    pub fn new(head: HeadTrack) -> Self {
        Self {
            head,
            instances: Vec::new(),
        }
    }

    pub fn head(&self) -> &HeadTrack {
        &self.head
    }

    pub fn head_mut(&mut self) -> &mut HeadTrack {
        &mut self.head
    }

    pub fn instances(&self) -> &[ActionInstance] {
        &self.instances
    }

    /// True if no action instance is running. The head tracker is not counted.
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// True if an instance of the named action is running.
    pub fn is_running(&self, name: &str) -> bool {
        self.instances.iter().any(|i| i.name() == name)
    }

    /// The first running atomic instance, if any.
    pub fn atomic(&self) -> Option<&ActionInstance> {
        self.instances.iter().find(|i| i.is_atomic())
    }

    pub fn has_body_motion(&self) -> bool {
        self.instances.iter().any(|i| i.category().is_body_motion())
    }

    pub fn has_turn(&self) -> bool {
        self.instances.iter().any(|i| i.category().is_turn())
    }

    pub fn names(&self) -> Vec<String> {
        self.instances.iter().map(|i| i.name().to_string()).collect()
    }

    /// Append a new instance. Callers are responsible for the one instance per name rule.
    pub fn push(&mut self, instance: ActionInstance) {
        self.instances.push(instance);
    }

    /// Remove every instance and switch head tracking off. Returns the number of instances
    /// removed.
    pub fn clear(&mut self) -> usize {
        let n = self.instances.len();
        self.instances.clear();
        self.head.deactivate();
        n
    }

    /// Evaluate the head tracker then every instance in start order, earlier generators taking
    /// precedence on any joint they share.
    pub fn sample(&mut self, now_ms: u64, calib: &Calibration) -> JointFrame {
        let mut frame: JointFrame = [None; NUM_JOINTS];

        self.head.sample(now_ms, calib, &mut frame);
        for inst in self.instances.iter_mut() {
            inst.sample(now_ms, calib, &mut frame);
        }

        frame
    }

    /// Remove finished instances, returning their templates.
    pub fn retire_finished(&mut self) -> Vec<Arc<ActionTemplate>> {
        let mut retired = Vec::new();

        self.instances.retain(|i| {
            if i.is_finished() {
                debug!("Retiring {}", i.name());
                retired.push(Arc::clone(i.template()));
                false
            } else {
                true
            }
        });

        retired
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::action::{ActionCategory, ActionKind, GaitParams};
    use comms_if::eqpt::JointId;

    fn template(name: &str, category: ActionCategory, joint: JointId, amp: f32) -> Arc<ActionTemplate> {
        let mut params = GaitParams::zero();
        params.amplitude[joint.index()] = amp;

        Arc::new(ActionTemplate {
            name: String::from(name),
            category,
            is_atomic: false,
            default_repeat_count: 1,
            kind: ActionKind::GaitPeriodic {
                period_ms: 1000,
                params,
            },
        })
    }

    #[test]
    fn test_sample_order() {
        let calib = Calibration::neutral();
        let mut set = RunningSet::new(HeadTrack::new(1000));

        set.push(ActionInstance::new(
            template("look", ActionCategory::Gesture, JointId::HeadPan, 30.0),
            0,
            &calib,
        ));
        set.push(ActionInstance::new(
            template("shake", ActionCategory::Gesture, JointId::HeadPan, -30.0),
            0,
            &calib,
        ));

        // Earlier instance wins
        let frame = set.sample(250, &calib);
        assert!((frame[JointId::HeadPan.index()].unwrap() - 120.0).abs() < 1e-3);

        // Head tracker wins over both
        set.head_mut().activate(0);
        set.head_mut().set_offsets(-5.0, 0.0);
        let frame = set.sample(250, &calib);
        assert_eq!(frame[JointId::HeadPan.index()], Some(85.0));
        assert_eq!(frame[JointId::LeftHip.index()], None);
    }

    #[test]
    fn test_retire_and_clear() {
        let calib = Calibration::neutral();
        let mut set = RunningSet::new(HeadTrack::new(1000));

        set.push(ActionInstance::new(
            template("walk_forward", ActionCategory::Locomotion, JointId::LeftHip, 20.0),
            0,
            &calib,
        ));
        set.push(ActionInstance::new(
            template("wave", ActionCategory::Gesture, JointId::RightShoulder, 20.0),
            500,
            &calib,
        ));
        assert!(set.has_body_motion());
        assert!(!set.has_turn());
        assert!(set.is_running("wave"));

        set.sample(1000, &calib);
        let retired = set.retire_finished();
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].name, "walk_forward");
        assert_eq!(set.names(), vec![String::from("wave")]);
        assert!(!set.has_body_motion());

        set.head_mut().activate(0);
        assert_eq!(set.clear(), 1);
        assert!(set.is_empty());
        assert!(!set.head().is_active());
        assert_eq!(set.clear(), 0);
    }

    #[test]
    fn test_looping_gait_not_retired() {
        let calib = Calibration::neutral();
        let mut set = RunningSet::new(HeadTrack::new(1000));

        let mut looping =
            (*template("dance", ActionCategory::Expression, JointId::LeftHip, 20.0)).clone();
        looping.default_repeat_count = 0;
        set.push(ActionInstance::new(Arc::new(looping), 0, &calib));

        for now_ms in (0..100_000).step_by(250) {
            set.sample(now_ms, &calib);
            assert!(set.retire_finished().is_empty(), "Retired at {} ms", now_ms);
        }
        assert!(set.is_running("dance"));

        assert_eq!(set.clear(), 1);
    }
}
