//! # Mixer Benchmark

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use comms_if::cmd::{MotionCmd, WalkDir};
use comms_if::eqpt::FaceLocation;
use motion_lib::{
    action::{ActionLibrary, HeadTrack},
    calib::{Calibration, ChannelMap},
    dispatcher::{self, Dispatcher},
    face_track::{self, FaceTracker},
    mixer::{self, Mixer},
    motion_core::SharedState,
    servo_ctrl::SimServoDriver,
};
use util::module::State;

fn mixer_benchmark(c: &mut Criterion) {
    // ---- Build a loaded core ----

    let shared = Arc::new(
        SharedState::new(
            Calibration::neutral(),
            ChannelMap::identity(),
            Box::new(SimServoDriver::new()),
            HeadTrack::new(1000),
            0.3,
            300,
        )
        .unwrap(),
    );

    let library =
        ActionLibrary::from_toml_str(include_str!("../../params/actions.toml")).unwrap();
    let dispatcher = Dispatcher::new(
        dispatcher::Params::default(),
        Arc::clone(&shared),
        Arc::new(library),
    );

    // Head tracking under a walk, a looping dance and a keyframe expression
    for cmd in [
        MotionCmd::FaceTrace,
        MotionCmd::Walk {
            direction: WalkDir::Forward,
        },
        MotionCmd::Expression {
            name: String::from("dance"),
        },
        MotionCmd::Expression {
            name: String::from("happy"),
        },
    ]
    .iter()
    {
        dispatcher.handle(cmd, 0).unwrap();
    }

    let mut mixer = Mixer::new(Arc::clone(&shared));
    mixer.init(mixer::Params::default()).unwrap();

    let mut tracker = FaceTracker::new(Arc::clone(&shared));
    tracker.init(face_track::Params::default()).unwrap();

    // ---- Benchmark ----

    let mut now_ms = 0;
    c.bench_function("mixer tick", |b| {
        b.iter(|| {
            now_ms += 20;
            mixer.proc(&mixer::InputData { now_ms }).unwrap()
        })
    });

    // Release the head so the tracker runs its full control path
    shared.set_head_frozen(false);
    let face = FaceLocation {
        x: 100,
        y: 80,
        w: 120,
        h: 120,
        detected: true,
    };
    let mut now_ms = 0;
    c.bench_function("face tracker tick", |b| {
        b.iter(|| {
            now_ms += 50;
            tracker
                .proc(&face_track::InputData {
                    now_ms,
                    face: Some(face),
                })
                .unwrap()
        })
    });
}

criterion_group!(benches, mixer_benchmark);
criterion_main!(benches);
