//! # Kinematic Transform Benchmark
//!
//! Covers the per-tick maths: the gear ratio and motor angle lookups plus the torque policy.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use exo_lib::{
    kinematics::{KinematicCalibration, KinematicTransform, KinematicsParams},
    torque_ctrl::{TorqueCtrl, TorqueCtrlParams},
};

fn transform_benchmark(c: &mut Criterion) {
    let kin = KinematicTransform::new(
        KinematicsParams::default(),
        KinematicCalibration::default()
    ).unwrap();
    let torque_ctrl = TorqueCtrl::new(TorqueCtrlParams::default());

    // Sweep across all three regimes
    let angles: Vec<f64> = (40..175).map(|d| (d as f64).to_radians()).collect();

    c.bench_function("gear_ratio", |b| b.iter(|| {
        for a in angles.iter() {
            black_box(kin.gear_ratio(black_box(*a)).unwrap());
        }
    }));

    c.bench_function("slackless_motor_angle", |b| b.iter(|| {
        for a in angles.iter() {
            black_box(kin.slackless_motor_angle(black_box(*a)).unwrap());
        }
    }));

    c.bench_function("torque_command", |b| b.iter(|| {
        for a in angles.iter() {
            let gr = kin.gear_ratio(*a).unwrap();
            black_box(torque_ctrl.command(black_box(20.0), gr, 0.8).unwrap());
        }
    }));
}

criterion_group!(benches, transform_benchmark);
criterion_main!(benches);
