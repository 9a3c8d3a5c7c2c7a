//! End-to-end charge cycles through [`RunLoop`], against both the scripted
//! double and the in-process road network.

use voltpilot_runtime::{ControllerConfig, EndReason, ResumePolicy, RunLoop};
use voltpilot_sim::{Frame, NetworkSim, NetworkSpec, ScriptedSim, ScriptedSimBuilder, SimCall};
use voltpilot_types::{INDEFINITE_STOP_DURATION, Route};

/// Vehicle on 1i heading for 4o that runs low on 2i, detours over 2o to the
/// charger on 3o, charges and heads back out.
fn low_battery_trip() -> ScriptedSimBuilder {
    ScriptedSim::builder("ev1")
        .with_initial_route(["1i", "2i", "4o"])
        .with_lane("3o", 80.0)
        .with_route("2i", "2i", Route::new(["2i"], 200.0))
        .with_route("2i", "3o", Route::new(["2i", "2o", "3o"], 120.0))
        .with_frames([
            Frame::driving(1.0, 60.0, "1i", 0.0),
            Frame::driving(2.0, 50.0, "1i", 400.0),
            Frame::driving(3.0, 48.0, "2i", 5.0),
            Frame::driving(4.0, 47.5, "2o", 10.0),
            Frame::driving(5.0, 47.0, "3o", 5.0),
            Frame::halted(6.0, 47.0, "3o", 7.0),
            Frame::halted(7.0, 99.95, "3o", 7.0),
        ])
}

#[test]
fn full_charge_cycle_with_scripted_sim() {
    let mut sim = low_battery_trip()
        .with_route("3o", "4o", Route::new(["3o", "4o"], 480.0))
        .with_frames([Frame::driving(8.0, 99.9, "4o", 10.0)])
        .build();

    let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();

    assert_eq!(
        sim.calls(),
        &[
            SimCall::SetRoute(vec!["2i".into(), "2o".into(), "3o".into()]),
            SimCall::SetStop {
                edge: "3o".into(),
                position: 7.0,
                duration: INDEFINITE_STOP_DURATION,
            },
            SimCall::SetRoute(vec!["3o".into(), "4o".into()]),
            SimCall::Resume,
            SimCall::Close,
        ]
    );
    assert_eq!(summary.samples.len(), 7);
    assert_eq!(summary.reroutes, 1);
    assert_eq!(summary.resumes, 1);
    assert_eq!(summary.faults, 0);
    assert_eq!(summary.final_phase, "driving");
    assert_eq!(summary.end_reason, EndReason::VehicleLeft);
}

#[test]
fn failed_resume_resets_without_commands() {
    // No route from the charger back to 4o.
    let mut sim = low_battery_trip()
        .with_frames([Frame::halted(8.0, 100.0, "3o", 7.0)])
        .build();

    let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();

    assert_eq!(
        sim.calls(),
        &[
            SimCall::SetRoute(vec!["2i".into(), "2o".into(), "3o".into()]),
            SimCall::SetStop {
                edge: "3o".into(),
                position: 7.0,
                duration: INDEFINITE_STOP_DURATION,
            },
            SimCall::Close,
        ]
    );
    assert_eq!(summary.abandoned_cycles, 1);
    assert_eq!(summary.resumes, 0);
    assert_eq!(summary.faults, 1);
    assert_eq!(summary.final_phase, "driving");
}

#[test]
fn failed_resume_retries_every_step_when_configured() {
    let mut sim = low_battery_trip()
        .with_frames([
            Frame::halted(8.0, 100.0, "3o", 7.0),
            Frame::halted(9.0, 100.0, "3o", 7.0),
        ])
        .build();
    let config = ControllerConfig {
        resume_policy: ResumePolicy::RetryOnFailure,
        ..ControllerConfig::default()
    };

    let summary = RunLoop::new(config).run(&mut sim).unwrap();

    // Full on the 7.0, 8.0 and 9.0 frames.
    assert_eq!(summary.faults, 3);
    assert_eq!(summary.abandoned_cycles, 0);
    assert_eq!(summary.final_phase, "charging");
}

#[test]
fn retried_resume_succeeds_once_route_back_opens() {
    // The route back to 4o only exists from step 9 (the 9.0 frame) onwards.
    let mut sim = low_battery_trip()
        .with_route_from_step("3o", "4o", Route::new(["3o", "4o"], 480.0), 9)
        .with_frames([
            Frame::halted(8.0, 100.0, "3o", 7.0),
            Frame::halted(9.0, 100.0, "3o", 7.0),
            Frame::driving(10.0, 99.9, "4o", 10.0),
        ])
        .build();
    let config = ControllerConfig {
        resume_policy: ResumePolicy::RetryOnFailure,
        ..ControllerConfig::default()
    };

    let summary = RunLoop::new(config).run(&mut sim).unwrap();

    assert_eq!(
        sim.calls(),
        &[
            SimCall::SetRoute(vec!["2i".into(), "2o".into(), "3o".into()]),
            SimCall::SetStop {
                edge: "3o".into(),
                position: 7.0,
                duration: INDEFINITE_STOP_DURATION,
            },
            SimCall::SetRoute(vec!["3o".into(), "4o".into()]),
            SimCall::Resume,
            SimCall::Close,
        ]
    );
    // Failed on the 7.0 and 8.0 frames, resumed on 9.0.
    assert_eq!(summary.faults, 2);
    assert_eq!(summary.resumes, 1);
    assert_eq!(summary.abandoned_cycles, 0);
    assert_eq!(summary.final_phase, "driving");
}

#[test]
fn repeated_low_readings_reroute_once() {
    let mut sim = ScriptedSim::builder("ev1")
        .with_initial_route(["1i", "2i", "4o"])
        .with_route("1i", "3o", Route::new(["1i", "2i", "3o"], 780.0))
        .with_frames([
            Frame::driving(1.0, 50.0, "1i", 0.0),
            Frame::driving(2.0, 48.0, "1i", 10.0),
            Frame::driving(3.0, 47.0, "1i", 20.0),
            Frame::driving(4.0, 46.0, "1i", 30.0),
        ])
        .build();

    let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();

    let reroutes = sim
        .calls()
        .iter()
        .filter(|c| matches!(c, SimCall::SetRoute(_)))
        .count();
    assert_eq!(reroutes, 1);
    assert_eq!(summary.reroutes, 1);
    assert_eq!(summary.final_phase, "rerouted");
}

#[test]
fn demo_network_completes_one_charge_cycle() {
    let mut sim = NetworkSim::new(NetworkSpec::default()).unwrap();

    let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();

    assert_eq!(summary.end_reason, EndReason::VehicleLeft);
    assert_eq!(summary.reroutes, 1);
    assert_eq!(summary.resumes, 1);
    assert_eq!(summary.faults, 0);

    let percents: Vec<f64> = summary.samples.iter().map(|s| s.percent).collect();
    let min = percents.iter().copied().fold(f64::INFINITY, f64::min);
    let max = percents.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(min < 49.0, "battery never ran low: {min}");
    assert!(max >= 99.9, "battery never charged: {max}");
    assert!(summary.samples.windows(2).all(|w| w[0].time < w[1].time));
}

#[test]
fn demo_network_with_unknown_chargers_never_reroutes() {
    let mut sim = NetworkSim::new(NetworkSpec::default()).unwrap();
    let config = ControllerConfig {
        chargers: vec!["nowhere".into()],
        ..ControllerConfig::default()
    };

    let summary = RunLoop::new(config).run(&mut sim).unwrap();

    assert_eq!(summary.end_reason, EndReason::VehicleLeft);
    assert_eq!(summary.reroutes, 0);
    assert!(summary.faults > 0);
    assert_eq!(summary.final_phase, "driving");
}
