//! [`RunLoop`] – drives the simulation from vehicle departure to exhaustion.
//!
//! 1. Step the simulation until the monitored vehicle exists.
//! 2. Take its original destination from the last edge of its route.
//! 3. While vehicles are still expected: step, read telemetry, record a
//!    battery sample and hand the telemetry to the [`VehicleController`].
//! 4. Close the environment and return a [`RunSummary`].
//!
//! The run ends when the vehicle leaves the network or the simulation has
//! nothing left to do.  The environment is closed on every exit path.
//!
//! # Example
//!
//! ```rust
//! use voltpilot_runtime::{ControllerConfig, EndReason, RunLoop};
//! use voltpilot_sim::{Frame, ScriptedSim};
//!
//! let mut sim = ScriptedSim::builder("ev1")
//!     .with_initial_route(["1i", "2i", "4o"])
//!     .with_frames([
//!         Frame::driving(1.0, 80.0, "1i", 0.0),
//!         Frame::driving(2.0, 79.0, "1i", 10.0),
//!     ])
//!     .build();
//!
//! let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();
//! assert_eq!(summary.end_reason, EndReason::VehicleLeft);
//! assert_eq!(summary.samples.len(), 1);
//! assert!(sim.is_closed());
//! ```

use serde::Serialize;
use tracing::{debug, info, info_span, warn};
use voltpilot_sim::SimEnvironment;
use voltpilot_types::{BatterySample, VehicleTelemetry, VoltError};

use crate::controller::{ChargePhase, ControllerConfig, VehicleController};
use crate::recorder::BatteryRecorder;

// ─────────────────────────────────────────────────────────────────────────────
// Summary
// ─────────────────────────────────────────────────────────────────────────────

/// Why the run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The vehicle was present and then left the network.
    VehicleLeft,
    /// No vehicles remained expected while the monitored one was present.
    SimulationExhausted,
    /// The simulation ran out before the vehicle ever appeared.
    VehicleNeverAppeared,
}

/// Everything a consumer needs after a run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Battery time series, one point per step with the vehicle present.
    pub samples: Vec<BatterySample>,
    /// Simulation steps taken, including those before departure.
    pub steps: usize,
    pub reroutes: usize,
    pub resumes: usize,
    pub abandoned_cycles: usize,
    /// Recoverable faults raised over the whole run.
    pub faults: usize,
    /// Phase the controller was in when the run ended.
    pub final_phase: &'static str,
    pub end_reason: EndReason,
}

// ─────────────────────────────────────────────────────────────────────────────
// RunLoop
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the controller configuration and runs one monitored trip.
pub struct RunLoop {
    config: ControllerConfig,
}

impl RunLoop {
    pub fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Run the simulation to completion and close it.
    ///
    /// Errors from the environment that the controller cannot recover from
    /// end the run early; the environment is still closed.
    pub fn run(&self, env: &mut dyn SimEnvironment) -> Result<RunSummary, VoltError> {
        let result = self.drive(env);
        let closed = env.close();
        let summary = result?;
        closed?;
        info!(
            steps = summary.steps,
            samples = summary.samples.len(),
            reroutes = summary.reroutes,
            resumes = summary.resumes,
            end_reason = ?summary.end_reason,
            "run complete"
        );
        Ok(summary)
    }

    fn drive(&self, env: &mut dyn SimEnvironment) -> Result<RunSummary, VoltError> {
        let vehicle = self.config.vehicle_id.as_str();
        let mut recorder = BatteryRecorder::new();
        let mut steps = 0;

        // ── Acquire the vehicle ──────────────────────────────────────────────
        while !env.vehicle_exists(vehicle)? {
            if env.min_expected_number()? == 0 {
                warn!(vehicle, steps, "simulation ended before the vehicle departed");
                return Ok(RunSummary {
                    samples: Vec::new(),
                    steps,
                    reroutes: 0,
                    resumes: 0,
                    abandoned_cycles: 0,
                    faults: 0,
                    final_phase: ChargePhase::Driving.name(),
                    end_reason: EndReason::VehicleNeverAppeared,
                });
            }
            env.simulation_step()?;
            steps += 1;
        }

        let route = env.route(vehicle)?;
        let destination = route
            .last()
            .cloned()
            .ok_or_else(|| VoltError::simulation("route", format!("vehicle '{vehicle}' has an empty route")))?;
        info!(vehicle, %destination, steps, "vehicle departed");

        // ── Monitor ──────────────────────────────────────────────────────────
        let mut controller = VehicleController::new(self.config.clone(), destination);
        let mut faults = 0;
        let end_reason = loop {
            if env.min_expected_number()? == 0 {
                break EndReason::SimulationExhausted;
            }
            env.simulation_step()?;
            steps += 1;
            if !env.vehicle_exists(vehicle)? {
                break EndReason::VehicleLeft;
            }

            let telemetry = read_telemetry(env, vehicle)?;
            let span = info_span!("step", time = telemetry.time);
            let _enter = span.enter();

            debug!(battery = telemetry.battery_percent, road = %telemetry.road_id, "telemetry");
            recorder.record(telemetry.time, telemetry.battery_percent);
            let report = controller.on_telemetry(env, &telemetry)?;
            faults += report.faults.len();
        };

        Ok(RunSummary {
            samples: recorder.into_samples(),
            steps,
            reroutes: controller.reroutes(),
            resumes: controller.resumes(),
            abandoned_cycles: controller.abandoned_cycles(),
            faults,
            final_phase: controller.state().phase().name(),
            end_reason,
        })
    }
}

/// Read this step's time, battery percentage and road for `vehicle`.
pub fn read_telemetry(
    env: &mut dyn SimEnvironment,
    vehicle: &str,
) -> Result<VehicleTelemetry, VoltError> {
    Ok(VehicleTelemetry {
        time: env.time()?,
        battery_percent: env.battery_percent(vehicle)?,
        road_id: env.road_id(vehicle)?,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use voltpilot_sim::{Frame, ScriptedSim, SimCall};

    #[test]
    fn vehicle_that_never_departs_yields_empty_series() {
        let mut sim = ScriptedSim::builder("ev1").with_depart_after(3).build();
        let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();
        assert_eq!(summary.end_reason, EndReason::VehicleNeverAppeared);
        assert!(summary.samples.is_empty());
        assert!(sim.is_closed());
    }

    #[test]
    fn departure_frame_is_not_recorded() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_depart_after(2)
            .with_initial_route(["1i", "4o"])
            .with_frames([
                Frame::driving(3.0, 90.0, "1i", 0.0),
                Frame::driving(4.0, 89.0, "1i", 10.0),
                Frame::driving(5.0, 88.0, "1i", 20.0),
            ])
            .build();
        let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();

        let times: Vec<f64> = summary.samples.iter().map(|s| s.time).collect();
        assert_eq!(times, vec![4.0, 5.0]);
        assert_eq!(summary.steps, 6);
        assert_eq!(summary.end_reason, EndReason::VehicleLeft);
        assert_eq!(summary.final_phase, "driving");
    }

    #[test]
    fn empty_route_is_an_error_and_still_closes() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_frames([Frame::driving(1.0, 90.0, "1i", 0.0)])
            .build();
        let result = RunLoop::new(ControllerConfig::default()).run(&mut sim);
        assert!(matches!(result, Err(VoltError::Simulation { .. })));
        assert_eq!(sim.calls(), &[SimCall::Close]);
    }

    #[test]
    fn faults_are_counted() {
        // Low battery with no reachable charger: one fault per monitored step.
        let mut sim = ScriptedSim::builder("ev1")
            .with_initial_route(["9x"])
            .with_frames([
                Frame::driving(1.0, 40.0, "9x", 0.0),
                Frame::driving(2.0, 40.0, "9x", 1.0),
                Frame::driving(3.0, 40.0, "9x", 2.0),
            ])
            .build();
        let summary = RunLoop::new(ControllerConfig::default()).run(&mut sim).unwrap();
        assert_eq!(summary.faults, 2);
        assert_eq!(summary.reroutes, 0);
    }
}
