//! [`VehicleController`] – the per-step charging state machine.
//!
//! The controller is fed one [`VehicleTelemetry`] reading per simulation step
//! and walks the vehicle through one charge cycle:
//!
//! ```text
//! Driving ──low battery──▶ Rerouted ──on charger edge──▶ ArrivedAtCharger
//!    ▲                                                        │
//!    └──────────── full battery ◀── Charging ◀── stop placed ─┘
//! ```
//!
//! Each step evaluates four guards in a fixed order:
//!
//! 1. **Low battery** – below the threshold and not yet rerouted: pick the
//!    nearest charger and reroute to it.
//! 2. **Arrival** – rerouted and on the assigned charger's edge: mark the
//!    vehicle as arrived.  No command is issued.
//! 3. **Stop** – arrived, not yet stopped: place an indefinite stop a safe
//!    distance ahead on the current lane.
//! 4. **Resume** – charging and the battery is full: route back to the
//!    original destination and release the vehicle.
//!
//! At most one command is issued per step.  A guard that would issue a
//! second command is left for the next step; its condition still holds then.
//!
//! # Faults
//!
//! Route and placement problems are recoverable.  They are logged, reported
//! in [`StepReport::faults`] and the affected guard fires again on a later
//! step.  Any other environment failure is returned as `Err` and ends the run.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use voltpilot_kernel::{ChargerSelector, NearestCharger, UnsafeStop, compute_stop_offset, find_route};
use voltpilot_sim::{SimEnvironment, dispatch};
use voltpilot_types::{
    Charger, EdgeId, INDEFINITE_STOP_DURATION, VehicleCommand, VehicleTelemetry, VoltError,
};

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// What the controller does when it cannot route the vehicle back to its
/// original destination after charging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResumePolicy {
    /// Drop back to `Driving` anyway.  The vehicle stays parked on its stop
    /// and may trigger a fresh charge cycle later.
    #[default]
    ForceReset,
    /// Stay in the charging phase and try again on the next step.
    RetryOnFailure,
}

/// Configuration bundle for [`VehicleController`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Simulation identifier of the monitored vehicle.
    pub vehicle_id: String,
    /// Battery percentage below which the vehicle is sent to charge.
    pub battery_threshold: f64,
    /// Battery percentage at which charging counts as complete.
    pub full_charge_percent: f64,
    /// Edges hosting a charging station, in evaluation order.
    pub chargers: Vec<EdgeId>,
    pub resume_policy: ResumePolicy,
    /// Duration handed to the simulator for the charging stop.
    pub stop_duration: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            vehicle_id: "ev1".to_string(),
            battery_threshold: 49.0,
            full_charge_percent: 99.9,
            chargers: vec!["2i".to_string(), "3o".to_string()],
            resume_policy: ResumePolicy::ForceReset,
            stop_duration: INDEFINITE_STOP_DURATION,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// State
// ─────────────────────────────────────────────────────────────────────────────

/// Where the vehicle is in its charge cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ChargePhase {
    #[default]
    Driving,
    /// Heading for `charger`.
    Rerouted { charger: Charger },
    /// On the charger's edge, waiting for a stop to be placed.
    ArrivedAtCharger { charger: Charger },
    /// Stopped at the charger.
    Charging { charger: Charger },
}

impl ChargePhase {
    pub fn name(&self) -> &'static str {
        match self {
            ChargePhase::Driving => "driving",
            ChargePhase::Rerouted { .. } => "rerouted",
            ChargePhase::ArrivedAtCharger { .. } => "arrived_at_charger",
            ChargePhase::Charging { .. } => "charging",
        }
    }

    fn charger(&self) -> Option<&Charger> {
        match self {
            ChargePhase::Driving => None,
            ChargePhase::Rerouted { charger }
            | ChargePhase::ArrivedAtCharger { charger }
            | ChargePhase::Charging { charger } => Some(charger),
        }
    }
}

/// Controller state for the monitored vehicle.
///
/// The three flags of the charge cycle are derived from [`ChargePhase`], so
/// "charging implies rerouted" and "stopped implies charging" always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleState {
    phase: ChargePhase,
    original_destination: EdgeId,
}

impl VehicleState {
    pub fn new(original_destination: impl Into<EdgeId>) -> Self {
        Self {
            phase: ChargePhase::Driving,
            original_destination: original_destination.into(),
        }
    }

    pub fn phase(&self) -> &ChargePhase {
        &self.phase
    }

    /// Last edge of the route the vehicle had before any reroute.
    pub fn original_destination(&self) -> &str {
        &self.original_destination
    }

    pub fn has_rerouted(&self) -> bool {
        !matches!(self.phase, ChargePhase::Driving)
    }

    /// `true` from arrival at the charger until charging ends.
    pub fn is_charging(&self) -> bool {
        matches!(
            self.phase,
            ChargePhase::ArrivedAtCharger { .. } | ChargePhase::Charging { .. }
        )
    }

    /// `true` once the charging stop has been placed.
    pub fn has_started_charging(&self) -> bool {
        matches!(self.phase, ChargePhase::Charging { .. })
    }

    pub fn assigned_charger(&self) -> Option<&Charger> {
        self.phase.charger()
    }
}

/// Outcome of one [`VehicleController::on_telemetry`] call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepReport {
    /// Command sent to the simulation this step, if any.
    pub command: Option<VehicleCommand>,
    /// Recoverable faults raised this step.
    pub faults: Vec<VoltError>,
}

// ─────────────────────────────────────────────────────────────────────────────
// VehicleController
// ─────────────────────────────────────────────────────────────────────────────

/// Battery monitor and charge-cycle controller for a single vehicle.
pub struct VehicleController {
    config: ControllerConfig,
    selector: ChargerSelector,
    state: VehicleState,
    reroutes: usize,
    resumes: usize,
    abandoned_cycles: usize,
}

impl VehicleController {
    /// Create a controller in the `Driving` phase.
    ///
    /// `original_destination` is where the vehicle is sent after charging.
    pub fn new(config: ControllerConfig, original_destination: impl Into<EdgeId>) -> Self {
        let selector = ChargerSelector::new(config.chargers.iter().map(Charger::new).collect());
        Self {
            config,
            selector,
            state: VehicleState::new(original_destination),
            reroutes: 0,
            resumes: 0,
            abandoned_cycles: 0,
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn state(&self) -> &VehicleState {
        &self.state
    }

    /// Number of reroutes to a charger issued so far.
    pub fn reroutes(&self) -> usize {
        self.reroutes
    }

    /// Number of charge cycles that ended with the vehicle back on its way.
    pub fn resumes(&self) -> usize {
        self.resumes
    }

    /// Number of charge cycles dropped because no route back was found.
    pub fn abandoned_cycles(&self) -> usize {
        self.abandoned_cycles
    }

    /// Evaluate all guards against this step's telemetry.
    ///
    /// Returns the command issued (if any) and the recoverable faults raised.
    /// Non-recoverable environment errors are propagated.
    #[instrument(skip_all, fields(time = telemetry.time, road = %telemetry.road_id))]
    pub fn on_telemetry(
        &mut self,
        env: &mut dyn SimEnvironment,
        telemetry: &VehicleTelemetry,
    ) -> Result<StepReport, VoltError> {
        let mut report = StepReport::default();

        self.check_low_battery(env, telemetry, &mut report)?;
        self.check_arrival(telemetry);
        if report.command.is_none() {
            self.check_stop(env, &mut report)?;
        }
        if report.command.is_none() {
            self.check_resume(env, telemetry, &mut report)?;
        }

        Ok(report)
    }

    // ── Guards ───────────────────────────────────────────────────────────────

    fn check_low_battery(
        &mut self,
        env: &mut dyn SimEnvironment,
        telemetry: &VehicleTelemetry,
        report: &mut StepReport,
    ) -> Result<(), VoltError> {
        if self.state.has_rerouted() || telemetry.battery_percent >= self.config.battery_threshold {
            return Ok(());
        }

        match self.selector.select_nearest(env, &telemetry.road_id) {
            None => {
                warn!(
                    battery = telemetry.battery_percent,
                    "low battery but no charger is reachable"
                );
                report.faults.push(VoltError::NoRouteFound {
                    from: telemetry.road_id.clone(),
                    to: self.config.chargers.join(","),
                });
            }
            Some(NearestCharger { charger, route }) if route.is_degenerate() => {
                error!(
                    charger = %charger,
                    edges = route.edges.len(),
                    "route to nearest charger is degenerate; not rerouting"
                );
                report.faults.push(VoltError::DegenerateRoute {
                    charger: charger.edge,
                    edges: route.edges.len(),
                });
            }
            Some(NearestCharger { charger, route }) => {
                info!(
                    battery = telemetry.battery_percent,
                    charger = %charger,
                    length = route.length,
                    "low battery; rerouting to nearest charger"
                );
                let command = VehicleCommand::Reroute { edges: route.edges };
                dispatch(env, &self.config.vehicle_id, &command)?;
                self.transition(ChargePhase::Rerouted { charger });
                self.reroutes += 1;
                report.command = Some(command);
            }
        }
        Ok(())
    }

    fn check_arrival(&mut self, telemetry: &VehicleTelemetry) {
        let ChargePhase::Rerouted { charger } = &self.state.phase else {
            return;
        };
        if telemetry.road_id != charger.edge {
            return;
        }
        let charger = charger.clone();
        info!(charger = %charger, "arrived at charger");
        self.transition(ChargePhase::ArrivedAtCharger { charger });
    }

    fn check_stop(
        &mut self,
        env: &mut dyn SimEnvironment,
        report: &mut StepReport,
    ) -> Result<(), VoltError> {
        let ChargePhase::ArrivedAtCharger { charger } = &self.state.phase else {
            return Ok(());
        };
        let charger = charger.clone();
        let vehicle = self.config.vehicle_id.as_str();
        if env.is_stopped(vehicle)? {
            return Ok(());
        }

        let lane = env.lane_id(vehicle)?;
        let position = env.lane_position(vehicle)?;
        let lane_length = env.lane_length(&lane)?;

        match compute_stop_offset(position, lane_length) {
            Err(UnsafeStop {
                remaining,
                required,
            }) => {
                warn!(
                    lane = %lane,
                    position,
                    lane_length,
                    "not enough lane left to stop; retrying next step"
                );
                report.faults.push(VoltError::UnsafeStopPosition {
                    lane,
                    remaining,
                    required,
                });
            }
            Ok(offset) => {
                let command = VehicleCommand::Stop {
                    edge: charger.edge.clone(),
                    position: offset,
                    duration: self.config.stop_duration,
                };
                dispatch(env, vehicle, &command)?;
                info!(charger = %charger, offset, "charging stop placed");
                self.transition(ChargePhase::Charging { charger });
                report.command = Some(command);
            }
        }
        Ok(())
    }

    fn check_resume(
        &mut self,
        env: &mut dyn SimEnvironment,
        telemetry: &VehicleTelemetry,
        report: &mut StepReport,
    ) -> Result<(), VoltError> {
        if !self.state.is_charging() || telemetry.battery_percent < self.config.full_charge_percent
        {
            return Ok(());
        }

        let from = telemetry.road_id.clone();
        let to = self.state.original_destination.clone();
        let outcome = find_route(env, &from, &to)
            .map_err(|e| e.to_string())
            .and_then(|route| {
                let command = VehicleCommand::Resume { edges: route.edges };
                dispatch(env, &self.config.vehicle_id, &command)
                    .map(|()| command)
                    .map_err(|e| e.to_string())
            });

        match outcome {
            Ok(command) => {
                info!(
                    battery = telemetry.battery_percent,
                    destination = %to,
                    "battery full; resuming trip"
                );
                self.resumes += 1;
                self.transition(ChargePhase::Driving);
                report.command = Some(command);
            }
            Err(details) => {
                error!(%from, %to, %details, "cannot route back to original destination");
                report.faults.push(VoltError::ResumeRouteFailure { from, to });
                match self.config.resume_policy {
                    ResumePolicy::ForceReset => {
                        self.abandoned_cycles += 1;
                        self.transition(ChargePhase::Driving);
                    }
                    ResumePolicy::RetryOnFailure => {
                        debug!("keeping charging phase; resume retried next step");
                    }
                }
            }
        }
        Ok(())
    }

    fn transition(&mut self, next: ChargePhase) {
        debug!(from = self.state.phase.name(), to = next.name(), "phase transition");
        self.state.phase = next;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
