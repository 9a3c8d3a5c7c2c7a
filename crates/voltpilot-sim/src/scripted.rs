//! [`ScriptedSim`] – frame-scripted simulation for tests and CI.
//!
//! Each call to [`simulation_step`][SimEnvironment::simulation_step] advances
//! to the next scripted [`Frame`].  Telemetry queries answer from the current
//! frame, route queries answer from a fixed route table, and every command is
//! recorded as a [`SimCall`] so tests can assert on exactly what the
//! controller sent.
//!
//! # Stub behaviour
//!
//! | Query | Answer |
//! |---|---|
//! | `time`, `road_id`, `lane_position`, `is_stopped` | current frame |
//! | `lane_id` | `"<road>_0"` |
//! | `lane_length` | registered via [`ScriptedSimBuilder::with_lane`] |
//! | `find_route` | route table; unknown or not yet open pairs are `NoRouteFound` |
//! | battery parameters | maximum `100`, actual = frame percent |
//!
//! # Example
//!
//! ```rust
//! use voltpilot_sim::scripted::{Frame, ScriptedSim};
//! use voltpilot_sim::SimEnvironment;
//!
//! let mut sim = ScriptedSim::builder("ev1")
//!     .with_frames([Frame::driving(1.0, 60.0, "1i", 0.0)])
//!     .build();
//!
//! sim.simulation_step().unwrap();
//! assert!(sim.vehicle_exists("ev1").unwrap());
//! assert_eq!(sim.road_id("ev1").unwrap(), "1i");
//! ```

use std::collections::HashMap;

use voltpilot_types::{EdgeId, Route, VoltError};

use crate::environment::{ACTUAL_BATTERY_CAPACITY, MAXIMUM_BATTERY_CAPACITY, SimEnvironment};

const MAXIMUM_CAPACITY: f64 = 100.0;

// ─────────────────────────────────────────────────────────────────────────────
// Frames and recorded calls
// ─────────────────────────────────────────────────────────────────────────────

/// Vehicle state for one scripted simulation step.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub time: f64,
    pub battery_percent: f64,
    pub road_id: EdgeId,
    pub lane_position: f64,
    pub stopped: bool,
}

impl Frame {
    /// A frame with the vehicle moving.
    pub fn driving(time: f64, battery_percent: f64, road_id: &str, lane_position: f64) -> Self {
        Self {
            time,
            battery_percent,
            road_id: road_id.to_string(),
            lane_position,
            stopped: false,
        }
    }

    /// A frame with the vehicle halted at a stop.
    pub fn halted(time: f64, battery_percent: f64, road_id: &str, lane_position: f64) -> Self {
        Self {
            stopped: true,
            ..Self::driving(time, battery_percent, road_id, lane_position)
        }
    }
}

/// A command received by the scripted simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    SetRoute(Vec<EdgeId>),
    SetStop {
        edge: EdgeId,
        position: f64,
        duration: f64,
    },
    Resume,
    Close,
}

// ─────────────────────────────────────────────────────────────────────────────
// ScriptedSim
// ─────────────────────────────────────────────────────────────────────────────

/// Simulation double driven by a fixed list of frames.
///
/// The vehicle is absent for the first `depart_after` steps, then present for
/// one step per frame, then gone.  [`min_expected_number`][SimEnvironment::min_expected_number]
/// stays at one until the step after the last frame.
pub struct ScriptedSim {
    vehicle_id: String,
    depart_after: usize,
    frames: Vec<Frame>,
    steps: usize,
    lanes: HashMap<String, f64>,
    routes: HashMap<(EdgeId, EdgeId), Result<Route, VoltError>>,
    /// First step at which a route table entry is answered.
    route_openings: HashMap<(EdgeId, EdgeId), usize>,
    current_route: Vec<EdgeId>,
    calls: Vec<SimCall>,
    closed: bool,
}

impl ScriptedSim {
    /// Start building a scripted simulation for `vehicle_id`.
    pub fn builder(vehicle_id: impl Into<String>) -> ScriptedSimBuilder {
        ScriptedSimBuilder {
            vehicle_id: vehicle_id.into(),
            ..ScriptedSimBuilder::default()
        }
    }

    /// Every command received so far, in order.
    pub fn calls(&self) -> &[SimCall] {
        &self.calls
    }

    /// Number of simulation steps taken.
    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn frame(&self) -> Option<&Frame> {
        let index = self.steps.checked_sub(self.depart_after + 1)?;
        self.frames.get(index)
    }

    fn vehicle_frame(&self, vehicle: &str) -> Result<&Frame, VoltError> {
        if self.closed {
            return Err(VoltError::simulation("vehicle", "simulation is closed"));
        }
        match self.frame() {
            Some(frame) if vehicle == self.vehicle_id => Ok(frame),
            _ => Err(VoltError::simulation(
                "vehicle",
                format!("vehicle '{vehicle}' is not in the simulation"),
            )),
        }
    }
}

impl SimEnvironment for ScriptedSim {
    fn simulation_step(&mut self) -> Result<(), VoltError> {
        if self.closed {
            return Err(VoltError::simulation("simulation_step", "simulation is closed"));
        }
        self.steps += 1;
        Ok(())
    }

    fn time(&mut self) -> Result<f64, VoltError> {
        Ok(self.frame().map_or(self.steps as f64, |f| f.time))
    }

    fn min_expected_number(&mut self) -> Result<usize, VoltError> {
        let last_step = self.depart_after + self.frames.len();
        Ok(usize::from(self.steps <= last_step))
    }

    fn vehicle_exists(&mut self, vehicle: &str) -> Result<bool, VoltError> {
        Ok(vehicle == self.vehicle_id && self.frame().is_some())
    }

    fn parameter(&mut self, vehicle: &str, key: &str) -> Result<String, VoltError> {
        let frame = self.vehicle_frame(vehicle)?;
        match key {
            ACTUAL_BATTERY_CAPACITY => Ok(frame.battery_percent.to_string()),
            MAXIMUM_BATTERY_CAPACITY => Ok(MAXIMUM_CAPACITY.to_string()),
            other => Err(VoltError::simulation(
                "parameter",
                format!("unknown parameter '{other}'"),
            )),
        }
    }

    fn road_id(&mut self, vehicle: &str) -> Result<EdgeId, VoltError> {
        Ok(self.vehicle_frame(vehicle)?.road_id.clone())
    }

    fn lane_id(&mut self, vehicle: &str) -> Result<String, VoltError> {
        Ok(format!("{}_0", self.vehicle_frame(vehicle)?.road_id))
    }

    fn lane_position(&mut self, vehicle: &str) -> Result<f64, VoltError> {
        Ok(self.vehicle_frame(vehicle)?.lane_position)
    }

    fn lane_length(&mut self, lane: &str) -> Result<f64, VoltError> {
        self.lanes
            .get(lane)
            .copied()
            .ok_or_else(|| VoltError::simulation("lane_length", format!("unknown lane '{lane}'")))
    }

    fn is_stopped(&mut self, vehicle: &str) -> Result<bool, VoltError> {
        Ok(self.vehicle_frame(vehicle)?.stopped)
    }

    fn route(&mut self, vehicle: &str) -> Result<Vec<EdgeId>, VoltError> {
        self.vehicle_frame(vehicle)?;
        Ok(self.current_route.clone())
    }

    fn find_route(&mut self, from: &str, to: &str) -> Result<Route, VoltError> {
        let key = (from.to_string(), to.to_string());
        let open = self
            .route_openings
            .get(&key)
            .is_none_or(|&step| self.steps >= step);
        match self.routes.get(&key) {
            Some(result) if open => result.clone(),
            _ => Err(VoltError::NoRouteFound {
                from: from.to_string(),
                to: to.to_string(),
            }),
        }
    }

    fn set_route(&mut self, vehicle: &str, edges: &[EdgeId]) -> Result<(), VoltError> {
        self.vehicle_frame(vehicle)?;
        self.current_route = edges.to_vec();
        self.calls.push(SimCall::SetRoute(edges.to_vec()));
        Ok(())
    }

    fn set_stop(
        &mut self,
        vehicle: &str,
        edge: &str,
        position: f64,
        duration: f64,
    ) -> Result<(), VoltError> {
        self.vehicle_frame(vehicle)?;
        self.calls.push(SimCall::SetStop {
            edge: edge.to_string(),
            position,
            duration,
        });
        Ok(())
    }

    fn resume(&mut self, vehicle: &str) -> Result<(), VoltError> {
        self.vehicle_frame(vehicle)?;
        self.calls.push(SimCall::Resume);
        Ok(())
    }

    fn close(&mut self) -> Result<(), VoltError> {
        self.closed = true;
        self.calls.push(SimCall::Close);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Builder
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for [`ScriptedSim`].  Obtain one with [`ScriptedSim::builder`].
#[derive(Default)]
pub struct ScriptedSimBuilder {
    vehicle_id: String,
    depart_after: usize,
    frames: Vec<Frame>,
    lanes: HashMap<String, f64>,
    routes: HashMap<(EdgeId, EdgeId), Result<Route, VoltError>>,
    route_openings: HashMap<(EdgeId, EdgeId), usize>,
    initial_route: Vec<EdgeId>,
}

impl ScriptedSimBuilder {
    /// Keep the vehicle out of the simulation for the first `steps` steps.
    pub fn with_depart_after(mut self, steps: usize) -> Self {
        self.depart_after = steps;
        self
    }

    /// Append frames, one per simulation step.
    pub fn with_frames(mut self, frames: impl IntoIterator<Item = Frame>) -> Self {
        self.frames.extend(frames);
        self
    }

    /// Register lane `"<edge>_0"` with the given length.
    pub fn with_lane(mut self, edge: &str, length: f64) -> Self {
        self.lanes.insert(format!("{edge}_0"), length);
        self
    }

    /// Answer `find_route(from, to)` with `route`.
    pub fn with_route(mut self, from: &str, to: &str, route: Route) -> Self {
        self.routes
            .insert((from.to_string(), to.to_string()), Ok(route));
        self
    }

    /// Answer `find_route(from, to)` with `route` once the simulation has
    /// taken `step` steps; before that the pair has no route.
    pub fn with_route_from_step(mut self, from: &str, to: &str, route: Route, step: usize) -> Self {
        self.route_openings
            .insert((from.to_string(), to.to_string()), step);
        self.with_route(from, to, route)
    }

    /// Answer `find_route(from, to)` with `error`.
    pub fn with_route_error(mut self, from: &str, to: &str, error: VoltError) -> Self {
        self.routes
            .insert((from.to_string(), to.to_string()), Err(error));
        self
    }

    /// Route the vehicle starts with; its last edge is the destination.
    pub fn with_initial_route<I, S>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EdgeId>,
    {
        self.initial_route = edges.into_iter().map(Into::into).collect();
        self
    }

    /// Consume the builder and return the configured simulation.
    pub fn build(self) -> ScriptedSim {
        ScriptedSim {
            vehicle_id: self.vehicle_id,
            depart_after: self.depart_after,
            frames: self.frames,
            steps: 0,
            lanes: self.lanes,
            routes: self.routes,
            route_openings: self.route_openings,
            current_route: self.initial_route,
            calls: Vec::new(),
            closed: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vehicle_appears_after_departure_delay() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_depart_after(2)
            .with_frames([Frame::driving(3.0, 60.0, "1i", 0.0)])
            .build();

        for _ in 0..2 {
            sim.simulation_step().unwrap();
            assert!(!sim.vehicle_exists("ev1").unwrap());
            assert_eq!(sim.min_expected_number().unwrap(), 1);
        }
        sim.simulation_step().unwrap();
        assert!(sim.vehicle_exists("ev1").unwrap());
        assert!((sim.time().unwrap() - 3.0).abs() < f64::EPSILON);
        assert_eq!(sim.min_expected_number().unwrap(), 1);

        sim.simulation_step().unwrap();
        assert!(!sim.vehicle_exists("ev1").unwrap());
        assert_eq!(sim.min_expected_number().unwrap(), 0);
    }

    #[test]
    fn vehicle_disappears_after_last_frame() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_frames([Frame::driving(1.0, 60.0, "1i", 0.0)])
            .build();
        sim.simulation_step().unwrap();
        sim.simulation_step().unwrap();
        assert!(!sim.vehicle_exists("ev1").unwrap());
        assert!(matches!(
            sim.road_id("ev1"),
            Err(VoltError::Simulation { .. })
        ));
    }

    #[test]
    fn battery_percent_is_derived_from_parameters() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_frames([Frame::driving(1.0, 48.0, "2i", 0.0)])
            .build();
        sim.simulation_step().unwrap();
        assert!((sim.battery_percent("ev1").unwrap() - 48.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_route_pair_is_no_route() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_route("2i", "3o", Route::new(["2i", "2o", "3o"], 120.0))
            .build();
        assert!(sim.find_route("2i", "3o").is_ok());
        assert!(matches!(
            sim.find_route("2i", "9x"),
            Err(VoltError::NoRouteFound { .. })
        ));
    }

    #[test]
    fn route_opens_at_configured_step() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_route_from_step("3o", "4o", Route::new(["3o", "4o"], 480.0), 2)
            .build();
        sim.simulation_step().unwrap();
        assert!(matches!(
            sim.find_route("3o", "4o"),
            Err(VoltError::NoRouteFound { .. })
        ));
        sim.simulation_step().unwrap();
        assert_eq!(sim.find_route("3o", "4o").unwrap().edges, vec!["3o", "4o"]);
    }

    #[test]
    fn lane_lookup_uses_lane_zero_of_edge() {
        let mut sim = ScriptedSim::builder("ev1")
            .with_frames([Frame::halted(1.0, 60.0, "3o", 4.0)])
            .with_lane("3o", 80.0)
            .build();
        sim.simulation_step().unwrap();
        let lane = sim.lane_id("ev1").unwrap();
        assert_eq!(lane, "3o_0");
        assert!((sim.lane_length(&lane).unwrap() - 80.0).abs() < f64::EPSILON);
        assert!(sim.is_stopped("ev1").unwrap());
    }

    #[test]
    fn closed_simulation_rejects_steps() {
        let mut sim = ScriptedSim::builder("ev1").build();
        sim.close().unwrap();
        assert!(sim.is_closed());
        assert!(sim.simulation_step().is_err());
        assert_eq!(sim.calls(), &[SimCall::Close]);
    }
}
