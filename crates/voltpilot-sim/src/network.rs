//! [`NetworkSim`] – a minimal in-process road network simulation.
//!
//! Lets the full VoltPilot stack run headless without an external traffic
//! simulator.  The model is intentionally small:
//!
//! - every edge has a single lane `"<edge>_0"` and a list of successor edges;
//! - one vehicle drives its route at constant speed;
//! - battery energy drains linearly with distance travelled and refills at a
//!   constant power while the vehicle is halted on a charging edge;
//! - routing uses Dijkstra over edge lengths, a route's length being the sum
//!   of the lengths of all its edges.
//!
//! The network is described by a serde-deserialisable [`NetworkSpec`] so it
//! can live in a TOML configuration file.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use voltpilot_types::{EdgeId, Route, VoltError};

use crate::environment::{ACTUAL_BATTERY_CAPACITY, MAXIMUM_BATTERY_CAPACITY, SimEnvironment};

// ─────────────────────────────────────────────────────────────────────────────
// Network description
// ─────────────────────────────────────────────────────────────────────────────

/// One directed road segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub id: EdgeId,
    pub length: f64,
    /// Edges reachable from the end of this one.
    #[serde(default)]
    pub next: Vec<EdgeId>,
}

/// The simulated vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleSpec {
    pub id: String,
    /// Initial route; its last edge is the trip destination.
    pub route: Vec<EdgeId>,
    /// Departure time in seconds.
    #[serde(default)]
    pub depart: f64,
    /// Cruise speed in distance units per second.
    #[serde(default = "default_speed")]
    pub speed: f64,
    /// Maximum battery energy (Wh).
    #[serde(default = "default_battery_capacity")]
    pub battery_capacity: f64,
    /// Battery energy at departure (Wh).
    #[serde(default = "default_initial_charge")]
    pub initial_charge: f64,
    /// Energy used per distance unit (Wh).
    #[serde(default = "default_consumption")]
    pub consumption_per_meter: f64,
    /// Charging power while halted on a charging edge (Wh per second).
    #[serde(default = "default_charge_power")]
    pub charge_power: f64,
}

fn default_speed() -> f64 {
    10.0
}
fn default_battery_capacity() -> f64 {
    1000.0
}
fn default_initial_charge() -> f64 {
    600.0
}
fn default_consumption() -> f64 {
    0.2
}
fn default_charge_power() -> f64 {
    5.0
}

/// Complete description of a [`NetworkSim`] scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Seconds advanced per simulation step.
    #[serde(default = "default_step_length")]
    pub step_length: f64,
    pub edges: Vec<EdgeSpec>,
    /// Edges equipped with a charging station.
    #[serde(default)]
    pub charging_edges: Vec<EdgeId>,
    pub vehicle: VehicleSpec,
}

fn default_step_length() -> f64 {
    1.0
}

impl Default for NetworkSpec {
    /// Demo scenario: the vehicle starts at 54 % and drops below 49 % on
    /// `"1i"`.  Of the chargers on `"2i"` and `"3o"`, `"2i"` is nearer; the
    /// trip ends on `"4o"`.
    fn default() -> Self {
        let edge = |id: &str, length: f64, next: &[&str]| EdgeSpec {
            id: id.to_string(),
            length,
            next: next.iter().map(|s| s.to_string()).collect(),
        };
        Self {
            step_length: default_step_length(),
            edges: vec![
                edge("1i", 500.0, &["2i"]),
                edge("2i", 200.0, &["3o", "4o"]),
                edge("3o", 80.0, &["4o"]),
                edge("4o", 400.0, &["5o"]),
                edge("5o", 300.0, &[]),
            ],
            charging_edges: vec!["2i".to_string(), "3o".to_string()],
            vehicle: VehicleSpec {
                id: "ev1".to_string(),
                route: vec!["1i".into(), "2i".into(), "4o".into()],
                depart: 0.0,
                speed: default_speed(),
                battery_capacity: default_battery_capacity(),
                initial_charge: 540.0,
                consumption_per_meter: default_consumption(),
                charge_power: default_charge_power(),
            },
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runtime state
// ─────────────────────────────────────────────────────────────────────────────

struct PendingStop {
    edge: EdgeId,
    position: f64,
    duration: f64,
    /// Set once the vehicle has reached the stop position.
    release_at: Option<f64>,
}

struct RunningVehicle {
    route: Vec<EdgeId>,
    route_index: usize,
    position: f64,
    charge: f64,
    stop: Option<PendingStop>,
}

impl RunningVehicle {
    fn edge(&self) -> &EdgeId {
        &self.route[self.route_index]
    }

    fn is_halted(&self) -> bool {
        self.stop.as_ref().is_some_and(|s| s.release_at.is_some())
    }
}

/// Single-vehicle road network simulation.
pub struct NetworkSim {
    spec: NetworkSpec,
    edges: HashMap<EdgeId, EdgeSpec>,
    time: f64,
    departed: bool,
    vehicle: Option<RunningVehicle>,
    closed: bool,
}

impl NetworkSim {
    /// Validate `spec` and build the simulation at time zero.
    ///
    /// # Errors
    ///
    /// Returns [`VoltError::Simulation`] when an edge length, the step
    /// length, the vehicle speed or the battery capacity is not a positive
    /// finite number, the departure time is not finite, a successor or route
    /// edge is unknown, or the vehicle route is empty.
    pub fn new(spec: NetworkSpec) -> Result<Self, VoltError> {
        let vehicle = &spec.vehicle;
        for (name, value) in [
            ("step_length", spec.step_length),
            ("vehicle.speed", vehicle.speed),
            ("vehicle.battery_capacity", vehicle.battery_capacity),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(VoltError::simulation(
                    "network",
                    format!("{name} must be positive, got {value}"),
                ));
            }
        }
        if !vehicle.depart.is_finite() {
            return Err(VoltError::simulation(
                "network",
                format!("vehicle.depart must be finite, got {}", vehicle.depart),
            ));
        }

        let mut edges = HashMap::new();
        for edge in &spec.edges {
            if edge.length <= 0.0 || !edge.length.is_finite() {
                return Err(VoltError::simulation(
                    "network",
                    format!("edge '{}' has invalid length {}", edge.id, edge.length),
                ));
            }
            edges.insert(edge.id.clone(), edge.clone());
        }
        for edge in &spec.edges {
            if let Some(unknown) = edge.next.iter().find(|n| !edges.contains_key(*n)) {
                return Err(VoltError::simulation(
                    "network",
                    format!("edge '{}' leads to unknown edge '{unknown}'", edge.id),
                ));
            }
        }
        if spec.vehicle.route.is_empty() {
            return Err(VoltError::simulation("network", "vehicle route is empty"));
        }
        let sim = Self {
            edges,
            time: 0.0,
            departed: false,
            vehicle: None,
            closed: false,
            spec,
        };
        sim.check_connected(&sim.spec.vehicle.route)?;
        Ok(sim)
    }

    fn check_open(&self, call: &str) -> Result<(), VoltError> {
        if self.closed {
            Err(VoltError::simulation(call, "simulation is closed"))
        } else {
            Ok(())
        }
    }

    fn edge_spec(&self, id: &str) -> Result<&EdgeSpec, VoltError> {
        self.edges
            .get(id)
            .ok_or_else(|| VoltError::simulation("edge", format!("unknown edge '{id}'")))
    }

    fn check_connected(&self, route: &[EdgeId]) -> Result<(), VoltError> {
        for id in route {
            self.edge_spec(id)?;
        }
        for pair in route.windows(2) {
            if !self.edges[&pair[0]].next.contains(&pair[1]) {
                return Err(VoltError::simulation(
                    "route",
                    format!("edge '{}' does not lead to '{}'", pair[0], pair[1]),
                ));
            }
        }
        Ok(())
    }

    fn running(&self, vehicle: &str) -> Result<&RunningVehicle, VoltError> {
        self.check_open("vehicle")?;
        match &self.vehicle {
            Some(v) if vehicle == self.spec.vehicle.id => Ok(v),
            _ => Err(VoltError::simulation(
                "vehicle",
                format!("vehicle '{vehicle}' is not in the simulation"),
            )),
        }
    }

    fn running_mut(&mut self, vehicle: &str) -> Result<&mut RunningVehicle, VoltError> {
        self.running(vehicle)?;
        self.vehicle
            .as_mut()
            .ok_or_else(|| VoltError::simulation("vehicle", "vehicle vanished"))
    }

    /// Advance the running vehicle by one step.  Returns `false` when it
    /// reached the end of its route and left the network.
    fn advance(&mut self, dt: f64) -> bool {
        let spec = &self.spec.vehicle;
        let is_charger = |edge: &EdgeId| self.spec.charging_edges.contains(edge);
        let Some(v) = self.vehicle.as_mut() else {
            return false;
        };

        if v.is_halted() {
            if is_charger(v.edge()) {
                v.charge = (v.charge + spec.charge_power * dt).min(spec.battery_capacity);
            }
            let release = v
                .stop
                .as_ref()
                .and_then(|s| s.release_at)
                .is_some_and(|at| self.time >= at);
            if release {
                debug!(edge = %v.edge(), "stop duration elapsed");
                v.stop = None;
            }
            return true;
        }

        let mut remaining = spec.speed * dt;
        loop {
            let current = &v.route[v.route_index];
            let edge_length = self.edges[current].length;
            if let Some(stop) = v.stop.as_mut()
                && stop.edge == *current
                && v.position <= stop.position
                && v.position + remaining >= stop.position
            {
                let travelled = stop.position - v.position;
                v.charge = (v.charge - spec.consumption_per_meter * travelled).max(0.0);
                v.position = stop.position;
                stop.release_at = Some(self.time + stop.duration);
                debug!(edge = %stop.edge, position = stop.position, "vehicle halted");
                return true;
            }
            if v.position + remaining < edge_length {
                v.position += remaining;
                v.charge = (v.charge - spec.consumption_per_meter * remaining).max(0.0);
                return true;
            }
            let travelled = edge_length - v.position;
            v.charge = (v.charge - spec.consumption_per_meter * travelled).max(0.0);
            remaining -= travelled;
            if v.route_index + 1 >= v.route.len() {
                return false;
            }
            v.route_index += 1;
            v.position = 0.0;
        }
    }
}

impl SimEnvironment for NetworkSim {
    fn simulation_step(&mut self) -> Result<(), VoltError> {
        self.check_open("simulation_step")?;
        let dt = self.spec.step_length;
        self.time += dt;

        if !self.departed {
            if self.time >= self.spec.vehicle.depart {
                self.departed = true;
                self.vehicle = Some(RunningVehicle {
                    route: self.spec.vehicle.route.clone(),
                    route_index: 0,
                    position: 0.0,
                    charge: self
                        .spec
                        .vehicle
                        .initial_charge
                        .min(self.spec.vehicle.battery_capacity),
                    stop: None,
                });
                info!(vehicle = %self.spec.vehicle.id, time = self.time, "vehicle departed");
            }
            return Ok(());
        }

        if self.vehicle.is_some() && !self.advance(dt) {
            self.vehicle = None;
            info!(vehicle = %self.spec.vehicle.id, time = self.time, "vehicle arrived");
        }
        Ok(())
    }

    fn time(&mut self) -> Result<f64, VoltError> {
        self.check_open("time")?;
        Ok(self.time)
    }

    fn min_expected_number(&mut self) -> Result<usize, VoltError> {
        self.check_open("min_expected_number")?;
        Ok(usize::from(!self.departed || self.vehicle.is_some()))
    }

    fn vehicle_exists(&mut self, vehicle: &str) -> Result<bool, VoltError> {
        self.check_open("vehicle_exists")?;
        Ok(self.vehicle.is_some() && vehicle == self.spec.vehicle.id)
    }

    fn parameter(&mut self, vehicle: &str, key: &str) -> Result<String, VoltError> {
        let charge = self.running(vehicle)?.charge;
        match key {
            ACTUAL_BATTERY_CAPACITY => Ok(charge.to_string()),
            MAXIMUM_BATTERY_CAPACITY => Ok(self.spec.vehicle.battery_capacity.to_string()),
            other => Err(VoltError::simulation(
                "parameter",
                format!("unknown parameter '{other}'"),
            )),
        }
    }

    fn road_id(&mut self, vehicle: &str) -> Result<EdgeId, VoltError> {
        Ok(self.running(vehicle)?.edge().clone())
    }

    fn lane_id(&mut self, vehicle: &str) -> Result<String, VoltError> {
        Ok(format!("{}_0", self.running(vehicle)?.edge()))
    }

    fn lane_position(&mut self, vehicle: &str) -> Result<f64, VoltError> {
        Ok(self.running(vehicle)?.position)
    }

    fn lane_length(&mut self, lane: &str) -> Result<f64, VoltError> {
        self.check_open("lane_length")?;
        let edge = lane
            .rsplit_once('_')
            .map_or(lane, |(edge, _)| edge);
        self.edges
            .get(edge)
            .map(|e| e.length)
            .ok_or_else(|| VoltError::simulation("lane_length", format!("unknown lane '{lane}'")))
    }

    fn is_stopped(&mut self, vehicle: &str) -> Result<bool, VoltError> {
        Ok(self.running(vehicle)?.is_halted())
    }

    fn route(&mut self, vehicle: &str) -> Result<Vec<EdgeId>, VoltError> {
        Ok(self.running(vehicle)?.route.clone())
    }

    fn find_route(&mut self, from: &str, to: &str) -> Result<Route, VoltError> {
        self.check_open("find_route")?;
        self.edge_spec(from)?;
        self.edge_spec(to)?;
        shortest_path(&self.edges, from, to).ok_or_else(|| VoltError::NoRouteFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    fn set_route(&mut self, vehicle: &str, edges: &[EdgeId]) -> Result<(), VoltError> {
        let current = self.running(vehicle)?.edge().clone();
        if edges.first() != Some(&current) {
            return Err(VoltError::simulation(
                "set_route",
                format!("route must start at current edge '{current}'"),
            ));
        }
        self.check_connected(edges)?;
        let v = self.running_mut(vehicle)?;
        v.route = edges.to_vec();
        v.route_index = 0;
        Ok(())
    }

    fn set_stop(
        &mut self,
        vehicle: &str,
        edge: &str,
        position: f64,
        duration: f64,
    ) -> Result<(), VoltError> {
        let length = self.edge_spec(edge)?.length;
        if !(0.0..=length).contains(&position) {
            return Err(VoltError::simulation(
                "set_stop",
                format!("position {position} outside edge '{edge}' of length {length}"),
            ));
        }
        let v = self.running_mut(vehicle)?;
        let ahead = &v.route[v.route_index..];
        if !ahead.iter().any(|e| e == edge) {
            return Err(VoltError::simulation(
                "set_stop",
                format!("edge '{edge}' is not on the remaining route"),
            ));
        }
        if v.edge() == edge && v.position > position {
            return Err(VoltError::simulation(
                "set_stop",
                format!("vehicle already passed position {position} on '{edge}'"),
            ));
        }
        v.stop = Some(PendingStop {
            edge: edge.to_string(),
            position,
            duration,
            release_at: None,
        });
        Ok(())
    }

    fn resume(&mut self, vehicle: &str) -> Result<(), VoltError> {
        let v = self.running_mut(vehicle)?;
        if !v.is_halted() {
            return Err(VoltError::simulation("resume", "vehicle is not stopped"));
        }
        v.stop = None;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VoltError> {
        self.closed = true;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dijkstra
// ─────────────────────────────────────────────────────────────────────────────

#[derive(PartialEq)]
struct Candidate {
    cost: f64,
    edge: EdgeId,
}

impl Eq for Candidate {}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap behaviour.
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

fn shortest_path(edges: &HashMap<EdgeId, EdgeSpec>, from: &str, to: &str) -> Option<Route> {
    let start = edges.get(from)?;
    let mut best: HashMap<&str, f64> = HashMap::from([(from, start.length)]);
    let mut parent: HashMap<&str, &str> = HashMap::new();
    let mut heap = BinaryHeap::from([Candidate {
        cost: start.length,
        edge: from.to_string(),
    }]);

    while let Some(Candidate { cost, edge }) = heap.pop() {
        if edge == to {
            let mut path = vec![edge.clone()];
            let mut cursor = edge.as_str();
            while let Some(prev) = parent.get(cursor) {
                path.push(prev.to_string());
                cursor = *prev;
            }
            path.reverse();
            return Some(Route { edges: path, length: cost });
        }
        let (id, spec) = edges.get_key_value(edge.as_str())?;
        if best.get(id.as_str()).is_some_and(|&b| cost > b) {
            continue;
        }
        for next in &spec.next {
            let Some((next_id, next_spec)) = edges.get_key_value(next.as_str()) else {
                continue;
            };
            let next_cost = cost + next_spec.length;
            if best.get(next_id.as_str()).is_none_or(|&b| next_cost < b) {
                best.insert(next_id.as_str(), next_cost);
                parent.insert(next_id.as_str(), id.as_str());
                heap.push(Candidate {
                    cost: next_cost,
                    edge: next_id.clone(),
                });
            }
        }
    }
    None
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
