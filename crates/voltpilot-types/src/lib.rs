use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a directed road segment (a simulation "edge"), e.g. `"2i"`.
pub type EdgeId = String;

/// Duration handed to the simulator for a charging stop that should last
/// until the controller explicitly resumes the vehicle.
pub const INDEFINITE_STOP_DURATION: f64 = 9999.0;

/// A charging station, identified by the edge it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Charger {
    pub edge: EdgeId,
}

impl Charger {
    pub fn new(edge: impl Into<EdgeId>) -> Self {
        Self { edge: edge.into() }
    }
}

impl std::fmt::Display for Charger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.edge)
    }
}

/// A route returned by the simulator's routing oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered edge sequence, starting at the query origin.
    pub edges: Vec<EdgeId>,
    /// Total route length in simulation distance units.
    pub length: f64,
}

impl Route {
    pub fn new<I, S>(edges: I, length: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EdgeId>,
    {
        Self {
            edges: edges.into_iter().map(Into::into).collect(),
            length,
        }
    }

    /// `true` when the route has at most one edge, i.e. the vehicle is
    /// already effectively at the destination.
    pub fn is_degenerate(&self) -> bool {
        self.edges.len() <= 1
    }

    /// Last edge of the route, if any.
    pub fn destination(&self) -> Option<&EdgeId> {
        self.edges.last()
    }
}

/// One (time, battery %) point of the recorded time series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatterySample {
    /// Simulation time in seconds.
    pub time: f64,
    /// Battery charge in percent, 0–100.
    pub percent: f64,
}

/// Vehicle telemetry read once per simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleTelemetry {
    pub time: f64,
    pub battery_percent: f64,
    /// Edge the vehicle currently occupies.
    pub road_id: EdgeId,
}

impl VehicleTelemetry {
    pub fn sample(&self) -> BatterySample {
        BatterySample {
            time: self.time,
            percent: self.battery_percent,
        }
    }
}

/// Commands the controller sends to the simulation environment.
///
/// At most one command is issued per simulation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", content = "payload")]
pub enum VehicleCommand {
    /// Replace the vehicle's route, diverting it to a charger.
    Reroute { edges: Vec<EdgeId> },
    /// Halt the vehicle on `edge` at lane offset `position` for `duration`
    /// seconds.
    Stop {
        edge: EdgeId,
        position: f64,
        duration: f64,
    },
    /// Install a route back to the original destination and release the
    /// vehicle from its stop.
    Resume { edges: Vec<EdgeId> },
}

impl VehicleCommand {
    /// Short label used in log fields.
    pub fn category(&self) -> &'static str {
        match self {
            VehicleCommand::Reroute { .. } => "reroute",
            VehicleCommand::Stop { .. } => "stop",
            VehicleCommand::Resume { .. } => "resume",
        }
    }
}

/// Error type shared by every VoltPilot crate.
///
/// The first four variants are recoverable controller faults: they are
/// logged and folded into the step report.  `Simulation` and
/// `InvalidParameter` come from the environment boundary and end the run.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VoltError {
    #[error("No route from {from} to {to}")]
    NoRouteFound { from: EdgeId, to: EdgeId },

    #[error("Degenerate route to charger {charger}: {edges} edge(s)")]
    DegenerateRoute { charger: EdgeId, edges: usize },

    #[error("Unsafe stop position on lane {lane}: {remaining:.2} remaining, {required:.2} required")]
    UnsafeStopPosition {
        lane: String,
        remaining: f64,
        required: f64,
    },

    #[error("Cannot resume: no route from {from} to {to}")]
    ResumeRouteFailure { from: EdgeId, to: EdgeId },

    #[error("Simulation call {call} failed: {details}")]
    Simulation { call: String, details: String },

    #[error("Invalid parameter {key}: {value}")]
    InvalidParameter { key: String, value: String },
}

impl VoltError {
    /// Shorthand for a [`VoltError::Simulation`] error.
    pub fn simulation(call: impl Into<String>, details: impl Into<String>) -> Self {
        VoltError::Simulation {
            call: call.into(),
            details: details.into(),
        }
    }

    /// `true` for faults the controller recovers from on its own.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            VoltError::Simulation { .. } | VoltError::InvalidParameter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_command_serializes_with_tag() {
        let cmd = VehicleCommand::Stop {
            edge: "3o".to_string(),
            position: 7.0,
            duration: INDEFINITE_STOP_DURATION,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        assert!(json.contains(r#""command":"Stop""#));
        let back: VehicleCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }

    #[test]
    fn command_categories() {
        assert_eq!(VehicleCommand::Reroute { edges: vec![] }.category(), "reroute");
        assert_eq!(VehicleCommand::Resume { edges: vec![] }.category(), "resume");
    }

    #[test]
    fn single_edge_route_is_degenerate() {
        assert!(Route::new(["2i"], 200.0).is_degenerate());
        assert!(Route::new(Vec::<String>::new(), 0.0).is_degenerate());
        assert!(!Route::new(["2i", "2o", "3o"], 120.0).is_degenerate());
    }

    #[test]
    fn route_destination_is_last_edge() {
        let route = Route::new(["1i", "2o", "4o"], 300.0);
        assert_eq!(route.destination().map(String::as_str), Some("4o"));
    }

    #[test]
    fn telemetry_sample_copies_time_and_percent() {
        let t = VehicleTelemetry {
            time: 12.0,
            battery_percent: 48.5,
            road_id: "2i".into(),
        };
        assert_eq!(
            t.sample(),
            BatterySample {
                time: 12.0,
                percent: 48.5
            }
        );
    }

    #[test]
    fn volt_error_display() {
        let err = VoltError::ResumeRouteFailure {
            from: "3o".into(),
            to: "4o".into(),
        };
        assert!(err.to_string().contains("Cannot resume"));

        let err2 = VoltError::UnsafeStopPosition {
            lane: "3o_0".into(),
            remaining: 2.0,
            required: 3.0,
        };
        assert!(err2.to_string().contains("3o_0"));
    }

    #[test]
    fn environment_errors_are_not_recoverable() {
        assert!(!VoltError::simulation("lane_length", "unknown lane").is_recoverable());
        assert!(
            VoltError::DegenerateRoute {
                charger: "2i".into(),
                edges: 1
            }
            .is_recoverable()
        );
    }
}
