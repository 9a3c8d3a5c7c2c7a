//! Generic `SimEnvironment` trait: the boundary between VoltPilot and the
//! traffic simulator that owns the clock, the road network and the vehicles.
//!
//! The controller only ever talks to this trait, so a TraCI client, the
//! in-process [`NetworkSim`][crate::network::NetworkSim] and the test-only
//! [`ScriptedSim`][crate::scripted::ScriptedSim] can be swapped without
//! touching decision logic.
//!
//! Every call is blocking: it completes before the next one is issued.

use voltpilot_types::{EdgeId, Route, VoltError};

/// Vehicle parameter holding the current battery energy.
pub const ACTUAL_BATTERY_CAPACITY: &str = "device.battery.actualBatteryCapacity";

/// Vehicle parameter holding the maximum battery energy.
pub const MAXIMUM_BATTERY_CAPACITY: &str = "device.battery.maximumBatteryCapacity";

/// A stepped traffic simulation hosting the monitored vehicle.
///
/// Implementations report failures as [`VoltError::Simulation`], except
/// [`find_route`][Self::find_route] which reports a missing path as
/// [`VoltError::NoRouteFound`].
pub trait SimEnvironment {
    /// Advance the simulation by one step.
    fn simulation_step(&mut self) -> Result<(), VoltError>;

    /// Current simulation time in seconds.
    fn time(&mut self) -> Result<f64, VoltError>;

    /// Number of vehicles that are running or still waiting to depart.
    /// Zero means the simulation has nothing left to do.
    fn min_expected_number(&mut self) -> Result<usize, VoltError>;

    fn vehicle_exists(&mut self, vehicle: &str) -> Result<bool, VoltError>;

    /// Read a string-valued vehicle parameter such as
    /// [`ACTUAL_BATTERY_CAPACITY`].
    fn parameter(&mut self, vehicle: &str, key: &str) -> Result<String, VoltError>;

    /// Edge the vehicle currently occupies.
    fn road_id(&mut self, vehicle: &str) -> Result<EdgeId, VoltError>;

    /// Lane the vehicle currently occupies.
    fn lane_id(&mut self, vehicle: &str) -> Result<String, VoltError>;

    /// Offset of the vehicle from the start of its lane.
    fn lane_position(&mut self, vehicle: &str) -> Result<f64, VoltError>;

    fn lane_length(&mut self, lane: &str) -> Result<f64, VoltError>;

    /// `true` while the vehicle is halted at a stop.
    fn is_stopped(&mut self, vehicle: &str) -> Result<bool, VoltError>;

    /// The vehicle's current route.
    fn route(&mut self, vehicle: &str) -> Result<Vec<EdgeId>, VoltError>;

    /// Ask the simulator's routing oracle for a path between two edges.
    fn find_route(&mut self, from: &str, to: &str) -> Result<Route, VoltError>;

    fn set_route(&mut self, vehicle: &str, edges: &[EdgeId]) -> Result<(), VoltError>;

    /// Schedule a stop on `edge` at lane offset `position` lasting `duration`
    /// seconds once reached.
    fn set_stop(
        &mut self,
        vehicle: &str,
        edge: &str,
        position: f64,
        duration: f64,
    ) -> Result<(), VoltError>;

    /// Release the vehicle from its current stop.
    fn resume(&mut self, vehicle: &str) -> Result<(), VoltError>;

    /// Shut the simulation down.  No further calls are valid afterwards.
    fn close(&mut self) -> Result<(), VoltError>;

    /// Battery charge of `vehicle` in percent of its maximum capacity.
    ///
    /// # Errors
    ///
    /// Returns [`VoltError::InvalidParameter`] when either battery parameter
    /// is not a number or the maximum capacity is not positive.
    fn battery_percent(&mut self, vehicle: &str) -> Result<f64, VoltError> {
        let actual = parse_parameter(
            ACTUAL_BATTERY_CAPACITY,
            &self.parameter(vehicle, ACTUAL_BATTERY_CAPACITY)?,
        )?;
        let maximum = parse_parameter(
            MAXIMUM_BATTERY_CAPACITY,
            &self.parameter(vehicle, MAXIMUM_BATTERY_CAPACITY)?,
        )?;
        if maximum <= 0.0 {
            return Err(VoltError::InvalidParameter {
                key: MAXIMUM_BATTERY_CAPACITY.to_string(),
                value: maximum.to_string(),
            });
        }
        Ok(100.0 * actual / maximum)
    }
}

fn parse_parameter(key: &str, raw: &str) -> Result<f64, VoltError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| VoltError::InvalidParameter {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_parameter_accepts_padded_numbers() {
        assert!((parse_parameter("k", " 480.5 ").unwrap() - 480.5).abs() < f64::EPSILON);
    }

    #[test]
    fn parse_parameter_rejects_garbage() {
        assert!(matches!(
            parse_parameter("k", "n/a"),
            Err(VoltError::InvalidParameter { ref value, .. }) if value == "n/a"
        ));
        assert!(parse_parameter("k", "NaN").is_err());
    }
}
