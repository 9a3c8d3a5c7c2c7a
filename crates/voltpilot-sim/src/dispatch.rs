//! Translate a [`VehicleCommand`] into calls on a [`SimEnvironment`].
//!
//! | Command | Environment calls |
//! |---|---|
//! | `Reroute { edges }` | `set_route` |
//! | `Stop { edge, position, duration }` | `set_stop` |
//! | `Resume { edges }` | `set_route`, then `resume` |

use tracing::debug;
use voltpilot_types::{VehicleCommand, VoltError};

use crate::environment::SimEnvironment;

/// Apply `command` to `vehicle`.
///
/// # Errors
///
/// Propagates the first failing environment call.  For `Resume` a failed
/// `set_route` means `resume` is never called.
pub fn dispatch(
    env: &mut dyn SimEnvironment,
    vehicle: &str,
    command: &VehicleCommand,
) -> Result<(), VoltError> {
    debug!(vehicle, command = command.category(), "dispatching command");
    match command {
        VehicleCommand::Reroute { edges } => env.set_route(vehicle, edges),
        VehicleCommand::Stop {
            edge,
            position,
            duration,
        } => env.set_stop(vehicle, edge, *position, *duration),
        VehicleCommand::Resume { edges } => {
            env.set_route(vehicle, edges)?;
            env.resume(vehicle)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::{Frame, ScriptedSim, SimCall};

    fn sim() -> ScriptedSim {
        let mut sim = ScriptedSim::builder("ev1")
            .with_frames([Frame::driving(1.0, 80.0, "1i", 3.0)])
            .build();
        sim.simulation_step().unwrap();
        sim
    }

    #[test]
    fn resume_sets_route_before_releasing() {
        let mut sim = sim();
        dispatch(
            &mut sim,
            "ev1",
            &VehicleCommand::Resume {
                edges: vec!["3o".into(), "4o".into()],
            },
        )
        .unwrap();
        assert_eq!(
            sim.calls(),
            &[
                SimCall::SetRoute(vec!["3o".into(), "4o".into()]),
                SimCall::Resume
            ]
        );
    }

    #[test]
    fn stop_forwards_offset_and_duration() {
        let mut sim = sim();
        dispatch(
            &mut sim,
            "ev1",
            &VehicleCommand::Stop {
                edge: "3o".into(),
                position: 7.0,
                duration: 9999.0,
            },
        )
        .unwrap();
        assert_eq!(
            sim.calls(),
            &[SimCall::SetStop {
                edge: "3o".into(),
                position: 7.0,
                duration: 9999.0
            }]
        );
    }

    #[test]
    fn unknown_vehicle_is_rejected() {
        let mut sim = sim();
        let result = dispatch(&mut sim, "ghost", &VehicleCommand::Reroute { edges: vec![] });
        assert!(matches!(result, Err(VoltError::Simulation { .. })));
        assert!(sim.calls().is_empty());
    }
}
