//! `voltpilot-sim` – The Simulation Boundary
//!
//! Everything VoltPilot knows about the traffic simulator goes through the
//! [`SimEnvironment`] trait.  Decision logic never touches vehicle physics,
//! lane geometry or pathfinding directly.
//!
//! # Modules
//!
//! - [`environment`] – [`SimEnvironment`]: the blocking query/command
//!   interface of a stepped traffic simulation, plus battery parameter keys.
//! - [`dispatch`] – [`dispatch()`]: translates a
//!   [`VehicleCommand`][voltpilot_types::VehicleCommand] into environment
//!   calls.
//! - [`scripted`] – [`ScriptedSim`]: frame-scripted double that records every
//!   command, for tests and CI.
//! - [`network`] – [`NetworkSim`]: a small single-vehicle road network with
//!   Dijkstra routing, used to run the stack headless.

pub mod dispatch;
pub mod environment;
pub mod network;
pub mod scripted;

pub use dispatch::dispatch;
pub use environment::{ACTUAL_BATTERY_CAPACITY, MAXIMUM_BATTERY_CAPACITY, SimEnvironment};
pub use network::{EdgeSpec, NetworkSim, NetworkSpec, VehicleSpec};
pub use scripted::{Frame, ScriptedSim, ScriptedSimBuilder, SimCall};
