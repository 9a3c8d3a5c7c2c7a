//! `voltpilot-runtime` – The Battery Monitor Loop
//!
//! Drives a stepped traffic simulation, watches one electric vehicle's
//! battery and sends it to charge when it runs low.
//!
//! # Modules
//!
//! - [`controller`] – [`VehicleController`][controller::VehicleController]:
//!   the Driving → Rerouted → ArrivedAtCharger → Charging → Driving state
//!   machine.  Consults [`ChargerSelector`][voltpilot_kernel::ChargerSelector]
//!   and [`compute_stop_offset`][voltpilot_kernel::compute_stop_offset] and
//!   issues at most one [`VehicleCommand`][voltpilot_types::VehicleCommand]
//!   per step.
//! - [`recorder`] – [`BatteryRecorder`][recorder::BatteryRecorder]: the
//!   (time, battery %) series handed to the caller after the run.
//! - [`run_loop`] – [`RunLoop`][run_loop::RunLoop]: vehicle acquisition, the
//!   per-step telemetry loop and environment shutdown.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: global
//!   `tracing` subscriber with an optional OTLP span exporter.

pub mod controller;
pub mod recorder;
pub mod run_loop;
pub mod telemetry;

pub use controller::{
    ChargePhase, ControllerConfig, ResumePolicy, StepReport, VehicleController, VehicleState,
};
pub use recorder::BatteryRecorder;
pub use run_loop::{EndReason, RunLoop, RunSummary, read_telemetry};
pub use telemetry::{TracerProviderGuard, init_tracing};
