//! `voltpilot-kernel` – Routing & Safety Primitives
//!
//! The pure decision helpers the vehicle controller consults when one of its
//! guards fires.  Nothing here holds state across simulation steps.
//!
//! # Modules
//!
//! - [`route_oracle`] – [`find_route`][route_oracle::find_route]: typed
//!   wrapper over the simulator's route query that separates "no route" from
//!   "query failed".
//! - [`charger_selector`] – [`ChargerSelector`][charger_selector::ChargerSelector]:
//!   picks the reachable charger with the shortest route.
//! - [`stop_placement`] – [`compute_stop_offset`][stop_placement::compute_stop_offset]:
//!   safe in-lane stop offset, or [`UnsafeStop`][stop_placement::UnsafeStop]
//!   when the lane ahead is too short.

pub mod charger_selector;
pub mod route_oracle;
pub mod stop_placement;

pub use charger_selector::{ChargerSelector, NearestCharger};
pub use route_oracle::{RouteQueryError, find_route};
pub use stop_placement::{UnsafeStop, compute_stop_offset};
