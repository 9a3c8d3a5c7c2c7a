//! Route oracle adapter – typed wrapper over
//! [`SimEnvironment::find_route`].
//!
//! The simulator signals a failed route query in several ways: an explicit
//! "no route" error, an empty edge list, or a generic failure of the call
//! itself.  [`find_route`] folds these into a [`RouteQueryError`] that keeps
//! "no path exists" apart from "the query broke", so callers can log and
//! test each path.  Neither case is retried.

use thiserror::Error;
use tracing::trace;
use voltpilot_sim::SimEnvironment;
use voltpilot_types::{EdgeId, Route, VoltError};

/// Why a route query produced no usable route.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RouteQueryError {
    /// The simulator knows no feasible path between the two edges.
    #[error("no route from {from} to {to}")]
    NoRoute { from: EdgeId, to: EdgeId },

    /// The query itself failed (unknown edge, disconnected topology, …).
    #[error("route query {from} -> {to} failed: {details}")]
    Failed {
        from: EdgeId,
        to: EdgeId,
        details: String,
    },
}

/// Query the simulator for a route from `from` to `to`.
///
/// On success the route is non-empty and its length is finite and
/// non-negative.
///
/// # Example
///
/// ```
/// use voltpilot_kernel::route_oracle::{find_route, RouteQueryError};
/// use voltpilot_sim::ScriptedSim;
/// use voltpilot_types::Route;
///
/// let mut sim = ScriptedSim::builder("ev1")
///     .with_route("2i", "3o", Route::new(["2i", "2o", "3o"], 120.0))
///     .build();
///
/// assert_eq!(find_route(&mut sim, "2i", "3o").unwrap().edges.len(), 3);
/// assert!(matches!(
///     find_route(&mut sim, "3o", "2i"),
///     Err(RouteQueryError::NoRoute { .. })
/// ));
/// ```
pub fn find_route(
    env: &mut dyn SimEnvironment,
    from: &str,
    to: &str,
) -> Result<Route, RouteQueryError> {
    let result = match env.find_route(from, to) {
        Ok(route) if route.edges.is_empty() => Err(RouteQueryError::NoRoute {
            from: from.to_string(),
            to: to.to_string(),
        }),
        Ok(route) if !(route.length.is_finite() && route.length >= 0.0) => {
            Err(RouteQueryError::Failed {
                from: from.to_string(),
                to: to.to_string(),
                details: format!("invalid route length {}", route.length),
            })
        }
        Ok(route) => Ok(route),
        Err(VoltError::NoRouteFound { .. }) => Err(RouteQueryError::NoRoute {
            from: from.to_string(),
            to: to.to_string(),
        }),
        Err(e) => Err(RouteQueryError::Failed {
            from: from.to_string(),
            to: to.to_string(),
            details: e.to_string(),
        }),
    };
    trace!(from, to, ok = result.is_ok(), "route query");
    result
}
