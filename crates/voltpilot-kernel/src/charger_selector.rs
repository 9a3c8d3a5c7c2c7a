//! [`ChargerSelector`] – picks the nearest reachable charging station.
//!
//! "Nearest" means shortest route length as reported by the simulator's
//! routing oracle, not straight-line distance.  Chargers that cannot be
//! reached from the current edge are skipped.

use tracing::debug;
use voltpilot_sim::SimEnvironment;
use voltpilot_types::{Charger, Route};

use crate::route_oracle::find_route;

/// The charger chosen by [`ChargerSelector::select_nearest`] together with
/// the route that reaches it.
#[derive(Debug, Clone, PartialEq)]
pub struct NearestCharger {
    pub charger: Charger,
    pub route: Route,
}

/// Holds the fixed set of candidate chargers configured at startup.
///
/// # Example
///
/// ```
/// use voltpilot_kernel::ChargerSelector;
/// use voltpilot_sim::ScriptedSim;
/// use voltpilot_types::{Charger, Route};
///
/// let selector = ChargerSelector::new(vec![Charger::new("2i"), Charger::new("3o")]);
/// let mut sim = ScriptedSim::builder("ev1")
///     .with_route("1i", "2i", Route::new(["1i", "2i"], 300.0))
///     .with_route("1i", "3o", Route::new(["1i", "3o"], 150.0))
///     .build();
///
/// let nearest = selector.select_nearest(&mut sim, "1i").unwrap();
/// assert_eq!(nearest.charger, Charger::new("3o"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct ChargerSelector {
    chargers: Vec<Charger>,
}

impl ChargerSelector {
    pub fn new(chargers: Vec<Charger>) -> Self {
        Self { chargers }
    }

    /// The configured candidates, in evaluation order.
    pub fn chargers(&self) -> &[Charger] {
        &self.chargers
    }

    /// Return the reachable charger with the strictly smallest route length
    /// from `current_edge`.
    ///
    /// Candidates are evaluated in configuration order; on equal lengths the
    /// first one wins.  Returns `None` when no candidate is reachable.
    pub fn select_nearest(
        &self,
        env: &mut dyn SimEnvironment,
        current_edge: &str,
    ) -> Option<NearestCharger> {
        let mut best: Option<NearestCharger> = None;
        for charger in &self.chargers {
            let route = match find_route(env, current_edge, &charger.edge) {
                Ok(route) => route,
                Err(e) => {
                    debug!(charger = %charger, error = %e, "charger unreachable; skipping");
                    continue;
                }
            };
            if best.as_ref().is_none_or(|b| route.length < b.route.length) {
                best = Some(NearestCharger {
                    charger: charger.clone(),
                    route,
                });
            }
        }
        best
    }
}
