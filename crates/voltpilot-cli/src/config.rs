//! Run configuration – reads `./voltpilot.toml` (or the path given on the
//! command line) and applies `VOLTPILOT_*` environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use voltpilot_runtime::ControllerConfig;
use voltpilot_sim::NetworkSpec;

/// Config file used when no path is given on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "voltpilot.toml";

/// Everything a `voltpilot` run needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Battery monitor settings.
    #[serde(default)]
    pub controller: ControllerConfig,

    /// Road network simulated in-process.
    #[serde(default)]
    pub network: NetworkSpec,

    /// Where to write the run summary (including the battery series) as
    /// JSON.  Nothing is written when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_path: Option<PathBuf>,
}

/// Resolve the config path from the first command-line argument.
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load the config at `path`, falling back to defaults when the file does
/// not exist.  Environment overrides are applied in both cases and the
/// result is validated again.
pub fn load(path: &Path) -> Result<Config, String> {
    let mut cfg = load_from(path)?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    validate(&cfg)?;
    Ok(cfg)
}

/// Parse the config at `path`.  Returns `None` if the file does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    validate(&cfg)?;
    Ok(Some(cfg))
}

fn validate(cfg: &Config) -> Result<(), String> {
    let c = &cfg.controller;
    if !(0.0..=100.0).contains(&c.battery_threshold) {
        return Err(format!(
            "battery_threshold must be within 0..=100, got {}",
            c.battery_threshold
        ));
    }
    if !(c.battery_threshold..=100.0).contains(&c.full_charge_percent) {
        return Err(format!(
            "full_charge_percent must be within battery_threshold..=100, got {}",
            c.full_charge_percent
        ));
    }
    if !c.stop_duration.is_finite() || c.stop_duration <= 0.0 {
        return Err(format!("stop_duration must be positive, got {}", c.stop_duration));
    }
    Ok(())
}

/// Apply `VOLTPILOT_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `VOLTPILOT_VEHICLE_ID` | `controller.vehicle_id` |
/// | `VOLTPILOT_BATTERY_THRESHOLD` | `controller.battery_threshold` |
/// | `VOLTPILOT_CHARGERS` | `controller.chargers` (comma-separated) |
///
/// Unparseable numbers are ignored.
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("VOLTPILOT_VEHICLE_ID") {
        cfg.controller.vehicle_id = v;
    }
    if let Ok(v) = std::env::var("VOLTPILOT_BATTERY_THRESHOLD")
        && let Ok(threshold) = v.trim().parse::<f64>()
        && (0.0..=100.0).contains(&threshold)
    {
        cfg.controller.battery_threshold = threshold;
    }
    if let Ok(v) = std::env::var("VOLTPILOT_CHARGERS") {
        cfg.controller.chargers = v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
    }
}
