//! `voltpilot-cli` – VoltPilot Command Line Interface
//!
//! Runs one monitored trip on the in-process road network:
//!
//! 1. Initialises tracing (`RUST_LOG`, `VOLTPILOT_LOG_FORMAT`,
//!    `OTEL_EXPORTER_OTLP_ENDPOINT`).
//! 2. Loads `./voltpilot.toml`, or the file given as the first argument.
//! 3. Builds a [`NetworkSim`] and drives it with the battery monitor until
//!    the vehicle leaves or the simulation ends.
//! 4. Prints a summary of the battery series and optionally writes it as
//!    JSON.

mod config;
mod summary;

use colored::Colorize;
use std::process::ExitCode;
use tracing::{error, warn};

use voltpilot_runtime::{RunLoop, init_tracing};
use voltpilot_sim::NetworkSim;

fn main() -> ExitCode {
    let _guard = init_tracing("voltpilot");

    print_banner();

    let path = config::config_path(std::env::args().nth(1));
    let cfg = match config::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };
    if path.exists() {
        println!("  Config loaded from {}", path.display().to_string().bold());
    } else {
        println!(
            "  No config at {}; using the demo network.",
            path.display().to_string().dimmed()
        );
    }

    if cfg.network.vehicle.id != cfg.controller.vehicle_id {
        warn!(
            network = %cfg.network.vehicle.id,
            controller = %cfg.controller.vehicle_id,
            "monitored vehicle is not the one the network spawns"
        );
    }

    let mut sim = match NetworkSim::new(cfg.network.clone()) {
        Ok(sim) => sim,
        Err(e) => {
            println!("{}: {}", "Network error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "  Monitoring {} (threshold {} %, chargers {})\n",
        cfg.controller.vehicle_id.bold(),
        cfg.controller.battery_threshold,
        cfg.controller.chargers.join(", ").bold()
    );

    let run = RunLoop::new(cfg.controller.clone()).run(&mut sim);
    let summary = match run {
        Ok(summary) => summary,
        Err(e) => {
            error!(error = %e, "run aborted");
            println!("{}: {}", "Run aborted".red(), e);
            return ExitCode::FAILURE;
        }
    };

    summary::print(&summary, cfg.controller.battery_threshold);

    if let Some(out) = &cfg.summary_path {
        match summary::write_json(&summary, out) {
            Ok(()) => println!(
                "  {} Summary written to {}\n",
                "✓".green().bold(),
                out.display().to_string().bold()
            ),
            Err(e) => {
                println!("{}: {}", "Error writing summary".red(), e);
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"  _   __     ____  ___  _ __     __ "#.bold().cyan());
    println!("{}", r#" | | / /__  / / /_/ _ \(_) /__  / /_"#.bold().cyan());
    println!("{}", r#" | |/ / _ \/ / __/ ___/ / / _ \/ __/"#.bold().cyan());
    println!("{}", r#" |___/\___/_/\__/_/  /_/_/\___/\__/ "#.bold().cyan());
    println!();
    println!("  {}", "EV battery monitor".dimmed());
    println!();
}
