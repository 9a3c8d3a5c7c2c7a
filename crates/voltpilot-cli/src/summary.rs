//! Terminal rendering of a finished run.

use colored::Colorize;
use std::fs;
use std::path::Path;

use voltpilot_runtime::{EndReason, RunSummary};
use voltpilot_types::BatterySample;

const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Columns used for the battery sparkline.
pub const SPARKLINE_WIDTH: usize = 60;

/// Render the battery series as a fixed-scale (0–100 %) sparkline of at most
/// `width` characters.  Each character shows the mean of its bucket.
pub fn sparkline(samples: &[BatterySample], width: usize) -> String {
    if samples.is_empty() || width == 0 {
        return String::new();
    }
    let bucket = samples.len().div_ceil(width);
    samples
        .chunks(bucket)
        .map(|chunk| {
            let mean = chunk.iter().map(|s| s.percent).sum::<f64>() / chunk.len() as f64;
            let level = (mean.clamp(0.0, 100.0) / 100.0 * (BARS.len() - 1) as f64).round();
            BARS[level as usize]
        })
        .collect()
}

/// Lowest battery reading of the run.
pub fn min_percent(samples: &[BatterySample]) -> Option<f64> {
    samples.iter().map(|s| s.percent).reduce(f64::min)
}

fn end_reason_label(reason: EndReason) -> &'static str {
    match reason {
        EndReason::VehicleLeft => "vehicle reached its destination",
        EndReason::SimulationExhausted => "simulation exhausted",
        EndReason::VehicleNeverAppeared => "vehicle never departed",
    }
}

/// Print the run summary to stdout.
pub fn print(summary: &RunSummary, threshold: f64) {
    println!();
    println!("{}", "  Run summary".bold().cyan());
    println!("  {:<16} {}", "Ended:", end_reason_label(summary.end_reason));
    println!("  {:<16} {}", "Steps:", summary.steps);
    println!("  {:<16} {}", "Samples:", summary.samples.len());

    if let (Some(first), Some(last), Some(min)) = (
        summary.samples.first(),
        summary.samples.last(),
        min_percent(&summary.samples),
    ) {
        let min_text = format!("{min:.1} %");
        let min_text = if min < threshold {
            min_text.yellow()
        } else {
            min_text.green()
        };
        println!(
            "  {:<16} {:.1} % → {:.1} % (low {})",
            "Battery:", first.percent, last.percent, min_text
        );
        println!(
            "  {:<16} {}",
            "",
            sparkline(&summary.samples, SPARKLINE_WIDTH).cyan()
        );
    }

    println!(
        "  {:<16} {} reroute(s), {} resume(s), {} abandoned",
        "Charge cycles:", summary.reroutes, summary.resumes, summary.abandoned_cycles
    );
    let faults = summary.faults.to_string();
    println!(
        "  {:<16} {}",
        "Faults:",
        if summary.faults == 0 {
            faults.green()
        } else {
            faults.yellow()
        }
    );
    println!("  {:<16} {}", "Final phase:", summary.final_phase.bold());
    println!();
}

/// Write `summary` as pretty-printed JSON to `path`.
pub fn write_json(summary: &RunSummary, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create {}: {}", parent.display(), e))?;
    }
    let raw = serde_json::to_string_pretty(summary)
        .map_err(|e| format!("Failed to serialize summary: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(percents: &[f64]) -> Vec<BatterySample> {
        percents
            .iter()
            .enumerate()
            .map(|(i, &percent)| BatterySample {
                time: i as f64,
                percent,
            })
            .collect()
    }

    #[test]
    fn sparkline_uses_full_scale() {
        assert_eq!(sparkline(&series(&[0.0, 50.0, 100.0]), 10), "▁▅█");
    }

    #[test]
    fn sparkline_buckets_long_series() {
        let samples = series(&[100.0; 120]);
        let line = sparkline(&samples, 60);
        assert_eq!(line.chars().count(), 60);
        assert!(line.chars().all(|c| c == '█'));
    }

    #[test]
    fn sparkline_of_nothing_is_empty() {
        assert!(sparkline(&[], 60).is_empty());
    }

    #[test]
    fn min_percent_finds_lowest_reading() {
        assert_eq!(min_percent(&series(&[60.0, 48.2, 99.9])), Some(48.2));
        assert_eq!(min_percent(&[]), None);
    }

    #[test]
    fn summary_json_is_written() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("nested").join("summary.json");
        let summary = RunSummary {
            samples: series(&[60.0, 59.0]),
            steps: 3,
            reroutes: 0,
            resumes: 0,
            abandoned_cycles: 0,
            faults: 0,
            final_phase: "driving",
            end_reason: EndReason::VehicleLeft,
        };
        write_json(&summary, &path).expect("write");

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["end_reason"], "vehicle_left");
        assert_eq!(value["samples"].as_array().map(Vec::len), Some(2));
    }
}
