// SPDX-License-Identifier: AGPL-3.0-only

//! `simcal` — hardware calibration and simulator accuracy CLI.
//!
//! ```text
//! USAGE:
//!   simcal init-config <path>          Write the default configuration JSON
//!   simcal calibrate [options]         Regress hardware latency baselines
//!   simcal acquire [options]           Collect per-suite simulator CPI
//!   simcal report [options]            Merge, compare, and emit the verdict
//!   simcal run [options]               calibrate + acquire + report
//! ```
//!
//! `report` (and `run`) exit non-zero when the calibrated-only mean
//! error exceeds the configured tolerance, so CI can gate on it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use simcal_core::{
    compare, merge_suites, normalize_calibrations, summarize, AccuracySummary, CalibConfig,
    CalibError, CalibrationResult, Calibrator, ComparisonRecord, SuiteCpiRecord,
};
use simcal_harness::{CommandSimulator, NativeBenchmark, SuiteAcquirer};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "simcal", about = "Simulator CPI calibration against hardware", version)]
struct Cli {
    /// Configuration JSON (defaults to built-in tables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Write the default configuration to a JSON file.
    InitConfig {
        /// Destination path
        path: PathBuf,
    },
    /// Calibrate hardware latency baselines by regression.
    Calibrate {
        /// Directory holding the pre-built `<bench>_native_r<reps>` binaries
        #[arg(long, default_value = "benchmarks/native/build")]
        build_dir: PathBuf,
        /// Benchmarks to calibrate (default: all configured)
        benchmarks: Vec<String>,
        /// Output JSON path
        #[arg(long, default_value = "calibration_results.json")]
        output: PathBuf,
    },
    /// Acquire per-suite CPI from the simulator.
    Acquire {
        /// Simulator command; `{test}` is replaced by the test identifier
        #[arg(long, num_args = 1.., required = true)]
        simulator: Vec<String>,
        /// Output JSON path
        #[arg(long, default_value = "suite_cpis.json")]
        output: PathBuf,
    },
    /// Merge suites, compare against the calibration file, emit the verdict.
    Report {
        /// Calibration results JSON from `calibrate`
        #[arg(long, default_value = "calibration_results.json")]
        calibration: PathBuf,
        /// Suite CPI records JSON from `acquire`
        #[arg(long, default_value = "suite_cpis.json")]
        records: PathBuf,
        /// Output JSON path
        #[arg(long, default_value = "accuracy_results.json")]
        output: PathBuf,
    },
    /// Full pipeline: calibrate, acquire, report.
    Run {
        /// Directory holding the pre-built native binaries
        #[arg(long, default_value = "benchmarks/native/build")]
        build_dir: PathBuf,
        /// Simulator command; `{test}` is replaced by the test identifier
        #[arg(long, num_args = 1.., required = true)]
        simulator: Vec<String>,
        /// Output JSON path
        #[arg(long, default_value = "accuracy_results.json")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let healthy = match cli.command {
        Cmd::InitConfig { path } => {
            std::fs::write(&path, config.to_json()?)?;
            println!("Default configuration written to {}", path.display());
            true
        }
        Cmd::Calibrate {
            build_dir,
            benchmarks,
            output,
        } => {
            let results = cmd_calibrate(&config, &build_dir, &benchmarks)?;
            std::fs::write(&output, serde_json::to_string_pretty(&results)?)?;
            println!("Calibration results saved to {}", output.display());
            true
        }
        Cmd::Acquire { simulator, output } => {
            let records = cmd_acquire(&config, &simulator)?;
            std::fs::write(&output, serde_json::to_string_pretty(&records)?)?;
            println!("Suite CPI records saved to {}", output.display());
            true
        }
        Cmd::Report {
            calibration,
            records,
            output,
        } => {
            let calibrations: Vec<CalibrationResult> = read_json(&calibration)?;
            let suite_records: Vec<SuiteCpiRecord> = read_json(&records)?;
            let summary = cmd_report(&config, &calibrations, &suite_records, &output)?;
            summary.healthy
        }
        Cmd::Run {
            build_dir,
            simulator,
            output,
        } => {
            let calibrations = cmd_calibrate(&config, &build_dir, &[])?;
            let suite_records = cmd_acquire(&config, &simulator)?;
            let summary = cmd_report(&config, &calibrations, &suite_records, &output)?;
            summary.healthy
        }
    };

    if !healthy {
        warn!("calibrated mean error exceeds tolerance");
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CalibConfig> {
    match path {
        Some(p) => CalibConfig::from_json_file(p)
            .with_context(|| format!("loading configuration from {}", p.display())),
        None => Ok(CalibConfig::default()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// Calibrate each requested benchmark, skipping individual failures.
fn cmd_calibrate(
    config: &CalibConfig,
    build_dir: &Path,
    requested: &[String],
) -> Result<Vec<CalibrationResult>> {
    let benchmarks = if requested.is_empty() {
        configured_benchmarks(config)
    } else {
        requested.to_vec()
    };
    anyhow::ensure!(!benchmarks.is_empty(), "no benchmarks configured or requested");

    let hw = NativeBenchmark::new(build_dir);
    let calibrator = Calibrator::new(config);

    let mut results = Vec::new();
    for bench in &benchmarks {
        match calibrator.calibrate(&hw, bench, &config.description(bench)) {
            Ok(r) => {
                println!(
                    "{:<15} {:>10.4} ns/inst  CPI@{:.1}GHz={:>8.2}  R²={:.6}",
                    r.benchmark_id,
                    r.latency_ns_per_instruction,
                    config.frequency_ghz,
                    r.implied_cpi(config.frequency_ghz),
                    r.r_squared
                );
                results.push(r);
            }
            Err(e @ CalibError::InsufficientDataPoints { .. }) => {
                warn!(benchmark = %bench, error = %e, "calibration failed, omitting");
            }
            Err(e) => {
                warn!(benchmark = %bench, error = %e, "calibration error, omitting");
            }
        }
    }

    if results.is_empty() {
        anyhow::bail!(CalibError::NoUsableBenchmarks {
            reason: "every benchmark failed calibration".to_string(),
        });
    }
    Ok(results)
}

/// Distinct benchmark ids from the suite test lists, falling back to
/// the instructions-per-rep table.
fn configured_benchmarks(config: &CalibConfig) -> Vec<String> {
    let from_suites: BTreeSet<String> = config
        .suite_tests
        .iter()
        .flat_map(|s| s.tests.iter().map(|t| t.benchmark_id.clone()))
        .collect();
    if from_suites.is_empty() {
        config.insts_per_rep.keys().cloned().collect()
    } else {
        from_suites.into_iter().collect()
    }
}

fn cmd_acquire(config: &CalibConfig, simulator: &[String]) -> Result<Vec<SuiteCpiRecord>> {
    let sim = CommandSimulator::from_command(simulator)
        .context("simulator command must not be empty")?;
    let acquirer = SuiteAcquirer::from_config(config);

    // Without explicit suite lists, run every mapped test under the
    // baseline no-cache suite.
    let suites = if config.suite_tests.is_empty() {
        vec![simcal_core::SuiteTests {
            suite: simcal_core::Suite::NoCache,
            tests: config
                .name_mapping
                .iter()
                .map(|(test_id, benchmark_id)| simcal_core::TestPair {
                    test_id: test_id.clone(),
                    benchmark_id: benchmark_id.clone(),
                })
                .collect(),
        }]
    } else {
        config.suite_tests.clone()
    };
    anyhow::ensure!(
        suites.iter().any(|s| !s.tests.is_empty()),
        "no simulator tests configured"
    );

    let mut records = Vec::new();
    for suite_tests in &suites {
        let acquisition = acquirer.acquire_suite(
            &sim,
            suite_tests.suite,
            &suite_tests.tests,
            &config.fallback_cpis,
        );
        info!(
            suite = %suite_tests.suite,
            acquired = acquisition.records.len(),
            unavailable = acquisition.unavailable.len(),
            "suite acquisition done"
        );
        records.extend(acquisition.records);
    }
    Ok(records)
}

fn cmd_report(
    config: &CalibConfig,
    calibrations: &[CalibrationResult],
    suite_records: &[SuiteCpiRecord],
    output: &Path,
) -> Result<AccuracySummary> {
    let normalized = normalize_calibrations(calibrations, &config.normalization);

    let expected: Vec<String> = normalized.iter().map(|c| c.benchmark_id.clone()).collect();
    let outcome = merge_suites(suite_records, &config.dcache_benchmarks, &expected);

    let comparisons = compare(
        &normalized,
        &outcome.merged,
        &config.analytical_baselines,
        config.frequency_ghz,
    );
    let summary = summarize(&comparisons, outcome.missing, config);

    print_table(&comparisons, &summary);

    let artifact = serde_json::json!({
        "summary": summary,
        "benchmarks": comparisons,
        "calibrations": normalized,
    });
    std::fs::write(output, serde_json::to_string_pretty(&artifact)?)?;
    println!("\nResults saved to {}", output.display());

    Ok(summary)
}

fn print_table(comparisons: &[ComparisonRecord], summary: &AccuracySummary) {
    println!();
    println!(
        "{:<16} {:>12} {:>12} {:>9}  {:<10} {}",
        "Benchmark", "Real (ns)", "Sim (ns)", "Error", "Suite", "Flags"
    );
    println!("{}", "-".repeat(72));

    for c in comparisons {
        let mut flags = Vec::new();
        if !c.calibrated {
            flags.push("uncalibrated");
        }
        if c.provenance == simcal_core::Provenance::Fallback {
            flags.push("fallback");
        }
        println!(
            "{:<16} {:>12.4} {:>12.4} {:>8.1}%  {:<10} {}",
            c.benchmark_id,
            c.real_latency_ns,
            c.sim_latency_ns,
            c.error * 100.0,
            c.source_suite.to_string(),
            flags.join(",")
        );
    }

    println!("{}", "-".repeat(72));
    match (summary.mean_error, summary.max_error) {
        (Some(mean), Some(max)) => println!(
            "Calibrated: {} benchmarks, mean error {:.1}%, max {:.1}%",
            summary.calibrated_count,
            mean * 100.0,
            max * 100.0
        ),
        _ => println!("No calibrated benchmarks to aggregate"),
    }
    if summary.uncalibrated_count > 0 {
        println!("Uncalibrated (display only): {}", summary.uncalibrated_count);
    }
    for missing in &summary.missing {
        println!("No simulator CPI available: {missing}");
    }
    println!(
        "Pipeline health: {}",
        if summary.healthy { "OK" } else { "DEGRADED" }
    );
}
