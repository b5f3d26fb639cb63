//! Run the (μa, Tb) sweep described by a TOML file
//!
//! Usage: `melt_sweep [config.toml]`. Without an argument the published
//! defaults are used. Log verbosity follows `RUST_LOG` (default `info`).

use env_logger::Env;
use log::error;
use mantle_melt::{run_sweep, NondimensionalScales, SimulationConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SimulationConfig::from_file(&path) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        },
        None => SimulationConfig::default(),
    };

    config.print_summary();
    for run in config.sweep_points() {
        NondimensionalScales::new(&config, &run).print_summary();
    }

    match run_sweep(&config) {
        Ok(report) => {
            report.print_summary();
            if report.all_succeeded() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
