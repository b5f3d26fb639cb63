//! Parameter sweep over reference viscosity × basal temperature
//!
//! Runs are independent: each owns its mesh, state and output directory.
//! A failed run is logged and recorded; the remaining runs continue.

use log::{error, info};
use rayon::prelude::*;
use crate::config::{RunParameters, SimulationConfig};
use crate::error::{Result, SimulationError};
use crate::simulation::{run_job, RunReport};

/// Results of every sweep point, in sweep order
#[derive(Debug, Default)]
pub struct SweepReport {
    pub completed: Vec<RunReport>,
    pub failed: Vec<(RunParameters, SimulationError)>,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.completed.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn print_summary(&self) {
        println!("═══════════════════════════════════════════════════════════════");
        println!("  Sweep Summary: {} of {} runs completed", self.completed.len(), self.total());
        println!("═══════════════════════════════════════════════════════════════");
        for report in &self.completed {
            let s = &report.statistics;
            println!(
                "  mu={:e}, Tb={}: {} steps, {} Newton iterations, {:.1}s",
                report.run.reference_viscosity, report.run.basal_temperature_c, s.steps, s.newton_iterations, s.wall_time
            );
        }
        for (run, err) in &self.failed {
            println!("  mu={:e}, Tb={}: FAILED ({})", run.reference_viscosity, run.basal_temperature_c, err);
        }
        println!("═══════════════════════════════════════════════════════════════\n");
    }
}

fn run_point(config: &SimulationConfig, run: RunParameters) -> std::result::Result<RunReport, (RunParameters, SimulationError)> {
    info!("Starting case mu={}, Tb={}", run.reference_viscosity, run.basal_temperature_c);
    run_job(config, run).map_err(|e| {
        let stage = if e.is_setup_error() { "setup" } else { "run" };
        error!(
            "Case mu={}, Tb={} failed during {}: {}",
            run.reference_viscosity, run.basal_temperature_c, stage, e
        );
        (run, e)
    })
}

/// Run every (μa, Tb) pair of the configuration
///
/// # Errors
/// Only an invalid configuration fails the sweep as a whole; per-run errors
/// are collected in the report.
pub fn run_sweep(config: &SimulationConfig) -> Result<SweepReport> {
    config.validate()?;
    let points = config.sweep_points();

    let outcomes: Vec<_> = if config.sweep.parallel {
        points.par_iter().map(|&run| run_point(config, run)).collect()
    } else {
        points.iter().map(|&run| run_point(config, run)).collect()
    };

    let mut report = SweepReport::default();
    for outcome in outcomes {
        match outcome {
            Ok(r) => report.completed.push(r),
            Err(f) => report.failed.push(f),
        }
    }
    Ok(report)
}
