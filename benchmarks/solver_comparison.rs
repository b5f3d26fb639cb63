/// One time step of the published configuration with each linear solver
///
/// Purpose: compare the banded RCM LU against the dense reference LU on the
/// same Newton solve, and report how the cost grows with resolution.

use mantle_melt::*;
use std::time::Instant;

fn run_once(nx: usize, ny: usize, kind: LinearSolverKind) -> Result<(RunStatistics, f64)> {
    let mut config = SimulationConfig::default();
    config.domain.nx = nx;
    config.domain.ny = ny;
    config.time.end_time_seconds = config.time.dt_seconds;
    config.solver.linear_solver = kind;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21))?;
    let stats = sim.run(&mut NullSink)?;
    let max_melt = sim
        .state()
        .melt_velocity
        .chunks(2)
        .map(|v| v[0].hypot(v[1]))
        .fold(0.0, f64::max);
    Ok((stats, max_melt))
}

fn main() {
    println!("═══════════════════════════════════════════════════════════════");
    println!("  BENCHMARK: Banded LU vs dense LU (one Newton-solved step)");
    println!("═══════════════════════════════════════════════════════════════\n");

    println!("{:>8} {:>8} {:>10} {:>12} {:>14}", "mesh", "solver", "Newton", "time (s)", "max |v_melt|");
    for &(nx, ny) in &[(5, 5), (10, 10), (20, 20)] {
        for kind in [LinearSolverKind::Banded, LinearSolverKind::Dense] {
            // Dense LU on the finest mesh takes minutes
            if kind == LinearSolverKind::Dense && nx > 10 {
                continue;
            }
            let start = Instant::now();
            match run_once(nx, ny, kind) {
                Ok((stats, max_melt)) => println!(
                    "{:>8} {:>8} {:>10} {:>12.3} {:>14.3e}",
                    format!("{}x{}", nx, ny),
                    format!("{:?}", kind),
                    stats.newton_iterations,
                    start.elapsed().as_secs_f64(),
                    max_melt
                ),
                Err(e) => println!("{:>8} {:>8}  FAILED: {}", format!("{}x{}", nx, ny), format!("{:?}", kind), e),
            }
        }
    }
    println!("\n═══════════════════════════════════════════════════════════════");
}
