use approx::assert_relative_eq;
use mantle_melt::mesh::FieldSnapshot;
use mantle_melt::{Channel, MemorySink, RunParameters, Simulation, SimulationConfig};

#[test]
fn test_time_advances_by_exactly_dt() {
    let mut config = SimulationConfig::default();
    config.domain.nx = 8;
    config.domain.ny = 4;
    config.time.end_time_seconds = 3.0 * config.time.dt_seconds;
    config.output.output_every = 1;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21)).unwrap();
    let dt = sim.scales().dt;
    let mut sink = MemorySink::new();
    let stats = sim.run(&mut sink).unwrap();

    assert!(stats.final_time >= sim.scales().t_end * (1.0 - 1e-12));
    let times = sink.times(Channel::Temperature);
    assert_eq!(times.len(), stats.steps);
    assert_eq!(times[0], 0.0);
    for pair in times.windows(2) {
        assert_relative_eq!(pair[1] - pair[0], dt, max_relative = 1e-12);
    }
    assert_relative_eq!(stats.final_time, stats.steps as f64 * dt, max_relative = 1e-12);
}

#[test]
fn test_output_interval() {
    let mut config = SimulationConfig::default();
    config.domain.nx = 4;
    config.domain.ny = 2;
    config.time.end_time_seconds = 5.0 * config.time.dt_seconds;
    config.output.output_every = 2;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21)).unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.run(&mut sink).unwrap();

    // Steps 0, 2, 4 are written
    let expected = (stats.steps + 1) / 2;
    assert_eq!(sink.times(Channel::Viscosity).len(), expected);
    assert_eq!(stats.outputs, expected);
}

#[test]
fn test_boundary_velocity_holds_every_step() {
    let mut config = SimulationConfig::default();
    config.domain.nx = 8;
    config.domain.ny = 4;
    config.time.end_time_seconds = 3.0 * config.time.dt_seconds;
    config.output.output_every = 1;
    let height = config.domain.height;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21)).unwrap();
    let vslip = sim.scales().vslip;
    let mut sink = MemorySink::new();
    let stats = sim.run(&mut sink).unwrap();

    let frames = sink.series(Channel::Velocity);
    assert_eq!(frames.len(), stats.steps);
    for (_, snapshot) in frames {
        let field = match snapshot {
            FieldSnapshot::Vector(f) => f,
            FieldSnapshot::Scalar(_) => panic!("velocity is a vector channel"),
        };
        let mut checked = 0;
        for (p, v) in field.points.iter().zip(field.data.iter()) {
            if (p.y - height).abs() < 1e-9 {
                assert_eq!((v.x, v.y), (0.0, 0.0));
                checked += 1;
            } else if p.y.abs() < 1e-9 {
                assert_eq!((v.x, v.y), (vslip, 0.0));
                checked += 1;
            }
        }
        // Top and bottom rows of P2 nodes, right edge merged into the left
        assert_eq!(checked, 2 * 2 * config.domain.nx);
    }
}
