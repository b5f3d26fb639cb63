//! One converged step of the published 20 × 20 configuration

use approx::assert_relative_eq;
use mantle_melt::{
    Block, BoundaryRegion, Channel, FieldSnapshot, MeltPostProcessor, MemorySink, PreviousFields, RunParameters,
    RunStatistics, Simulation, SimulationConfig, WeakFormAssembler,
};
use mantle_melt::fem::FormCoefficients;
use mantle_melt::physics::MeltConstants;

fn one_step() -> (Simulation, RunStatistics, MemorySink) {
    let mut config = SimulationConfig::default();
    config.time.end_time_seconds = config.time.dt_seconds;
    config.output.output_every = 1;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21)).unwrap();
    let mut sink = MemorySink::new();
    let stats = sim.run(&mut sink).unwrap();
    (sim, stats, sink)
}

#[test]
fn test_single_step_converges_with_finite_melt_velocity() {
    let (sim, stats, sink) = one_step();

    assert_eq!(stats.steps, 1);
    let last = stats.last_step.as_ref().unwrap();
    assert!(last.iterations >= 1 && last.iterations <= 25);
    assert_relative_eq!(stats.final_time, sim.scales().dt, max_relative = 1e-12);

    let state = sim.state();
    assert!(state.is_finite());
    assert!(state.melt_velocity.iter().all(|v| v.is_finite()));

    // Every channel was emitted once, at t = 0
    for channel in Channel::ALL {
        assert_eq!(sink.times(channel), vec![0.0]);
    }
    match &sink.series(Channel::MeltVelocity)[0].1 {
        FieldSnapshot::Vector(f) => assert!(f.max_magnitude().is_finite() && f.max_magnitude() > 0.0),
        FieldSnapshot::Scalar(_) => panic!("melt velocity is a vector channel"),
    }
}

#[test]
fn test_density_contrast_pointwise() {
    let (sim, _, _) = one_step();
    let state = sim.state();
    let dt = sim.scales().delta_t;

    for (drho, t) in state.density_contrast.iter().zip(state.temperature.iter()) {
        let expected = 3300.0 * (1.0 - 2.5e-5 * (t * dt - 1573.0)) - 2900.0;
        assert_relative_eq!(*drho, expected, max_relative = 1e-12);
    }
}

#[test]
fn test_boundary_fidelity() {
    let (sim, _, _) = one_step();
    let state = sim.state();
    let space = &sim.spaces().velocity;
    let vslip = sim.scales().vslip;

    for node in 0..sim.mesh().num_nodes() {
        let vx = space.value_at_node(&state.velocity, node, 0).unwrap();
        let vy = space.value_at_node(&state.velocity, node, 1).unwrap();
        if sim.mesh().on_boundary(node, BoundaryRegion::Top) {
            assert_eq!((vx, vy), (0.0, 0.0));
        } else if sim.mesh().on_boundary(node, BoundaryRegion::Bottom) {
            assert_eq!((vx, vy), (vslip, 0.0));
        }
    }

    let t_space = &sim.spaces().temperature;
    for node in 0..sim.mesh().num_nodes() {
        if let Some(t) = t_space.value_at_node(&state.temperature, node, 0) {
            if sim.mesh().on_boundary(node, BoundaryRegion::Top) {
                assert_eq!(t, sim.scales().surface_temperature());
            } else if sim.mesh().on_boundary(node, BoundaryRegion::Bottom) {
                assert_eq!(t, sim.scales().bottom_temperature());
            }
        }
    }
}

#[test]
fn test_converged_velocity_is_incompressible() {
    let (sim, stats, _) = one_step();
    let state = sim.state();
    let spaces = sim.spaces();

    let coefficients = FormCoefficients {
        scheme: sim.stepper_settings().scheme,
        rayleigh: sim.scales().rayleigh,
        fluid_coupling: sim.config().physics.fluid_coupling,
    };
    let law = sim.viscosity_law();
    let assembler = WeakFormAssembler::new(sim.mesh(), spaces, law, coefficients);
    let prev = PreviousFields {
        velocity: &state.velocity_prev,
        temperature: &state.temperature_prev,
        fluid_temperature: &state.fluid_temperature,
    };
    let r = assembler.residual(&state.mixed(&spaces.layout), &prev).unwrap();

    // The continuity rows only see v, so they are unaffected by the promotion
    let r_p: f64 = (0..r.len())
        .filter(|&i| spaces.layout.block_of(i) == Block::Pressure && !sim.boundary().is_dirichlet(i))
        .map(|i| r[i] * r[i])
        .sum::<f64>()
        .sqrt();
    let final_residual = stats.last_step.unwrap().residual;
    assert!(r_p <= final_residual * (1.0 + 1e-6) + 1e-14, "r_p = {:e}, r = {:e}", r_p, final_residual);
}

#[test]
fn test_post_processing_is_idempotent() {
    let (sim, _, _) = one_step();
    let state = sim.state();
    let post = MeltPostProcessor::new(MeltConstants::new(sim.config(), sim.scales()));

    let again = post
        .compute(sim.mesh(), sim.spaces(), &state.velocity, &state.pressure, &state.temperature)
        .unwrap();
    assert_eq!(again.melt_velocity, state.melt_velocity);
    assert_eq!(again.density_contrast, state.density_contrast);
    assert_eq!(again.pressure_gradient, state.pressure_gradient);

    let twice = post
        .compute(sim.mesh(), sim.spaces(), &state.velocity, &state.pressure, &state.temperature)
        .unwrap();
    assert_eq!(again, twice);
}
