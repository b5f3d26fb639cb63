use mantle_melt::{CoupledSpaces, FieldKind, FunctionSpace, MeshGenerator, MemorySink, RunParameters, Simulation, SimulationConfig};

#[test]
fn test_right_edge_shares_left_dofs() {
    let mesh = MeshGenerator::rectangle(1.0, 0.4, 20, 20).unwrap();
    // 41 P2 rows on each vertical edge
    assert_eq!(mesh.periodic.len(), 41);

    for kind in [FieldKind::Velocity, FieldKind::Pressure, FieldKind::Temperature, FieldKind::MeltVelocity] {
        let space = FunctionSpace::new(&mesh, kind, &mesh.periodic);
        for &(right, left) in mesh.periodic.pairs() {
            for c in 0..space.components() {
                assert_eq!(space.dof(right, c), space.dof(left, c), "{} at node {}", kind.name(), right);
            }
        }
    }

    let spaces = CoupledSpaces::new(&mesh);
    assert_eq!(spaces.velocity.num_base_dofs(), 41 * 41 - 41);
    assert_eq!(spaces.pressure.num_base_dofs(), 21 * 21 - 21);
    assert_eq!(spaces.total_dofs(), 2 * 1640 + 420 + 420);
}

#[test]
fn test_solution_is_periodic() {
    let mut config = SimulationConfig::default();
    config.domain.nx = 8;
    config.domain.ny = 4;
    config.time.end_time_seconds = config.time.dt_seconds;

    let mut sim = Simulation::new(&config, RunParameters::new(1300.0, 5e21)).unwrap();
    sim.run(&mut MemorySink::new()).unwrap();

    let state = sim.state();
    let v = &sim.spaces().velocity;
    for &(right, left) in sim.mesh().periodic.pairs() {
        for c in 0..2 {
            assert_eq!(
                v.value_at_node(&state.melt_velocity, right, c),
                v.value_at_node(&state.melt_velocity, left, c)
            );
        }
    }
}
