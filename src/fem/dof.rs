use std::collections::{BTreeSet, HashSet};
use nalgebra::{Point2, Vector2};
use crate::mesh::{BoundaryRegion, Mesh, PeriodicPairs};

/// Polynomial order of a Lagrange space on Tri6 elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementOrder {
    /// P1: one dof per element vertex
    Linear,
    /// P2: one dof per vertex and per edge midpoint
    Quadratic,
}

/// The discrete fields of the problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Velocity,
    Pressure,
    Temperature,
    Viscosity,
    FluidTemperature,
    SolidDensity,
    MeltVelocity,
    PressureGradient,
}

impl FieldKind {
    pub fn order(&self) -> ElementOrder {
        match self {
            FieldKind::Velocity | FieldKind::MeltVelocity | FieldKind::PressureGradient => {
                ElementOrder::Quadratic
            }
            _ => ElementOrder::Linear,
        }
    }

    pub fn components(&self) -> usize {
        match self {
            FieldKind::Velocity | FieldKind::MeltVelocity | FieldKind::PressureGradient => 2,
            _ => 1,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Velocity => "velocity",
            FieldKind::Pressure => "pressure",
            FieldKind::Temperature => "temperature",
            FieldKind::Viscosity => "viscosity",
            FieldKind::FluidTemperature => "fluid_temperature",
            FieldKind::SolidDensity => "solid_density",
            FieldKind::MeltVelocity => "melt_velocity",
            FieldKind::PressureGradient => "pressure_gradient",
        }
    }
}

/// Degree-of-freedom layout for one field
///
/// Nodes are grouped into "base" dofs; a vector field stores its components
/// interleaved: `dof = base * components + component`. Right-edge nodes share
/// the base dof of their left-edge partner.
#[derive(Debug, Clone)]
pub struct FunctionSpace {
    kind: FieldKind,
    order: ElementOrder,
    components: usize,
    node_to_base: Vec<Option<usize>>,
    base_nodes: Vec<usize>,
}

impl FunctionSpace {
    /// Enumerate the dofs of `kind` on `mesh`, merging the periodic pairs
    pub fn new(mesh: &Mesh, kind: FieldKind, periodic: &PeriodicPairs) -> Self {
        let order = kind.order();
        let n_nodes = mesh.num_nodes();

        let included: Vec<bool> = match order {
            ElementOrder::Quadratic => vec![true; n_nodes],
            ElementOrder::Linear => {
                let corners: HashSet<usize> =
                    mesh.connectivity.corner_nodes().into_iter().collect();
                (0..n_nodes).map(|n| corners.contains(&n)).collect()
            }
        };

        let mut node_to_base = vec![None; n_nodes];
        let mut base_nodes = Vec::new();

        // Masters first so slaves can always find their partner's dof
        for node in 0..n_nodes {
            if included[node] && !periodic.is_slave(node) {
                node_to_base[node] = Some(base_nodes.len());
                base_nodes.push(node);
            }
        }
        for node in 0..n_nodes {
            if included[node] && periodic.is_slave(node) {
                node_to_base[node] = node_to_base[periodic.master(node)];
            }
        }

        Self {
            kind,
            order,
            components: kind.components(),
            node_to_base,
            base_nodes,
        }
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn order(&self) -> ElementOrder {
        self.order
    }

    pub fn components(&self) -> usize {
        self.components
    }

    /// Total number of scalar coefficients
    pub fn len(&self) -> usize {
        self.base_nodes.len() * self.components
    }

    pub fn is_empty(&self) -> bool {
        self.base_nodes.is_empty()
    }

    /// Number of distinct node locations (after periodic merging)
    pub fn num_base_dofs(&self) -> usize {
        self.base_nodes.len()
    }

    /// Representative (left-side) node of a base dof
    pub fn base_node(&self, base: usize) -> usize {
        self.base_nodes[base]
    }

    /// Global dof for a node and component, if the node carries this field
    pub fn dof(&self, node: usize, component: usize) -> Option<usize> {
        debug_assert!(component < self.components);
        self.node_to_base[node].map(|b| b * self.components + component)
    }

    /// Dof of a node that is known to carry the field (element nodes of the right order)
    pub fn node_dof(&self, node: usize, component: usize) -> usize {
        match self.node_to_base[node] {
            Some(b) => b * self.components + component,
            None => panic!("node {} carries no {} dof", node, self.kind.name()),
        }
    }

    /// Coefficient of `coeffs` at a node
    pub fn value_at_node(&self, coeffs: &[f64], node: usize, component: usize) -> Option<f64> {
        self.dof(node, component).map(|d| coeffs[d])
    }

    /// Sorted, de-duplicated dofs of one component on a boundary region
    pub fn boundary_dofs(&self, mesh: &Mesh, region: BoundaryRegion, component: usize) -> Vec<usize> {
        let mut dofs = BTreeSet::new();
        for node in 0..mesh.num_nodes() {
            if mesh.on_boundary(node, region) {
                if let Some(d) = self.dof(node, component) {
                    dofs.insert(d);
                }
            }
        }
        dofs.into_iter().collect()
    }

    /// Nodal interpolation of a scalar function
    pub fn interpolate<F>(&self, mesh: &Mesh, f: F) -> Vec<f64>
    where
        F: Fn(&Point2<f64>) -> f64,
    {
        debug_assert_eq!(self.components, 1);
        self.base_nodes.iter().map(|&n| f(mesh.node(n))).collect()
    }

    /// Nodal interpolation of a vector function
    pub fn interpolate_vector<F>(&self, mesh: &Mesh, f: F) -> Vec<f64>
    where
        F: Fn(&Point2<f64>) -> Vector2<f64>,
    {
        debug_assert_eq!(self.components, 2);
        let mut out = Vec::with_capacity(self.len());
        for &n in &self.base_nodes {
            let v = f(mesh.node(n));
            out.push(v.x);
            out.push(v.y);
        }
        out
    }
}

/// Segregated ordering of the coupled unknowns: `[velocity | pressure | temperature]`
#[derive(Debug, Clone, Copy)]
pub struct MixedLayout {
    pub n_velocity: usize,
    pub n_pressure: usize,
    pub n_temperature: usize,
}

/// Block of a mixed dof
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Velocity,
    Pressure,
    Temperature,
}

impl MixedLayout {
    pub fn new(velocity: &FunctionSpace, pressure: &FunctionSpace, temperature: &FunctionSpace) -> Self {
        Self {
            n_velocity: velocity.len(),
            n_pressure: pressure.len(),
            n_temperature: temperature.len(),
        }
    }

    pub fn total_dofs(&self) -> usize {
        self.n_velocity + self.n_pressure + self.n_temperature
    }

    pub fn velocity_offset(&self) -> usize {
        0
    }

    pub fn pressure_offset(&self) -> usize {
        self.n_velocity
    }

    pub fn temperature_offset(&self) -> usize {
        self.n_velocity + self.n_pressure
    }

    pub fn block_of(&self, dof: usize) -> Block {
        if dof < self.pressure_offset() {
            Block::Velocity
        } else if dof < self.temperature_offset() {
            Block::Pressure
        } else {
            Block::Temperature
        }
    }

    /// Concatenate the three fields into one mixed vector
    pub fn pack(&self, velocity: &[f64], pressure: &[f64], temperature: &[f64]) -> Vec<f64> {
        debug_assert_eq!(velocity.len(), self.n_velocity);
        debug_assert_eq!(pressure.len(), self.n_pressure);
        debug_assert_eq!(temperature.len(), self.n_temperature);
        let mut u = Vec::with_capacity(self.total_dofs());
        u.extend_from_slice(velocity);
        u.extend_from_slice(pressure);
        u.extend_from_slice(temperature);
        u
    }

    /// Split a mixed vector into (velocity, pressure, temperature) views
    pub fn split<'a>(&self, u: &'a [f64]) -> (&'a [f64], &'a [f64], &'a [f64]) {
        let (v, rest) = u.split_at(self.n_velocity);
        let (p, t) = rest.split_at(self.n_pressure);
        (v, p, t)
    }
}

/// The three spaces of the coupled solve together with their mixed layout
#[derive(Debug, Clone)]
pub struct CoupledSpaces {
    pub velocity: FunctionSpace,
    pub pressure: FunctionSpace,
    pub temperature: FunctionSpace,
    pub layout: MixedLayout,
}

impl CoupledSpaces {
    pub fn new(mesh: &Mesh) -> Self {
        let velocity = FunctionSpace::new(mesh, FieldKind::Velocity, &mesh.periodic);
        let pressure = FunctionSpace::new(mesh, FieldKind::Pressure, &mesh.periodic);
        let temperature = FunctionSpace::new(mesh, FieldKind::Temperature, &mesh.periodic);
        let layout = MixedLayout::new(&velocity, &pressure, &temperature);

        Self { velocity, pressure, temperature, layout }
    }

    pub fn space(&self, block: Block) -> &FunctionSpace {
        match block {
            Block::Velocity => &self.velocity,
            Block::Pressure => &self.pressure,
            Block::Temperature => &self.temperature,
        }
    }

    /// First mixed dof of a block
    pub fn offset(&self, block: Block) -> usize {
        match block {
            Block::Velocity => self.layout.velocity_offset(),
            Block::Pressure => self.layout.pressure_offset(),
            Block::Temperature => self.layout.temperature_offset(),
        }
    }

    pub fn total_dofs(&self) -> usize {
        self.layout.total_dofs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;

    #[test]
    fn test_dof_counts() {
        let (nx, ny) = (4, 3);
        let mesh = MeshGenerator::rectangle(1.0, 0.4, nx, ny).unwrap();

        let vel = FunctionSpace::new(&mesh, FieldKind::Velocity, &mesh.periodic);
        let pre = FunctionSpace::new(&mesh, FieldKind::Pressure, &mesh.periodic);

        // Periodic in x removes one column of nodes
        assert_eq!(vel.num_base_dofs(), (2 * nx) * (2 * ny + 1));
        assert_eq!(vel.len(), 2 * (2 * nx) * (2 * ny + 1));
        assert_eq!(pre.len(), nx * (ny + 1));
    }

    #[test]
    fn test_right_edge_shares_left_dofs() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 3, 2).unwrap();
        let vel = FunctionSpace::new(&mesh, FieldKind::Velocity, &mesh.periodic);
        let tem = FunctionSpace::new(&mesh, FieldKind::Temperature, &mesh.periodic);

        for &(right, left) in mesh.periodic.pairs() {
            assert_eq!(vel.dof(right, 0), vel.dof(left, 0));
            assert_eq!(vel.dof(right, 1), vel.dof(left, 1));
            assert_eq!(tem.dof(right, 0), tem.dof(left, 0));
        }
    }

    #[test]
    fn test_linear_space_skips_midpoints() {
        let mesh = MeshGenerator::rectangle(1.0, 1.0, 1, 1).unwrap();
        let tem = FunctionSpace::new(&mesh, FieldKind::Temperature, &mesh.periodic);
        for elem in &mesh.connectivity.tri6_elements {
            for &n in &elem.edge_nodes() {
                assert!(tem.dof(n, 0).is_none());
            }
            for &n in &elem.vertices() {
                assert!(tem.dof(n, 0).is_some());
            }
        }
    }

    #[test]
    fn test_interpolate_uses_left_representative() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 2, 2).unwrap();
        let tem = FunctionSpace::new(&mesh, FieldKind::Temperature, &mesh.periodic);
        let values = tem.interpolate(&mesh, |p| p.x);
        for &(right, _) in mesh.periodic.pairs() {
            if let Some(v) = tem.value_at_node(&values, right, 0) {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn test_mixed_layout_roundtrip() {
        let layout = MixedLayout { n_velocity: 4, n_pressure: 2, n_temperature: 3 };
        let u = layout.pack(&[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0], &[7.0, 8.0, 9.0]);
        let (v, p, t) = layout.split(&u);

        assert_eq!(v, &[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(p, &[5.0, 6.0]);
        assert_eq!(t, &[7.0, 8.0, 9.0]);
        assert_eq!(layout.block_of(3), Block::Velocity);
        assert_eq!(layout.block_of(4), Block::Pressure);
        assert_eq!(layout.block_of(6), Block::Temperature);
    }

    #[test]
    fn test_coupled_offsets() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 2, 2).unwrap();
        let spaces = CoupledSpaces::new(&mesh);

        assert_eq!(spaces.offset(Block::Pressure), spaces.velocity.len());
        assert_eq!(
            spaces.offset(Block::Temperature),
            spaces.velocity.len() + spaces.pressure.len()
        );
        assert_eq!(spaces.total_dofs(), spaces.offset(Block::Temperature) + spaces.temperature.len());
    }
}
