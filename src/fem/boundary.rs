/// Dirichlet boundary conditions for the coupled system
///
/// Conditions are declared per field and region, then resolved once against
/// the dof maps into a table of mixed dof → prescribed value.

use std::collections::BTreeMap;
use nalgebra::Point2;
use sprs::{CsMat, TriMat};
use crate::error::{Result, SimulationError};
use crate::fem::{Block, CoupledSpaces};
use crate::mesh::{near, BoundaryRegion, Mesh};

/// Where a condition applies
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundarySelector {
    /// Every node on a domain edge
    Region(BoundaryRegion),
    /// The single mesh node at this location
    Point(Point2<f64>),
}

/// One declared condition: `field[component] = value` on `selector`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirichletCondition {
    pub field: Block,
    pub component: usize,
    pub selector: BoundarySelector,
    pub value: f64,
}

/// Declared conditions, before they are resolved to dofs
#[derive(Debug, Clone, Default)]
pub struct BoundaryConditions {
    conditions: Vec<DirichletCondition>,
}

impl BoundaryConditions {
    pub fn new() -> Self {
        Self { conditions: Vec::new() }
    }

    /// Add a condition on one component of a field over a region
    pub fn add_region(&mut self, field: Block, component: usize, region: BoundaryRegion, value: f64) -> &mut Self {
        self.conditions.push(DirichletCondition {
            field,
            component,
            selector: BoundarySelector::Region(region),
            value,
        });
        self
    }

    /// Add a condition at a single node
    pub fn add_point(&mut self, field: Block, component: usize, point: Point2<f64>, value: f64) -> &mut Self {
        self.conditions.push(DirichletCondition {
            field,
            component,
            selector: BoundarySelector::Point(point),
            value,
        });
        self
    }

    pub fn conditions(&self) -> &[DirichletCondition] {
        &self.conditions
    }

    /// Resolve every condition to mixed dofs
    ///
    /// # Errors
    /// `ConstraintConflict` if two conditions prescribe different values on the
    /// same dof; `InvalidGeometry` if a point condition matches no node.
    pub fn build(&self, mesh: &Mesh, spaces: &CoupledSpaces) -> Result<DirichletSet> {
        let mut values: BTreeMap<usize, f64> = BTreeMap::new();

        for cond in &self.conditions {
            let space = spaces.space(cond.field);
            let offset = spaces.offset(cond.field);

            let dofs = match cond.selector {
                BoundarySelector::Region(region) => space.boundary_dofs(mesh, region, cond.component),
                BoundarySelector::Point(p) => {
                    let node = (0..mesh.num_nodes())
                        .find(|&n| {
                            let q = mesh.node(n);
                            near(q.x, p.x) && near(q.y, p.y)
                        })
                        .ok_or_else(|| {
                            SimulationError::InvalidGeometry(format!(
                                "no mesh node at ({}, {}) for {} condition",
                                p.x,
                                p.y,
                                space.kind().name()
                            ))
                        })?;
                    space.dof(node, cond.component).into_iter().collect()
                }
            };

            for dof in dofs {
                let global = offset + dof;
                match values.get(&global) {
                    Some(&existing) if existing != cond.value => {
                        return Err(SimulationError::ConstraintConflict {
                            field: space.kind().name(),
                            dof: global,
                            existing,
                            requested: cond.value,
                        });
                    }
                    _ => {
                        values.insert(global, cond.value);
                    }
                }
            }
        }

        let mut is_constrained = vec![false; spaces.total_dofs()];
        for &dof in values.keys() {
            is_constrained[dof] = true;
        }

        Ok(DirichletSet { values, is_constrained })
    }
}

/// Resolved Dirichlet table over the mixed unknowns
#[derive(Debug, Clone)]
pub struct DirichletSet {
    values: BTreeMap<usize, f64>,
    is_constrained: Vec<bool>,
}

impl DirichletSet {
    pub fn is_dirichlet(&self, dof: usize) -> bool {
        self.is_constrained.get(dof).copied().unwrap_or(false)
    }

    pub fn value(&self, dof: usize) -> Option<f64> {
        self.values.get(&dof).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.values.iter().map(|(&d, &v)| (d, v))
    }

    /// Overwrite constrained entries of `u` with their prescribed values
    pub fn impose(&self, u: &mut [f64]) {
        for (&dof, &value) in &self.values {
            u[dof] = value;
        }
    }

    /// Apply the constraints to a Newton system `J δ = −r` at iterate `u`
    ///
    /// Constrained rows become `δ_i = −(u_i − g_i)`: the residual row is replaced
    /// by `u_i − g_i` and the Jacobian row by the identity. Constrained columns
    /// are eliminated from the free rows, their known correction moved into the
    /// residual.
    pub fn apply(&self, jacobian: &CsMat<f64>, residual: &[f64], u: &[f64]) -> (CsMat<f64>, Vec<f64>) {
        let n = residual.len();
        let mut r_new = residual.to_vec();

        // Known corrections on constrained dofs
        let mut delta_fixed = vec![0.0; n];
        for (&dof, &value) in &self.values {
            r_new[dof] = u[dof] - value;
            delta_fixed[dof] = -(u[dof] - value);
        }

        let mut tri = TriMat::new((n, n));
        for (row_idx, row) in jacobian.outer_iterator().enumerate() {
            if self.is_dirichlet(row_idx) {
                tri.add_triplet(row_idx, row_idx, 1.0);
            } else {
                for (col_idx, &val) in row.iter() {
                    if self.is_dirichlet(col_idx) {
                        r_new[row_idx] += val * delta_fixed[col_idx];
                    } else {
                        tri.add_triplet(row_idx, col_idx, val);
                    }
                }
            }
        }

        (tri.to_csr(), r_new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;

    fn setup() -> (Mesh, CoupledSpaces) {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 3, 2).unwrap();
        let spaces = CoupledSpaces::new(&mesh);
        (mesh, spaces)
    }

    #[test]
    fn test_region_conditions_resolve() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_region(Block::Velocity, 0, BoundaryRegion::Top, 0.0)
            .add_region(Block::Velocity, 1, BoundaryRegion::Top, 0.0)
            .add_region(Block::Temperature, 0, BoundaryRegion::Bottom, 1.0);

        let set = bcs.build(&mesh, &spaces).unwrap();

        // 2nx distinct P2 nodes on the top edge after periodic merging
        let top_nodes = 2 * 3;
        let bottom_vertices = 3;
        assert_eq!(set.len(), 2 * top_nodes + bottom_vertices);

        let t_off = spaces.offset(Block::Temperature);
        for dof in spaces.temperature.boundary_dofs(&mesh, BoundaryRegion::Bottom, 0) {
            assert_eq!(set.value(t_off + dof), Some(1.0));
        }
    }

    #[test]
    fn test_point_condition_pins_one_dof() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_point(Block::Pressure, 0, Point2::origin(), 0.0);

        let set = bcs.build(&mesh, &spaces).unwrap();
        assert_eq!(set.len(), 1);
        let (dof, _) = set.iter().next().unwrap();
        assert_eq!(dof, spaces.offset(Block::Pressure) + spaces.pressure.dof(0, 0).unwrap());
    }

    #[test]
    fn test_missing_point_is_geometry_error() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_point(Block::Pressure, 0, Point2::new(0.123, 0.0), 0.0);

        assert!(matches!(bcs.build(&mesh, &spaces), Err(SimulationError::InvalidGeometry(_))));
    }

    #[test]
    fn test_conflicting_values_rejected() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        // The origin lies on both the bottom and left edges
        bcs.add_region(Block::Temperature, 0, BoundaryRegion::Bottom, 1.0)
            .add_region(Block::Temperature, 0, BoundaryRegion::Left, 0.5);

        assert!(matches!(
            bcs.build(&mesh, &spaces),
            Err(SimulationError::ConstraintConflict { field: "temperature", .. })
        ));
    }

    #[test]
    fn test_agreeing_values_are_merged() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_region(Block::Temperature, 0, BoundaryRegion::Bottom, 1.0)
            .add_region(Block::Temperature, 0, BoundaryRegion::Left, 1.0);

        assert!(bcs.build(&mesh, &spaces).is_ok());
    }

    #[test]
    fn test_apply_identity_rows() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_point(Block::Pressure, 0, Point2::origin(), 2.0);
        let set = bcs.build(&mesh, &spaces).unwrap();
        let (pinned, _) = set.iter().next().unwrap();

        let n = spaces.total_dofs();
        let mut tri = TriMat::new((n, n));
        for i in 0..n {
            tri.add_triplet(i, i, 4.0);
            if i + 1 < n {
                tri.add_triplet(i, i + 1, 1.0);
            }
        }
        let jac = tri.to_csr();
        let residual = vec![1.0; n];
        let u = vec![0.5; n];

        let (jac_bc, r_bc) = set.apply(&jac, &residual, &u);

        assert_eq!(r_bc[pinned], 0.5 - 2.0);
        assert_eq!(jac_bc.get(pinned, pinned).copied(), Some(1.0));
        assert_eq!(jac_bc.get(pinned, pinned + 1), None);
        // Column moved into the residual of the coupled free row
        assert_eq!(jac_bc.get(pinned - 1, pinned), None);
        assert_eq!(r_bc[pinned - 1], 1.0 + 1.0 * 1.5);
    }

    #[test]
    fn test_impose_overwrites_values() {
        let (mesh, spaces) = setup();
        let mut bcs = BoundaryConditions::new();
        bcs.add_region(Block::Velocity, 0, BoundaryRegion::Bottom, 0.3);
        let set = bcs.build(&mesh, &spaces).unwrap();

        let mut u = vec![0.0; spaces.total_dofs()];
        set.impose(&mut u);
        for (dof, value) in set.iter() {
            assert_eq!(u[dof], value);
            assert!(set.is_dirichlet(dof));
        }
    }
}
