use nalgebra::{Point2, Vector2};
use crate::fem::FunctionSpace;
use crate::mesh::Mesh;

/// Scalar field sampled at the dof locations of its space
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub name: String,
    pub points: Vec<Point2<f64>>,
    pub data: Vec<f64>,
}

impl ScalarField {
    pub fn new(name: &str, points: Vec<Point2<f64>>, data: Vec<f64>) -> Self {
        assert_eq!(points.len(), data.len(), "one value per sample point");
        Self {
            name: name.to_string(),
            points,
            data,
        }
    }

    /// Snapshot of a scalar coefficient vector, scaled by `scale`
    pub fn from_space(name: &str, mesh: &Mesh, space: &FunctionSpace, coeffs: &[f64], scale: f64) -> Self {
        debug_assert_eq!(space.components(), 1);
        let points = (0..space.num_base_dofs())
            .map(|b| *mesh.node(space.base_node(b)))
            .collect();
        let data = coeffs.iter().map(|&c| c * scale).collect();
        Self::new(name, points, data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, v| m.max(v.abs()))
    }
}

/// Vector field data on mesh nodes (2 components per node)
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField {
    pub name: String,
    pub points: Vec<Point2<f64>>,
    pub data: Vec<Vector2<f64>>,
}

impl VectorField {
    pub fn new(name: &str, points: Vec<Point2<f64>>, data: Vec<Vector2<f64>>) -> Self {
        assert_eq!(points.len(), data.len(), "one value per sample point");
        Self {
            name: name.to_string(),
            points,
            data,
        }
    }

    /// Snapshot of an interleaved coefficient vector [x0, y0, x1, y1, ...]
    ///
    /// # Panics
    /// Panics if the coefficient count does not match the space
    pub fn from_space(name: &str, mesh: &Mesh, space: &FunctionSpace, coeffs: &[f64], scale: f64) -> Self {
        assert_eq!(space.components(), 2, "vector snapshot needs a 2-component space");
        assert_eq!(coeffs.len(), space.len(), "coefficient vector does not match space");

        let points = (0..space.num_base_dofs())
            .map(|b| *mesh.node(space.base_node(b)))
            .collect();
        let data = coeffs
            .chunks(2)
            .map(|chunk| Vector2::new(chunk[0], chunk[1]) * scale)
            .collect();
        Self::new(name, points, data)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |m, v| m.max(v.norm()))
    }
}

/// One recorded output frame
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSnapshot {
    Scalar(ScalarField),
    Vector(VectorField),
}

impl FieldSnapshot {
    pub fn name(&self) -> &str {
        match self {
            FieldSnapshot::Scalar(f) => &f.name,
            FieldSnapshot::Vector(f) => &f.name,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            FieldSnapshot::Scalar(f) => f.len(),
            FieldSnapshot::Vector(f) => f.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if every sampled value is finite
    pub fn is_finite(&self) -> bool {
        match self {
            FieldSnapshot::Scalar(f) => f.data.iter().all(|v| v.is_finite()),
            FieldSnapshot::Vector(f) => f.data.iter().all(|v| v.x.is_finite() && v.y.is_finite()),
        }
    }
}
