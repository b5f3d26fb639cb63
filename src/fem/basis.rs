use nalgebra::{Matrix2, Point2, Vector2};

/// Straight-sided triangle with its affine map from the reference element
///
/// Reference element (in barycentric coordinates):
///   Node 0: (1, 0, 0) at origin
///   Node 1: (0, 1, 0) at (1, 0)
///   Node 2: (0, 0, 1) at (0, 1)
#[derive(Debug, Clone, Copy)]
pub struct AffineTriangle {
    pub vertices: [Point2<f64>; 3],
    /// det(J) = twice the signed area
    pub det_j: f64,
    /// Cartesian gradients of the barycentric coordinates (constant per element)
    pub grad_l: [Vector2<f64>; 3],
}

impl AffineTriangle {
    /// Build the map; `None` for a degenerate (zero-area) triangle
    pub fn new(vertices: [Point2<f64>; 3]) -> Option<Self> {
        let [p0, p1, p2] = vertices;
        let det_j = (p1.x - p0.x) * (p2.y - p0.y) - (p2.x - p0.x) * (p1.y - p0.y);
        if det_j.abs() < f64::EPSILON * (p1 - p0).norm_squared().max(1.0) {
            return None;
        }

        let grad_l = [
            Vector2::new(p1.y - p2.y, p2.x - p1.x) / det_j,
            Vector2::new(p2.y - p0.y, p0.x - p2.x) / det_j,
            Vector2::new(p0.y - p1.y, p1.x - p0.x) / det_j,
        ];

        Some(Self { vertices, det_j, grad_l })
    }

    /// Jacobian J = ∂x/∂(L1, L2)
    pub fn jacobian(&self) -> Matrix2<f64> {
        let [p0, p1, p2] = self.vertices;
        Matrix2::new(
            p1.x - p0.x, p2.x - p0.x,
            p1.y - p0.y, p2.y - p0.y,
        )
    }

    pub fn area(&self) -> f64 {
        0.5 * self.det_j.abs()
    }

    /// Physical point of barycentric coordinates
    pub fn to_cartesian(&self, l: &[f64; 3]) -> Point2<f64> {
        let [p0, p1, p2] = self.vertices;
        Point2::from(p0.coords * l[0] + p1.coords * l[1] + p2.coords * l[2])
    }
}

/// Tri6 (6-node quadratic triangle) basis functions
///
/// Node numbering:
///   Vertices: 0, 1, 2
///   Edge midpoints: 3 (edge 0-1), 4 (edge 1-2), 5 (edge 2-0)
///
/// Shape functions use barycentric (area) coordinates L0, L1, L2
/// where L0 + L1 + L2 = 1
pub struct Tri6Basis;

impl Tri6Basis {
    /// Evaluate all 6 shape functions at barycentric coordinates
    ///
    /// Vertices: N_i = L_i (2 L_i - 1); midpoints: N_3 = 4 L_0 L_1, N_4 = 4 L_1 L_2, N_5 = 4 L_2 L_0
    #[allow(non_snake_case)]
    pub fn shape_functions(L: &[f64; 3]) -> [f64; 6] {
        let [L0, L1, L2] = *L;

        [
            L0 * (2.0 * L0 - 1.0),
            L1 * (2.0 * L1 - 1.0),
            L2 * (2.0 * L2 - 1.0),
            4.0 * L0 * L1,
            4.0 * L1 * L2,
            4.0 * L2 * L0,
        ]
    }

    /// Derivatives with respect to barycentric coordinates, [∂N/∂L0, ∂N/∂L1, ∂N/∂L2]
    #[allow(non_snake_case)]
    pub fn shape_derivatives_barycentric(L: &[f64; 3]) -> [[f64; 3]; 6] {
        let [L0, L1, L2] = *L;

        [
            [4.0 * L0 - 1.0, 0.0, 0.0],
            [0.0, 4.0 * L1 - 1.0, 0.0],
            [0.0, 0.0, 4.0 * L2 - 1.0],
            [4.0 * L1, 4.0 * L0, 0.0],
            [0.0, 4.0 * L2, 4.0 * L1],
            [4.0 * L2, 0.0, 4.0 * L0],
        ]
    }

    /// Cartesian gradients by the chain rule ∇N = Σ_k ∂N/∂L_k ∇L_k
    #[allow(non_snake_case)]
    pub fn shape_derivatives_cartesian(L: &[f64; 3], tri: &AffineTriangle) -> [Vector2<f64>; 6] {
        let dN_dL = Self::shape_derivatives_barycentric(L);
        let mut grads = [Vector2::zeros(); 6];
        for (i, d) in dN_dL.iter().enumerate() {
            grads[i] = tri.grad_l[0] * d[0] + tri.grad_l[1] * d[1] + tri.grad_l[2] * d[2];
        }
        grads
    }

    /// Evaluate a nodal field at a point within the element
    pub fn evaluate_at_point<T>(l: &[f64; 3], nodal_values: &[T; 6]) -> T
    where
        T: std::ops::Mul<f64, Output = T> + std::ops::Add<T, Output = T> + Copy,
    {
        let n = Self::shape_functions(l);
        let mut result = nodal_values[0] * n[0];
        for i in 1..6 {
            result = result + nodal_values[i] * n[i];
        }
        result
    }
}

/// Tri3 (linear triangle) basis: the barycentric coordinates themselves
pub struct Tri3Basis;

impl Tri3Basis {
    pub fn shape_functions(l: &[f64; 3]) -> [f64; 3] {
        *l
    }

    pub fn gradients(tri: &AffineTriangle) -> [Vector2<f64>; 3] {
        tri.grad_l
    }

    /// Constant gradient of a linear field from its vertex values
    pub fn field_gradient(tri: &AffineTriangle, values: &[f64; 3]) -> Vector2<f64> {
        tri.grad_l[0] * values[0] + tri.grad_l[1] * values[1] + tri.grad_l[2] * values[2]
    }
}
