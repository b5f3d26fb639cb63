/// Gaussian quadrature rules for triangular elements
#[derive(Debug, Clone)]
pub struct GaussQuadrature {
    /// Integration point coordinates in barycentric form [L0, L1, L2]
    pub points: Vec<[f64; 3]>,
    /// Integration weights (sum to the reference triangle area, 1/2)
    pub weights: Vec<f64>,
}

impl GaussQuadrature {
    /// 1-point quadrature (degree 1 exactness) - centroid rule
    pub fn tri_1point() -> Self {
        Self {
            points: vec![[1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0]],
            weights: vec![0.5],
        }
    }

    /// 3-point quadrature (degree 2 exactness)
    ///
    /// Exact for P1 mass matrices and P2 stiffness on straight triangles
    pub fn tri_3point() -> Self {
        let a = 2.0 / 3.0;
        let b = 1.0 / 6.0;
        let w = 1.0 / 6.0;

        Self {
            points: vec![[a, b, b], [b, a, b], [b, b, a]],
            weights: vec![w, w, w],
        }
    }

    /// 6-point Dunavant quadrature (degree 4 exactness)
    ///
    /// Used for the coupled residual: the advection term v·∇T tested against
    /// P1 functions is cubic on each element.
    pub fn tri_6point() -> Self {
        let a1 = 0.445948490915965;
        let b1 = 0.108103018168070;
        let w1 = 0.223381589678011 / 2.0;
        let a2 = 0.091576213509771;
        let b2 = 0.816847572980459;
        let w2 = 0.109951743655322 / 2.0;

        Self {
            points: vec![
                [a1, a1, b1],
                [a1, b1, a1],
                [b1, a1, a1],
                [a2, a2, b2],
                [a2, b2, a2],
                [b2, a2, a2],
            ],
            weights: vec![w1, w1, w1, w2, w2, w2],
        }
    }

    /// Get the number of integration points
    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}
