use nalgebra::Point2;
use super::topology::Connectivity;

/// Absolute tolerance used by the boundary predicates
pub const NEAR_TOLERANCE: f64 = 1e-10;

/// Floating-point equality within [`NEAR_TOLERANCE`]
pub fn near(a: f64, b: f64) -> bool {
    (a - b).abs() < NEAR_TOLERANCE
}

/// Geometric information for the mesh
#[derive(Debug, Clone)]
pub struct Geometry {
    /// Node coordinates
    pub nodes: Vec<Point2<f64>>,
}

impl Geometry {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn add_node(&mut self, x: f64, y: f64) -> usize {
        let idx = self.nodes.len();
        self.nodes.push(Point2::new(x, y));
        idx
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_node(&self, idx: usize) -> Option<&Point2<f64>> {
        self.nodes.get(idx)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        Self::new()
    }
}

/// Named edges of the rectangular domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundaryRegion {
    /// y = height
    Top,
    /// y = 0
    Bottom,
    /// x = 0
    Left,
    /// x = width
    Right,
}

impl BoundaryRegion {
    /// Coordinate test against the domain extents; false outside tolerance
    pub fn contains(&self, p: &Point2<f64>, width: f64, height: f64) -> bool {
        match self {
            BoundaryRegion::Top => near(p.y, height),
            BoundaryRegion::Bottom => near(p.y, 0.0),
            BoundaryRegion::Left => near(p.x, 0.0),
            BoundaryRegion::Right => near(p.x, width),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BoundaryRegion::Top => "top",
            BoundaryRegion::Bottom => "bottom",
            BoundaryRegion::Left => "left",
            BoundaryRegion::Right => "right",
        }
    }
}

/// Left/right node identification, built once from geometry
///
/// `slave_to_master[n]` is `Some(m)` when node `n` sits on the right edge and
/// `m` is the left-edge node at the same height.
#[derive(Debug, Clone)]
pub struct PeriodicPairs {
    slave_to_master: Vec<Option<usize>>,
    pairs: Vec<(usize, usize)>,
}

impl PeriodicPairs {
    /// Match every right-edge node to the left-edge node with the same y
    ///
    /// Returns `None` when the two edges do not carry matching node sets.
    pub fn from_geometry(geometry: &Geometry, width: f64) -> Option<Self> {
        let mut left: Vec<(f64, usize)> = Vec::new();
        let mut right: Vec<(f64, usize)> = Vec::new();

        for (id, p) in geometry.nodes.iter().enumerate() {
            if near(p.x, 0.0) {
                left.push((p.y, id));
            } else if near(p.x, width) {
                right.push((p.y, id));
            }
        }

        if left.len() != right.len() {
            return None;
        }

        left.sort_by(|a, b| a.0.total_cmp(&b.0));
        right.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut slave_to_master = vec![None; geometry.num_nodes()];
        let mut pairs = Vec::with_capacity(left.len());
        for (&(yl, l), &(yr, r)) in left.iter().zip(right.iter()) {
            if !near(yl, yr) {
                return None;
            }
            slave_to_master[r] = Some(l);
            pairs.push((r, l));
        }

        Some(Self { slave_to_master, pairs })
    }

    /// Representative node: the left partner for right-edge nodes, itself otherwise
    pub fn master(&self, node: usize) -> usize {
        self.slave_to_master[node].unwrap_or(node)
    }

    pub fn is_slave(&self, node: usize) -> bool {
        self.slave_to_master[node].is_some()
    }

    /// (right node, left node) pairs sorted by height
    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Complete mesh with geometry, topology and the periodic seam
#[derive(Debug, Clone)]
pub struct Mesh {
    pub geometry: Geometry,
    pub connectivity: Connectivity,
    pub periodic: PeriodicPairs,
    pub width: f64,
    pub height: f64,
    pub nx: usize,
    pub ny: usize,
}

impl Mesh {
    pub fn num_nodes(&self) -> usize {
        self.geometry.num_nodes()
    }

    pub fn num_elements(&self) -> usize {
        self.connectivity.num_elements()
    }

    pub fn node(&self, id: usize) -> &Point2<f64> {
        &self.geometry.nodes[id]
    }

    /// Boundary predicate evaluated on a node
    pub fn on_boundary(&self, node: usize, region: BoundaryRegion) -> bool {
        region.contains(&self.geometry.nodes[node], self.width, self.height)
    }

    /// Depth below the top surface
    pub fn depth(&self, p: &Point2<f64>) -> f64 {
        self.height - p.y
    }

    /// Smallest vertex-to-vertex edge length
    pub fn min_edge_length(&self) -> f64 {
        let mut h_min = f64::INFINITY;
        for elem in &self.connectivity.tri6_elements {
            for (a, b) in crate::mesh::Tri6Element::edges() {
                let pa = &self.geometry.nodes[elem.nodes[a]];
                let pb = &self.geometry.nodes[elem.nodes[b]];
                h_min = h_min.min((pa - pb).norm());
            }
        }
        h_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_near_is_silent_outside_tolerance() {
        assert!(near(0.4, 0.4 + 1e-12));
        assert!(!near(0.4, 0.41));
        assert!(!near(f64::NAN, 0.0));
    }

    #[test]
    fn test_region_predicates() {
        let p = Point2::new(1.0, 0.4);
        assert!(BoundaryRegion::Top.contains(&p, 1.0, 0.4));
        assert!(BoundaryRegion::Right.contains(&p, 1.0, 0.4));
        assert!(!BoundaryRegion::Bottom.contains(&p, 1.0, 0.4));
        assert!(!BoundaryRegion::Left.contains(&p, 1.0, 0.4));
    }

    #[test]
    fn test_periodic_pairs_match_heights() {
        let mut geometry = Geometry::new();
        geometry.add_node(0.0, 0.0); // 0
        geometry.add_node(2.0, 0.5); // 1
        geometry.add_node(1.0, 0.2); // 2 (interior)
        geometry.add_node(0.0, 0.5); // 3
        geometry.add_node(2.0, 0.0); // 4

        let pairs = PeriodicPairs::from_geometry(&geometry, 2.0).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs.master(4), 0);
        assert_eq!(pairs.master(1), 3);
        assert_eq!(pairs.master(2), 2);
        assert!(!pairs.is_slave(0));
    }

    #[test]
    fn test_periodic_pairs_reject_mismatch() {
        let mut geometry = Geometry::new();
        geometry.add_node(0.0, 0.0);
        geometry.add_node(1.0, 0.3);
        assert!(PeriodicPairs::from_geometry(&geometry, 1.0).is_none());
    }
}
