/// A 6-node quadratic triangle (Tri6)
///
/// Node numbering:
/// Vertices: 0, 1, 2 (counter-clockwise)
/// Edge midpoints:
///   3: midpoint of edge 0-1
///   4: midpoint of edge 1-2
///   5: midpoint of edge 2-0
#[derive(Debug, Clone)]
pub struct Tri6Element {
    /// Global node indices for this element (6 nodes)
    pub nodes: [usize; 6],
}

impl Tri6Element {
    pub fn new(nodes: [usize; 6]) -> Self {
        Self { nodes }
    }

    /// Get the vertex node indices (first 3 nodes)
    pub fn vertices(&self) -> [usize; 3] {
        [self.nodes[0], self.nodes[1], self.nodes[2]]
    }

    /// Get the edge midpoint node indices (last 3 nodes)
    pub fn edge_nodes(&self) -> [usize; 3] {
        [self.nodes[3], self.nodes[4], self.nodes[5]]
    }

    /// Get edges as pairs of local vertex indices, ordered like the midpoints
    pub fn edges() -> [(usize, usize); 3] {
        [
            (0, 1), // edge 0 -> node 3
            (1, 2), // edge 1 -> node 4
            (2, 0), // edge 2 -> node 5
        ]
    }
}

/// Connectivity information for the mesh
#[derive(Debug, Clone)]
pub struct Connectivity {
    pub tri6_elements: Vec<Tri6Element>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self {
            tri6_elements: Vec::new(),
        }
    }

    pub fn add_element(&mut self, element: Tri6Element) {
        self.tri6_elements.push(element);
    }

    pub fn num_elements(&self) -> usize {
        self.tri6_elements.len()
    }

    /// Get all unique vertex (corner) nodes from all elements
    pub fn corner_nodes(&self) -> Vec<usize> {
        use std::collections::BTreeSet;
        let mut corners = BTreeSet::new();
        for elem in &self.tri6_elements {
            for &node in &elem.nodes[0..3] {
                corners.insert(node);
            }
        }
        corners.into_iter().collect()
    }

    /// For each node, the pair of vertices whose edge it bisects (None for vertices)
    ///
    /// Used to evaluate linear fields at quadratic nodes.
    pub fn midpoint_parents(&self, num_nodes: usize) -> Vec<Option<(usize, usize)>> {
        let mut parents = vec![None; num_nodes];
        for elem in &self.tri6_elements {
            for (k, (a, b)) in Tri6Element::edges().iter().enumerate() {
                parents[elem.nodes[3 + k]] = Some((elem.nodes[*a], elem.nodes[*b]));
            }
        }
        parents
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}
