/// Structured rectangle mesh generator
///
/// Each grid cell is split into two Tri6 triangles along the diagonal from the
/// lower-left to the upper-right corner. Edge midpoints are shared between
/// neighbouring elements through an edge cache.

use crate::error::{Result, SimulationError};
use crate::mesh::{Connectivity, Geometry, Mesh, PeriodicPairs, Tri6Element};
use std::collections::HashMap;

pub struct MeshGenerator;

impl MeshGenerator {
    /// Generate a `width × height` rectangle with `nx × ny` cells
    ///
    /// # Errors
    /// `InvalidGeometry` if a resolution is zero or an extent is not a positive
    /// finite number.
    pub fn rectangle(width: f64, height: f64, nx: usize, ny: usize) -> Result<Mesh> {
        if nx == 0 || ny == 0 {
            return Err(SimulationError::InvalidGeometry(format!(
                "resolution must be positive, got nx={}, ny={}",
                nx, ny
            )));
        }
        if !(width.is_finite() && width > 0.0 && height.is_finite() && height > 0.0) {
            return Err(SimulationError::InvalidGeometry(format!(
                "domain extents must be positive, got {} x {}",
                width, height
            )));
        }

        let mut geometry = Geometry::new();
        let mut connectivity = Connectivity::new();

        let dx = width / nx as f64;
        let dy = height / ny as f64;

        let mut vertex_map = HashMap::new();
        for iy in 0..=ny {
            for ix in 0..=nx {
                // Snap the last column/row onto the exact extents
                let x = if ix == nx { width } else { ix as f64 * dx };
                let y = if iy == ny { height } else { iy as f64 * dy };
                let node_id = geometry.add_node(x, y);
                vertex_map.insert((ix, iy), node_id);
            }
        }

        // Edge midpoint cache to avoid duplicates
        let mut edge_cache: HashMap<(usize, usize), usize> = HashMap::new();
        let mut midpoint = |geometry: &mut Geometry, v1: usize, v2: usize| -> usize {
            let key = if v1 < v2 { (v1, v2) } else { (v2, v1) };
            *edge_cache.entry(key).or_insert_with(|| {
                let p1 = geometry.nodes[v1];
                let p2 = geometry.nodes[v2];
                geometry.add_node((p1.x + p2.x) / 2.0, (p1.y + p2.y) / 2.0)
            })
        };

        for iy in 0..ny {
            for ix in 0..nx {
                let v00 = vertex_map[&(ix, iy)];
                let v10 = vertex_map[&(ix + 1, iy)];
                let v11 = vertex_map[&(ix + 1, iy + 1)];
                let v01 = vertex_map[&(ix, iy + 1)];

                // Both triangles counter-clockwise, sharing the v00-v11 diagonal
                for &(a, b, c) in &[(v00, v10, v11), (v00, v11, v01)] {
                    let m_ab = midpoint(&mut geometry, a, b);
                    let m_bc = midpoint(&mut geometry, b, c);
                    let m_ca = midpoint(&mut geometry, c, a);
                    connectivity.add_element(Tri6Element::new([a, b, c, m_ab, m_bc, m_ca]));
                }
            }
        }

        let periodic = PeriodicPairs::from_geometry(&geometry, width).ok_or_else(|| {
            SimulationError::InvalidGeometry("left and right edges do not pair up".to_string())
        })?;

        Ok(Mesh {
            geometry,
            connectivity,
            periodic,
            width,
            height,
            nx,
            ny,
        })
    }
}
