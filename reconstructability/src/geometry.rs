/// Proxy geometry shared read-only by all workers
use crate::bounds::Aabb;
use nalgebra::{Point3, Vector3};

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    pub vertices: Vec<Point3<f32>>,
    pub faces: Vec<[u32; 3]>,
    pub normals: Option<Vec<Vector3<f32>>>,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Point3<f32>>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            normals: None,
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Triangle corner positions; faces referencing missing vertices are skipped
    pub fn triangles(&self) -> impl Iterator<Item = [Point3<f32>; 3]> + '_ {
        self.faces.iter().filter_map(|f| {
            Some([
                *self.vertices.get(f[0] as usize)?,
                *self.vertices.get(f[1] as usize)?,
                *self.vertices.get(f[2] as usize)?,
            ])
        })
    }
}

/// Ordered surface samples with normals.
/// A zero normal means the orientation is unknown.
#[derive(Debug, Clone, Default)]
pub struct ProxyCloud {
    pub positions: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub values: Option<Vec<f32>>,
}

impl ProxyCloud {
    pub fn new(positions: Vec<Point3<f32>>, normals: Vec<Vector3<f32>>) -> Self {
        debug_assert_eq!(positions.len(), normals.len());
        Self {
            positions,
            normals,
            values: None,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }
}
