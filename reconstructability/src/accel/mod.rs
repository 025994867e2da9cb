/// Acceleration-structure adapter: host-built trees and their read-only device mirrors
pub mod bvh;
pub mod kdtree;

use crate::geometry::TriangleMesh;
use crate::sphere::DirectionBasis;
use bvh::{RayTree, RayTreeView};
use kdtree::PointTree;
use log::info;

/// Owns the ray-intersection tree over the proxy mesh and, for guidance sampling, the
/// nearest-neighbour tree over the direction basis. Neither changes after construction.
#[derive(Debug)]
pub struct AccelerationAdapter {
    ray_tree: RayTree,
    basis_tree: Option<PointTree>,
}

impl AccelerationAdapter {
    pub fn from_mesh(mesh: &TriangleMesh) -> Self {
        let ray_tree = RayTree::build(mesh);
        info!(
            "Ray tree ready: {} triangles in {} nodes",
            ray_tree.triangle_count(),
            ray_tree.node_count()
        );
        Self {
            ray_tree,
            basis_tree: None,
        }
    }

    pub fn with_direction_basis(mesh: &TriangleMesh, basis: &DirectionBasis) -> Self {
        let mut adapter = Self::from_mesh(mesh);
        adapter.basis_tree = Some(PointTree::build(&basis.directions));
        info!("Direction basis tree ready: {} bins", basis.len());
        adapter
    }

    /// Read-only mirror usable from any number of workers at once
    pub fn upload(&self) -> DeviceAccel<'_> {
        DeviceAccel {
            rays: self.ray_tree.view(),
            basis: self.basis_tree.as_ref(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct DeviceAccel<'a> {
    pub rays: RayTreeView<'a>,
    pub basis: Option<&'a PointTree>,
}
