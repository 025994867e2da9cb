/// Nearest-neighbour tree over a fixed point set
use kiddo::{ImmutableKdTree, SquaredEuclidean};
use log::debug;
use nalgebra::Vector3;

pub struct PointTree {
    tree: Option<ImmutableKdTree<f32, 3>>,
    points: Vec<[f32; 3]>,
}

impl std::fmt::Debug for PointTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PointTree")
            .field("points", &self.points.len())
            .finish()
    }
}

impl PointTree {
    pub fn build(points: &[Vector3<f32>]) -> Self {
        let points: Vec<[f32; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = if points.is_empty() {
            None
        } else {
            Some(ImmutableKdTree::new_from_slice(&points))
        };
        debug!("Built point tree over {} points", points.len());
        Self { tree, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, idx: usize) -> Vector3<f32> {
        let [x, y, z] = self.points[idx];
        Vector3::new(x, y, z)
    }

    /// Index and squared distance of the closest point
    pub fn nearest(&self, query: &Vector3<f32>) -> Option<(usize, f32)> {
        let tree = self.tree.as_ref()?;
        let nn = tree.nearest_one::<SquaredEuclidean>(&[query.x, query.y, query.z]);
        Some((nn.item as usize, nn.distance))
    }

    /// Indices of all points within `squared_radius` of `query`, unordered
    pub fn within(&self, query: &Vector3<f32>, squared_radius: f32) -> Vec<usize> {
        match &self.tree {
            Some(tree) => tree
                .within_unsorted::<SquaredEuclidean>(&[query.x, query.y, query.z], squared_radius)
                .into_iter()
                .map(|nn| nn.item as usize)
                .collect(),
            None => Vec::new(),
        }
    }
}
