/// Flat bounding volume hierarchy over proxy mesh triangles for occlusion queries.
///
/// Internal node: `left_or_first` = left child index (right child follows), `count = 0`.
/// Leaf node: `left_or_first` = first triangle index, `count > 0`.
use crate::bounds::Aabb;
use crate::geometry::TriangleMesh;
use log::debug;
use nalgebra::{Point3, Vector3};

const LEAF_SIZE: usize = 4;
/// Initial traversal stack size; deeper trees grow it
const TRAVERSAL_STACK: usize = 64;
/// Hits closer than this to the ray origin are ignored
pub const RAY_EPSILON: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
pub struct BvhNode {
    pub bounds: Aabb,
    pub left_or_first: u32,
    pub count: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct Triangle {
    pub v0: Point3<f32>,
    pub v1: Point3<f32>,
    pub v2: Point3<f32>,
}

impl Triangle {
    pub fn new(corners: [Point3<f32>; 3]) -> Self {
        Self {
            v0: corners[0],
            v1: corners[1],
            v2: corners[2],
        }
    }

    pub fn bounds(&self) -> Aabb {
        Aabb::from_points([&self.v0, &self.v1, &self.v2])
    }

    pub fn centroid(&self) -> Point3<f32> {
        Point3::from((self.v0.coords + self.v1.coords + self.v2.coords) / 3.0)
    }

    /// Möller–Trumbore; returns the ray parameter of the hit
    pub fn intersect(&self, origin: &Point3<f32>, dir: &Vector3<f32>) -> Option<f32> {
        let e1 = self.v1 - self.v0;
        let e2 = self.v2 - self.v0;
        let p = dir.cross(&e2);
        let det = e1.dot(&p);
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;
        let s = origin - self.v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }
        let q = s.cross(&e1);
        let v = dir.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }
        Some(e2.dot(&q) * inv_det)
    }
}

/// Host-built ray-intersection tree. Immutable after `build`.
#[derive(Debug, Clone, Default)]
pub struct RayTree {
    nodes: Vec<BvhNode>,
    triangles: Vec<Triangle>,
}

impl RayTree {
    pub fn build(mesh: &TriangleMesh) -> Self {
        let mut triangles: Vec<Triangle> = mesh.triangles().map(Triangle::new).collect();
        let mut nodes = Vec::with_capacity(2 * triangles.len() / LEAF_SIZE + 1);

        if !triangles.is_empty() {
            nodes.push(BvhNode {
                bounds: Aabb::new(),
                left_or_first: 0,
                count: 0,
            });
            let count = triangles.len();
            build_node(&mut nodes, &mut triangles, 0, 0, count);
        }

        debug!(
            "Built ray tree: {} triangles, {} nodes",
            triangles.len(),
            nodes.len()
        );
        Self { nodes, triangles }
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn view(&self) -> RayTreeView<'_> {
        RayTreeView {
            nodes: &self.nodes,
            triangles: &self.triangles,
        }
    }
}

fn build_node(
    nodes: &mut Vec<BvhNode>,
    triangles: &mut [Triangle],
    node_idx: usize,
    first: usize,
    count: usize,
) {
    let range = &mut triangles[first..first + count];
    let bounds = range
        .iter()
        .fold(Aabb::new(), |acc, tri| acc.merge(&tri.bounds()));
    let mut centroid_bounds = Aabb::new();
    for tri in range.iter() {
        centroid_bounds.update(&tri.centroid());
    }

    let extent = centroid_bounds.dimensions();
    let axis = extent.imax();

    if count <= LEAF_SIZE || extent[axis] <= 0.0 {
        nodes[node_idx] = BvhNode {
            bounds,
            left_or_first: first as u32,
            count: count as u32,
        };
        return;
    }

    let mid = count / 2;
    range.select_nth_unstable_by(mid, |a, b| a.centroid()[axis].total_cmp(&b.centroid()[axis]));

    let left = nodes.len();
    let placeholder = BvhNode {
        bounds: Aabb::new(),
        left_or_first: 0,
        count: 0,
    };
    nodes.push(placeholder);
    nodes.push(placeholder);
    nodes[node_idx] = BvhNode {
        bounds,
        left_or_first: left as u32,
        count: 0,
    };

    build_node(nodes, triangles, left, first, mid);
    build_node(nodes, triangles, left + 1, first + mid, count - mid);
}

/// Read-only mirror of a `RayTree`, shared by every worker
#[derive(Debug, Clone, Copy)]
pub struct RayTreeView<'a> {
    nodes: &'a [BvhNode],
    triangles: &'a [Triangle],
}

impl RayTreeView<'_> {
    /// True if any triangle is hit strictly between `RAY_EPSILON` and `t_max`.
    /// `t_max` is measured in multiples of `dir`.
    pub fn occluded(&self, origin: &Point3<f32>, dir: &Vector3<f32>, t_max: f32) -> bool {
        if self.nodes.is_empty() || t_max <= RAY_EPSILON {
            return false;
        }
        let inv_dir = dir.map(|d| if d != 0.0 { 1.0 / d } else { f32::INFINITY });

        let mut stack = Vec::with_capacity(TRAVERSAL_STACK);
        stack.push(0u32);

        while let Some(idx) = stack.pop() {
            let node = &self.nodes[idx as usize];
            if !slab_hit(&node.bounds, origin, &inv_dir, t_max) {
                continue;
            }

            if node.count > 0 {
                let first = node.left_or_first as usize;
                let hit = self.triangles[first..first + node.count as usize]
                    .iter()
                    .filter_map(|tri| tri.intersect(origin, dir))
                    .any(|t| t > RAY_EPSILON && t < t_max);
                if hit {
                    return true;
                }
            } else {
                stack.push(node.left_or_first);
                stack.push(node.left_or_first + 1);
            }
        }
        false
    }
}

/// Slab-method ray–box overlap restricted to `[0, t_max]`
fn slab_hit(bounds: &Aabb, origin: &Point3<f32>, inv_dir: &Vector3<f32>, t_max: f32) -> bool {
    let mut t_enter = 0.0f32;
    let mut t_exit = t_max;
    for i in 0..3 {
        let t1 = (bounds.min[i] - origin[i]) * inv_dir[i];
        let t2 = (bounds.max[i] - origin[i]) * inv_dir[i];
        t_enter = t_enter.max(t1.min(t2));
        t_exit = t_exit.min(t1.max(t2));
    }
    t_enter <= t_exit
}
