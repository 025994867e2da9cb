/// Unit-sphere tessellation used as the fixed direction-bin basis
use nalgebra::Vector3;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct DirectionBasis {
    pub directions: Vec<Vector3<f32>>,
    pub faces: Vec<[u32; 3]>,
}

impl DirectionBasis {
    /// Subdivided icosahedron; level `n` has `10 * 4^n + 2` vertices
    pub fn tessellate(subdivisions: u32) -> Self {
        let t = (1.0 + 5.0f32.sqrt()) / 2.0;
        let mut directions: Vec<Vector3<f32>> = [
            (-1.0, t, 0.0),
            (1.0, t, 0.0),
            (-1.0, -t, 0.0),
            (1.0, -t, 0.0),
            (0.0, -1.0, t),
            (0.0, 1.0, t),
            (0.0, -1.0, -t),
            (0.0, 1.0, -t),
            (t, 0.0, -1.0),
            (t, 0.0, 1.0),
            (-t, 0.0, -1.0),
            (-t, 0.0, 1.0),
        ]
        .iter()
        .map(|&(x, y, z)| Vector3::new(x, y, z).normalize())
        .collect();

        let mut faces: Vec<[u32; 3]> = vec![
            [0, 11, 5], [0, 5, 1], [0, 1, 7], [0, 7, 10], [0, 10, 11],
            [1, 5, 9], [5, 11, 4], [11, 10, 2], [10, 7, 6], [7, 1, 8],
            [3, 9, 4], [3, 4, 2], [3, 2, 6], [3, 6, 8], [3, 8, 9],
            [4, 9, 5], [2, 4, 11], [6, 2, 10], [8, 6, 7], [9, 8, 1],
        ];

        for _ in 0..subdivisions {
            let mut midpoints: HashMap<(u32, u32), u32> = HashMap::new();
            let mut next = Vec::with_capacity(faces.len() * 4);

            for &[a, b, c] in &faces {
                let ab = midpoint(&mut directions, &mut midpoints, a, b);
                let bc = midpoint(&mut directions, &mut midpoints, b, c);
                let ca = midpoint(&mut directions, &mut midpoints, c, a);
                next.push([a, ab, ca]);
                next.push([b, bc, ab]);
                next.push([c, ca, bc]);
                next.push([ab, bc, ca]);
            }
            faces = next;
        }

        Self { directions, faces }
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }
}

fn midpoint(
    directions: &mut Vec<Vector3<f32>>,
    cache: &mut HashMap<(u32, u32), u32>,
    a: u32,
    b: u32,
) -> u32 {
    let key = if a < b { (a, b) } else { (b, a) };
    *cache.entry(key).or_insert_with(|| {
        let mid = (directions[a as usize] + directions[b as usize]).normalize();
        directions.push(mid);
        (directions.len() - 1) as u32
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_counts_per_level() {
        assert_eq!(DirectionBasis::tessellate(0).len(), 12);
        assert_eq!(DirectionBasis::tessellate(1).len(), 42);
        assert_eq!(DirectionBasis::tessellate(3).len(), 642);
        assert_eq!(DirectionBasis::tessellate(3).faces.len(), 1280);
    }

    #[test]
    fn test_directions_are_unit_length() {
        let basis = DirectionBasis::tessellate(2);
        for d in &basis.directions {
            assert!((d.norm() - 1.0).abs() < 1e-5);
        }
    }
}
