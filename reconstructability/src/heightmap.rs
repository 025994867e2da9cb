/// Airspace height map: per-cell maximum surface height over the mesh footprint
use crate::bounds::Aabb;
use crate::dds_writer::write_r32f_texture;
use crate::error::Result;
use log::{debug, info};
use nalgebra::Point3;
use rayon::prelude::*;
use std::path::Path;

/// Marker for cells no vertex projected into
pub const UNSET_HEIGHT: f32 = f32::NEG_INFINITY;

#[derive(Debug, Clone)]
pub struct HeightMap {
    pub width: usize,
    pub height: usize,
    pub resolution: f32,
    /// World position of cell (0, 0)
    pub origin: [f32; 2],
    /// Height subtracted during normalisation; world z of the sample grid floor
    pub ground_level: f32,
    data: Vec<f32>,
}

impl HeightMap {
    /// Rasterize, estimate the ground level and normalise in one go
    pub fn build(vertices: &[Point3<f32>], aabb: &Aabb, resolution: f32) -> Self {
        let mut map = Self::rasterize(vertices, aabb, resolution);
        let ground_level = map.estimate_ground_level();
        map.normalize(ground_level);
        info!(
            "Height map {}x{} at {:.2} resolution, ground level {:.3}",
            map.width, map.height, resolution, ground_level
        );
        map
    }

    /// Keep the highest vertex seen per cell; untouched cells stay `UNSET_HEIGHT`
    pub fn rasterize(vertices: &[Point3<f32>], aabb: &Aabb, resolution: f32) -> Self {
        let dims = aabb.dimensions();
        let width = (dims.x / resolution).ceil() as usize + 1;
        let height = (dims.y / resolution).ceil() as usize + 1;
        let mut data = vec![UNSET_HEIGHT; width * height];

        for v in vertices {
            let x = ((v.x - aabb.min.x) / resolution).floor();
            let y = ((v.y - aabb.min.y) / resolution).floor();
            assert!(
                x >= 0.0 && y >= 0.0 && (x as usize) < width && (y as usize) < height,
                "vertex ({}, {}) outside height map footprint",
                v.x,
                v.y
            );
            let cell = &mut data[y as usize * width + x as usize];
            if v.z > *cell {
                *cell = v.z;
            }
        }

        debug!(
            "Rasterized {} vertices into {}x{} cells",
            vertices.len(),
            width,
            height
        );

        Self {
            width,
            height,
            resolution,
            origin: [aabb.min.x, aabb.min.y],
            ground_level: 0.0,
            data,
        }
    }

    /// Minimum finite cell value, computed with a parallel reduction
    pub fn estimate_ground_level(&self) -> f32 {
        self.data
            .par_chunks(4096)
            .map(|chunk| {
                chunk
                    .iter()
                    .copied()
                    .filter(|h| h.is_finite())
                    .fold(f32::INFINITY, f32::min)
            })
            .reduce_with(f32::min)
            .filter(|g| g.is_finite())
            .unwrap_or(0.0)
    }

    /// Subtract `ground_level` from every finite cell; unset cells become exactly zero
    pub fn normalize(&mut self, ground_level: f32) {
        self.data.par_iter_mut().for_each(|h| {
            *h = if h.is_finite() { *h - ground_level } else { 0.0 };
        });
        self.ground_level = ground_level;
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Export as a single-channel float texture
    pub fn write_dds(&self, path: &Path) -> Result<()> {
        write_r32f_texture(path, self.width, self.height, &self.data)?;
        info!("Saved {} (R32F height map)", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(max_x: f32, max_y: f32) -> Aabb {
        Aabb::from_corners(Point3::new(0.0, 0.0, 0.0), Point3::new(max_x, max_y, 10.0))
    }

    #[test]
    fn test_dimensions() {
        let map = HeightMap::rasterize(&[], &bounds(10.0, 4.5), 1.0);
        assert_eq!(map.width, 11);
        assert_eq!(map.height, 6);
        assert!(map.data().iter().all(|&h| h == UNSET_HEIGHT));
    }

    #[test]
    fn test_rasterize_keeps_cell_maximum() {
        let vertices = vec![
            Point3::new(0.2, 0.2, 3.0),
            Point3::new(0.7, 0.9, 7.0),
            Point3::new(0.5, 0.5, 5.0),
            Point3::new(2.5, 1.5, 2.0),
        ];
        let map = HeightMap::rasterize(&vertices, &bounds(3.0, 2.0), 1.0);
        assert_eq!(map.get(0, 0), 7.0);
        assert_eq!(map.get(2, 1), 2.0);
        assert_eq!(map.get(1, 1), UNSET_HEIGHT);
    }

    #[test]
    fn test_normalisation_zeroes_ground_and_unset_cells() {
        let vertices = vec![
            Point3::new(0.0, 0.0, 4.0),
            Point3::new(1.0, 0.0, 6.5),
            Point3::new(2.0, 2.0, 9.0),
        ];
        let map = HeightMap::build(&vertices, &bounds(2.0, 2.0), 1.0);
        assert_eq!(map.ground_level, 4.0);
        assert_eq!(map.get(0, 0), 0.0);
        assert_eq!(map.get(1, 0), 2.5);
        assert_eq!(map.get(2, 2), 5.0);
        // no vertex landed here
        assert_eq!(map.get(1, 1), 0.0);

        let min = map.data().iter().copied().fold(f32::INFINITY, f32::min);
        assert_eq!(min, 0.0);
    }

    #[test]
    #[should_panic(expected = "outside height map footprint")]
    fn test_vertex_outside_footprint_panics() {
        let _ = HeightMap::rasterize(&[Point3::new(-5.0, 0.0, 1.0)], &bounds(2.0, 2.0), 1.0);
    }

    #[test]
    fn test_empty_map_ground_level_defaults_to_zero() {
        let map = HeightMap::rasterize(&[], &bounds(2.0, 2.0), 1.0);
        assert_eq!(map.estimate_ground_level(), 0.0);
    }
}
