/// Airspace voxelization constrained by the height map
use crate::bounds::Aabb;
use crate::config::SamplerConfig;
use crate::error::{PlannerError, Result};
use crate::heightmap::HeightMap;
use constants::sampling::MAX_GRID_VOXELS;
use log::debug;
use nalgebra::{Point3, Vector3};

/// Sample positions over the footprint, sparse in z.
#[derive(Debug, Clone)]
pub struct SampleGrid {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub resolution: f32,
    /// World position of voxel (0, 0, 0)
    pub origin: Point3<f32>,
    /// Occupied voxels in (x, y, z) order
    pub positions: Vec<[u32; 3]>,
}

impl SampleGrid {
    /// Refuse footprints and ceilings whose dense grid would exceed `MAX_GRID_VOXELS`.
    /// Run before the height map is allocated.
    pub fn check_extent(aabb: &Aabb, config: &SamplerConfig) -> Result<()> {
        let resolution = config.resolution as f64;
        let dims = aabb.dimensions();
        let cells = |span: f32| (span as f64 / resolution).ceil() + 1.0;
        let voxels = cells(dims.x) * cells(dims.y) * cells(config.max_altitude);
        if !voxels.is_finite() || voxels > MAX_GRID_VOXELS as f64 {
            return Err(PlannerError::InvalidConfig(format!(
                "sample grid of {:.0} voxels at resolution {} exceeds the {} voxel limit",
                voxels, config.resolution, MAX_GRID_VOXELS
            )));
        }
        Ok(())
    }

    /// Every voxel at or above `max(height map, min altitude)`, up to the configured ceiling
    pub fn enumerate(height_map: &HeightMap, config: &SamplerConfig) -> Self {
        let resolution = config.resolution;
        let depth = (config.max_altitude / resolution).ceil() as u32 + 1;

        let mut positions = Vec::new();
        for x in 0..height_map.width {
            for y in 0..height_map.height {
                let min_height = height_map.get(x, y).max(config.min_altitude);
                for z in 0..depth {
                    if (z as f32) * resolution < min_height {
                        continue;
                    }
                    positions.push([x as u32, y as u32, z]);
                }
            }
        }

        let grid = Self {
            width: height_map.width as u32,
            height: height_map.height as u32,
            depth,
            resolution,
            origin: Point3::new(
                height_map.origin[0],
                height_map.origin[1],
                height_map.ground_level,
            ),
            positions,
        };
        debug!(
            "Sample grid {}x{}x{}: {} of {} voxels in free airspace",
            grid.width,
            grid.height,
            grid.depth,
            grid.len(),
            grid.capacity()
        );
        grid
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Voxel count of the full (dense) grid
    pub fn capacity(&self) -> usize {
        self.width as usize * self.height as usize * self.depth as usize
    }

    pub fn world_position(&self, voxel: [u32; 3]) -> Point3<f32> {
        self.origin + Vector3::new(voxel[0] as f32, voxel[1] as f32, voxel[2] as f32) * self.resolution
    }

    /// Box spanned by the voxel centres of the full grid
    pub fn bounds(&self) -> Aabb {
        let extent = Vector3::new(
            self.width.saturating_sub(1) as f32,
            self.height.saturating_sub(1) as f32,
            self.depth.saturating_sub(1) as f32,
        ) * self.resolution;
        Aabb::from_corners(self.origin, self.origin + extent)
    }
}
