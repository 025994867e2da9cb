/// Axis-aligned bounds tracking for meshes and sample grids
use crate::error::{PlannerError, Result};
use nalgebra::{Point3, Vector3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new()
    }
}

impl Aabb {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min: Point3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY),
            max: Point3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY),
        }
    }

    pub fn from_corners(min: Point3<f32>, max: Point3<f32>) -> Self {
        Self { min, max }
    }

    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f32>>) -> Self {
        let mut bounds = Self::new();
        for p in points {
            bounds.update(p);
        }
        bounds
    }

    /// Update bounds with a new point
    pub fn update(&mut self, p: &Point3<f32>) {
        for i in 0..3 {
            self.min[i] = self.min[i].min(p[i]);
            self.max[i] = self.max[i].max(p[i]);
        }
    }

    pub fn merge(mut self, other: &Aabb) -> Self {
        self.update(&other.min);
        self.update(&other.max);
        self
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|i| self.min[i] > self.max[i])
    }

    /// Get world space dimensions
    pub fn dimensions(&self) -> Vector3<f32> {
        if self.is_empty() {
            return Vector3::zeros();
        }
        self.max - self.min
    }

    pub fn volume(&self) -> f32 {
        let d = self.dimensions();
        d.x * d.y * d.z
    }

    pub fn contains(&self, p: &Point3<f32>) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Raise the upper z bound so the box spans `altitude` above its floor.
    /// Flat airspace meshes only describe the footprint; the flyable column above them
    /// is what gets sampled.
    pub fn extended_to_altitude(mut self, altitude: f32) -> Self {
        if !self.is_empty() {
            self.max.z = self.max.z.max(self.min.z + altitude);
        }
        self
    }

    /// Reject bounds that cannot hold a single sample cell
    pub fn validate(&self) -> Result<()> {
        let volume = self.volume();
        if self.is_empty() || !volume.is_finite() || volume <= 0.0 {
            return Err(PlannerError::DegenerateBounds { volume });
        }
        Ok(())
    }
}
