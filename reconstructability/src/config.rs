/// Run settings for both pipelines, loadable from JSON and overridden by command-line flags
use crate::error::{PlannerError, Result};
use constants::histogram::{AGGREGATE_ROWS, DEFAULT_MAX_CAMERAS, DEFAULT_SPHERE_SUBDIVISIONS};
use constants::sampling::{
    DEFAULT_MAX_ALTITUDE, DEFAULT_MAX_DISTANCE, DEFAULT_MIN_ALTITUDE, DEFAULT_RESOLUTION,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Guidance volume sampling parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SamplerConfig {
    /// Voxel and height-map cell size in world units
    pub resolution: f32,
    /// Proxy points farther than this from a sample are ignored
    pub max_distance: f32,
    /// Lowest sample altitude above ground level
    pub min_altitude: f32,
    /// Highest sample altitude above ground level
    pub max_altitude: f32,
    /// Icosphere subdivision level of the direction basis
    pub sphere_subdivisions: u32,
    /// Worker count, 0 for one per core
    pub workers: usize,
    pub heightmap_out: Option<PathBuf>,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            max_distance: DEFAULT_MAX_DISTANCE,
            min_altitude: DEFAULT_MIN_ALTITUDE,
            max_altitude: DEFAULT_MAX_ALTITUDE,
            sphere_subdivisions: DEFAULT_SPHERE_SUBDIVISIONS,
            workers: 0,
            heightmap_out: None,
        }
    }
}

impl SamplerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "resolution must be positive, got {}",
                self.resolution
            )));
        }
        if !(self.max_distance.is_finite() && self.max_distance > 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "max distance must be positive, got {}",
                self.max_distance
            )));
        }
        if !(self.min_altitude.is_finite() && self.min_altitude >= 0.0) {
            return Err(PlannerError::InvalidConfig(format!(
                "min altitude must be non-negative, got {}",
                self.min_altitude
            )));
        }
        if !(self.max_altitude.is_finite() && self.max_altitude > self.min_altitude) {
            return Err(PlannerError::InvalidConfig(format!(
                "max altitude {} must exceed min altitude {}",
                self.max_altitude, self.min_altitude
            )));
        }
        if self.sphere_subdivisions > 6 {
            return Err(PlannerError::InvalidConfig(format!(
                "sphere subdivision level {} is too fine (max 6)",
                self.sphere_subdivisions
            )));
        }
        Ok(())
    }
}

/// Trajectory evaluation parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Row capacity per point, including the two aggregate rows
    pub max_cameras: usize,
    pub export: Option<PathBuf>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            max_cameras: DEFAULT_MAX_CAMERAS,
            export: None,
        }
    }
}

impl EvaluatorConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_cameras < AGGREGATE_ROWS {
            return Err(PlannerError::InvalidConfig(format!(
                "max cameras must be at least {}, got {}",
                AGGREGATE_ROWS, self.max_cameras
            )));
        }
        Ok(())
    }
}
