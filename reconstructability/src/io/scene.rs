/// Camera trajectory ingestion from a JSON scene description
use crate::camera::CameraPose;
use crate::error::{PlannerError, Result};
use log::{info, warn};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const SCENE_FILE_NAME: &str = "scene.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SceneFile {
    pub views: Vec<ViewEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ViewEntry {
    pub id: u32,
    #[serde(default)]
    pub name: String,
    /// `None` for views that never received a pose
    #[serde(default)]
    pub camera: Option<CameraEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CameraEntry {
    pub focal_length: f32,
    #[serde(default = "default_pixel_aspect")]
    pub pixel_aspect: f32,
    #[serde(default = "default_principal_point")]
    pub principal_point: [f32; 2],
    /// World-to-camera rotation, row-major
    pub rotation: [f32; 9],
    pub translation: [f32; 3],
}

fn default_pixel_aspect() -> f32 {
    1.0
}

fn default_principal_point() -> [f32; 2] {
    [0.5, 0.5]
}

impl CameraEntry {
    pub fn to_pose(&self) -> CameraPose {
        CameraPose {
            focal_length: self.focal_length,
            pixel_aspect: self.pixel_aspect,
            principal_point: self.principal_point,
            rotation: Matrix3::from_row_slice(&self.rotation),
            translation: Vector3::from(self.translation),
        }
    }

    pub fn from_pose(pose: &CameraPose) -> Self {
        let mut rotation = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                rotation[r * 3 + c] = pose.rotation[(r, c)];
            }
        }
        Self {
            focal_length: pose.focal_length,
            pixel_aspect: pose.pixel_aspect,
            principal_point: pose.principal_point,
            rotation,
            translation: [pose.translation.x, pose.translation.y, pose.translation.z],
        }
    }
}

/// Accepts a scene directory holding `scene.json`, or the JSON file itself
pub fn resolve_scene_path(path: &Path) -> PathBuf {
    if path.is_dir() {
        path.join(SCENE_FILE_NAME)
    } else {
        path.to_path_buf()
    }
}

pub fn parse_scene(text: &str) -> Result<Vec<CameraPose>> {
    let scene: SceneFile = serde_json::from_str(text)?;
    let total = scene.views.len();

    let poses: Vec<CameraPose> = scene
        .views
        .iter()
        .filter_map(|view| {
            let camera = view.camera.as_ref()?;
            if camera.focal_length > 0.0 {
                Some(camera.to_pose())
            } else {
                None
            }
        })
        .collect();

    if poses.len() < total {
        warn!("Skipped {} views without a usable camera", total - poses.len());
    }
    Ok(poses)
}

/// Camera poses in trajectory order, placeholders removed
pub fn load_scene(path: &Path) -> Result<Vec<CameraPose>> {
    let scene_path = resolve_scene_path(path);
    let text = fs::read_to_string(&scene_path).map_err(|e| {
        PlannerError::IoError(std::io::Error::new(
            e.kind(),
            format!("{}: {}", scene_path.display(), e),
        ))
    })?;
    let poses = parse_scene(&text)?;
    info!("Loaded {} camera poses from {}", poses.len(), scene_path.display());
    Ok(poses)
}

pub fn write_scene(path: &Path, poses: &[CameraPose]) -> Result<()> {
    let scene = SceneFile {
        views: poses
            .iter()
            .enumerate()
            .map(|(idx, pose)| ViewEntry {
                id: idx as u32,
                name: format!("view_{:04}", idx),
                camera: Some(CameraEntry::from_pose(pose)),
            })
            .collect(),
    };
    fs::write(path, serde_json::to_string_pretty(&scene)?)?;
    Ok(())
}
