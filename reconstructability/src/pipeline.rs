/// End-to-end drivers for guidance sampling and trajectory evaluation
use crate::accel::AccelerationAdapter;
use crate::camera::CameraPose;
use crate::config::{EvaluatorConfig, SamplerConfig};
use crate::device::WorkerPool;
use crate::error::{PlannerError, Result};
use crate::geometry::{ProxyCloud, TriangleMesh};
use crate::heightmap::HeightMap;
use crate::io::{self, ply, scene};
use crate::sampler::GuidanceSampler;
use crate::sampler::grid::SampleGrid;
use crate::sphere::DirectionBasis;
use crate::trajectory::TrajectoryEvaluator;
use crate::trajectory::export::{self, QualitySummary};
use crate::trajectory::histogram::DirectionHistogram;
use crate::volume::GuidanceVolume;
use log::info;
use std::path::{Path, PathBuf};

fn require_file(path: &Path, what: &str) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(PlannerError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist: {}", what, path.display()),
        )))
    }
}

/// Height map and sampled volume, nothing written yet
fn sample_airspace(
    proxy_mesh: &TriangleMesh,
    cloud: &ProxyCloud,
    airspace: &TriangleMesh,
    config: &SamplerConfig,
) -> Result<(HeightMap, GuidanceVolume)> {
    config.validate()?;

    // A planar airspace only gains volume once extended up to the flight ceiling.
    let aabb = airspace.bounds().extended_to_altitude(config.max_altitude);
    aabb.validate()?;
    SampleGrid::check_extent(&aabb, config)?;

    let height_map = HeightMap::build(&airspace.vertices, &aabb, config.resolution);
    let grid = SampleGrid::enumerate(&height_map, config);

    let basis = DirectionBasis::tessellate(config.sphere_subdivisions);
    let adapter = AccelerationAdapter::with_direction_basis(proxy_mesh, &basis);
    let pool = WorkerPool::new(config.workers)?;

    let volume = GuidanceSampler::new(&adapter, cloud, config)?.run(&grid, &pool)?;
    Ok((height_map, volume))
}

/// Build a guidance volume from in-memory geometry.
/// The height map is exported only once sampling has succeeded.
pub fn build_guidance_volume(
    proxy_mesh: &TriangleMesh,
    cloud: &ProxyCloud,
    airspace: &TriangleMesh,
    config: &SamplerConfig,
) -> Result<GuidanceVolume> {
    let (height_map, volume) = sample_airspace(proxy_mesh, cloud, airspace, config)?;
    if let Some(path) = &config.heightmap_out {
        height_map.write_dds(path)?;
    }
    Ok(volume)
}

/// Proxy mesh + proxy cloud + airspace mesh → guidance volume file
pub struct GuidancePipeline {
    proxy_mesh: PathBuf,
    proxy_cloud: PathBuf,
    airspace_mesh: PathBuf,
    output: PathBuf,
    config: SamplerConfig,
}

impl GuidancePipeline {
    pub fn new(
        proxy_mesh: &Path,
        proxy_cloud: &Path,
        airspace_mesh: &Path,
        output: &Path,
        config: SamplerConfig,
    ) -> Result<Self> {
        config.validate()?;
        require_file(proxy_mesh, "Proxy mesh")?;
        require_file(proxy_cloud, "Proxy cloud")?;
        require_file(airspace_mesh, "Airspace mesh")?;

        Ok(Self {
            proxy_mesh: proxy_mesh.to_path_buf(),
            proxy_cloud: proxy_cloud.to_path_buf(),
            airspace_mesh: airspace_mesh.to_path_buf(),
            output: output.to_path_buf(),
            config,
        })
    }

    pub fn run(&self) -> Result<GuidanceVolume> {
        info!("Starting guidance volume sampling...");

        let proxy_mesh = ply::read_mesh(&self.proxy_mesh)?;
        let cloud = io::load_cloud(&self.proxy_cloud)?;
        let airspace = ply::read_mesh(&self.airspace_mesh)?;

        let (height_map, volume) = sample_airspace(&proxy_mesh, &cloud, &airspace, &self.config)?;
        volume.save(&self.output)?;
        if let Some(path) = &self.config.heightmap_out {
            height_map.write_dds(path)?;
        }

        info!("Guidance volume sampling complete!");
        Ok(volume)
    }
}

/// Reduced histogram plus the per-point quality derived from it
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub histogram: DirectionHistogram,
    pub quality: Vec<f32>,
    pub summary: QualitySummary,
}

/// Evaluate a trajectory against in-memory geometry
pub fn evaluate_trajectory(
    proxy_mesh: &TriangleMesh,
    cloud: &ProxyCloud,
    poses: &[CameraPose],
    config: &EvaluatorConfig,
) -> Result<EvaluationReport> {
    let adapter = AccelerationAdapter::from_mesh(proxy_mesh);
    let histogram = TrajectoryEvaluator::new(&adapter, cloud, config)?.run(poses)?;
    let quality = export::quality_values(&histogram);
    let summary = export::summarize(&histogram, &quality);
    Ok(EvaluationReport {
        histogram,
        quality,
        summary,
    })
}

/// Scene + proxy mesh + proxy cloud → per-point quality, optionally exported
pub struct EvaluationPipeline {
    scene: PathBuf,
    proxy_mesh: PathBuf,
    proxy_cloud: PathBuf,
    config: EvaluatorConfig,
}

impl EvaluationPipeline {
    pub fn new(
        scene: &Path,
        proxy_mesh: &Path,
        proxy_cloud: &Path,
        config: EvaluatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        require_file(scene, "Scene")?;
        require_file(proxy_mesh, "Proxy mesh")?;
        require_file(proxy_cloud, "Proxy cloud")?;

        Ok(Self {
            scene: scene.to_path_buf(),
            proxy_mesh: proxy_mesh.to_path_buf(),
            proxy_cloud: proxy_cloud.to_path_buf(),
            config,
        })
    }

    pub fn run(&self) -> Result<EvaluationReport> {
        info!("Starting trajectory evaluation...");

        let poses = scene::load_scene(&self.scene)?;
        let proxy_mesh = ply::read_mesh(&self.proxy_mesh)?;
        let cloud = io::load_cloud(&self.proxy_cloud)?;

        let report = evaluate_trajectory(&proxy_mesh, &cloud, &poses, &self.config)?;
        info!("{}", report.summary);

        if let Some(path) = &self.config.export {
            export::write_annotated_cloud(path, &cloud, &report.quality)?;
        }
        Ok(report)
    }
}
