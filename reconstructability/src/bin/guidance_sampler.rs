/// Guidance volume sampler entry point
use clap::Parser;
use log::error;
use reconstructability::config::SamplerConfig;
use reconstructability::pipeline::GuidancePipeline;
use reconstructability::progress::init_logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "guidance-sampler",
    version,
    about = "Sample a reconstructability guidance volume over free airspace"
)]
struct Args {
    /// Proxy surface mesh (PLY) used for occlusion
    proxy_mesh: PathBuf,
    /// Proxy point cloud with normals (PLY, LAS or LAZ)
    proxy_cloud: PathBuf,
    /// Airspace mesh bounding the sampled region (PLY)
    airspace_mesh: PathBuf,
    /// Output guidance volume
    out_volume: PathBuf,

    /// JSON file with sampler settings; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Voxel size [default: 1.0]
    #[arg(long)]
    resolution: Option<f32>,
    /// Ignore proxy points farther than this from a sample [default: 80.0]
    #[arg(long)]
    max_distance: Option<f32>,
    /// Lowest sample altitude above ground [default: 0.0]
    #[arg(long)]
    min_altitude: Option<f32>,
    /// Highest sample altitude above ground [default: 100.0]
    #[arg(long)]
    max_altitude: Option<f32>,
    /// Worker threads, 0 for one per core [default: 0]
    #[arg(long)]
    workers: Option<usize>,
    /// Direction basis subdivision level [default: 3]
    #[arg(long)]
    subdivisions: Option<u32>,
    /// Also write the normalised height map as an R32F DDS texture
    #[arg(long)]
    heightmap_out: Option<PathBuf>,
}

impl Args {
    fn sampler_config(&self) -> reconstructability::Result<SamplerConfig> {
        let mut config = match &self.config {
            Some(path) => SamplerConfig::load(path)?,
            None => SamplerConfig::default(),
        };
        if let Some(v) = self.resolution {
            config.resolution = v;
        }
        if let Some(v) = self.max_distance {
            config.max_distance = v;
        }
        if let Some(v) = self.min_altitude {
            config.min_altitude = v;
        }
        if let Some(v) = self.max_altitude {
            config.max_altitude = v;
        }
        if let Some(v) = self.workers {
            config.workers = v;
        }
        if let Some(v) = self.subdivisions {
            config.sphere_subdivisions = v;
        }
        if self.heightmap_out.is_some() {
            config.heightmap_out = self.heightmap_out.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(args: &Args) -> reconstructability::Result<()> {
    let config = args.sampler_config()?;
    let pipeline = GuidancePipeline::new(
        &args.proxy_mesh,
        &args.proxy_cloud,
        &args.airspace_mesh,
        &args.out_volume,
        config,
    )?;
    pipeline.run()?;
    Ok(())
}

fn main() {
    init_logging();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        error!("{}", e);
        std::process::exit(1);
    }
}
