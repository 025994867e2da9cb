/// Trajectory reconstructability evaluator entry point
use clap::Parser;
use log::error;
use reconstructability::config::EvaluatorConfig;
use reconstructability::pipeline::EvaluationPipeline;
use reconstructability::progress::init_logging;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "trajectory-evaluator",
    version,
    about = "Score proxy points by how well a camera trajectory observes them"
)]
struct Args {
    /// Scene directory holding scene.json, or the JSON file itself
    scene: PathBuf,
    /// Proxy surface mesh (PLY) used for occlusion
    proxy_mesh: PathBuf,
    /// Proxy point cloud (PLY, LAS or LAZ)
    proxy_cloud: PathBuf,

    /// Write the proxy cloud annotated with per-point quality (PLY)
    #[arg(long)]
    export: Option<PathBuf>,
    /// JSON file with evaluator settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Observation rows per point, including two aggregate rows [default: 64]
    #[arg(long)]
    max_cameras: Option<usize>,
}

fn run(args: &Args) -> reconstructability::Result<()> {
    let mut config = match &args.config {
        Some(path) => EvaluatorConfig::load(path)?,
        None => EvaluatorConfig::default(),
    };
    if let Some(v) = args.max_cameras {
        config.max_cameras = v;
    }
    if args.export.is_some() {
        config.export = args.export.clone();
    }

    let pipeline = EvaluationPipeline::new(&args.scene, &args.proxy_mesh, &args.proxy_cloud, config)?;
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
