/// Trajectory evaluation: per-point observation directions and their reduction to quality
pub mod export;
pub mod histogram;
pub mod kernels;

use crate::accel::{AccelerationAdapter, DeviceAccel};
use crate::camera::CameraPose;
use crate::config::EvaluatorConfig;
use crate::device::DeviceContext;
use crate::error::Result;
use crate::geometry::ProxyCloud;
use crate::progress::progress_bar;
use constants::camera::{SIMULATED_IMAGE_HEIGHT, SIMULATED_IMAGE_WIDTH};
use histogram::DirectionHistogram;
use log::info;
use std::time::Instant;

pub struct TrajectoryEvaluator<'a> {
    accel: DeviceAccel<'a>,
    cloud: &'a ProxyCloud,
    max_cameras: usize,
}

impl<'a> TrajectoryEvaluator<'a> {
    pub fn new(
        adapter: &'a AccelerationAdapter,
        cloud: &'a ProxyCloud,
        config: &EvaluatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            accel: adapter.upload(),
            cloud,
            max_cameras: config.max_cameras,
        })
    }

    /// Apply cameras in trajectory order, then reduce every point's rows
    pub fn run(&self, poses: &[CameraPose]) -> Result<DirectionHistogram> {
        let start = Instant::now();
        let context = DeviceContext::new(0);
        let mut stream = context.create_stream();
        let mut histogram = DirectionHistogram::new(&context, self.cloud.len(), self.max_cameras);

        let pb = progress_bar(poses.len() as u64, "cameras", "Accumulating observations");
        for pose in poses {
            let camera = pose.prepare(SIMULATED_IMAGE_WIDTH, SIMULATED_IMAGE_HEIGHT);
            stream.launch("populate_from_camera", || {
                kernels::populate_from_camera(&self.accel, self.cloud, &camera, &mut histogram)
            });
            pb.inc(1);
        }
        pb.finish_with_message("Observations accumulated");

        stream.launch("reduce_histogram", || kernels::reduce_histogram(&mut histogram));
        stream.synchronize()?;

        info!(
            "Evaluated {} cameras against {} points in {:.2}s",
            poses.len(),
            self.cloud.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(histogram)
    }
}
