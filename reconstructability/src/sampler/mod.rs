/// Guidance volume sampling over the free airspace
pub mod grid;
pub mod kernels;

use crate::accel::{AccelerationAdapter, DeviceAccel};
use crate::config::SamplerConfig;
use crate::device::{DeviceBuffer, DeviceContext, Stream, WorkerPool};
use crate::error::{PlannerError, Result};
use crate::geometry::ProxyCloud;
use crate::progress::progress_bar;
use crate::volume::{GuidanceVolume, HistogramImage};
use constants::histogram::{HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use grid::SampleGrid;
use log::{debug, info, trace};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

/// Scratch state owned by one worker for the whole run, reused for every voxel it takes
struct WorkerState {
    context: DeviceContext,
    stream: Stream,
    histogram: DeviceBuffer<f32>,
    image: DeviceBuffer<f32>,
}

impl WorkerState {
    fn new(ordinal: usize, bins: usize) -> Self {
        let context = DeviceContext::new(ordinal);
        let stream = context.create_stream();
        let histogram = context.alloc(1, bins);
        let image = context.alloc(HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH);
        Self {
            context,
            stream,
            histogram,
            image,
        }
    }
}

/// What one worker produced before the voxel queue ran dry
struct WorkerOutput {
    ordinal: usize,
    launches: u64,
    images: Vec<([u32; 3], HistogramImage)>,
}

pub struct GuidanceSampler<'a> {
    accel: DeviceAccel<'a>,
    cloud: &'a ProxyCloud,
    max_distance: f32,
    bins: usize,
}

impl<'a> GuidanceSampler<'a> {
    pub fn new(
        adapter: &'a AccelerationAdapter,
        cloud: &'a ProxyCloud,
        config: &SamplerConfig,
    ) -> Result<Self> {
        let accel = adapter.upload();
        let bins = accel.basis.ok_or(PlannerError::MissingDirectionBasis)?.len();
        Ok(Self {
            accel,
            cloud,
            max_distance: config.max_distance,
            bins,
        })
    }

    /// Fill one histogram image per grid position.
    /// Positions are handed out one at a time so busy columns do not stall a worker.
    pub fn run(&self, grid: &SampleGrid, pool: &WorkerPool) -> Result<GuidanceVolume> {
        info!(
            "Sampling {} positions on {} workers ({} direction bins, {} proxy points)",
            grid.len(),
            pool.workers(),
            self.bins,
            self.cloud.len()
        );
        let start = Instant::now();
        let pb = progress_bar(grid.len() as u64, "voxels", "Sampling guidance volume");

        let outputs = self.drain(grid, pool, |_| pb.inc(1))?;
        pb.finish_with_message("Guidance volume sampled");

        let mut volume = GuidanceVolume::new(grid.width, grid.height, grid.depth, grid.bounds());
        for output in outputs {
            debug!(
                "Device {} sampled {} voxels ({} launches)",
                output.ordinal,
                output.images.len(),
                output.launches
            );
            for (voxel, image) in output.images {
                volume.insert(voxel, image);
            }
        }

        info!(
            "Sampled {} voxels in {:.2}s",
            volume.len(),
            start.elapsed().as_secs_f32()
        );
        Ok(volume)
    }

    /// One long-lived task per worker, each with its own context, stream and buffers.
    /// Voxels come off a shared cursor one at a time; the first failure stops every worker.
    fn drain<F>(&self, grid: &SampleGrid, pool: &WorkerPool, on_voxel: F) -> Result<Vec<WorkerOutput>>
    where
        F: Fn(usize) + Sync,
    {
        let cursor = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);

        pool.install(|| {
            (0..pool.workers())
                .into_par_iter()
                .with_max_len(1)
                .map(|ordinal| {
                    let mut state = WorkerState::new(ordinal, self.bins);
                    let mut images = Vec::new();
                    while !failed.load(Ordering::Relaxed) {
                        let idx = cursor.fetch_add(1, Ordering::Relaxed);
                        let Some(&voxel) = grid.positions.get(idx) else {
                            break;
                        };
                        match self.sample(&mut state, grid, voxel) {
                            Ok(image) => images.push((voxel, image)),
                            Err(e) => {
                                failed.store(true, Ordering::Relaxed);
                                return Err(e);
                            }
                        }
                        on_voxel(idx);
                    }
                    Ok(WorkerOutput {
                        ordinal,
                        launches: state.stream.launches(),
                        images,
                    })
                })
                .collect::<Result<Vec<_>>>()
        })
    }

    fn sample(&self, state: &mut WorkerState, grid: &SampleGrid, voxel: [u32; 3]) -> Result<HistogramImage> {
        let position = grid.world_position(voxel);
        state.histogram.clear();

        let histogram = &mut state.histogram;
        state.stream.launch("populate_histogram", || {
            kernels::populate_histogram(
                &self.accel,
                self.cloud,
                &position,
                self.max_distance,
                histogram.as_mut_slice(),
            )
        });
        let (histogram, image) = (&state.histogram, &mut state.image);
        state.stream.launch("evaluate_histogram", || {
            kernels::evaluate_histogram(&self.accel, histogram.as_slice(), image.as_mut_slice())
        });
        state.stream.synchronize()?;

        let mut host = vec![0.0; state.image.len()];
        state.image.copy_to_host(&mut host)?;
        trace!(
            "Voxel {:?} done on device {} ({} launches)",
            voxel,
            state.context.ordinal(),
            state.stream.launches()
        );
        HistogramImage::from_data(HISTOGRAM_WIDTH, HISTOGRAM_HEIGHT, host)
    }
}
