/// Per-sample kernels: directional population and simulated-camera evaluation
use crate::accel::DeviceAccel;
use crate::accel::kdtree::PointTree;
use crate::camera::{Calibration, PreparedCamera};
use crate::device::DeviceError;
use crate::geometry::ProxyCloud;
use constants::camera::SURFACE_OFFSET;
use constants::histogram::{HISTOGRAM_HEIGHT, HISTOGRAM_WIDTH};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use std::f32::consts::{FRAC_PI_2, PI};

fn basis<'a>(accel: &DeviceAccel<'a>, kernel: &'static str) -> Result<&'a PointTree, DeviceError> {
    accel.basis.ok_or(DeviceError::LaunchFailed {
        kernel,
        reason: "no direction basis bound".into(),
    })
}

/// Accumulate, per direction bin, the weight of every proxy point visible from `sample`.
/// Weights are the facing cosine `n · -dir`; points with a zero normal count fully.
pub fn populate_histogram(
    accel: &DeviceAccel<'_>,
    cloud: &ProxyCloud,
    sample: &Point3<f32>,
    max_distance: f32,
    bins: &mut [f32],
) -> Result<(), DeviceError> {
    let basis = basis(accel, "populate_histogram")?;
    if bins.len() != basis.len() {
        return Err(DeviceError::SizeMismatch {
            what: "direction histogram",
            expected: basis.len(),
            actual: bins.len(),
        });
    }

    let partial = cloud
        .positions
        .par_iter()
        .zip(cloud.normals.par_iter())
        .fold(
            || vec![0.0f32; bins.len()],
            |mut local, (point, normal)| {
                let offset = point - sample;
                let distance = offset.norm();
                if distance > max_distance || distance <= SURFACE_OFFSET {
                    return local;
                }
                let dir = offset / distance;

                let weight = if *normal == Vector3::zeros() {
                    1.0
                } else {
                    normal.dot(&-dir)
                };
                if weight <= 0.0 {
                    return local;
                }

                if accel
                    .rays
                    .occluded(sample, &dir, distance - SURFACE_OFFSET)
                {
                    return local;
                }

                if let Some((bin, _)) = basis.nearest(&dir) {
                    local[bin] += weight;
                }
                local
            },
        )
        .reduce_with(|mut a, b| {
            for (x, y) in a.iter_mut().zip(&b) {
                *x += *y;
            }
            a
        });

    if let Some(partial) = partial {
        for (bin, value) in bins.iter_mut().zip(&partial) {
            *bin += *value;
        }
    }
    Ok(())
}

/// Viewing direction of histogram pixel `(x, y)`: azimuth around +z, depression below the horizon
pub fn pixel_direction(x: usize, y: usize) -> Vector3<f32> {
    let theta = 2.0 * PI * (x as f32 + 0.5) / HISTOGRAM_WIDTH as f32;
    let phi = FRAC_PI_2 * (y as f32 + 0.5) / HISTOGRAM_HEIGHT as f32;
    Vector3::new(
        phi.cos() * theta.cos(),
        phi.cos() * theta.sin(),
        -phi.sin(),
    )
}

/// For each pixel, sum the bins a simulated camera facing that pixel's direction would see.
/// `image` is row-major, one row per elevation step.
pub fn evaluate_histogram(
    accel: &DeviceAccel<'_>,
    bins: &[f32],
    image: &mut [f32],
) -> Result<(), DeviceError> {
    let basis = basis(accel, "evaluate_histogram")?;
    if bins.len() != basis.len() {
        return Err(DeviceError::SizeMismatch {
            what: "direction histogram",
            expected: basis.len(),
            actual: bins.len(),
        });
    }
    if image.len() != HISTOGRAM_WIDTH * HISTOGRAM_HEIGHT {
        return Err(DeviceError::SizeMismatch {
            what: "histogram image",
            expected: HISTOGRAM_WIDTH * HISTOGRAM_HEIGHT,
            actual: image.len(),
        });
    }

    if bins.iter().all(|&b| b == 0.0) {
        image.fill(0.0);
        return Ok(());
    }

    let calibration = Calibration::simulated();
    // chord length of the field-of-view cone on the unit sphere
    let cone = 2.0 - 2.0 * calibration.half_diagonal_fov().cos();

    image
        .par_chunks_mut(HISTOGRAM_WIDTH)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, pixel) in row.iter_mut().enumerate() {
                let forward = pixel_direction(x, y);
                let camera = PreparedCamera::looking_along(Point3::origin(), &forward, calibration);

                *pixel = basis
                    .within(&forward, cone)
                    .into_iter()
                    .filter(|&bin| bins[bin] != 0.0)
                    .filter(|&bin| camera.project_direction(&basis.point(bin)).is_some())
                    .map(|bin| bins[bin])
                    .sum();
            }
        });
    Ok(())
}
