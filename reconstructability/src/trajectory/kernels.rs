/// Observation accumulation per camera, and reduction of each point's rows into aggregates
use super::histogram::{DirectionHistogram, PointRows, decode_direction, encode_direction};
use crate::accel::DeviceAccel;
use crate::camera::PreparedCamera;
use crate::device::DeviceError;
use crate::geometry::ProxyCloud;
use constants::camera::SURFACE_OFFSET;
use nalgebra::{Matrix2, SymmetricEigen, Vector2, Vector3};
use rayon::prelude::*;

/// Record, for every point the camera sees unoccluded, the direction from the point to the camera
pub fn populate_from_camera(
    accel: &DeviceAccel<'_>,
    cloud: &ProxyCloud,
    camera: &PreparedCamera,
    histogram: &mut DirectionHistogram,
) -> Result<(), DeviceError> {
    if histogram.points() != cloud.len() {
        return Err(DeviceError::SizeMismatch {
            what: "per-point rows",
            expected: cloud.len(),
            actual: histogram.points(),
        });
    }

    histogram
        .par_points_mut()
        .zip(cloud.positions.par_iter())
        .for_each(|(mut rows, point)| {
            if camera.project(point).is_none() {
                return;
            }
            let offset = camera.position - *point;
            let distance = offset.norm();
            if distance <= SURFACE_OFFSET {
                return;
            }
            let dir = offset / distance;
            let origin = *point + dir * SURFACE_OFFSET;
            if accel.rays.occluded(&origin, &dir, distance - SURFACE_OFFSET) {
                return;
            }
            rows.push(encode_direction(&dir));
        });
    Ok(())
}

/// Any unit vector orthogonal to `axis`
fn tangent(axis: &Vector3<f32>) -> Vector3<f32> {
    let helper = if axis.z.abs() < 0.9 {
        Vector3::z()
    } else {
        Vector3::x()
    };
    helper.cross(axis).normalize()
}

/// `([|m|, elevation(m)], [λ_max, λ_min])` for one point's observations
pub fn reduce_observations(observations: &[[f32; 2]]) -> ([f32; 2], [f32; 2]) {
    if observations.is_empty() {
        return ([0.0; 2], [0.0; 2]);
    }
    let n = observations.len() as f32;
    let dirs: Vec<Vector3<f32>> = observations.iter().map(decode_direction).collect();

    let mean = dirs.iter().fold(Vector3::zeros(), |acc, d| acc + d) / n;
    let length = mean.norm();
    let axis = if length > 1e-6 {
        mean / length
    } else {
        Vector3::z()
    };
    let elevation = if length > 1e-6 {
        axis.z.clamp(-1.0, 1.0).asin()
    } else {
        0.0
    };

    let t1 = tangent(&axis);
    let t2 = axis.cross(&t1);
    let moment = dirs.iter().fold(Matrix2::zeros(), |acc, d| {
        let q = Vector2::new(d.dot(&t1), d.dot(&t2));
        acc + q * q.transpose()
    }) / n;

    let eigen = SymmetricEigen::new(moment);
    let (a, b) = (eigen.eigenvalues[0], eigen.eigenvalues[1]);
    let (major, minor) = if a.abs() >= b.abs() { (a, b) } else { (b, a) };

    ([length, elevation], [major, minor])
}

fn reduce_point(rows: &mut PointRows<'_>) {
    let (mean, spread) = reduce_observations(rows.observations());
    let cap = rows.rows.len();
    rows.rows[cap - 2] = mean;
    rows.rows[cap - 1] = spread;
}

/// Overwrite the last two rows of every point with its aggregates.
/// Counts are left untouched so the raw rows below stay addressable.
pub fn reduce_histogram(histogram: &mut DirectionHistogram) -> Result<(), DeviceError> {
    histogram
        .par_points_mut()
        .for_each(|mut rows| reduce_point(&mut rows));
    Ok(())
}
