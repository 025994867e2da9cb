/// Per-point observation rows stored in one strided arena
use crate::device::{DeviceBuffer, DeviceContext};
use constants::histogram::AGGREGATE_ROWS;
use nalgebra::Vector3;
use rayon::prelude::*;

/// Encode a unit direction as `[azimuth, elevation]`
pub fn encode_direction(dir: &Vector3<f32>) -> [f32; 2] {
    [dir.y.atan2(dir.x), dir.z.clamp(-1.0, 1.0).asin()]
}

pub fn decode_direction(row: &[f32; 2]) -> Vector3<f32> {
    let [azimuth, elevation] = *row;
    Vector3::new(
        elevation.cos() * azimuth.cos(),
        elevation.cos() * azimuth.sin(),
        elevation.sin(),
    )
}

/// `points × max_cameras` rows of `[azimuth, elevation]`.
/// After reduction the last two rows of each point hold the aggregates.
#[derive(Debug, Clone)]
pub struct DirectionHistogram {
    max_cameras: usize,
    rows: DeviceBuffer<[f32; 2]>,
    counts: Vec<u32>,
}

impl DirectionHistogram {
    pub fn new(context: &DeviceContext, points: usize, max_cameras: usize) -> Self {
        assert!(
            max_cameras >= AGGREGATE_ROWS,
            "row store needs room for the aggregate rows"
        );
        Self {
            max_cameras,
            rows: context.alloc(points, max_cameras),
            counts: vec![0; points],
        }
    }

    pub fn points(&self) -> usize {
        self.counts.len()
    }

    pub fn max_cameras(&self) -> usize {
        self.max_cameras
    }

    pub fn count(&self, point: usize) -> usize {
        self.counts[point] as usize
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    pub fn rows(&self, point: usize) -> &[[f32; 2]] {
        self.rows.row(point)
    }

    /// Rows appended so far for `point`
    pub fn observations(&self, point: usize) -> &[[f32; 2]] {
        &self.rows(point)[..self.count(point)]
    }

    /// Mean-direction aggregate `[|m|, elevation(m)]`
    pub fn mean_row(&self, point: usize) -> [f32; 2] {
        self.rows(point)[self.max_cameras - 2]
    }

    /// Spread aggregate `[λ_max, λ_min]`
    pub fn eigen_row(&self, point: usize) -> [f32; 2] {
        self.rows(point)[self.max_cameras - 1]
    }

    /// Append one observation; returns `false` once the point's rows are full
    pub fn push(&mut self, point: usize, row: [f32; 2]) -> bool {
        let stride = self.max_cameras;
        let rows = &mut self.rows.as_mut_slice()[point * stride..(point + 1) * stride];
        PointRows {
            rows,
            count: &mut self.counts[point],
        }
        .push(row)
    }

    /// Disjoint per-point views, for parallel writers
    pub fn par_points_mut(&mut self) -> impl IndexedParallelIterator<Item = PointRows<'_>> {
        self.rows
            .as_mut_slice()
            .par_chunks_mut(self.max_cameras)
            .zip(self.counts.par_iter_mut())
            .map(|(rows, count)| PointRows { rows, count })
    }
}

/// One point's rows and its observation count
#[derive(Debug)]
pub struct PointRows<'a> {
    pub rows: &'a mut [[f32; 2]],
    pub count: &'a mut u32,
}

impl PointRows<'_> {
    pub fn push(&mut self, row: [f32; 2]) -> bool {
        let count = *self.count as usize;
        if count >= self.rows.len() {
            return false;
        }
        self.rows[count] = row;
        *self.count += 1;
        true
    }

    pub fn observations(&self) -> &[[f32; 2]] {
        &self.rows[..*self.count as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_count_never_exceeds_capacity() {
        let ctx = DeviceContext::new(0);
        let mut hist = DirectionHistogram::new(&ctx, 3, 4);
        for i in 0..10 {
            let stored = hist.push(1, [i as f32, 0.0]);
            assert_eq!(stored, i < 4);
        }
        assert_eq!(hist.count(1), 4);
        assert_eq!(hist.count(0), 0);
        assert_eq!(hist.observations(1)[3], [3.0, 0.0]);
        // neighbours untouched
        assert!(hist.rows(2).iter().all(|r| *r == [0.0, 0.0]));
    }

    #[test]
    fn test_parallel_views_are_disjoint() {
        let ctx = DeviceContext::new(0);
        let mut hist = DirectionHistogram::new(&ctx, 100, 3);
        hist.par_points_mut().enumerate().for_each(|(i, mut point)| {
            for _ in 0..(i % 5) {
                point.push([i as f32, 1.0]);
            }
        });
        for i in 0..100 {
            assert_eq!(hist.count(i), (i % 5).min(3));
            assert!(hist.observations(i).iter().all(|r| r[0] == i as f32));
        }
    }

    #[test]
    fn test_direction_encoding() {
        let dir = Vector3::new(1.0, 1.0, 1.0).normalize();
        let row = encode_direction(&dir);
        assert!((row[0] - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!((decode_direction(&row) - dir).norm() < 1e-6);
        assert_eq!(encode_direction(&Vector3::z())[1], std::f32::consts::FRAC_PI_2);
    }
}
