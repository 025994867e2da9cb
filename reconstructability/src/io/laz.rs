use crate::error::Result;
use crate::geometry::ProxyCloud;
use las::Reader;
use log::info;
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Create LAS file reader for point cloud access.
/// Handles both .las and .laz compressed formats.
pub fn create_reader(file_path: &Path) -> Result<Reader> {
    let file = File::open(file_path)?;
    let buf_reader = BufReader::new(file);
    Ok(Reader::new(buf_reader)?)
}

/// Proxy cloud from a LAS/LAZ file. LAS carries no normals, so every point has an
/// unknown orientation; intensity becomes the scalar value.
pub fn read_cloud(file_path: &Path) -> Result<ProxyCloud> {
    let mut reader = create_reader(file_path)?;
    let total_points = reader.header().number_of_points() as usize;

    let mut positions = Vec::with_capacity(total_points);
    let mut values = Vec::with_capacity(total_points);
    for point_result in reader.points() {
        let point = point_result?;
        positions.push(Point3::new(point.x as f32, point.y as f32, point.z as f32));
        values.push(point.intensity as f32);
    }

    let normals = vec![Vector3::zeros(); positions.len()];
    let mut cloud = ProxyCloud::new(positions, normals);
    cloud.values = Some(values);

    info!("Loaded {} points from {}", cloud.len(), file_path.display());
    Ok(cloud)
}
