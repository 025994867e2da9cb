/// Guidance volume: sparse voxel grid of per-position histogram images, and its file format.
///
/// Layout (little endian):
/// `"GVOL" | version u32 | width u32 | height u32 | depth u32 | aabb min xyz f32 |
/// aabb max xyz f32 | voxel count u64 | per voxel: x y z u32, image w h u32, w*h f32`
use crate::bounds::Aabb;
use crate::error::{PlannerError, Result};
use log::info;
use nalgebra::Point3;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

const MAGIC: &[u8; 4] = b"GVOL";
const VERSION: u32 = 1;
/// Largest image a voxel record may declare, in values
const MAX_IMAGE_VALUES: usize = 1 << 24;

/// Dense 2D histogram, row-major (elevation rows × azimuth columns)
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl HistogramImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    pub fn from_data(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(PlannerError::Format(format!(
                "image {}x{} needs {} values, got {}",
                width,
                height,
                width * height,
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn at(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GuidanceVolume {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub bounds: Aabb,
    voxels: BTreeMap<[u32; 3], HistogramImage>,
}

impl GuidanceVolume {
    pub fn new(width: u32, height: u32, depth: u32, bounds: Aabb) -> Self {
        Self {
            width,
            height,
            depth,
            bounds,
            voxels: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, voxel: [u32; 3], image: HistogramImage) {
        debug_assert!(voxel[0] < self.width && voxel[1] < self.height && voxel[2] < self.depth);
        self.voxels.insert(voxel, image);
    }

    pub fn get(&self, voxel: [u32; 3]) -> Option<&HistogramImage> {
        self.voxels.get(&voxel)
    }

    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u32; 3], &HistogramImage)> {
        self.voxels.iter()
    }

    /// Cell size along each axis
    pub fn spacing(&self) -> [f32; 3] {
        let d = self.bounds.dimensions();
        let step = |extent: f32, n: u32| if n > 1 { extent / (n - 1) as f32 } else { 0.0 };
        [
            step(d.x, self.width),
            step(d.y, self.height),
            step(d.z, self.depth),
        ]
    }

    /// World position of a voxel centre
    pub fn voxel_position(&self, voxel: [u32; 3]) -> Point3<f32> {
        let s = self.spacing();
        Point3::new(
            self.bounds.min.x + voxel[0] as f32 * s[0],
            self.bounds.min.y + voxel[1] as f32 * s[1],
            self.bounds.min.z + voxel[2] as f32 * s[2],
        )
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let mut w = BufWriter::new(File::create(path)?);
        self.write_to(&mut w)?;
        w.flush()?;
        info!("Saved guidance volume with {} voxels to {}", self.len(), path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut r = BufReader::new(File::open(path)?);
        Self::read_from(&mut r)
    }

    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(MAGIC)?;
        write_u32(w, VERSION)?;
        write_u32(w, self.width)?;
        write_u32(w, self.height)?;
        write_u32(w, self.depth)?;
        for v in self.bounds.min.iter().chain(self.bounds.max.iter()) {
            w.write_all(&v.to_le_bytes())?;
        }
        w.write_all(&(self.voxels.len() as u64).to_le_bytes())?;

        let mut bytes = Vec::new();
        for (voxel, image) in &self.voxels {
            for &c in voxel {
                write_u32(w, c)?;
            }
            write_u32(w, image.width as u32)?;
            write_u32(w, image.height as u32)?;

            bytes.clear();
            bytes.reserve(image.data.len() * 4);
            for value in &image.data {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            w.write_all(&bytes)?;
        }
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if &magic != MAGIC {
            return Err(PlannerError::Format("not a guidance volume file".into()));
        }
        let version = read_u32(r)?;
        if version != VERSION {
            return Err(PlannerError::Format(format!(
                "unsupported version {} (expected {})",
                version, VERSION
            )));
        }

        let width = read_u32(r)?;
        let height = read_u32(r)?;
        let depth = read_u32(r)?;
        let mut corners = [0.0f32; 6];
        for c in corners.iter_mut() {
            *c = read_f32(r)?;
        }
        let bounds = Aabb::from_corners(
            Point3::new(corners[0], corners[1], corners[2]),
            Point3::new(corners[3], corners[4], corners[5]),
        );

        let mut count = [0u8; 8];
        r.read_exact(&mut count)?;
        let count = u64::from_le_bytes(count);

        let mut volume = Self::new(width, height, depth, bounds);
        let mut bytes = Vec::new();
        for _ in 0..count {
            let voxel = [read_u32(r)?, read_u32(r)?, read_u32(r)?];
            if voxel[0] >= width || voxel[1] >= height || voxel[2] >= depth {
                return Err(PlannerError::Format(format!(
                    "voxel {:?} outside {}x{}x{} grid",
                    voxel, width, height, depth
                )));
            }
            let img_w = read_u32(r)? as usize;
            let img_h = read_u32(r)? as usize;
            let values = img_w
                .checked_mul(img_h)
                .filter(|&n| n <= MAX_IMAGE_VALUES)
                .ok_or_else(|| {
                    PlannerError::Format(format!(
                        "voxel {:?} declares an oversized {}x{} image",
                        voxel, img_w, img_h
                    ))
                })?;

            bytes.resize(values * 4, 0);
            r.read_exact(&mut bytes)?;
            let data = bytes
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .collect();
            volume
                .voxels
                .insert(voxel, HistogramImage::from_data(img_w, img_h, data)?);
        }
        Ok(volume)
    }
}

fn write_u32<W: Write>(w: &mut W, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> std::io::Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

fn read_f32<R: Read>(r: &mut R) -> std::io::Result<f32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(f32::from_le_bytes(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_volume() -> GuidanceVolume {
        let bounds = Aabb::from_corners(Point3::new(-1.0, 2.0, 3.5), Point3::new(3.0, 6.0, 7.5));
        let mut volume = GuidanceVolume::new(5, 5, 5, bounds);
        let mut image = HistogramImage::new(4, 2);
        image.data = vec![0.0, 1.5, -2.25, f32::MAX, f32::MIN_POSITIVE, 1e-30, 7.0, 0.1];
        volume.insert([0, 4, 2], image);
        volume.insert([3, 1, 0], HistogramImage::new(4, 2));
        volume
    }

    #[test]
    fn test_in_memory_round_trip_is_bit_identical() {
        let volume = sample_volume();
        let mut bytes = Vec::new();
        volume.write_to(&mut bytes).unwrap();
        let restored = GuidanceVolume::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(restored, volume);

        let a = volume.get([0, 4, 2]).unwrap();
        let b = restored.get([0, 4, 2]).unwrap();
        for (x, y) in a.data.iter().zip(&b.data) {
            assert_eq!(x.to_bits(), y.to_bits());
        }
    }

    #[test]
    fn test_rejects_foreign_files() {
        let err = GuidanceVolume::read_from(&mut &b"PLY\n0000000000"[..]).unwrap_err();
        assert!(matches!(err, PlannerError::Format(_)));
    }

    #[test]
    fn test_rejects_oversized_image_header() {
        let mut bytes = Vec::new();
        GuidanceVolume::new(2, 2, 2, Aabb::new())
            .write_to(&mut bytes)
            .unwrap();
        // bump the voxel count to one and append a record with a huge image
        let count_at = bytes.len() - 8;
        bytes[count_at..].copy_from_slice(&1u64.to_le_bytes());
        for v in [0u32, 1, 1, u32::MAX, u32::MAX] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }

        let err = GuidanceVolume::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, PlannerError::Format(_)));
    }

    #[test]
    fn test_truncated_file_is_an_io_error() {
        let mut bytes = Vec::new();
        sample_volume().write_to(&mut bytes).unwrap();
        bytes.truncate(bytes.len() - 3);
        let err = GuidanceVolume::read_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, PlannerError::IoError(_)));
    }

    #[test]
    fn test_voxel_positions() {
        let volume = sample_volume();
        assert_eq!(volume.spacing(), [1.0, 1.0, 1.0]);
        assert_eq!(volume.voxel_position([0, 4, 2]), Point3::new(-1.0, 6.0, 5.5));
    }
}
