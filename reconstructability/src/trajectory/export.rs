/// Per-point quality scores derived from the reduced rows
use super::histogram::DirectionHistogram;
use crate::error::Result;
use crate::geometry::ProxyCloud;
use crate::io::ply;
use constants::histogram::{LAMBDA_CLAMP, QUALITY_SCALE};
use log::info;
use std::fmt;
use std::path::Path;

/// `QUALITY_SCALE * clamp(λ_max, 0, LAMBDA_CLAMP) * |mean|`
pub fn quality(mean_row: [f32; 2], eigen_row: [f32; 2]) -> f32 {
    QUALITY_SCALE * eigen_row[0].clamp(0.0, LAMBDA_CLAMP) * mean_row[0]
}

/// Quality per point; expects a reduced histogram
pub fn quality_values(histogram: &DirectionHistogram) -> Vec<f32> {
    (0..histogram.points())
        .map(|p| quality(histogram.mean_row(p), histogram.eigen_row(p)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualitySummary {
    pub points: usize,
    /// Points seen by at least one camera
    pub observed: usize,
    pub mean_quality: f32,
    pub max_quality: f32,
}

impl fmt::Display for QualitySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ratio = if self.points > 0 {
            self.observed as f32 / self.points as f32 * 100.0
        } else {
            0.0
        };
        write!(
            f,
            "{}/{} points observed ({:.1}%), quality mean {:.4}, max {:.4}",
            self.observed, self.points, ratio, self.mean_quality, self.max_quality
        )
    }
}

pub fn summarize(histogram: &DirectionHistogram, values: &[f32]) -> QualitySummary {
    let observed = histogram.counts().iter().filter(|&&c| c > 0).count();
    let mean_quality = if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    };
    QualitySummary {
        points: histogram.points(),
        observed,
        mean_quality,
        max_quality: values.iter().copied().fold(0.0, f32::max),
    }
}

/// Write the proxy cloud with each point's quality as its `value`
pub fn write_annotated_cloud(path: &Path, cloud: &ProxyCloud, values: &[f32]) -> Result<()> {
    ply::write_annotated_cloud(path, cloud, values)?;
    info!("Exported {} annotated points to {}", cloud.len(), path.display());
    Ok(())
}
