/// File ingestion and export
pub mod laz;
pub mod ply;
pub mod scene;

use crate::error::Result;
use crate::geometry::ProxyCloud;
use log::info;
use std::path::Path;

/// Proxy cloud from `.las`/`.laz`, otherwise PLY
pub fn load_cloud(path: &Path) -> Result<ProxyCloud> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("las") | Some("laz") => laz::read_cloud(path),
        _ => {
            let cloud = ply::read_cloud(path)?;
            info!("Loaded {} points from {}", cloud.len(), path.display());
            Ok(cloud)
        }
    }
}
