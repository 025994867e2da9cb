/// Float texture export for inspection tools
use crate::error::Result;
use ddsfile::{AlphaMode, D3D10ResourceDimension, Dds, DxgiFormat, NewDxgiParams};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write a single-channel float texture
pub fn write_r32f_texture(
    path: &Path,
    width: usize,
    height: usize,
    data: &[f32],
) -> Result<()> {
    let mut bytes = Vec::with_capacity(data.len() * 4);
    for &value in data {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    let params = NewDxgiParams {
        height: height as u32,
        width: width as u32,
        depth: None,
        format: DxgiFormat::R32_Float,
        mipmap_levels: Some(1),
        array_layers: Some(1),
        caps2: None,
        is_cubemap: false,
        resource_dimension: D3D10ResourceDimension::Texture2D,
        alpha_mode: AlphaMode::Unknown,
    };

    let mut dds = Dds::new_dxgi(params)?;
    dds.data = bytes;
    dds.write(&mut BufWriter::new(File::create(path)?))?;
    Ok(())
}
