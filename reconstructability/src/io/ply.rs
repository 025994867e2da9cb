/// Polygon file reading for proxy meshes and clouds, and the annotated cloud writer
use crate::error::{PlannerError, Result};
use crate::geometry::{ProxyCloud, TriangleMesh};
use log::{debug, info};
use nalgebra::{Point3, Vector3};
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Ply, Property};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

fn read_ply<R: Read>(reader: &mut R) -> Result<Ply<DefaultElement>> {
    let parser = Parser::<DefaultElement>::new();
    parser
        .read_ply(reader)
        .map_err(|e| PlannerError::Ply(e.to_string()))
}

fn open(path: &Path) -> Result<BufReader<File>> {
    Ok(BufReader::new(File::open(path)?))
}

fn scalar(el: &DefaultElement, key: &str) -> Option<f32> {
    match el.get(key)? {
        Property::Char(v) => Some(*v as f32),
        Property::UChar(v) => Some(*v as f32),
        Property::Short(v) => Some(*v as f32),
        Property::UShort(v) => Some(*v as f32),
        Property::Int(v) => Some(*v as f32),
        Property::UInt(v) => Some(*v as f32),
        Property::Float(v) => Some(*v),
        Property::Double(v) => Some(*v as f32),
        _ => None,
    }
}

fn index_list(el: &DefaultElement) -> Option<Vec<u32>> {
    let prop = el.get("vertex_indices").or_else(|| el.get("vertex_index"))?;
    let list = match prop {
        Property::ListChar(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUChar(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListShort(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUShort(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListInt(v) => v.iter().map(|&i| i as u32).collect(),
        Property::ListUInt(v) => v.clone(),
        _ => return None,
    };
    Some(list)
}

fn vertices(ply: &Ply<DefaultElement>) -> Result<&Vec<DefaultElement>> {
    ply.payload
        .get("vertex")
        .ok_or_else(|| PlannerError::Ply("missing 'vertex' element".into()))
}

fn position(el: &DefaultElement, idx: usize) -> Result<Point3<f32>> {
    match (scalar(el, "x"), scalar(el, "y"), scalar(el, "z")) {
        (Some(x), Some(y), Some(z)) if x.is_finite() && y.is_finite() && z.is_finite() => {
            Ok(Point3::new(x, y, z))
        }
        (Some(x), Some(y), Some(z)) => Err(PlannerError::Ply(format!(
            "vertex {} has a non-finite position ({}, {}, {})",
            idx, x, y, z
        ))),
        _ => Err(PlannerError::Ply(format!(
            "vertex {} has no numeric x/y/z",
            idx
        ))),
    }
}

fn normal(el: &DefaultElement) -> Option<Vector3<f32>> {
    Some(Vector3::new(
        scalar(el, "nx")?,
        scalar(el, "ny")?,
        scalar(el, "nz")?,
    ))
}

pub fn read_mesh_from<R: Read>(reader: &mut R) -> Result<TriangleMesh> {
    let ply = read_ply(reader)?;
    let elements = vertices(&ply)?;

    let mut positions = Vec::with_capacity(elements.len());
    let mut normals = Vec::with_capacity(elements.len());
    for (idx, el) in elements.iter().enumerate() {
        positions.push(position(el, idx)?);
        if let Some(n) = normal(el) {
            normals.push(n);
        }
    }

    let mut faces = Vec::new();
    if let Some(face_elements) = ply.payload.get("face") {
        for (idx, el) in face_elements.iter().enumerate() {
            let polygon = index_list(el)
                .ok_or_else(|| PlannerError::Ply(format!("face {} has no index list", idx)))?;
            if let Some(&bad) = polygon.iter().find(|&&i| i as usize >= positions.len()) {
                return Err(PlannerError::Ply(format!(
                    "face {} references vertex {} of {}",
                    idx,
                    bad,
                    positions.len()
                )));
            }
            // fan triangulation
            for k in 1..polygon.len().saturating_sub(1) {
                faces.push([polygon[0], polygon[k], polygon[k + 1]]);
            }
        }
    }

    debug!("Mesh: {} vertices, {} triangles", positions.len(), faces.len());
    let mut mesh = TriangleMesh::new(positions, faces);
    if normals.len() == mesh.vertices.len() {
        mesh.normals = Some(normals);
    }
    Ok(mesh)
}

pub fn read_mesh(path: &Path) -> Result<TriangleMesh> {
    let mesh = read_mesh_from(&mut open(path)?)?;
    info!(
        "Loaded mesh {} ({} vertices, {} triangles)",
        path.display(),
        mesh.vertices.len(),
        mesh.faces.len()
    );
    Ok(mesh)
}

/// Vertices with optional normals and scalar `value`; missing normals read as zero (unknown)
pub fn read_cloud_from<R: Read>(reader: &mut R) -> Result<ProxyCloud> {
    let ply = read_ply(reader)?;
    let elements = vertices(&ply)?;

    let mut positions = Vec::with_capacity(elements.len());
    let mut normals = Vec::with_capacity(elements.len());
    let mut values = Vec::new();
    for (idx, el) in elements.iter().enumerate() {
        positions.push(position(el, idx)?);
        normals.push(normal(el).unwrap_or_else(Vector3::zeros));
        if let Some(v) = scalar(el, "value") {
            values.push(v);
        }
    }

    let mut cloud = ProxyCloud::new(positions, normals);
    if !values.is_empty() && values.len() == cloud.len() {
        cloud.values = Some(values);
    }
    Ok(cloud)
}

pub fn read_cloud(path: &Path) -> Result<ProxyCloud> {
    read_cloud_from(&mut open(path)?)
}

/// ASCII cloud with normals and one float `value` per point
pub fn write_annotated_cloud_to<W: Write>(w: &mut W, cloud: &ProxyCloud, values: &[f32]) -> Result<()> {
    if values.len() != cloud.len() {
        return Err(PlannerError::Ply(format!(
            "{} values for {} points",
            values.len(),
            cloud.len()
        )));
    }

    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", cloud.len())?;
    for name in ["x", "y", "z", "nx", "ny", "nz", "value"] {
        writeln!(w, "property float {}", name)?;
    }
    writeln!(w, "end_header")?;

    for ((p, n), v) in cloud.positions.iter().zip(&cloud.normals).zip(values) {
        writeln!(w, "{} {} {} {} {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z, v)?;
    }
    Ok(())
}

pub fn write_annotated_cloud(path: &Path, cloud: &ProxyCloud, values: &[f32]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    write_annotated_cloud_to(&mut w, cloud, values)?;
    w.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUAD: &str = "ply
format ascii 1.0
element vertex 4
property float x
property float y
property float z
element face 1
property list uchar int vertex_indices
end_header
0 0 0
1 0 0
1 1 0
0 1 0
4 0 1 2 3
";

    #[test]
    fn test_quad_is_fan_triangulated() {
        let mesh = read_mesh_from(&mut QUAD.as_bytes()).unwrap();
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(mesh.normals.is_none());
    }

    #[test]
    fn test_face_index_out_of_range() {
        let broken = QUAD.replace("4 0 1 2 3", "3 0 1 9");
        let err = read_mesh_from(&mut broken.as_bytes()).unwrap_err();
        assert!(matches!(err, PlannerError::Ply(_)));
    }

    #[test]
    fn test_non_finite_vertex_is_rejected() {
        let mut bytes = b"ply\nformat binary_little_endian 1.0\nelement vertex 1\n\
property float x\nproperty float y\nproperty float z\nend_header\n"
            .to_vec();
        for v in [f32::NAN, 0.0, 1.0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        let err = read_cloud_from(&mut bytes.as_slice()).unwrap_err();
        assert!(matches!(err, PlannerError::Ply(_)));
    }

    #[test]
    fn test_cloud_without_normals_reads_zero() {
        let cloud = read_cloud_from(&mut QUAD.as_bytes()).unwrap();
        assert_eq!(cloud.len(), 4);
        assert!(cloud.normals.iter().all(|n| *n == Vector3::zeros()));
        assert!(cloud.values.is_none());
    }

    #[test]
    fn test_annotated_cloud_reads_back() {
        let cloud = ProxyCloud::new(
            vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-1.0, 0.5, 0.0)],
            vec![Vector3::z(), Vector3::x()],
        );
        let mut bytes = Vec::new();
        write_annotated_cloud_to(&mut bytes, &cloud, &[0.25, 0.75]).unwrap();

        let restored = read_cloud_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(restored.positions, cloud.positions);
        assert_eq!(restored.normals, cloud.normals);
        assert_eq!(restored.values, Some(vec![0.25, 0.75]));
    }

    #[test]
    fn test_value_count_must_match() {
        let cloud = ProxyCloud::new(vec![Point3::origin()], vec![Vector3::z()]);
        let mut sink = Vec::new();
        assert!(write_annotated_cloud_to(&mut sink, &cloud, &[]).is_err());
    }
}
