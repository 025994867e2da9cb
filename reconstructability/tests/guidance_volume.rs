use nalgebra::{Point3, Vector3};
use reconstructability::PlannerError;
use reconstructability::config::SamplerConfig;
use reconstructability::geometry::{ProxyCloud, TriangleMesh};
use reconstructability::heightmap::HeightMap;
use reconstructability::pipeline::{GuidancePipeline, build_guidance_volume};
use reconstructability::sampler::grid::SampleGrid;
use reconstructability::volume::GuidanceVolume;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Square grid mesh of `size × size` cells at height `z`
fn plane(size: usize, z: f32) -> TriangleMesh {
    let n = size + 1;
    let mut vertices = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            vertices.push(Point3::new(x as f32, y as f32, z));
        }
    }
    let mut faces = Vec::new();
    for y in 0..size {
        for x in 0..size {
            let i = (y * n + x) as u32;
            let n = n as u32;
            faces.push([i, i + 1, i + n + 1]);
            faces.push([i, i + n + 1, i + n]);
        }
    }
    TriangleMesh::new(vertices, faces)
}

fn write_mesh_ply(path: &Path, mesh: &TriangleMesh) {
    let mut text = String::new();
    writeln!(text, "ply\nformat ascii 1.0").unwrap();
    writeln!(text, "element vertex {}", mesh.vertices.len()).unwrap();
    writeln!(text, "property float x\nproperty float y\nproperty float z").unwrap();
    writeln!(text, "element face {}", mesh.faces.len()).unwrap();
    writeln!(text, "property list uchar int vertex_indices\nend_header").unwrap();
    for v in &mesh.vertices {
        writeln!(text, "{} {} {}", v.x, v.y, v.z).unwrap();
    }
    for f in &mesh.faces {
        writeln!(text, "3 {} {} {}", f[0], f[1], f[2]).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn write_cloud_ply(path: &Path, cloud: &ProxyCloud) {
    let mut text = String::new();
    writeln!(text, "ply\nformat ascii 1.0").unwrap();
    writeln!(text, "element vertex {}", cloud.len()).unwrap();
    for name in ["x", "y", "z", "nx", "ny", "nz"] {
        writeln!(text, "property float {}", name).unwrap();
    }
    writeln!(text, "end_header").unwrap();
    for (p, n) in cloud.positions.iter().zip(&cloud.normals) {
        writeln!(text, "{} {} {} {} {} {}", p.x, p.y, p.z, n.x, n.y, n.z).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn test_planar_airspace_voxel_counts() {
    let airspace = plane(10, 5.0);
    let config = SamplerConfig {
        max_altitude: 10.0,
        ..Default::default()
    };

    let aabb = airspace.bounds();
    assert!(matches!(
        aabb.validate(),
        Err(PlannerError::DegenerateBounds { .. })
    ));
    let aabb = aabb.extended_to_altitude(config.max_altitude);
    aabb.validate().unwrap();

    let map = HeightMap::build(&airspace.vertices, &aabb, config.resolution);
    assert_eq!((map.width, map.height), (11, 11));
    assert_eq!(map.ground_level, 5.0);
    assert!(map.data().iter().all(|&h| h == 0.0));

    let grid = SampleGrid::enumerate(&map, &config);
    assert_eq!(grid.depth, 11);
    assert_eq!(grid.len(), 121 * 11);
    for x in 0..11 {
        for y in 0..11 {
            let column = grid
                .positions
                .iter()
                .filter(|p| p[0] == x && p[1] == y)
                .count();
            assert_eq!(column, 11);
        }
    }
    assert_eq!(grid.world_position([0, 0, 0]).z, 5.0);
}

#[test]
fn test_no_voxel_below_terrain() {
    // stepped terrain: left half at 0, right half at 3
    let mut airspace = plane(6, 0.0);
    for v in airspace.vertices.iter_mut() {
        if v.x > 3.0 {
            v.z = 3.0;
        }
    }
    let config = SamplerConfig {
        min_altitude: 1.0,
        max_altitude: 6.0,
        ..Default::default()
    };
    let aabb = airspace.bounds().extended_to_altitude(config.max_altitude);
    let map = HeightMap::build(&airspace.vertices, &aabb, config.resolution);
    let grid = SampleGrid::enumerate(&map, &config);

    for p in &grid.positions {
        let floor = map.get(p[0] as usize, p[1] as usize).max(config.min_altitude);
        assert!(p[2] as f32 * config.resolution >= floor);
    }
    let low = grid.positions.iter().filter(|p| p[0] == 0 && p[1] == 0).count();
    let high = grid.positions.iter().filter(|p| p[0] == 5 && p[1] == 0).count();
    // depth 7: z 1..=6 on the low side, 3..=6 on the high side
    assert_eq!(low, 6);
    assert_eq!(high, 4);
}

#[test]
fn test_sampled_voxel_sees_point_below() {
    let ground = plane(10, 0.0);
    let cloud = ProxyCloud::new(vec![Point3::new(5.0, 5.0, 0.0)], vec![Vector3::z()]);
    let config = SamplerConfig {
        max_altitude: 2.0,
        sphere_subdivisions: 2,
        workers: 2,
        ..Default::default()
    };

    let volume = build_guidance_volume(&ground, &cloud, &ground, &config).unwrap();
    assert_eq!((volume.width, volume.height, volume.depth), (11, 11, 3));
    assert_eq!(volume.len(), 11 * 11 * 3);

    let above = volume.get([5, 5, 2]).unwrap();
    assert!((above.max() - 1.0).abs() < 1e-4);

    // a voxel at ground level sees the point edge-on at best
    let level = volume.get([0, 5, 0]).unwrap();
    assert!(level.max() < 0.5);
}

#[test]
fn test_pipeline_writes_loadable_volume() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("proxy.ply");
    let cloud_path = dir.path().join("cloud.ply");
    let out_path = dir.path().join("guidance.gvol");
    let dds_path = dir.path().join("height.dds");

    let ground = plane(3, 0.0);
    write_mesh_ply(&mesh_path, &ground);
    write_cloud_ply(
        &cloud_path,
        &ProxyCloud::new(
            vec![Point3::new(1.5, 1.25, 0.0), Point3::new(0.5, 2.5, 0.0)],
            vec![Vector3::z(), Vector3::z()],
        ),
    );

    let config = SamplerConfig {
        max_altitude: 2.0,
        sphere_subdivisions: 1,
        heightmap_out: Some(dds_path.clone()),
        ..Default::default()
    };
    let pipeline =
        GuidancePipeline::new(&mesh_path, &cloud_path, &mesh_path, &out_path, config).unwrap();
    let volume = pipeline.run().unwrap();

    assert!(dds_path.exists());
    let restored = GuidanceVolume::load(&out_path).unwrap();
    assert_eq!(restored, volume);
    assert_eq!(restored.len(), 4 * 4 * 3);
}

#[test]
fn test_failed_run_leaves_no_height_map() {
    let dir = tempfile::tempdir().unwrap();
    let mesh_path = dir.path().join("proxy.ply");
    let cloud_path = dir.path().join("cloud.ply");
    let dds_path = dir.path().join("height.dds");
    write_mesh_ply(&mesh_path, &plane(2, 0.0));
    write_cloud_ply(
        &cloud_path,
        &ProxyCloud::new(vec![Point3::new(1.0, 1.0, 0.0)], vec![Vector3::z()]),
    );

    let config = SamplerConfig {
        max_altitude: 1.0,
        sphere_subdivisions: 0,
        heightmap_out: Some(dds_path.clone()),
        ..Default::default()
    };
    // output directory does not exist, so saving the volume fails
    let out_path = dir.path().join("missing").join("guidance.gvol");
    let pipeline =
        GuidancePipeline::new(&mesh_path, &cloud_path, &mesh_path, &out_path, config).unwrap();

    assert!(matches!(pipeline.run(), Err(PlannerError::IoError(_))));
    assert!(!dds_path.exists());
}

#[test]
fn test_pipeline_rejects_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.ply");
    let result = GuidancePipeline::new(
        &missing,
        &missing,
        &missing,
        &dir.path().join("out.gvol"),
        SamplerConfig::default(),
    );
    assert!(matches!(result, Err(PlannerError::IoError(_))));
    assert!(!dir.path().join("out.gvol").exists());
}
