use nalgebra::{Point3, Vector3};
use reconstructability::camera::CameraPose;
use reconstructability::config::EvaluatorConfig;
use reconstructability::geometry::{ProxyCloud, TriangleMesh};
use reconstructability::io::{ply, scene};
use reconstructability::pipeline::{EvaluationPipeline, evaluate_trajectory};
use std::fmt::Write as _;
use std::fs;

const FOCAL: f32 = 0.86;

fn looking_at(position: Point3<f32>, target: Point3<f32>) -> CameraPose {
    CameraPose::looking_along(position, target - position, FOCAL)
}

/// Small triangle hovering over the origin at z = 5
fn occluder() -> TriangleMesh {
    TriangleMesh::new(
        vec![
            Point3::new(-1.0, -1.0, 5.0),
            Point3::new(1.0, -1.0, 5.0),
            Point3::new(0.0, 1.0, 5.0),
        ],
        vec![[0, 1, 2]],
    )
}

fn cloud() -> ProxyCloud {
    ProxyCloud::new(
        vec![Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 0.0, 0.0)],
        vec![Vector3::z(); 2],
    )
}

#[test]
fn test_occluded_point_gets_no_rows() {
    let poses: Vec<CameraPose> = (0..3)
        .map(|i| {
            let p = Point3::new(0.1 * i as f32, 0.0, 10.0);
            CameraPose::looking_along(p, Vector3::new(0.0, 0.0, -1.0), FOCAL)
        })
        .collect();

    let report = evaluate_trajectory(&occluder(), &cloud(), &poses, &EvaluatorConfig::default())
        .unwrap();
    assert_eq!(report.histogram.count(0), 0);
    assert_eq!(report.histogram.count(1), 3);
    assert_eq!(report.quality[0], 0.0);
    assert_eq!(report.summary.observed, 1);
}

#[test]
fn test_rows_bounded_by_capacity() {
    let poses: Vec<CameraPose> = (0..10)
        .map(|i| looking_at(Point3::new(3.0 + i as f32, 4.0, 10.0), Point3::new(3.0, 0.0, 0.0)))
        .collect();
    let config = EvaluatorConfig {
        max_cameras: 4,
        export: None,
    };

    let report = evaluate_trajectory(&occluder(), &cloud(), &poses, &config).unwrap();
    assert_eq!(report.histogram.count(1), 4);
    assert!(report.histogram.counts().iter().all(|&c| c <= 4));
}

#[test]
fn test_symmetric_cameras_quality() {
    let half = 30f32.to_radians();
    let target = Point3::new(3.0, 0.0, 0.0);
    let poses = vec![
        looking_at(target + Vector3::new(half.sin(), 0.0, half.cos()) * 10.0, target),
        looking_at(target + Vector3::new(-half.sin(), 0.0, half.cos()) * 10.0, target),
    ];

    let report = evaluate_trajectory(
        &TriangleMesh::default(),
        &cloud(),
        &poses,
        &EvaluatorConfig::default(),
    )
    .unwrap();
    assert_eq!(report.histogram.count(1), 2);
    assert!((report.quality[1] - half.cos()).abs() < 1e-3);
    assert!(report.summary.max_quality >= report.quality[1]);
}

#[test]
fn test_pipeline_exports_annotated_cloud() {
    let dir = tempfile::tempdir().unwrap();
    let half = 30f32.to_radians();
    let target = Point3::new(3.0, 0.0, 0.0);
    scene::write_scene(
        &dir.path().join(scene::SCENE_FILE_NAME),
        &[
            looking_at(target + Vector3::new(half.sin(), 0.0, half.cos()) * 10.0, target),
            looking_at(target + Vector3::new(-half.sin(), 0.0, half.cos()) * 10.0, target),
        ],
    )
    .unwrap();

    // occluder moved clear of both sight lines
    let mut mesh = occluder();
    for v in mesh.vertices.iter_mut() {
        v.x -= 20.0;
    }
    let mesh_path = dir.path().join("proxy.ply");
    let mut text = String::from("ply\nformat ascii 1.0\nelement vertex 3\n");
    text.push_str("property float x\nproperty float y\nproperty float z\n");
    text.push_str("element face 1\nproperty list uchar int vertex_indices\nend_header\n");
    for v in &mesh.vertices {
        writeln!(text, "{} {} {}", v.x, v.y, v.z).unwrap();
    }
    text.push_str("3 0 1 2\n");
    fs::write(&mesh_path, text).unwrap();

    let cloud_path = dir.path().join("cloud.ply");
    ply::write_annotated_cloud(&cloud_path, &cloud(), &[0.0, 0.0]).unwrap();

    let export_path = dir.path().join("quality.ply");
    let config = EvaluatorConfig {
        export: Some(export_path.clone()),
        ..Default::default()
    };
    let pipeline = EvaluationPipeline::new(dir.path(), &mesh_path, &cloud_path, config).unwrap();
    let report = pipeline.run().unwrap();

    let exported = ply::read_cloud(&export_path).unwrap();
    let values = exported.values.unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values, report.quality);
    assert!((values[1] - half.cos()).abs() < 1e-3);
}

#[test]
fn test_invalid_row_capacity_is_rejected() {
    let config = EvaluatorConfig {
        max_cameras: 1,
        export: None,
    };
    assert!(evaluate_trajectory(&occluder(), &cloud(), &[], &config).is_err());
}
