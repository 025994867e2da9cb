/// Camera poses and the simulated pinhole calibration used for visibility tests
use constants::camera::{SIMULATED_FOCAL_LENGTH, SIMULATED_IMAGE_HEIGHT, SIMULATED_IMAGE_WIDTH};
use nalgebra::{Matrix3, Point3, Vector2, Vector3};

/// Pixel-space pinhole intrinsics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: u32,
    pub height: u32,
}

impl Calibration {
    /// Fill intrinsics from a focal length normalised by the larger image dimension and a
    /// principal point given in image fractions.
    pub fn fill(
        focal_length: f32,
        pixel_aspect: f32,
        principal_point: [f32; 2],
        width: u32,
        height: u32,
    ) -> Self {
        let dim = width.max(height) as f32;
        let fx = focal_length * dim;
        Self {
            fx,
            fy: fx * pixel_aspect,
            cx: principal_point[0] * width as f32,
            cy: principal_point[1] * height as f32,
            width,
            height,
        }
    }

    /// The fixed camera assumed for guidance sampling and trajectory evaluation
    pub fn simulated() -> Self {
        Self::fill(
            SIMULATED_FOCAL_LENGTH,
            1.0,
            [0.5, 0.5],
            SIMULATED_IMAGE_WIDTH,
            SIMULATED_IMAGE_HEIGHT,
        )
    }

    /// Pixel position of a camera-space point, or `None` behind the camera / outside the image
    pub fn project(&self, p_cam: &Vector3<f32>) -> Option<Vector2<f32>> {
        if p_cam.z <= 0.0 {
            return None;
        }
        let u = self.fx * p_cam.x / p_cam.z + self.cx;
        let v = self.fy * p_cam.y / p_cam.z + self.cy;
        if u < 0.0 || v < 0.0 || u >= self.width as f32 || v >= self.height as f32 {
            return None;
        }
        Some(Vector2::new(u, v))
    }

    /// Half-angle of the cone through the image corner farthest from the principal point
    pub fn half_diagonal_fov(&self) -> f32 {
        let ax = self.cx.max(self.width as f32 - self.cx) / self.fx;
        let ay = self.cy.max(self.height as f32 - self.cy) / self.fy;
        (ax * ax + ay * ay).sqrt().atan()
    }
}

/// Extrinsics (world → camera) plus normalised intrinsics, as read from a scene
#[derive(Debug, Clone, PartialEq)]
pub struct CameraPose {
    pub focal_length: f32,
    pub pixel_aspect: f32,
    pub principal_point: [f32; 2],
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
}

impl CameraPose {
    /// Pose of a camera centred at `position` whose optical axis is `forward`.
    /// Image x points right and image y points down.
    pub fn looking_along(position: Point3<f32>, forward: Vector3<f32>, focal_length: f32) -> Self {
        let rotation = look_rotation(&forward);
        Self {
            focal_length,
            pixel_aspect: 1.0,
            principal_point: [0.5, 0.5],
            translation: -(rotation * position.coords),
            rotation,
        }
    }

    /// Camera centre in world coordinates
    pub fn position(&self) -> Point3<f32> {
        Point3::from(-(self.rotation.transpose() * self.translation))
    }

    /// Derive the per-pose quantities once, against a fixed image resolution
    pub fn prepare(&self, width: u32, height: u32) -> PreparedCamera {
        PreparedCamera {
            rotation: self.rotation,
            translation: self.translation,
            calibration: Calibration::fill(
                self.focal_length,
                self.pixel_aspect,
                self.principal_point,
                width,
                height,
            ),
            position: self.position(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PreparedCamera {
    pub rotation: Matrix3<f32>,
    pub translation: Vector3<f32>,
    pub calibration: Calibration,
    pub position: Point3<f32>,
}

impl PreparedCamera {
    /// Camera at `position` with optical axis `forward`, sharing `calibration`
    pub fn looking_along(
        position: Point3<f32>,
        forward: &Vector3<f32>,
        calibration: Calibration,
    ) -> Self {
        let rotation = look_rotation(forward);
        Self {
            rotation,
            translation: -(rotation * position.coords),
            calibration,
            position,
        }
    }

    pub fn world_to_camera(&self, p: &Point3<f32>) -> Vector3<f32> {
        self.rotation * p.coords + self.translation
    }

    pub fn project(&self, p: &Point3<f32>) -> Option<Vector2<f32>> {
        self.calibration.project(&self.world_to_camera(p))
    }

    /// Project a viewing direction (rotation only)
    pub fn project_direction(&self, dir: &Vector3<f32>) -> Option<Vector2<f32>> {
        self.calibration.project(&(self.rotation * dir))
    }
}

/// Rows are the camera axes (right, down, forward) in world coordinates
fn look_rotation(forward: &Vector3<f32>) -> Matrix3<f32> {
    let forward = forward.normalize();
    let up = if forward.z.abs() > 0.999 {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let right = forward.cross(&up).normalize();
    let down = forward.cross(&right);
    Matrix3::from_rows(&[right.transpose(), down.transpose(), forward.transpose()])
}
