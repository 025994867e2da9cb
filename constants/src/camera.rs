/// Simulated camera used for projection tests. Not a render target.
pub const SIMULATED_IMAGE_WIDTH: u32 = 1920;
pub const SIMULATED_IMAGE_HEIGHT: u32 = 1080;

/// Focal length normalised by the larger image dimension
pub const SIMULATED_FOCAL_LENGTH: f32 = 0.86;

/// Offset applied to ray origins and extents to avoid self intersection (world units)
pub const SURFACE_OFFSET: f32 = 0.01;
