/// Guidance histogram image layout (azimuth columns × elevation rows)
pub const HISTOGRAM_WIDTH: usize = 128;
pub const HISTOGRAM_HEIGHT: usize = 45;

/// Sphere subdivision level for the direction basis (642 vertices at level 3)
pub const DEFAULT_SPHERE_SUBDIVISIONS: u32 = 3;

/// Default capacity of the per-point observation row store
pub const DEFAULT_MAX_CAMERAS: usize = 64;

/// Rows reserved at the tail of each row store for the reduced aggregates
pub const AGGREGATE_ROWS: usize = 2;

/// Export quality scale: `QUALITY_SCALE * clamp(lambda, 0, LAMBDA_CLAMP)`.
/// Empirical; 10 × 0.1 maps a saturated spread to 1.
pub const QUALITY_SCALE: f32 = 10.0;
pub const LAMBDA_CLAMP: f32 = 0.1;
