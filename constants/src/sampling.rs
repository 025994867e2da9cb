/// Guidance sampler defaults (world units)
pub const DEFAULT_RESOLUTION: f32 = 1.0;
pub const DEFAULT_MAX_DISTANCE: f32 = 80.0;
pub const DEFAULT_MIN_ALTITUDE: f32 = 0.0;
pub const DEFAULT_MAX_ALTITUDE: f32 = 100.0;
/// Dense sample grid size above which a run is refused
pub const MAX_GRID_VOXELS: u64 = 1 << 28;
