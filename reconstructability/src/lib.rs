/// Reconstructability guidance volumes and trajectory evaluation for aerial capture
pub mod accel;
pub mod bounds;
pub mod camera;
pub mod config;
pub mod dds_writer;
pub mod device;
pub mod error;
pub mod geometry;
pub mod heightmap;
pub mod io;
pub mod pipeline;
pub mod progress;
pub mod sampler;
pub mod sphere;
pub mod trajectory;
pub mod volume;

pub use error::{PlannerError, Result};
