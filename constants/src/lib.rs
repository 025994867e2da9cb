/// Shared numeric conventions for guidance sampling and trajectory evaluation
pub mod camera;
pub mod histogram;
pub mod sampling;
