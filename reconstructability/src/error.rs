/// Error types shared by both pipelines
use crate::device::DeviceError;

pub type Result<T> = std::result::Result<T, PlannerError>;

#[derive(Debug)]
pub enum PlannerError {
    IoError(std::io::Error),
    LasError(las::Error),
    JsonError(serde_json::Error),
    DdsError(ddsfile::Error),
    /// Malformed or incomplete polygon file
    Ply(String),
    InvalidConfig(String),
    /// Sampling region has no volume
    DegenerateBounds { volume: f32 },
    MissingDirectionBasis,
    Device(DeviceError),
    /// Guidance volume file does not follow the expected layout
    Format(String),
}

impl From<std::io::Error> for PlannerError {
    fn from(err: std::io::Error) -> Self {
        PlannerError::IoError(err)
    }
}

impl From<las::Error> for PlannerError {
    fn from(err: las::Error) -> Self {
        PlannerError::LasError(err)
    }
}

impl From<serde_json::Error> for PlannerError {
    fn from(err: serde_json::Error) -> Self {
        PlannerError::JsonError(err)
    }
}

impl From<ddsfile::Error> for PlannerError {
    fn from(err: ddsfile::Error) -> Self {
        PlannerError::DdsError(err)
    }
}

impl From<DeviceError> for PlannerError {
    fn from(err: DeviceError) -> Self {
        PlannerError::Device(err)
    }
}

impl std::fmt::Display for PlannerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlannerError::IoError(e) => write!(f, "IO error: {}", e),
            PlannerError::LasError(e) => write!(f, "LAS error: {}", e),
            PlannerError::JsonError(e) => write!(f, "JSON error: {}", e),
            PlannerError::DdsError(e) => write!(f, "DDS error: {}", e),
            PlannerError::Ply(msg) => write!(f, "PLY error: {}", msg),
            PlannerError::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
            PlannerError::DegenerateBounds { volume } => {
                write!(f, "Sampling bounds are degenerate (volume {})", volume)
            }
            PlannerError::MissingDirectionBasis => {
                write!(f, "Acceleration structures were built without a direction basis")
            }
            PlannerError::Device(e) => write!(f, "Device error: {}", e),
            PlannerError::Format(msg) => write!(f, "Volume format error: {}", msg),
        }
    }
}

impl std::error::Error for PlannerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlannerError::IoError(e) => Some(e),
            PlannerError::LasError(e) => Some(e),
            PlannerError::JsonError(e) => Some(e),
            PlannerError::DdsError(e) => Some(e),
            PlannerError::Device(e) => Some(e),
            _ => None,
        }
    }
}
