use align_core::{ConfigError, ImageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeometryError {
    #[error("{count} correspondences given, a homography needs at least {required}")]
    TooFewCorrespondences { count: usize, required: usize },
    #[error("No well-conditioned homography after {iterations} iterations (best support {inliers} inliers)")]
    DegenerateGeometry { inliers: usize, iterations: usize },
    #[error("Homography is not invertible (determinant {determinant:e})")]
    NonInvertibleTransform { determinant: f64 },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type GeometryResult<T> = Result<T, GeometryError>;
