use align_core::{ConfigError, ImageError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FastError {
    #[error("Image is {actual_width}x{actual_height}, detector was built for {width}x{height}")]
    DimensionMismatch {
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },
    #[error("FAST detection needs a grayscale image, got {0} channels")]
    NotGrayscale(usize),
    #[error("Image {width}x{height} too small (minimum {min_size}x{min_size})")]
    ImageTooSmall {
        width: usize,
        height: usize,
        min_size: usize,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageError),
}

pub type FastResult<T> = Result<T, FastError>;
