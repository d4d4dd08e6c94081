use align_core::ConfigError;
use thiserror::Error;

/// Which keypoint sequence a match index refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchSide {
    Query,
    Train,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Only {retained} matches retained, at least {required} needed for a homography")]
    InsufficientMatches { retained: usize, required: usize },
    #[error("{side:?} index {index} out of range for {len} keypoints")]
    IndexOutOfRange { side: MatchSide, index: usize, len: usize },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type MatchResult<T> = Result<T, MatchError>;
