//! Shared data model for the registration pipeline.
//!
//! Every stage crate (`align-fast`, `align-brief`, `align-match`,
//! `align-geometry`) speaks in terms of the types defined here, so the
//! stages can be tested in isolation and composed by `align-cli`.

pub mod config;
pub mod image;
pub mod pyramid;
pub mod types;

pub use config::{AlignConfig, ConfigError, ConfigResult, FeatureConfig, MatchConfig, RansacConfig, ScoreType};
pub use image::{Image, ImageError, ImageResult};
pub use pyramid::{ImagePyramid, PyramidLevel};
pub use types::{hamming_distance, Descriptor, Keypoint, Match, PointCorrespondence, DESCRIPTOR_BITS, DESCRIPTOR_SIZE};

/// Dedicated Rayon pool with `n_threads` workers for one pipeline instance
pub fn build_thread_pool(n_threads: usize) -> Result<rayon::ThreadPool, rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .thread_name(|i| format!("align-worker-{}", i))
        .build()
}
