//! FAST corner detection for the feature extraction stage.
//!
//! Corners are found with the FAST-9 segment test on every level of an
//! image pyramid, scored (Harris or FAST score), thinned by non-maximum
//! suppression, ranked by response and finally oriented with the
//! intensity-centroid method.

pub mod builder;
pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod refinement;
pub mod types;
pub mod utils;

pub use builder::DetectorBuilder;
pub use corner_detection::CornerDetector;
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use refinement::KeypointRefinement;
pub use types::ScoredKeypoint;
