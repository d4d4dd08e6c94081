//! Projective geometry for the registration pipeline.
//!
//! * [`homography`]: the `Homography` type and the shared DLT solver used
//!   for both minimal samples and least-squares refits.
//! * [`ransac`]: outlier-robust estimation with an injected RNG.
//! * [`warp`]: inverse-mapped bilinear resampling into a target frame.

pub mod error;
pub mod homography;
pub mod ransac;
pub mod warp;

pub use error::{GeometryError, GeometryResult};
pub use homography::{solve_homography, Homography};
pub use ransac::{adaptive_iterations, estimate_homography, HomographyEstimator, RansacResult, SAMPLE_SIZE};
pub use warp::{warp_perspective, Warper};
