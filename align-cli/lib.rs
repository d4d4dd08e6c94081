//! Pairwise image registration.
//!
//! [`Aligner`] chains the stage crates: FAST + rotated BRIEF features for
//! both images, brute-force Hamming matching, best-fraction filtering,
//! RANSAC homography estimation and perspective warping of the source
//! into the target frame. File and display I/O live in the `align` binary;
//! [`render`] holds the helpers it uses.

pub mod render;

use align_brief::{BriefError, BriefGenerator};
use align_core::{build_thread_pool, ConfigError, Descriptor, Image, ImageError, Keypoint, Match};
use align_fast::{FastDetector, FastError};
use align_geometry::{GeometryError, Homography, HomographyEstimator, Warper};
use align_match::{correspondences, BruteForceMatcher, CorrespondenceFilter, MatchError};
use flexi_logger::{FlexiLoggerError, Logger, LoggerHandle};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

pub use align_core::AlignConfig;
pub use align_geometry::RansacResult;

#[derive(Debug, Error)]
pub enum AlignError {
    #[error("Insufficient matches: {retained} retained, {required} required")]
    InsufficientMatches { retained: usize, required: usize },
    #[error("Degenerate geometry: best model has {inliers} inliers after {iterations} iterations")]
    DegenerateGeometry { inliers: usize, iterations: usize },
    #[error("Non-invertible transform (determinant {determinant:e})")]
    NonInvertibleTransform { determinant: f64 },
    #[error("Feature detection failed: {0}")]
    Detection(#[from] FastError),
    #[error("Descriptor extraction failed: {0}")]
    Descriptor(#[from] BriefError),
    #[error("Invalid match: {0}")]
    InvalidMatch(MatchError),
    #[error("Geometry error: {0}")]
    Geometry(GeometryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Image(#[from] ImageError),
    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<MatchError> for AlignError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InsufficientMatches { retained, required } => AlignError::InsufficientMatches { retained, required },
            MatchError::Config(e) => AlignError::Config(e),
            other => AlignError::InvalidMatch(other),
        }
    }
}

impl From<GeometryError> for AlignError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::DegenerateGeometry { inliers, iterations } => AlignError::DegenerateGeometry { inliers, iterations },
            GeometryError::NonInvertibleTransform { determinant } => AlignError::NonInvertibleTransform { determinant },
            GeometryError::TooFewCorrespondences { count, required } => AlignError::InsufficientMatches {
                retained: count,
                required,
            },
            GeometryError::Config(e) => AlignError::Config(e),
            GeometryError::Image(e) => AlignError::Image(e),
        }
    }
}

pub type AlignResult<T> = Result<T, AlignError>;

/// Keypoints of one image with their descriptors, index-aligned
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Result of a successful registration
#[derive(Debug, Clone)]
pub struct Alignment {
    /// Source resampled into the target frame (target size, source channels)
    pub registered: Image,
    /// Maps source coordinates onto target coordinates
    pub homography: Homography,
    /// Retained matches: `query_idx` into the source keypoints, `train_idx` into the target's
    pub matches: Vec<Match>,
    /// One flag per retained match
    pub inlier_mask: Vec<bool>,
    pub source_keypoints: Vec<Keypoint>,
    pub target_keypoints: Vec<Keypoint>,
    pub ransac_iterations: usize,
}

impl Alignment {
    pub fn inlier_count(&self) -> usize {
        self.inlier_mask.iter().filter(|&&inlier| inlier).count()
    }
}

/// Registration pipeline built from one `AlignConfig`
pub struct Aligner {
    cfg: AlignConfig,
    pool: rayon::ThreadPool,
    brief: BriefGenerator,
    matcher: BruteForceMatcher,
    filter: CorrespondenceFilter,
    estimator: HomographyEstimator,
    warper: Warper,
}

impl Aligner {
    pub fn new(cfg: AlignConfig) -> AlignResult<Self> {
        cfg.validate()?;

        let pool = build_thread_pool(cfg.n_threads)?;
        let brief = BriefGenerator::new(cfg.features.patch_size)?;
        let matcher = BruteForceMatcher::from_config(&cfg.matching);
        let filter = CorrespondenceFilter::from_config(&cfg.matching)?;
        let estimator = HomographyEstimator::new(cfg.ransac.clone())?;
        let warper = Warper::new(cfg.background);

        debug!("{}", cfg.summary());
        Ok(Self {
            cfg,
            pool,
            brief,
            matcher,
            filter,
            estimator,
            warper,
        })
    }

    pub fn config(&self) -> &AlignConfig {
        &self.cfg
    }

    /// Detect and describe up to `max_features` keypoints, strongest first.
    ///
    /// Color images are converted to grayscale first. An image without
    /// corners, or too small to hold a descriptor window, yields empty
    /// features, not an error.
    pub fn extract(&self, img: &Image) -> AlignResult<Features> {
        self.pool.install(|| self.extract_in_pool(img))
    }

    fn extract_in_pool(&self, img: &Image) -> AlignResult<Features> {
        let gray = img.to_gray();
        let min_size = FastDetector::min_image_size(&self.cfg.features);
        if gray.width() < min_size || gray.height() < min_size {
            debug!(
                "Extract: {}x{} image cannot hold a {}x{} descriptor window, no features",
                gray.width(),
                gray.height(),
                min_size,
                min_size
            );
            return Ok(Features::default());
        }
        let detector = FastDetector::new(self.cfg.features.clone(), gray.width(), gray.height())?;
        let pyramid = detector.build_pyramid(&gray)?;
        let keypoints = detector.detect_in_pyramid(&pyramid);
        let descriptors = self.brief.generate_descriptors(&pyramid, &keypoints)?;
        Ok(Features { keypoints, descriptors })
    }

    /// Register `source` onto `target`, seeding RANSAC from the configured
    /// seed or, without one, from OS entropy.
    pub fn align(&self, source: &Image, target: &Image) -> AlignResult<Alignment> {
        let mut rng = match self.cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.align_with_rng(source, target, &mut rng)
    }

    /// Register `source` onto `target` with an explicit random source
    pub fn align_with_rng<R: Rng + ?Sized>(&self, source: &Image, target: &Image, rng: &mut R) -> AlignResult<Alignment> {
        let (src_features, dst_features) = self
            .pool
            .install(|| rayon::join(|| self.extract_in_pool(source), || self.extract_in_pool(target)));
        let (src_features, dst_features) = (src_features?, dst_features?);

        let matches = self
            .pool
            .install(|| self.matcher.match_descriptors(&src_features.descriptors, &dst_features.descriptors));
        let total_matches = matches.len();
        let matches = self.filter.filter(matches)?;

        let pairs = correspondences(&matches, &src_features.keypoints, &dst_features.keypoints)?;
        let fit = self.estimator.estimate(&pairs, rng)?;

        let (width, height) = target.dimensions();
        let registered = self
            .pool
            .install(|| self.warper.warp(source, &fit.homography, width, height))?;

        info!(
            "Aligned {}x{} onto {}x{}: {}/{} keypoints, {} matches, {} retained, {} inliers, {} RANSAC iterations",
            source.width(),
            source.height(),
            width,
            height,
            src_features.len(),
            dst_features.len(),
            total_matches,
            matches.len(),
            fit.inlier_count,
            fit.iterations
        );

        Ok(Alignment {
            registered,
            homography: fit.homography,
            matches,
            inlier_mask: fit.inlier_mask,
            source_keypoints: src_features.keypoints,
            target_keypoints: dst_features.keypoints,
            ransac_iterations: fit.iterations,
        })
    }
}

/// Start logging to stderr; `RUST_LOG` overrides `default_spec`.
///
/// Keep the returned handle alive for as long as logging is needed.
pub fn setup_logging(default_spec: &str) -> Result<LoggerHandle, FlexiLoggerError> {
    Logger::try_with_env_or_str(default_spec)?
        .log_to_stderr()
        .format(flexi_logger::detailed_format)
        .start()
}
