use align_core::{FeatureConfig, Image, ImagePyramid, Keypoint, PyramidLevel, ScoreType};
use log::debug;
use rayon::prelude::*;

use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::refinement::KeypointRefinement;
use crate::types::ScoredKeypoint;

/// Main FAST corner detector with multi-scale capability
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: FeatureConfig,
    w: usize,
    h: usize,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: FeatureConfig, width: usize, height: usize) -> FastResult<Self> {
        cfg.validate()?;

        // The descriptor patch has to fit at least once inside the image
        let min_size = Self::min_image_size(&cfg);
        if width < min_size || height < min_size {
            return Err(FastError::ImageTooSmall {
                width,
                height,
                min_size,
            });
        }

        Ok(Self {
            cfg,
            w: width,
            h: height,
        })
    }

    /// Smallest image side the detector accepts for `cfg`
    pub fn min_image_size(cfg: &FeatureConfig) -> usize {
        2 * cfg.border() + 1
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &Image) -> FastResult<()> {
        if !img.is_gray() {
            return Err(FastError::NotGrayscale(img.channels()));
        }
        if img.dimensions() != (self.w, self.h) {
            return Err(FastError::DimensionMismatch {
                width: self.w,
                height: self.h,
                actual_width: img.width(),
                actual_height: img.height(),
            });
        }
        Ok(())
    }

    /// Build the scale pyramid the detector (and the descriptor stage) work on
    pub fn build_pyramid(&self, img: &Image) -> FastResult<ImagePyramid> {
        self.validate_image(img)?;
        Ok(ImagePyramid::build(
            img,
            self.cfg.n_levels,
            self.cfg.scale_factor,
            Self::min_image_size(&self.cfg),
        )?)
    }

    /// Detect, rank and orient keypoints in a grayscale image
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        let pyramid = self.build_pyramid(img)?;
        Ok(self.detect_in_pyramid(&pyramid))
    }

    /// Detect keypoints across all pyramid levels.
    ///
    /// The result holds at most `max_features` keypoints sorted by response,
    /// highest first. Equal responses keep level order, then raster order,
    /// so raising `max_features` only ever appends keypoints.
    pub fn detect_in_pyramid(&self, pyramid: &ImagePyramid) -> Vec<Keypoint> {
        let per_level: Vec<Vec<(usize, ScoredKeypoint)>> = pyramid
            .levels()
            .par_iter()
            .enumerate()
            .map(|(index, level)| {
                self.detect_at_level(level)
                    .into_iter()
                    .map(|sk| (index, sk))
                    .collect()
            })
            .collect();

        let mut candidates: Vec<(usize, ScoredKeypoint)> = per_level.into_iter().flatten().collect();
        let total = candidates.len();

        candidates.sort_by(|a, b| b.1.response.total_cmp(&a.1.response));
        candidates.truncate(self.cfg.max_features);

        let keypoints: Vec<Keypoint> = candidates
            .par_iter()
            .map(|&(index, sk)| self.finish_keypoint(&pyramid.levels()[index], sk))
            .collect();

        debug!(
            "FAST: {} candidates over {} levels, kept {}",
            total,
            pyramid.len(),
            keypoints.len()
        );

        keypoints
    }

    /// Corner candidates on one level after non-maximum suppression
    pub fn detect_at_level(&self, level: &PyramidLevel) -> Vec<ScoredKeypoint> {
        let raw = CornerDetector::detect(
            &level.image,
            self.cfg.fast_threshold,
            self.cfg.border(),
            self.cfg.score_type,
        );
        KeypointRefinement::non_maximum_suppression(&raw, level.width(), level.height(), self.cfg.nms_radius)
    }

    /// Orient a ranked candidate and lift it into base-image coordinates
    fn finish_keypoint(&self, level: &PyramidLevel, sk: ScoredKeypoint) -> Keypoint {
        let (ox, oy) = if self.cfg.subpixel_refinement && self.cfg.score_type == ScoreType::Harris {
            KeypointRefinement::refine_subpixel(&level.image, sk.x, sk.y)
        } else {
            (0.0, 0.0)
        };
        let angle = KeypointRefinement::compute_orientation(&level.image, sk.x, sk.y, self.cfg.patch_size);

        // Level pixel centres sit at (i + 0.5) * scale - 0.5 in the base image
        let scale = level.scale;
        Keypoint {
            x: (sk.x as f32 + ox + 0.5) * scale - 0.5,
            y: (sk.y as f32 + oy + 0.5) * scale - 0.5,
            scale: self.cfg.patch_size as f32 * scale,
            angle,
            response: sk.response,
            octave: level.level,
        }
    }

    /// Get detector configuration
    pub fn config(&self) -> &FeatureConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}
