use align_core::{FeatureConfig, ScoreType};

use crate::detector::FastDetector;
use crate::error::FastResult;

/// Fluent builder for a `FastDetector`
#[derive(Debug, Clone)]
pub struct DetectorBuilder {
    config: FeatureConfig,
    width: usize,
    height: usize,
}

impl DetectorBuilder {
    /// Create a new builder with default settings
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            config: FeatureConfig::default(),
            width,
            height,
        }
    }

    /// Create a builder from an existing configuration
    pub fn from_config(config: FeatureConfig, width: usize, height: usize) -> Self {
        Self { config, width, height }
    }

    /// Maximum number of keypoints returned
    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.max_features = max_features;
        self
    }

    /// Set the FAST threshold (1-127)
    pub fn threshold(mut self, threshold: u8) -> Self {
        self.config.fast_threshold = threshold;
        self
    }

    /// Set the patch size for orientation and descriptors
    pub fn patch_size(mut self, patch_size: usize) -> Self {
        self.config.patch_size = patch_size;
        self
    }

    /// Set the number of pyramid levels and the ratio between them
    pub fn pyramid(mut self, n_levels: usize, scale_factor: f32) -> Self {
        self.config.n_levels = n_levels;
        self.config.scale_factor = scale_factor;
        self
    }

    pub fn score_type(mut self, score_type: ScoreType) -> Self {
        self.config.score_type = score_type;
        self
    }

    /// Set the non-maximum suppression radius
    pub fn nms_radius(mut self, radius: usize) -> Self {
        self.config.nms_radius = radius;
        self
    }

    /// Enable or disable subpixel refinement
    pub fn subpixel_refinement(mut self, enable: bool) -> Self {
        self.config.subpixel_refinement = enable;
        self
    }

    /// Build the detector, validating the configuration
    pub fn build(self) -> FastResult<FastDetector> {
        FastDetector::new(self.config, self.width, self.height)
    }

    /// Convert the builder into its configuration
    pub fn to_config(self) -> FeatureConfig {
        self.config
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        format!(
            "DetectorBuilder: {}x{}, max_features={}, threshold={}, patch_size={}, levels={}x{:.2}, score={:?}, NMS radius={}, subpixel={}",
            self.width,
            self.height,
            self.config.max_features,
            self.config.fast_threshold,
            self.config.patch_size,
            self.config.n_levels,
            self.config.scale_factor,
            self.config.score_type,
            self.config.nms_radius,
            self.config.subpixel_refinement
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FastError;

    #[test]
    fn test_builder_sets_fields() {
        let cfg = DetectorBuilder::new(64, 64)
            .max_features(42)
            .threshold(15)
            .patch_size(15)
            .pyramid(3, 1.5)
            .score_type(ScoreType::Fast)
            .nms_radius(2)
            .subpixel_refinement(false)
            .to_config();

        assert_eq!(cfg.max_features, 42);
        assert_eq!(cfg.fast_threshold, 15);
        assert_eq!(cfg.patch_size, 15);
        assert_eq!(cfg.n_levels, 3);
        assert_eq!(cfg.scale_factor, 1.5);
        assert_eq!(cfg.score_type, ScoreType::Fast);
        assert_eq!(cfg.nms_radius, 2);
        assert!(!cfg.subpixel_refinement);
    }

    #[test]
    fn test_build_validates() {
        assert!(DetectorBuilder::new(64, 64).build().is_ok());
        assert!(matches!(
            DetectorBuilder::new(64, 64).patch_size(8).build(),
            Err(FastError::Config(_))
        ));
    }

    #[test]
    fn test_summary() {
        let summary = DetectorBuilder::new(640, 480).threshold(25).summary();
        assert!(summary.contains("640x480"));
        assert!(summary.contains("threshold=25"));
    }
}
