use thiserror::Error;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid FAST threshold: {0} (must be 1-127)")]
    InvalidThreshold(u8),
    #[error("Invalid patch size {0} (must be odd and >= 7)")]
    InvalidPatchSize(usize),
    #[error("max_features must be positive")]
    ZeroFeatures,
    #[error("Invalid pyramid: {n_levels} levels with scale factor {scale_factor}")]
    InvalidPyramid { n_levels: usize, scale_factor: f32 },
    #[error("good_match_percent must be in (0, 1], got {0}")]
    InvalidMatchPercent(f64),
    #[error("RANSAC reprojection threshold must be positive and finite, got {0}")]
    InvalidReprojectionThreshold(f64),
    #[error("RANSAC iteration budget must be positive")]
    ZeroIterations,
    #[error("RANSAC confidence must be in (0, 1), got {0}")]
    InvalidConfidence(f64),
    #[cfg(feature = "serde")]
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "serde")]
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[cfg(feature = "serde")]
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),
    #[cfg(feature = "serde")]
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Corner score used to rank FAST detections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScoreType {
    #[default]
    Harris,
    Fast,
}

/// Feature extraction settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FeatureConfig {
    pub max_features: usize,
    pub fast_threshold: u8,
    /// Side of the orientation / descriptor patch (odd)
    pub patch_size: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub score_type: ScoreType,
    /// Half-width of the non-maximum suppression window
    pub nms_radius: usize,
    /// Quadratic peak fit on the corner response around each kept corner
    pub subpixel_refinement: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 500,
            fast_threshold: 20,
            patch_size: 31,
            n_levels: 8,
            scale_factor: 1.2,
            score_type: ScoreType::Harris,
            nms_radius: 1,
            subpixel_refinement: true,
        }
    }
}

impl FeatureConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_features == 0 {
            return Err(ConfigError::ZeroFeatures);
        }
        if self.fast_threshold == 0 || self.fast_threshold > 127 {
            return Err(ConfigError::InvalidThreshold(self.fast_threshold));
        }
        if self.patch_size % 2 == 0 || self.patch_size < 7 {
            return Err(ConfigError::InvalidPatchSize(self.patch_size));
        }
        if self.n_levels == 0 || !(self.scale_factor > 1.0) || !self.scale_factor.is_finite() {
            return Err(ConfigError::InvalidPyramid {
                n_levels: self.n_levels,
                scale_factor: self.scale_factor,
            });
        }
        Ok(())
    }

    /// Distance a corner must keep from the border of its pyramid level
    pub fn border(&self) -> usize {
        self.patch_size / 2 + 1
    }
}

/// Matching and correspondence filtering settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MatchConfig {
    /// Fraction of the best matches retained, in (0, 1]
    pub good_match_percent: f64,
    pub cross_check: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            good_match_percent: 0.15,
            cross_check: false,
        }
    }
}

impl MatchConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.good_match_percent > 0.0 && self.good_match_percent <= 1.0) {
            return Err(ConfigError::InvalidMatchPercent(self.good_match_percent));
        }
        Ok(())
    }
}

/// Robust homography estimation settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    pub reprojection_threshold_px: f64,
    pub max_iterations: usize,
    /// Early-termination confidence; `None` always spends the full budget
    pub confidence: Option<f64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            reprojection_threshold_px: 3.0,
            max_iterations: 2000,
            confidence: Some(0.995),
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.reprojection_threshold_px > 0.0) || !self.reprojection_threshold_px.is_finite() {
            return Err(ConfigError::InvalidReprojectionThreshold(self.reprojection_threshold_px));
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if let Some(confidence) = self.confidence {
            if !(confidence > 0.0 && confidence < 1.0) {
                return Err(ConfigError::InvalidConfidence(confidence));
            }
        }
        Ok(())
    }
}

/// Complete registration configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignConfig {
    pub n_threads: usize,
    /// RANSAC seed; `None` seeds from OS entropy
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub seed: Option<u64>,
    /// Fill value for output pixels that map outside the source image
    pub background: u8,
    pub features: FeatureConfig,
    pub matching: MatchConfig,
    pub ransac: RansacConfig,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            n_threads: num_cpus::get().max(1),
            seed: None,
            background: 0,
            features: FeatureConfig::default(),
            matching: MatchConfig::default(),
            ransac: RansacConfig::default(),
        }
    }
}

impl AlignConfig {
    /// Fast preset: fewer features and a smaller RANSAC budget
    pub fn fast_preset() -> Self {
        Self {
            features: FeatureConfig {
                max_features: 300,
                fast_threshold: 30,
                n_levels: 4,
                score_type: ScoreType::Fast,
                subpixel_refinement: false,
                ..FeatureConfig::default()
            },
            ransac: RansacConfig {
                max_iterations: 500,
                ..RansacConfig::default()
            },
            ..Self::default()
        }
    }

    /// Quality preset: more features, more of them kept, exhaustive RANSAC
    pub fn quality_preset() -> Self {
        Self {
            features: FeatureConfig {
                max_features: 2000,
                fast_threshold: 12,
                ..FeatureConfig::default()
            },
            matching: MatchConfig {
                good_match_percent: 0.25,
                cross_check: true,
            },
            ransac: RansacConfig {
                reprojection_threshold_px: 2.0,
                max_iterations: 5000,
                confidence: None,
            },
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> ConfigResult<()> {
        self.features.validate()?;
        self.matching.validate()?;
        self.ransac.validate()
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "AlignConfig: max_features={}, threshold={}, levels={}x{:.2}, score={:?}, good_match={:.2}, cross_check={}, ransac=[{:.1}px, {} iters, conf={:?}], threads={}, seed={:?}",
            self.features.max_features,
            self.features.fast_threshold,
            self.features.n_levels,
            self.features.scale_factor,
            self.features.score_type,
            self.matching.good_match_percent,
            self.matching.cross_check,
            self.ransac.reprojection_threshold_px,
            self.ransac.max_iterations,
            self.ransac.confidence,
            self.n_threads,
            self.seed,
        )
    }

    /// Serialize to JSON string
    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserialize from JSON string
    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to TOML string
    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deserialize from TOML string
    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> ConfigResult<()> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> ConfigResult<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }
}
