use align_core::{Descriptor, Image, ImagePyramid, Keypoint, DESCRIPTOR_BITS, DESCRIPTOR_SIZE};
use image::GrayImage;
use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

/// Seed of the sampling pattern; changing it changes every descriptor
const PATTERN_SEED: u64 = 0x0B1E_F256;

/// Gaussian pre-smoothing applied before the intensity tests
const SMOOTHING_SIGMA: f32 = 2.0;

#[derive(Debug, Error)]
pub enum BriefError {
    #[error("Keypoint octave {octave} outside pyramid with {levels} levels")]
    OctaveOutOfRange { octave: usize, levels: usize },
    #[error("Pyramid level {0} could not be converted for smoothing")]
    LevelBuffer(usize),
    #[error("Patch size {0} too small for a descriptor pattern")]
    PatchTooSmall(usize),
}

pub type BriefResult<T> = Result<T, BriefError>;

/// One intensity comparison: bit is set when I(p1) < I(p2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestPair {
    pub x1: i8,
    pub y1: i8,
    pub x2: i8,
    pub y2: i8,
}

/// Steered BRIEF descriptor generator
pub struct BriefGenerator {
    pattern: Vec<TestPair>,
    radius: i32,
}

impl BriefGenerator {
    /// Build the generator for keypoints whose support patch is `patch_size` wide.
    ///
    /// Test points are drawn from an isotropic Gaussian (sigma = patch / 5)
    /// and kept inside a disc of radius `patch_size / 2 - 2`, so any rotation
    /// of the pattern stays inside the patch.
    pub fn new(patch_size: usize) -> BriefResult<Self> {
        let radius = (patch_size / 2) as i32 - 2;
        if radius < 2 {
            return Err(BriefError::PatchTooSmall(patch_size));
        }
        Ok(Self {
            pattern: Self::generate_pattern(radius, patch_size as f32 / 5.0),
            radius,
        })
    }

    fn generate_pattern(radius: i32, sigma: f32) -> Vec<TestPair> {
        let mut rng = StdRng::seed_from_u64(PATTERN_SEED);
        let point = |rng: &mut StdRng| loop {
            // Box-Muller
            let u1: f32 = rng.random_range(f32::EPSILON..1.0);
            let u2: f32 = rng.random();
            let mag = sigma * (-2.0 * u1.ln()).sqrt();
            let (s, c) = (2.0 * std::f32::consts::PI * u2).sin_cos();
            let (x, y) = ((mag * c).round() as i32, (mag * s).round() as i32);
            if x * x + y * y <= radius * radius {
                return (x as i8, y as i8);
            }
        };

        let mut pattern = Vec::with_capacity(DESCRIPTOR_BITS);
        while pattern.len() < DESCRIPTOR_BITS {
            let (x1, y1) = point(&mut rng);
            let (x2, y2) = point(&mut rng);
            let pair = TestPair { x1, y1, x2, y2 };
            if (x1, y1) != (x2, y2) && !pattern.contains(&pair) {
                pattern.push(pair);
            }
        }
        pattern
    }

    pub fn pattern(&self) -> &[TestPair] {
        &self.pattern
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    /// Compute one descriptor per keypoint, in keypoint order.
    ///
    /// Each keypoint is described on its own (smoothed) pyramid level, with
    /// the pattern rotated by the keypoint angle.
    pub fn generate_descriptors(&self, pyramid: &ImagePyramid, kps: &[Keypoint]) -> BriefResult<Vec<Descriptor>> {
        if let Some(kp) = kps.iter().find(|kp| kp.octave >= pyramid.len()) {
            return Err(BriefError::OctaveOutOfRange {
                octave: kp.octave,
                levels: pyramid.len(),
            });
        }

        let smoothed: Vec<Option<Image>> = pyramid
            .levels()
            .par_iter()
            .map(|level| {
                if kps.iter().any(|kp| kp.octave == level.level) {
                    Self::smooth(&level.image, level.level).map(Some)
                } else {
                    Ok(None)
                }
            })
            .collect::<BriefResult<_>>()?;

        let descriptors: Vec<Descriptor> = kps
            .par_iter()
            .map(|kp| {
                let level = &pyramid.levels()[kp.octave];
                let img = smoothed[kp.octave].as_ref().unwrap_or(&level.image);
                let cx = (kp.x + 0.5) / level.scale - 0.5;
                let cy = (kp.y + 0.5) / level.scale - 0.5;
                self.describe(img, cx, cy, kp.angle)
            })
            .collect();

        debug!("BRIEF: {} descriptors", descriptors.len());
        Ok(descriptors)
    }

    /// Descriptor of the patch centred at `(cx, cy)` in `img`
    pub fn describe(&self, img: &Image, cx: f32, cy: f32, angle: f32) -> Descriptor {
        let (s, c) = angle.sin_cos();
        let mut d = [0u8; DESCRIPTOR_SIZE];

        for (i, pair) in self.pattern.iter().enumerate() {
            let (dx1, dy1) = (pair.x1 as f32, pair.y1 as f32);
            let (dx2, dy2) = (pair.x2 as f32, pair.y2 as f32);
            let (rx1, ry1) = (cx + c * dx1 - s * dy1, cy + s * dx1 + c * dy1);
            let (rx2, ry2) = (cx + c * dx2 - s * dy2, cy + s * dx2 + c * dy2);

            let val1 = img.sample_bilinear(rx1, ry1, 0);
            let val2 = img.sample_bilinear(rx2, ry2, 0);

            let bit = (val1 < val2) as u8;
            d[i / 8] |= bit << (i % 8);
        }

        d
    }

    fn smooth(img: &Image, level: usize) -> BriefResult<Image> {
        let (w, h) = img.dimensions();
        let buffer = GrayImage::from_raw(w as u32, h as u32, img.as_raw().to_vec())
            .ok_or(BriefError::LevelBuffer(level))?;
        let blurred = imageproc::filter::gaussian_blur_f32(&buffer, SMOOTHING_SIGMA);
        Image::gray(w, h, blurred.into_raw()).map_err(|_| BriefError::LevelBuffer(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::{hamming_distance, FeatureConfig};
    use align_fast::FastDetector;

    fn textured_image(width: usize, height: usize) -> Image {
        let data = (0..width * height)
            .map(|i| {
                let (x, y) = (i % width, i / width);
                (((x / 6) * 53 + (y / 6) * 97 + (x / 6) * (y / 6) * 13) % 256) as u8
            })
            .collect();
        Image::gray(width, height, data).unwrap()
    }

    fn noise_image(size: usize, seed: u64) -> Image {
        let mut rng = StdRng::seed_from_u64(seed);
        let data = (0..size * size).map(|_| rng.random()).collect();
        Image::gray(size, size, data).unwrap()
    }

    fn keypoint(x: f32, y: f32, angle: f32) -> Keypoint {
        Keypoint {
            x,
            y,
            scale: 31.0,
            angle,
            response: 1.0,
            octave: 0,
        }
    }

    #[test]
    fn test_pattern_is_deterministic_and_bounded() {
        let a = BriefGenerator::new(31).unwrap();
        let b = BriefGenerator::new(31).unwrap();
        assert_eq!(a.pattern(), b.pattern());
        assert_eq!(a.pattern().len(), DESCRIPTOR_BITS);
        let r = a.radius();
        for p in a.pattern() {
            assert!((p.x1 as i32).pow(2) + (p.y1 as i32).pow(2) <= r * r);
            assert!((p.x2 as i32).pow(2) + (p.y2 as i32).pow(2) <= r * r);
            assert!((p.x1, p.y1) != (p.x2, p.y2));
        }
    }

    #[test]
    fn test_patch_too_small() {
        assert!(matches!(BriefGenerator::new(5), Err(BriefError::PatchTooSmall(5))));
        assert!(BriefGenerator::new(9).is_ok());
    }

    #[test]
    fn test_flat_patch_gives_zero_descriptor() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = Image::filled(64, 64, 1, 100).unwrap();
        assert_eq!(gen.describe(&img, 32.0, 32.0, 0.3), [0u8; DESCRIPTOR_SIZE]);
    }

    #[test]
    fn test_same_patch_same_descriptor() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured_image(96, 96);
        let pyramid = ImagePyramid::build(&img, 1, 1.2, 33).unwrap();
        let kps = vec![keypoint(40.0, 40.0, 0.5), keypoint(40.0, 40.0, 0.5)];
        let desc = gen.generate_descriptors(&pyramid, &kps).unwrap();
        assert_eq!(desc[0], desc[1]);
    }

    #[test]
    fn test_rotation_is_compensated() {
        // Quarter turn of the image about the keypoint; the detected angle
        // rotates with it, so the steered descriptor should barely change.
        let gen = BriefGenerator::new(31).unwrap();
        let size = 97;
        let img = noise_image(size, 21);
        let mut rotated = vec![0u8; size * size];
        for y in 0..size {
            for x in 0..size {
                // (x, y) -> (size - 1 - y, x)
                rotated[x * size + (size - 1 - y)] = img.pixel(x, y, 0);
            }
        }
        let rotated = Image::gray(size, size, rotated).unwrap();

        let c = 48.0;
        let d0 = gen.describe(&img, c, c, 0.0);
        let d1 = gen.describe(&rotated, c, c, std::f32::consts::FRAC_PI_2);
        assert!(hamming_distance(&d0, &d1) < 16, "distance {}", hamming_distance(&d0, &d1));
    }

    #[test]
    fn test_rejects_unknown_octave() {
        let gen = BriefGenerator::new(31).unwrap();
        let img = textured_image(64, 64);
        let pyramid = ImagePyramid::build(&img, 1, 1.2, 33).unwrap();
        let mut kp = keypoint(32.0, 32.0, 0.0);
        kp.octave = 3;
        assert!(matches!(
            gen.generate_descriptors(&pyramid, &[kp]),
            Err(BriefError::OctaveOutOfRange { octave: 3, levels: 1 })
        ));
    }

    #[test]
    fn test_descriptors_for_detected_keypoints() {
        let img = textured_image(160, 120);
        let detector = FastDetector::new(FeatureConfig::default(), 160, 120).unwrap();
        let pyramid = detector.build_pyramid(&img).unwrap();
        let kps = detector.detect_in_pyramid(&pyramid);
        let gen = BriefGenerator::new(31).unwrap();
        let desc = gen.generate_descriptors(&pyramid, &kps).unwrap();
        assert_eq!(desc.len(), kps.len());
    }
}
