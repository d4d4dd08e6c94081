use align_core::{PointCorrespondence, RansacConfig};
use log::{debug, warn};
use rand::seq::index;
use rand::Rng;

use crate::error::{GeometryError, GeometryResult};
use crate::homography::{solve_homography, Homography};

/// Minimal sample size for a projective fit
pub const SAMPLE_SIZE: usize = 4;

/// Sine of the smallest angle a sampled triple may span without being
/// treated as collinear
const COLLINEAR_SIN: f64 = 1e-3;

/// Outcome of a robust fit
#[derive(Debug, Clone, PartialEq)]
pub struct RansacResult {
    pub homography: Homography,
    /// One flag per input correspondence, judged against `homography`
    pub inlier_mask: Vec<bool>,
    pub inlier_count: usize,
    /// Hypotheses drawn before termination
    pub iterations: usize,
}

impl RansacResult {
    pub fn inlier_ratio(&self) -> f64 {
        if self.inlier_mask.is_empty() {
            0.0
        } else {
            self.inlier_count as f64 / self.inlier_mask.len() as f64
        }
    }
}

/// RANSAC homography estimator.
///
/// The random source is passed to every call so runs are reproducible
/// with a seeded generator.
#[derive(Debug, Clone)]
pub struct HomographyEstimator {
    cfg: RansacConfig,
}

impl HomographyEstimator {
    pub fn new(cfg: RansacConfig) -> GeometryResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.cfg
    }

    /// Fit a homography mapping each `src` onto its `dst`.
    ///
    /// Draws 4-point samples until the iteration budget (possibly shrunk by
    /// the confidence criterion) runs out, keeps the hypothesis with the
    /// most inliers (the earliest one on ties) and refits it by least
    /// squares over its inliers.
    pub fn estimate<R: Rng + ?Sized>(
        &self,
        pairs: &[PointCorrespondence],
        rng: &mut R,
    ) -> GeometryResult<RansacResult> {
        let n = pairs.len();
        if n < SAMPLE_SIZE {
            return Err(GeometryError::TooFewCorrespondences {
                count: n,
                required: SAMPLE_SIZE,
            });
        }

        let threshold = self.cfg.reprojection_threshold_px;
        let mut budget = self.cfg.max_iterations;
        let mut iterations = 0;
        let mut rejected = 0;
        let mut best: Option<(Homography, usize)> = None;
        let mut sample = [PointCorrespondence::new((0.0, 0.0), (0.0, 0.0)); SAMPLE_SIZE];

        while iterations < budget {
            iterations += 1;

            for (slot, i) in sample.iter_mut().zip(index::sample(rng, n, SAMPLE_SIZE).iter()) {
                *slot = pairs[i];
            }
            if is_degenerate_sample(&sample) {
                rejected += 1;
                continue;
            }
            let Some(candidate) = solve_homography(&sample) else {
                rejected += 1;
                continue;
            };

            let support = count_inliers(pairs, &candidate, threshold);
            if best.map_or(true, |(_, best_support)| support > best_support) {
                best = Some((candidate, support));
                if let Some(confidence) = self.cfg.confidence {
                    let ratio = support as f64 / n as f64;
                    budget = budget.min(adaptive_iterations(ratio, SAMPLE_SIZE, confidence));
                }
            }
        }

        let (minimal, support) = match best {
            Some((h, support)) if support >= SAMPLE_SIZE => (h, support),
            other => {
                let inliers = other.map_or(0, |(_, s)| s);
                warn!(
                    "RANSAC: no usable model after {} iterations ({} degenerate samples, best support {})",
                    iterations, rejected, inliers
                );
                return Err(GeometryError::DegenerateGeometry { inliers, iterations });
            }
        };

        let (homography, inlier_mask) = refine(pairs, &minimal, threshold);
        let inlier_count = inlier_mask.iter().filter(|&&inlier| inlier).count();

        debug!(
            "RANSAC: {} iterations ({} degenerate), minimal support {}, refined support {} of {}",
            iterations, rejected, support, inlier_count, n
        );

        Ok(RansacResult {
            homography,
            inlier_mask,
            inlier_count,
            iterations,
        })
    }
}

/// Shorthand for `HomographyEstimator::new(cfg.clone())?.estimate(pairs, rng)`
pub fn estimate_homography<R: Rng + ?Sized>(
    pairs: &[PointCorrespondence],
    cfg: &RansacConfig,
    rng: &mut R,
) -> GeometryResult<RansacResult> {
    HomographyEstimator::new(cfg.clone())?.estimate(pairs, rng)
}

/// Least-squares refit over the inliers of `minimal`.
///
/// Falls back to `minimal` when the refit is singular or loses support
/// below the minimal sample size.
fn refine(pairs: &[PointCorrespondence], minimal: &Homography, threshold: f64) -> (Homography, Vec<bool>) {
    let minimal_mask = inlier_mask(pairs, minimal, threshold);
    let inliers: Vec<PointCorrespondence> = pairs
        .iter()
        .zip(&minimal_mask)
        .filter(|(_, &inlier)| inlier)
        .map(|(p, _)| *p)
        .collect();

    if let Some(refined) = solve_homography(&inliers) {
        let mask = inlier_mask(pairs, &refined, threshold);
        if mask.iter().filter(|&&inlier| inlier).count() >= SAMPLE_SIZE {
            return (refined, mask);
        }
    }

    warn!("RANSAC: least-squares refit failed, keeping the minimal-sample model");
    (*minimal, minimal_mask)
}

fn inlier_mask(pairs: &[PointCorrespondence], h: &Homography, threshold: f64) -> Vec<bool> {
    pairs.iter().map(|p| h.reprojection_error(p) <= threshold).collect()
}

fn count_inliers(pairs: &[PointCorrespondence], h: &Homography, threshold: f64) -> usize {
    pairs.iter().filter(|p| h.reprojection_error(p) <= threshold).count()
}

/// Whether a 4-point sample cannot define a proper homography: two pairs
/// share an image-A point, or three points on either side are collinear.
pub fn is_degenerate_sample(sample: &[PointCorrespondence; SAMPLE_SIZE]) -> bool {
    for i in 0..SAMPLE_SIZE {
        for j in i + 1..SAMPLE_SIZE {
            if sample[i].src == sample[j].src {
                return true;
            }
        }
    }

    const TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];
    TRIPLES.iter().any(|&[a, b, c]| {
        collinear(sample[a].src, sample[b].src, sample[c].src)
            || collinear(sample[a].dst, sample[b].dst, sample[c].dst)
    })
}

fn collinear(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> bool {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (acx, acy) = (c.0 - a.0, c.1 - a.1);
    let cross = abx * acy - aby * acx;
    cross.abs() <= COLLINEAR_SIN * abx.hypot(aby) * acx.hypot(acy)
}

/// Iterations needed to draw at least one all-inlier sample with
/// probability `confidence`, given an inlier ratio.
///
/// `N = log(1 - confidence) / log(1 - ratio^sample_size)`
pub fn adaptive_iterations(inlier_ratio: f64, sample_size: usize, confidence: f64) -> usize {
    if inlier_ratio >= 1.0 {
        return 1;
    }
    let all_inliers = inlier_ratio.powi(sample_size as i32);
    if !(all_inliers > 0.0) {
        return usize::MAX;
    }
    let n = (1.0 - confidence).ln() / (1.0 - all_inliers).ln();
    if n.is_finite() && n >= 0.0 {
        n.ceil().max(1.0) as usize
    } else {
        usize::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Deterministic scatter of points over a 400x300 frame
    fn scatter(n: usize) -> Vec<(f64, f64)> {
        (0..n)
            .map(|i| {
                let x = ((i * 7919) % 397) as f64 + 0.25;
                let y = ((i * 104_729) % 293) as f64 + 0.5;
                (x, y)
            })
            .collect()
    }

    fn pairs_through(h: &Homography, points: &[(f64, f64)]) -> Vec<PointCorrespondence> {
        points
            .iter()
            .map(|&(x, y)| PointCorrespondence::new((x, y), h.project(x, y).unwrap()))
            .collect()
    }

    /// Replace every `stride`-th pair with a far-off outlier
    fn corrupt(pairs: &mut [PointCorrespondence], stride: usize) -> usize {
        let mut count = 0;
        for (i, p) in pairs.iter_mut().enumerate() {
            if i % stride == 0 {
                p.dst = (p.dst.0 + 57.0 + i as f64, p.dst.1 - 41.0);
                count += 1;
            }
        }
        count
    }

    fn config() -> RansacConfig {
        RansacConfig::default()
    }

    #[test]
    fn test_recovers_homography_with_outliers() {
        let truth = Homography::from_rows([[0.95, -0.08, 12.0], [0.07, 1.02, -6.0], [1e-4, -5e-5, 1.0]]);
        let mut pairs = pairs_through(&truth, &scatter(60));
        let outliers = corrupt(&mut pairs, 3);

        let mut rng = StdRng::seed_from_u64(7);
        let result = estimate_homography(&pairs, &config(), &mut rng).unwrap();

        assert_eq!(result.inlier_count, pairs.len() - outliers);
        for (i, &inlier) in result.inlier_mask.iter().enumerate() {
            assert_eq!(inlier, i % 3 != 0, "pair {}", i);
        }
        for &(x, y) in &scatter(10) {
            let (ex, ey) = truth.project(x, y).unwrap();
            let (gx, gy) = result.homography.project(x, y).unwrap();
            assert!((ex - gx).hypot(ey - gy) < 1e-6);
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let truth = Homography::similarity(1.1, 0.2, 5.0, 9.0);
        let mut pairs = pairs_through(&truth, &scatter(40));
        corrupt(&mut pairs, 2);

        let run = |seed| estimate_homography(&pairs, &config(), &mut StdRng::seed_from_u64(seed)).unwrap();
        assert_eq!(run(11), run(11));
    }

    #[test]
    fn test_confidence_shortens_clean_runs() {
        let pairs = pairs_through(&Homography::translation(3.0, -2.0), &scatter(30));
        let mut rng = StdRng::seed_from_u64(1);
        let result = estimate_homography(&pairs, &config(), &mut rng).unwrap();
        assert_eq!(result.inlier_count, 30);
        assert!(result.iterations < 10);

        let exhaustive = RansacConfig {
            max_iterations: 50,
            confidence: None,
            ..config()
        };
        let result = estimate_homography(&pairs, &exhaustive, &mut rng).unwrap();
        assert_eq!(result.iterations, 50);
    }

    #[test]
    fn test_too_few_correspondences() {
        let pairs = pairs_through(&Homography::identity(), &scatter(3));
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            estimate_homography(&pairs, &config(), &mut rng),
            Err(GeometryError::TooFewCorrespondences { count: 3, required: 4 })
        ));
    }

    #[test]
    fn test_collinear_points_are_degenerate() {
        let points: Vec<(f64, f64)> = (0..12).map(|i| (i as f64 * 10.0, i as f64 * 5.0 + 3.0)).collect();
        let pairs = pairs_through(&Homography::translation(4.0, 4.0), &points);
        let cfg = RansacConfig {
            max_iterations: 100,
            ..config()
        };
        let mut rng = StdRng::seed_from_u64(3);
        assert!(matches!(
            estimate_homography(&pairs, &cfg, &mut rng),
            Err(GeometryError::DegenerateGeometry { inliers: 0, iterations: 100 })
        ));
    }

    #[test]
    fn test_invalid_config() {
        let cfg = RansacConfig {
            reprojection_threshold_px: -1.0,
            ..config()
        };
        assert!(matches!(HomographyEstimator::new(cfg), Err(GeometryError::Config(_))));
    }

    #[test]
    fn test_degenerate_sample_detection() {
        let p = |x: f64, y: f64| PointCorrespondence::new((x, y), (x + 1.0, y));
        assert!(!is_degenerate_sample(&[p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]));
        assert!(is_degenerate_sample(&[p(0.0, 0.0), p(10.0, 0.0), p(20.0, 0.0), p(0.0, 10.0)]));
        assert!(is_degenerate_sample(&[p(0.0, 0.0), p(0.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)]));

        let mut squashed = [p(0.0, 0.0), p(10.0, 0.0), p(10.0, 10.0), p(0.0, 10.0)];
        squashed[2].dst = (5.0, 0.0);
        assert!(is_degenerate_sample(&squashed));
    }

    #[test]
    fn test_adaptive_iterations() {
        assert_eq!(adaptive_iterations(1.0, 4, 0.995), 1);
        assert_eq!(adaptive_iterations(0.0, 4, 0.995), usize::MAX);
        // 0.5^4 = 1/16: ln(0.005) / ln(15/16) = 82.1
        assert_eq!(adaptive_iterations(0.5, 4, 0.995), 83);
        assert!(adaptive_iterations(0.3, 4, 0.995) > adaptive_iterations(0.6, 4, 0.995));
    }
}
