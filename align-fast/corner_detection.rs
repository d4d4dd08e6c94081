use align_core::{Image, ScoreType};
use rayon::prelude::*;

use crate::types::{CornerType, ScoredKeypoint};
use crate::utils::has_contiguous_arc;

/// Corner detection algorithms (FAST segment test, Harris and FAST scores)
pub struct CornerDetector;

impl CornerDetector {
    /// Bresenham circle of radius 3, clockwise from the top
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Contiguous arc length of the FAST-9 test
    pub const ARC_LENGTH: usize = 9;

    /// Circle radius; no corner can be tested closer than this to the edge
    pub const RADIUS: usize = 3;

    pub const HARRIS_K: f64 = 0.04;
    const HARRIS_HALF_BLOCK: i32 = 3;

    /// Run the segment test on every pixel at least `border` away from the
    /// edge and score the corners found. Rows are processed in parallel;
    /// the result is in raster order.
    pub fn detect(img: &Image, threshold: u8, border: usize, score_type: ScoreType) -> Vec<ScoredKeypoint> {
        let (w, h) = img.dimensions();
        let border = border.max(Self::RADIUS);
        if w <= 2 * border || h <= 2 * border {
            return Vec::new();
        }

        (border..h - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row = Vec::new();
                for x in border..w - border {
                    let corner = Self::classify(img, x, y, threshold);
                    if corner == CornerType::None {
                        continue;
                    }
                    let response = match score_type {
                        ScoreType::Harris => Self::harris_response(img, x, y),
                        ScoreType::Fast => Self::fast_score(img, x, y, threshold, corner),
                    };
                    row.push(ScoredKeypoint::new(x, y, response));
                }
                row
            })
            .collect()
    }

    /// FAST-9 segment test. Caller guarantees a 3-pixel margin.
    pub(crate) fn classify(img: &Image, x: usize, y: usize, threshold: u8) -> CornerType {
        let data = img.as_raw();
        let w = img.width();
        let center = data[y * w + x] as i16;
        let t = threshold as i16;
        let at = |i: usize| {
            let (dx, dy) = Self::FAST_OFFSETS[i];
            let px = (x as i32 + dx) as usize;
            let py = (y as i32 + dy) as usize;
            data[py * w + px] as i16
        };

        // Any arc of 9 covers at least two of the four compass pixels
        let mut bright_compass = 0;
        let mut dark_compass = 0;
        for i in [0, 4, 8, 12] {
            let q = at(i);
            if q > center + t {
                bright_compass += 1;
            } else if q < center - t {
                dark_compass += 1;
            }
        }
        if bright_compass < 2 && dark_compass < 2 {
            return CornerType::None;
        }

        let mut bright: u16 = 0;
        let mut dark: u16 = 0;
        for i in 0..16 {
            let q = at(i);
            if q > center + t {
                bright |= 1 << i;
            } else if q < center - t {
                dark |= 1 << i;
            }
        }

        if has_contiguous_arc(bright, Self::ARC_LENGTH) {
            CornerType::Bright
        } else if has_contiguous_arc(dark, Self::ARC_LENGTH) {
            CornerType::Dark
        } else {
            CornerType::None
        }
    }

    /// Sum of the differences beyond the threshold on the corner's side
    pub(crate) fn fast_score(img: &Image, x: usize, y: usize, threshold: u8, corner: CornerType) -> f32 {
        let data = img.as_raw();
        let w = img.width();
        let center = data[y * w + x] as i32;
        let t = threshold as i32;

        Self::FAST_OFFSETS
            .iter()
            .map(|&(dx, dy)| {
                let q = data[(y as i32 + dy) as usize * w + (x as i32 + dx) as usize] as i32;
                match corner {
                    CornerType::Bright => (q - center - t).max(0),
                    CornerType::Dark => (center - q - t).max(0),
                    CornerType::None => 0,
                }
            })
            .sum::<i32>() as f32
    }

    /// Harris corner response `det(M) - k * trace(M)^2` over a 7x7 block of
    /// Sobel gradients. Pixels outside the image are clamped to the edge.
    pub fn harris_response(img: &Image, x: usize, y: usize) -> f32 {
        let mut sxx = 0.0f64;
        let mut sxy = 0.0f64;
        let mut syy = 0.0f64;

        let half = Self::HARRIS_HALF_BLOCK;
        for dy in -half..=half {
            for dx in -half..=half {
                let (gx, gy) = Self::sobel(img, x as i32 + dx, y as i32 + dy);
                sxx += gx * gx;
                sxy += gx * gy;
                syy += gy * gy;
            }
        }

        let det = sxx * syy - sxy * sxy;
        let trace = sxx + syy;
        (det - Self::HARRIS_K * trace * trace) as f32
    }

    /// Sobel gradients, normalized to intensity units per pixel
    fn sobel(img: &Image, x: i32, y: i32) -> (f64, f64) {
        let p = |dx: i32, dy: i32| Self::clamped(img, x + dx, y + dy);

        let gx = p(1, -1) + 2.0 * p(1, 0) + p(1, 1) - p(-1, -1) - 2.0 * p(-1, 0) - p(-1, 1);
        let gy = p(-1, 1) + 2.0 * p(0, 1) + p(1, 1) - p(-1, -1) - 2.0 * p(0, -1) - p(1, -1);

        (gx / 8.0, gy / 8.0)
    }

    #[inline]
    fn clamped(img: &Image, x: i32, y: i32) -> f64 {
        let xx = x.clamp(0, img.width() as i32 - 1) as usize;
        let yy = y.clamp(0, img.height() as i32 - 1) as usize;
        img.pixel(xx, yy, 0) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_image(size: usize, lo: u8, hi: u8) -> Image {
        // Bright square occupying the lower-right quadrant
        let mut data = vec![lo; size * size];
        for y in size / 2..size {
            for x in size / 2..size {
                data[y * size + x] = hi;
            }
        }
        Image::gray(size, size, data).unwrap()
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = Image::filled(32, 32, 1, 128).unwrap();
        assert!(CornerDetector::detect(&img, 20, 3, ScoreType::Harris).is_empty());
    }

    #[test]
    fn test_square_corner_is_detected() {
        let img = square_image(32, 40, 220);
        let corners = CornerDetector::detect(&img, 20, 3, ScoreType::Fast);
        assert!(!corners.is_empty());
        // Every detection hugs the quadrant corner at (16, 16)
        for c in &corners {
            assert!((c.x as i32 - 16).abs() <= 3, "x = {}", c.x);
            assert!((c.y as i32 - 16).abs() <= 3, "y = {}", c.y);
            assert!(c.response > 0.0);
        }
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        // Vertical step edge: at most 7 circle pixels lie on either side
        let mut data = vec![30u8; 32 * 32];
        for y in 0..32 {
            for x in 16..32 {
                data[y * 32 + x] = 230;
            }
        }
        let img = Image::gray(32, 32, data).unwrap();
        assert_eq!(CornerDetector::classify(&img, 16, 16, 20), CornerType::None);
        assert_eq!(CornerDetector::classify(&img, 15, 16, 20), CornerType::None);
    }

    #[test]
    fn test_isolated_dot_is_dark_or_bright() {
        let mut data = vec![200u8; 16 * 16];
        data[8 * 16 + 8] = 10;
        let img = Image::gray(16, 16, data).unwrap();
        assert_eq!(CornerDetector::classify(&img, 8, 8, 20), CornerType::Bright);

        let mut data = vec![10u8; 16 * 16];
        data[8 * 16 + 8] = 200;
        let img = Image::gray(16, 16, data).unwrap();
        assert_eq!(CornerDetector::classify(&img, 8, 8, 20), CornerType::Dark);
    }

    #[test]
    fn test_harris_prefers_corner_over_edge() {
        let img = square_image(32, 40, 220);
        let corner = CornerDetector::harris_response(&img, 16, 16);
        let edge = CornerDetector::harris_response(&img, 16, 26);
        let flat = CornerDetector::harris_response(&img, 5, 5);
        assert!(corner > edge);
        assert!(corner > 0.0);
        assert_eq!(flat, 0.0);
    }

    #[test]
    fn test_border_is_respected() {
        let img = square_image(32, 40, 220);
        let corners = CornerDetector::detect(&img, 20, 10, ScoreType::Harris);
        for c in &corners {
            assert!(c.x >= 10 && c.x < 22 && c.y >= 10 && c.y < 22);
        }
    }
}
