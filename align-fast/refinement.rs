use align_core::Image;

use crate::corner_detection::CornerDetector;
use crate::types::ScoredKeypoint;

/// Non-maximum suppression, orientation and subpixel refinement
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Keep candidates whose response is maximal within a `(2r+1)^2` window.
    ///
    /// On plateaus only the first candidate in raster order survives, so the
    /// result never contains two adjacent copies of the same corner. Input
    /// order is preserved.
    pub fn non_maximum_suppression(
        candidates: &[ScoredKeypoint],
        width: usize,
        height: usize,
        radius: usize,
    ) -> Vec<ScoredKeypoint> {
        if candidates.is_empty() || radius == 0 {
            return candidates.to_vec();
        }

        let mut scores = vec![f32::NEG_INFINITY; width * height];
        for c in candidates {
            scores[c.y * width + c.x] = c.response;
        }

        let r = radius as i64;
        candidates
            .iter()
            .filter(|c| {
                let own_idx = c.y * width + c.x;
                for dy in -r..=r {
                    let ny = c.y as i64 + dy;
                    if ny < 0 || ny >= height as i64 {
                        continue;
                    }
                    for dx in -r..=r {
                        let nx = c.x as i64 + dx;
                        if nx < 0 || nx >= width as i64 || (dx == 0 && dy == 0) {
                            continue;
                        }
                        let idx = ny as usize * width + nx as usize;
                        let other = scores[idx];
                        if other > c.response || (other == c.response && idx < own_idx) {
                            return false;
                        }
                    }
                }
                true
            })
            .copied()
            .collect()
    }

    /// Orientation by intensity centroid over a disc of radius `patch_size / 2`.
    ///
    /// Returns `atan2(m01, m10)` in radians, 0 for a perfectly flat patch.
    /// Pixels outside the image are skipped.
    pub fn compute_orientation(img: &Image, x: usize, y: usize, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let radius_sq = half * half;
        let (w, h) = (img.width() as i64, img.height() as i64);
        let data = img.as_raw();

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let yy = y as i64 + dy;
            if yy < 0 || yy >= h {
                continue;
            }
            for dx in -half..=half {
                if dx * dx + dy * dy > radius_sq {
                    continue;
                }
                let xx = x as i64 + dx;
                if xx < 0 || xx >= w {
                    continue;
                }
                let val = data[(yy * w + xx) as usize] as i64;
                m10 += dx * val;
                m01 += dy * val;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }

    /// Refine a corner to subpixel accuracy by fitting a quadratic surface
    /// to the Harris response of its 3x3 neighbourhood.
    ///
    /// Returns the offset `(dx, dy)`, each clamped to half a pixel; a flat or
    /// saddle-shaped response yields no offset.
    pub fn refine_subpixel(img: &Image, x: usize, y: usize) -> (f32, f32) {
        let (w, h) = img.dimensions();
        if x < 1 || y < 1 || x + 1 >= w || y + 1 >= h {
            return (0.0, 0.0);
        }

        let mut r = [[0.0f32; 3]; 3];
        for (j, row) in r.iter_mut().enumerate() {
            for (i, value) in row.iter_mut().enumerate() {
                *value = CornerDetector::harris_response(img, x + i - 1, y + j - 1);
            }
        }

        let dx = (r[1][2] - r[1][0]) / 2.0;
        let dy = (r[2][1] - r[0][1]) / 2.0;
        let dxx = r[1][2] - 2.0 * r[1][1] + r[1][0];
        let dyy = r[2][1] - 2.0 * r[1][1] + r[0][1];
        let dxy = (r[2][2] - r[2][0] - r[0][2] + r[0][0]) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        // Only a proper maximum (negative definite Hessian) gives a usable peak
        if !(det > 0.0) || !(dxx < 0.0) {
            return (0.0, 0.0);
        }

        let offset_x = -(dyy * dx - dxy * dy) / det;
        let offset_y = -(dxx * dy - dxy * dx) / det;
        if !offset_x.is_finite() || !offset_y.is_finite() {
            return (0.0, 0.0);
        }

        (offset_x.clamp(-0.5, 0.5), offset_y.clamp(-0.5, 0.5))
    }
}
