use align_core::{Image, ImageError};
use log::debug;
use rayon::prelude::*;

use crate::error::GeometryResult;
use crate::homography::Homography;

/// Slack, in source pixels, for coordinates that land just outside the
/// image because of rounding in the inverse mapping
const EDGE_TOLERANCE: f64 = 1e-3;

/// Perspective resampler with a fixed background value
#[derive(Debug, Clone, Copy, Default)]
pub struct Warper {
    background: u8,
}

impl Warper {
    pub fn new(background: u8) -> Self {
        Self { background }
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    /// Resample `src` into a `width x height` frame where `h` maps source
    /// coordinates onto output coordinates.
    ///
    /// Every output pixel is pulled back through `h^-1`; if it lands inside
    /// the source it is bilinearly interpolated, otherwise it gets the
    /// background value. The output keeps the source's channel count.
    pub fn warp(&self, src: &Image, h: &Homography, width: usize, height: usize) -> GeometryResult<Image> {
        let inverse = h.try_inverse()?;
        let channels = src.channels();
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions {
                width,
                height,
                channels,
            }
            .into());
        }

        let max_x = (src.width() - 1) as f64;
        let max_y = (src.height() - 1) as f64;
        let mut data = vec![self.background; width * height * channels];

        data.par_chunks_mut(width * channels).enumerate().for_each(|(y, row)| {
            for (x, px) in row.chunks_exact_mut(channels).enumerate() {
                let Some((sx, sy)) = inverse.project(x as f64, y as f64) else {
                    continue;
                };
                let inside = (-EDGE_TOLERANCE..=max_x + EDGE_TOLERANCE).contains(&sx)
                    && (-EDGE_TOLERANCE..=max_y + EDGE_TOLERANCE).contains(&sy);
                if !inside {
                    continue;
                }
                let (sx, sy) = (sx.clamp(0.0, max_x) as f32, sy.clamp(0.0, max_y) as f32);
                for (c, value) in px.iter_mut().enumerate() {
                    *value = src.sample_bilinear(sx, sy, c).round().clamp(0.0, 255.0) as u8;
                }
            }
        });

        debug!(
            "Warp: {}x{} -> {}x{} ({} channels)",
            src.width(),
            src.height(),
            width,
            height,
            channels
        );
        Ok(Image::new(width, height, channels, data)?)
    }
}

/// Shorthand for `Warper::new(background).warp(src, h, width, height)`
pub fn warp_perspective(
    src: &Image,
    h: &Homography,
    width: usize,
    height: usize,
    background: u8,
) -> GeometryResult<Image> {
    Warper::new(background).warp(src, h, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeometryError;

    fn gradient(width: usize, height: usize) -> Image {
        let data = (0..width * height)
            .map(|i| ((i % width) * 3 + (i / width) * 5) as u8)
            .collect();
        Image::gray(width, height, data).unwrap()
    }

    #[test]
    fn test_identity_is_lossless() {
        let img = gradient(30, 20);
        let out = warp_perspective(&img, &Homography::identity(), 30, 20, 0).unwrap();
        assert_eq!(out, img);
    }

    #[test]
    fn test_integer_translation_shifts_pixels() {
        let img = gradient(30, 20);
        let out = warp_perspective(&img, &Homography::translation(4.0, 2.0), 30, 20, 7).unwrap();
        for y in 0..20 {
            for x in 0..30 {
                let expected = if x >= 4 && y >= 2 { img.pixel(x - 4, y - 2, 0) } else { 7 };
                assert_eq!(out.pixel(x, y, 0), expected, "({}, {})", x, y);
            }
        }
    }

    #[test]
    fn test_half_pixel_shift_interpolates() {
        let img = Image::gray(2, 1, vec![10, 20]).unwrap();
        let out = warp_perspective(&img, &Homography::translation(-0.5, 0.0), 1, 1, 0).unwrap();
        assert_eq!(out.pixel(0, 0, 0), 15);
    }

    #[test]
    fn test_output_dimensions_and_channels() {
        let img = Image::filled(10, 10, 3, 200).unwrap();
        let out = warp_perspective(&img, &Homography::similarity(0.5, 0.3, 2.0, 1.0), 17, 9, 0).unwrap();
        assert_eq!(out.dimensions(), (17, 9));
        assert_eq!(out.channels(), 3);
        assert!(out.as_raw().iter().all(|&v| v == 0 || v == 200));
    }

    #[test]
    fn test_singular_homography() {
        let img = gradient(10, 10);
        let h = Homography::from_rows([[1.0, 1.0, 0.0], [1.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert!(matches!(
            warp_perspective(&img, &h, 10, 10, 0),
            Err(GeometryError::NonInvertibleTransform { .. })
        ));
    }

    #[test]
    fn test_zero_sized_output() {
        let img = gradient(10, 10);
        assert!(matches!(
            warp_perspective(&img, &Homography::identity(), 0, 10, 0),
            Err(GeometryError::Image(ImageError::InvalidDimensions { .. }))
        ));
    }
}
