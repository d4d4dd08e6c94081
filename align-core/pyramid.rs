use crate::image::{Image, ImageError, ImageResult};

/// One level of a scale pyramid
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub level: usize,
    /// Downscale factor relative to the base image (1.0 at level 0)
    pub scale: f32,
    pub image: Image,
}

impl PyramidLevel {
    pub fn width(&self) -> usize {
        self.image.width()
    }

    pub fn height(&self) -> usize {
        self.image.height()
    }
}

/// Image pyramid operations for multi-scale feature detection
#[derive(Debug, Clone)]
pub struct ImagePyramid {
    levels: Vec<PyramidLevel>,
}

impl ImagePyramid {
    /// Build a grayscale pyramid.
    ///
    /// Level `i` is the base downscaled by `scale_factor^i`. Levels whose
    /// shorter side would fall below `min_size` are not generated; level 0
    /// is always present.
    pub fn build(base: &Image, n_levels: usize, scale_factor: f32, min_size: usize) -> ImageResult<Self> {
        if !base.is_gray() {
            return Err(ImageError::UnsupportedChannels(base.channels()));
        }

        let mut levels = Vec::with_capacity(n_levels.max(1));
        levels.push(PyramidLevel {
            level: 0,
            scale: 1.0,
            image: base.clone(),
        });

        let (width, height) = base.dimensions();
        let mut current_scale = 1.0f32;

        for level in 1..n_levels {
            current_scale *= scale_factor;
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            if scaled_width < min_size || scaled_height < min_size {
                break;
            }

            let image = base.resize_gray(scaled_width, scaled_height)?;
            levels.push(PyramidLevel {
                level,
                scale: current_scale,
                image,
            });
        }

        Ok(Self { levels })
    }

    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    pub fn level(&self, index: usize) -> Option<&PyramidLevel> {
        self.levels.get(index)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}
