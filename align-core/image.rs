use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("Invalid image dimensions: {width}x{height}x{channels} (must be > 0)")]
    InvalidDimensions {
        width: usize,
        height: usize,
        channels: usize,
    },
    #[error("Image data length mismatch: expected {expected_len}, got {actual_len}")]
    DataLength { expected_len: usize, actual_len: usize },
    #[error("Unsupported channel count {0} (expected 1, 3 or 4)")]
    UnsupportedChannels(usize),
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Row-major 8-bit image with interleaved channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: usize,
    height: usize,
    channels: usize,
    data: Vec<u8>,
}

impl Image {
    pub fn new(width: usize, height: usize, channels: usize, data: Vec<u8>) -> ImageResult<Self> {
        if width == 0 || height == 0 || channels == 0 {
            return Err(ImageError::InvalidDimensions {
                width,
                height,
                channels,
            });
        }
        if !matches!(channels, 1 | 3 | 4) {
            return Err(ImageError::UnsupportedChannels(channels));
        }
        let expected_len = width * height * channels;
        if data.len() != expected_len {
            return Err(ImageError::DataLength {
                expected_len,
                actual_len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Single-channel image from raw luma bytes
    pub fn gray(width: usize, height: usize, data: Vec<u8>) -> ImageResult<Self> {
        Self::new(width, height, 1, data)
    }

    /// Image filled with a constant value in every channel
    pub fn filled(width: usize, height: usize, channels: usize, value: u8) -> ImageResult<Self> {
        Self::new(width, height, channels, vec![value; width * height * channels])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn is_gray(&self) -> bool {
        self.channels == 1
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize, channel: usize) -> u8 {
        self.data[(y * self.width + x) * self.channels + channel]
    }

    /// Luma conversion with BT.601 weights; grayscale input is cloned
    pub fn to_gray(&self) -> Image {
        if self.channels == 1 {
            return self.clone();
        }
        let data = self
            .data
            .chunks_exact(self.channels)
            .map(|px| {
                let luma = 0.299 * px[0] as f32 + 0.587 * px[1] as f32 + 0.114 * px[2] as f32;
                luma.round().clamp(0.0, 255.0) as u8
            })
            .collect();
        Image {
            width: self.width,
            height: self.height,
            channels: 1,
            data,
        }
    }

    /// Bilinear interpolation of one channel at fractional coordinates.
    ///
    /// Coordinates are clamped to the image, so callers are responsible for
    /// deciding what "outside" means.
    pub fn sample_bilinear(&self, x: f32, y: f32, channel: usize) -> f32 {
        let max_x = (self.width - 1) as f32;
        let max_y = (self.height - 1) as f32;
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);

        let x0 = x.floor() as usize;
        let y0 = y.floor() as usize;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let dx = x - x0 as f32;
        let dy = y - y0 as f32;

        let p00 = self.pixel(x0, y0, channel) as f32;
        let p10 = self.pixel(x1, y0, channel) as f32;
        let p01 = self.pixel(x0, y1, channel) as f32;
        let p11 = self.pixel(x1, y1, channel) as f32;

        let top = p00 * (1.0 - dx) + p10 * dx;
        let bottom = p01 * (1.0 - dx) + p11 * dx;

        top * (1.0 - dy) + bottom * dy
    }

    /// Bilinear resize of a single-channel image
    pub fn resize_gray(&self, width: usize, height: usize) -> ImageResult<Image> {
        if !self.is_gray() {
            return Err(ImageError::UnsupportedChannels(self.channels));
        }
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions {
                width,
                height,
                channels: 1,
            });
        }

        let x_ratio = self.width as f32 / width as f32;
        let y_ratio = self.height as f32 / height as f32;
        let mut data = vec![0u8; width * height];

        for y in 0..height {
            // Sample at pixel centres so the resampled grid stays aligned
            let src_y = (y as f32 + 0.5) * y_ratio - 0.5;
            for x in 0..width {
                let src_x = (x as f32 + 0.5) * x_ratio - 0.5;
                data[y * width + x] = self.sample_bilinear(src_x, src_y, 0).round() as u8;
            }
        }

        Ok(Image {
            width,
            height,
            channels: 1,
            data,
        })
    }
}
