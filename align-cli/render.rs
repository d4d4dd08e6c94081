//! Conversions between `image` buffers and pipeline images, plus the
//! composites the binary writes out.

use align_core::{Image, ImageError, Keypoint, Match};
use image::{DynamicImage, GrayImage, Rgb, RgbImage, RgbaImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::AlignResult;

const INLIER_COLOR: Rgb<u8> = Rgb([0, 220, 0]);
const OUTLIER_COLOR: Rgb<u8> = Rgb([230, 30, 30]);

/// Decoded image -> pipeline image: grayscale stays single channel,
/// everything else becomes RGB
pub fn from_dynamic(img: &DynamicImage) -> AlignResult<Image> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    let image = match img {
        DynamicImage::ImageLuma8(gray) => Image::gray(w, h, gray.as_raw().clone())?,
        other => Image::new(w, h, 3, other.to_rgb8().into_raw())?,
    };
    Ok(image)
}

pub fn to_dynamic(img: &Image) -> AlignResult<DynamicImage> {
    let (w, h) = (img.width() as u32, img.height() as u32);
    let data = img.as_raw().to_vec();
    let mismatch = || ImageError::DataLength {
        expected_len: img.width() * img.height() * img.channels(),
        actual_len: img.as_raw().len(),
    };
    let dynamic = match img.channels() {
        1 => DynamicImage::ImageLuma8(GrayImage::from_raw(w, h, data).ok_or_else(mismatch)?),
        3 => DynamicImage::ImageRgb8(RgbImage::from_raw(w, h, data).ok_or_else(mismatch)?),
        4 => DynamicImage::ImageRgba8(RgbaImage::from_raw(w, h, data).ok_or_else(mismatch)?),
        n => return Err(ImageError::UnsupportedChannels(n).into()),
    };
    Ok(dynamic)
}

/// Place images left to right, top-aligned, on a `background` canvas
pub fn side_by_side(images: &[&Image], background: u8) -> RgbImage {
    let width: u32 = images.iter().map(|img| img.width() as u32).sum();
    let height = images.iter().map(|img| img.height() as u32).max().unwrap_or(0);
    let mut canvas = RgbImage::from_pixel(width.max(1), height.max(1), Rgb([background; 3]));

    let mut offset = 0;
    for img in images {
        blit(&mut canvas, img, offset);
        offset += img.width() as u32;
    }
    canvas
}

/// `source | target` with a line per match, green for inliers and red for
/// outliers (all green without a mask)
pub fn draw_matches(
    source: &Image,
    source_kps: &[Keypoint],
    target: &Image,
    target_kps: &[Keypoint],
    matches: &[Match],
    inlier_mask: Option<&[bool]>,
) -> RgbImage {
    let mut canvas = side_by_side(&[source, target], 0);
    let offset = source.width() as f32;

    for (i, m) in matches.iter().enumerate() {
        let (Some(a), Some(b)) = (source_kps.get(m.query_idx), target_kps.get(m.train_idx)) else {
            continue;
        };
        let inlier = inlier_mask.map_or(true, |mask| mask.get(i).copied().unwrap_or(false));
        let color = if inlier { INLIER_COLOR } else { OUTLIER_COLOR };

        let start = (a.x, a.y);
        let end = (b.x + offset, b.y);
        draw_line_segment_mut(&mut canvas, start, end, color);
        draw_hollow_circle_mut(&mut canvas, (start.0 as i32, start.1 as i32), 4, color);
        draw_hollow_circle_mut(&mut canvas, (end.0 as i32, end.1 as i32), 4, color);
    }
    canvas
}

fn blit(canvas: &mut RgbImage, img: &Image, x_offset: u32) {
    for y in 0..img.height() {
        for x in 0..img.width() {
            let px = match img.channels() {
                1 => {
                    let v = img.pixel(x, y, 0);
                    [v, v, v]
                }
                _ => [img.pixel(x, y, 0), img.pixel(x, y, 1), img.pixel(x, y, 2)],
            };
            canvas.put_pixel(x_offset + x as u32, y as u32, Rgb(px));
        }
    }
}
