//! Merging stills: homogenizing, collages and the palette strip.

use crate::error::*;
use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage};

/// Colors shown by [`palette`].
pub const PALETTE_COLORS: usize = 10;

/// Pixels sampled per image when building a palette.
const PALETTE_SAMPLES: usize = 65_536;

/// Bring images from different sources to one size: scale to the narrowest
/// width, then center-crop to the shortest height.
pub fn homogenize(images: Vec<RgbImage>) -> Vec<RgbImage> {
    let width = match images.iter().map(|i| i.width()).filter(|w| *w > 0).min() {
        Some(width) => width,
        None => return images,
    };

    let scaled = images
        .into_iter()
        .map(|image| {
            if image.width() == width || image.width() == 0 {
                return image;
            }
            let height = (u64::from(image.height()) * u64::from(width) / u64::from(image.width()))
                .max(1) as u32;
            imageops::resize(&image, width, height, FilterType::Triangle)
        })
        .collect::<Vec<_>>();

    let height = scaled.iter().map(|i| i.height()).min().unwrap_or(0);

    scaled
        .into_iter()
        .map(|image| {
            if image.height() == height {
                return image;
            }
            let y = (image.height() - height) / 2;
            imageops::crop_imm(&image, 0, y, image.width(), height).to_image()
        })
        .collect()
}

/// Four images become a 2x2 grid; anything else is stacked vertically.
/// Every tile takes the first image's size.
pub fn collage(images: &[RgbImage]) -> Result<RgbImage> {
    let first = images
        .first()
        .ok_or_else(|| Error::invalid_request("cannot build a collage from no images"))?;
    let (width, height) = first.dimensions();

    let (columns, rows) = if images.len() == 4 {
        (2, 2)
    } else {
        (1, images.len() as u32)
    };

    let mut canvas = RgbImage::new(width * columns, height * rows);
    for (index, image) in images.iter().enumerate() {
        let index = index as u32;
        let x = i64::from((index % columns) * width);
        let y = i64::from((index / columns) * height);

        if image.dimensions() == (width, height) {
            imageops::replace(&mut canvas, image, x, y);
        } else {
            let tile = imageops::resize(image, width, height, FilterType::Triangle);
            imageops::replace(&mut canvas, &tile, x, y);
        }
    }

    Ok(canvas)
}

/// Reject sequences that cannot be delivered together.
pub fn check_integrity(images: &[RgbImage]) -> Result<()> {
    let first = images
        .first()
        .ok_or_else(|| Error::invalid_request("no images were produced"))?;

    if images.iter().any(|i| i.width() == 0 || i.height() == 0) {
        return Err(Error::invalid_request("empty image in sequence"));
    }

    if images.iter().any(|i| i.dimensions() != first.dimensions()) {
        return Err(Error::invalid_request(
            "images in the sequence come from different sources",
        ));
    }

    Ok(())
}

/// The image with a strip of its dominant colors underneath.
pub fn palette(image: &RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    let colors = dominant_colors(image, PALETTE_COLORS);
    let strip = (height / 6).max(1);

    let mut canvas = RgbImage::new(width, height + strip);
    imageops::replace(&mut canvas, image, 0, 0);

    if colors.is_empty() {
        return canvas;
    }

    let bar = f64::from(width) / colors.len() as f64;
    for x in 0..width {
        let color = colors[((f64::from(x) / bar) as usize).min(colors.len() - 1)];
        for y in height..height + strip {
            canvas.put_pixel(x, y, color);
        }
    }

    canvas
}

/// Median-cut quantization, darkest color first.
pub fn dominant_colors(image: &RgbImage, count: usize) -> Vec<Rgb<u8>> {
    let total = image.width() as usize * image.height() as usize;
    if total == 0 || count == 0 {
        return Vec::new();
    }

    let step = (total / PALETTE_SAMPLES).max(1);
    let mut buckets: Vec<Vec<[u8; 3]>> = vec![image.pixels().step_by(step).map(|p| p.0).collect()];

    while buckets.len() < count {
        let widest = buckets
            .iter()
            .enumerate()
            .filter(|(_, bucket)| bucket.len() > 1)
            .map(|(index, bucket)| {
                let (channel, range) = widest_channel(bucket);
                (index, channel, range)
            })
            .filter(|(_, _, range)| *range > 0)
            .max_by_key(|(index, _, range)| (*range, std::cmp::Reverse(*index)));

        let (index, channel, _) = match widest {
            Some(found) => found,
            None => break,
        };

        let mut bucket = buckets.swap_remove(index);
        bucket.sort_unstable_by_key(|pixel| pixel[channel]);
        let upper = bucket.split_off(bucket.len() / 2);
        buckets.push(bucket);
        buckets.push(upper);
    }

    let mut colors = buckets
        .iter()
        .filter(|bucket| !bucket.is_empty())
        .map(|bucket| {
            let mut sum = [0u64; 3];
            for pixel in bucket {
                for (total, value) in sum.iter_mut().zip(pixel.iter()) {
                    *total += u64::from(*value);
                }
            }
            let len = bucket.len() as u64;
            Rgb([
                (sum[0] / len) as u8,
                (sum[1] / len) as u8,
                (sum[2] / len) as u8,
            ])
        })
        .collect::<Vec<_>>();

    colors.sort_by_key(|c| {
        (
            u32::from(c[0]) * 299 + u32::from(c[1]) * 587 + u32::from(c[2]) * 114,
            c.0,
        )
    });
    colors
}

fn widest_channel(bucket: &[[u8; 3]]) -> (usize, u8) {
    (0..3)
        .map(|channel| {
            let min = bucket.iter().map(|p| p[channel]).min().unwrap_or(0);
            let max = bucket.iter().map(|p| p[channel]).max().unwrap_or(0);
            (channel, max - min)
        })
        .max_by_key(|(channel, range)| (*range, std::cmp::Reverse(*channel)))
        .unwrap_or((0, 0))
}
