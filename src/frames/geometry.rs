use image::imageops::{self, FilterType};
use image::RgbImage;

/// Aspect ratio every extracted frame is cropped to.
pub const OUTPUT_ASPECT: f64 = 16.0 / 9.0;

/// Resample the width so pixels are square for the given display aspect
/// ratio. Frames already at that ratio are returned untouched.
pub fn fix_dar(image: RgbImage, dar: f64) -> RgbImage {
    let (width, height) = image.dimensions();
    if height == 0 || !dar.is_finite() || dar <= 0.0 {
        return image;
    }

    let target_width = (f64::from(height) * dar).round().max(1.0) as u32;
    if target_width == width {
        return image;
    }

    imageops::resize(&image, target_width, height, FilterType::Triangle)
}

/// Crop the centered [`OUTPUT_ASPECT`] region out of `image`.
pub fn center_crop(image: RgbImage) -> RgbImage {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return image;
    }

    let (crop_width, crop_height) = if f64::from(width) / f64::from(height) > OUTPUT_ASPECT {
        ((f64::from(height) * OUTPUT_ASPECT).round() as u32, height)
    } else {
        (width, (f64::from(width) / OUTPUT_ASPECT).round() as u32)
    };

    let crop_width = crop_width.clamp(1, width);
    let crop_height = crop_height.clamp(1, height);
    if (crop_width, crop_height) == (width, height) {
        return image;
    }

    let x = (width - crop_width) / 2;
    let y = (height - crop_height) / 2;
    imageops::crop_imm(&image, x, y, crop_width, crop_height).to_image()
}

/// DAR correction followed by the center crop.
pub fn correct(image: RgbImage, dar: f64) -> RgbImage {
    center_crop(fix_dar(image, dar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anamorphic_frame_is_widened() {
        // DVD-style 720x480 storage with a 16:9 display ratio
        let fixed = fix_dar(RgbImage::new(720, 480), 16.0 / 9.0);
        assert_eq!(fixed.dimensions(), (853, 480));
    }

    #[test]
    fn matching_dar_is_a_no_op_before_the_crop() {
        let image = RgbImage::from_fn(64, 36, |x, y| image::Rgb([x as u8, y as u8, 0]));
        let fixed = fix_dar(image.clone(), 64.0 / 36.0);
        assert_eq!(fixed, image);
        assert_eq!(center_crop(fixed), image);
    }

    #[test]
    fn scope_frame_is_cropped_horizontally() {
        let cropped = center_crop(RgbImage::new(1920, 800));
        assert_eq!(cropped.dimensions(), (1422, 800));
    }

    #[test]
    fn tall_frame_is_cropped_vertically() {
        let image = RgbImage::from_fn(640, 480, |_, y| image::Rgb([y as u8, 0, 0]));
        let cropped = center_crop(image);
        assert_eq!(cropped.dimensions(), (640, 360));
        // 60 rows trimmed from the top
        assert_eq!(cropped.get_pixel(0, 0)[0], 60);
    }

    #[test]
    fn correction_is_idempotent() {
        let once = correct(RgbImage::new(720, 480), 16.0 / 9.0);
        let twice = correct(once.clone(), 16.0 / 9.0);
        assert_eq!(once.dimensions(), twice.dimensions());
    }
}
