//! Image transformations shared by the CLI and the HTTP service.
//!
//! Every function takes the input by reference and returns a freshly
//! allocated image; nothing here keeps state between calls.

use std::io::Cursor;

use image::{
    imageops::FilterType, DynamicImage, GenericImageView, ImageBuffer, ImageOutputFormat, Pixel,
};

use crate::error::{Error, Result};

/// Largest side of an image produced by [`resize`] or [`rotate`].
pub const MAX_DIMENSION: u32 = 16_384;

/// Largest pixel count of an image produced by [`resize`] or [`rotate`].
pub const MAX_PIXELS: u64 = 40_000_000;

/// Largest side the JPEG format can store.
pub const MAX_JPEG_DIMENSION: u32 = 65_535;

/// JPEG quality used for every encoded result.
pub const JPEG_QUALITY: u8 = 90;

// Angles closer than this to a right angle take the lossless path.
const RIGHT_ANGLE_TOLERANCE: f32 = 1e-4;

/// Decodes JPEG/PNG (or any format the `image` crate sniffs) from memory.
pub fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(bytes).map_err(Error::Decode)
}

/// Encodes an image as JPEG.
///
/// JPEG carries neither alpha nor 16-bit samples, so color images are
/// flattened to 8-bit RGB and gray images to 8-bit luma first.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>> {
    let (width, height) = image.dimensions();
    if width > MAX_JPEG_DIMENSION || height > MAX_JPEG_DIMENSION {
        return Err(Error::TooLargeForJpeg { width, height });
    }

    let flattened = if image.color().has_color() {
        DynamicImage::ImageRgb8(image.to_rgb8())
    } else {
        DynamicImage::ImageLuma8(image.to_luma8())
    };

    let mut buf = Vec::new();
    flattened
        .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(Error::Encode)?;
    Ok(buf)
}

/// Scales the image to exactly `width` x `height`, ignoring aspect ratio.
pub fn resize(image: &DynamicImage, width: i64, height: i64) -> Result<DynamicImage> {
    let (w, h) = checked_dimensions(width, height)?;
    Ok(image.resize_exact(w, h, FilterType::CatmullRom))
}

/// Checks an output size against the per-side and total pixel limits
/// before anything is allocated.
fn checked_dimensions(width: i64, height: i64) -> Result<(u32, u32)> {
    let valid = 1..=i64::from(MAX_DIMENSION);
    let within_budget = (width as i128) * (height as i128) <= MAX_PIXELS as i128;
    if !valid.contains(&width) || !valid.contains(&height) || !within_budget {
        return Err(Error::InvalidDimension { width, height });
    }
    Ok((width as u32, height as u32))
}

/// Converts to a single 8-bit luma channel. Alpha is dropped.
pub fn grayscale(image: &DynamicImage) -> DynamicImage {
    DynamicImage::ImageLuma8(image.to_luma8())
}

/// Rotates counter-clockwise by `degrees`.
///
/// The canvas grows to the bounding box of the rotated image so nothing is
/// clipped; uncovered pixels are left zeroed. Multiples of 90 degrees are
/// pure pixel permutations, other angles sample the nearest source pixel.
pub fn rotate(image: &DynamicImage, degrees: f32) -> Result<DynamicImage> {
    if !degrees.is_finite() {
        return Err(Error::InvalidInput(format!(
            "Rotation angle must be a finite number (got {degrees})"
        )));
    }

    let normalized = degrees.rem_euclid(360.0);
    let near = |target: f32| (normalized - target).abs() < RIGHT_ANGLE_TOLERANCE;

    // `image` rotates clockwise, so a quarter turn left is rotate270.
    let rotated = if near(0.0) || near(360.0) {
        image.clone()
    } else if near(90.0) {
        image.rotate270()
    } else if near(180.0) {
        image.rotate180()
    } else if near(270.0) {
        image.rotate90()
    } else {
        rotate_expanded(image, normalized.to_radians())?
    };
    Ok(rotated)
}

fn rotate_expanded(image: &DynamicImage, radians: f32) -> Result<DynamicImage> {
    let (src_w, src_h) = image.dimensions();
    let (w, h) = expanded_canvas(src_w, src_h, radians);
    let canvas = checked_dimensions(i64::from(w), i64::from(h))?;

    let color = image.color();
    let rotated = match (color.has_color(), color.has_alpha()) {
        (false, false) => {
            DynamicImage::ImageLuma8(rotate_buffer(&image.to_luma8(), canvas, radians))
        }
        (false, true) => {
            DynamicImage::ImageLumaA8(rotate_buffer(&image.to_luma_alpha8(), canvas, radians))
        }
        (true, false) => DynamicImage::ImageRgb8(rotate_buffer(&image.to_rgb8(), canvas, radians)),
        (true, true) => {
            DynamicImage::ImageRgba8(rotate_buffer(&image.to_rgba8(), canvas, radians))
        }
    };
    Ok(rotated)
}

/// Size of the axis-aligned box enclosing a `width` x `height` rectangle
/// rotated by `radians`.
fn expanded_canvas(width: u32, height: u32, radians: f32) -> (u32, u32) {
    let (sin, cos) = radians.sin_cos();
    let (w, h) = (width as f32, height as f32);
    // Shave float noise so that e.g. 10.000001 does not round up to 11.
    let side = |v: f32| ((v - 1e-3).ceil().max(1.0)) as u32;
    (
        side(w * cos.abs() + h * sin.abs()),
        side(w * sin.abs() + h * cos.abs()),
    )
}

fn rotate_buffer<P>(
    src: &ImageBuffer<P, Vec<P::Subpixel>>,
    (dst_w, dst_h): (u32, u32),
    radians: f32,
) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
{
    let (src_w, src_h) = src.dimensions();
    let mut dst = ImageBuffer::new(dst_w, dst_h);

    let (sin, cos) = radians.sin_cos();
    let (src_cx, src_cy) = (src_w as f32 / 2.0, src_h as f32 / 2.0);
    let (dst_cx, dst_cy) = (dst_w as f32 / 2.0, dst_h as f32 / 2.0);

    // Inverse mapping: for each destination pixel centre, find the source
    // pixel it came from. y grows downwards, hence the sign layout.
    for y in 0..dst_h {
        for x in 0..dst_w {
            let dx = x as f32 + 0.5 - dst_cx;
            let dy = y as f32 + 0.5 - dst_cy;
            let sx = (dx * cos - dy * sin + src_cx).floor();
            let sy = (dx * sin + dy * cos + src_cy).floor();
            if sx >= 0.0 && sy >= 0.0 && sx < src_w as f32 && sy < src_h as f32 {
                dst.put_pixel(x, y, *src.get_pixel(sx as u32, sy as u32));
            }
        }
    }
    dst
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn test_gradient_image(width: u32, height: u32) -> DynamicImage {
        let mut img = RgbImage::new(width, height);
        for y in 0..height {
            for x in 0..width {
                let r = (x * 255 / width) as u8;
                let g = (y * 255 / height) as u8;
                img.put_pixel(x, y, Rgb([r, g, 128]));
            }
        }
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_resize_exact_dimensions() -> Result<()> {
        let img = test_gradient_image(10, 10);
        for (w, h) in [(75, 75), (100, 50), (1, 1), (3, 200)] {
            assert_eq!(resize(&img, w, h)?.dimensions(), (w as u32, h as u32));
        }
        Ok(())
    }

    #[test]
    fn test_resize_rejects_non_positive() {
        let img = test_gradient_image(10, 10);
        for (w, h) in [(0, 10), (10, 0), (-1, 10), (10, -50)] {
            assert!(matches!(
                resize(&img, w, h),
                Err(Error::InvalidDimension { .. })
            ));
        }
    }

    #[test]
    fn test_resize_rejects_oversized() {
        let img = test_gradient_image(4, 4);
        let too_big = i64::from(MAX_DIMENSION) + 1;
        assert!(matches!(
            resize(&img, too_big, 4),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_grayscale_preserves_size() {
        let img = test_gradient_image(13, 7);
        let gray = grayscale(&img);
        assert_eq!(gray.dimensions(), (13, 7));
        assert!(!gray.color().has_color());
        assert!(!gray.color().has_alpha());
    }

    #[test]
    fn test_grayscale_drops_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(3, 3, Rgba([255, 0, 0, 10])));
        let gray = grayscale(&img);
        assert!(matches!(gray, DynamicImage::ImageLuma8(_)));
    }

    #[test]
    fn test_rotate_zero_is_size_noop() -> Result<()> {
        let img = test_gradient_image(12, 5);
        assert_eq!(rotate(&img, 0.0)?.dimensions(), (12, 5));
        assert_eq!(rotate(&img, 360.0)?.dimensions(), (12, 5));
        assert_eq!(rotate(&img, 180.0)?.dimensions(), (12, 5));
        Ok(())
    }

    #[test]
    fn test_rotate_quarter_turn_is_counter_clockwise() -> Result<()> {
        let mut buf = RgbImage::new(4, 2);
        buf.put_pixel(3, 0, Rgb([255, 255, 255]));
        let img = DynamicImage::ImageRgb8(buf);

        let rotated = rotate(&img, 90.0)?;
        assert_eq!(rotated.dimensions(), (2, 4));
        // Top-right corner ends up top-left after a left turn.
        assert_eq!(rotated.to_rgb8().get_pixel(0, 0), &Rgb([255, 255, 255]));

        let right = rotate(&img, -90.0)?;
        assert_eq!(right.to_rgb8().get_pixel(1, 3), &Rgb([255, 255, 255]));
        Ok(())
    }

    #[test]
    fn test_rotate_arbitrary_angle_grows_canvas() -> Result<()> {
        let img = test_gradient_image(10, 10);
        let rotated = rotate(&img, 45.0)?;
        assert_eq!(rotated.dimensions(), (15, 15));

        // Corners of the new canvas are outside the source and stay empty.
        let rgb = rotated.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([0, 0, 0]));
        // The centre is still covered.
        assert_ne!(rgb.get_pixel(7, 7), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn test_rotate_keeps_gray_images_gray() -> Result<()> {
        let img = DynamicImage::ImageLuma8(ImageBuffer::from_pixel(6, 4, Luma([200u8])));
        let rotated = rotate(&img, 30.0)?;
        assert!(matches!(rotated, DynamicImage::ImageLuma8(_)));
        Ok(())
    }

    #[test]
    fn test_resize_rejects_pixel_budget_overrun() {
        let img = test_gradient_image(10, 10);
        let side = i64::from(MAX_DIMENSION);
        assert!(matches!(
            resize(&img, side, side),
            Err(Error::InvalidDimension { .. })
        ));
    }

    #[test]
    fn test_rotate_wide_strip_is_rejected_before_allocating() {
        let strip = DynamicImage::ImageLuma8(GrayImage::new(100_000, 1));
        assert!(matches!(
            rotate(&strip, 45.0),
            Err(Error::InvalidDimension { .. })
        ));

        // Even a strip within the side limit blows the pixel budget at 45 degrees.
        let strip = DynamicImage::ImageLuma8(GrayImage::new(12_000, 1));
        assert!(matches!(
            rotate(&strip, 45.0),
            Err(Error::InvalidDimension { .. })
        ));
    }

    /// Centroid of all pixels brighter than mid-gray.
    fn bright_centroid(img: &DynamicImage) -> (f32, f32) {
        let gray = img.to_luma8();
        let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
        for (x, y, p) in gray.enumerate_pixels() {
            if p[0] > 127 {
                sx += x as f32;
                sy += y as f32;
                n += 1.0;
            }
        }
        assert!(n > 0.0, "no bright pixels left");
        (sx / n, sy / n)
    }

    #[test]
    fn test_rotate_arbitrary_angle_is_counter_clockwise() -> Result<()> {
        // White 5x5 block in the top-right corner of a black 20x20 square.
        let mut buf = GrayImage::new(20, 20);
        for y in 0..5 {
            for x in 15..20 {
                buf.put_pixel(x, y, Luma([255]));
            }
        }
        let rotated = rotate(&DynamicImage::ImageLuma8(buf), 30.0)?;
        assert_eq!(rotated.dimensions(), (28, 28));

        // Turning left carries the block towards the top edge (about 16.7, 3.8);
        // turning right would carry it to the right edge (about 24.2, 11.3).
        let (cx, cy) = bright_centroid(&rotated);
        assert!(cx > 14.0 && cx < 20.0, "centroid x = {cx}");
        assert!(cy < 7.0, "centroid y = {cy}");
        Ok(())
    }

    #[test]
    fn test_rotate_near_right_angle_matches_quarter_turn() -> Result<()> {
        let mut buf = GrayImage::new(4, 2);
        buf.put_pixel(3, 0, Luma([255]));
        let img = DynamicImage::ImageLuma8(buf);

        // 89.99 misses the lossless path and goes through resampling.
        let rotated = rotate(&img, 89.99)?;
        assert_eq!(rotated.dimensions(), (2, 4));
        assert_eq!(rotated.to_luma8().get_pixel(0, 0), &Luma([255]));
        Ok(())
    }

    #[test]
    fn test_encode_jpeg_rejects_oversized_side() {
        let strip = DynamicImage::ImageLuma8(GrayImage::new(70_000, 1));
        assert!(matches!(
            encode_jpeg(&strip),
            Err(Error::TooLargeForJpeg {
                width: 70_000,
                height: 1
            })
        ));
    }

    #[test]
    fn test_rotate_rejects_nan() {
        let img = test_gradient_image(2, 2);
        assert!(matches!(rotate(&img, f32::NAN), Err(Error::InvalidInput(_))));
        assert!(matches!(
            rotate(&img, f32::INFINITY),
            Err(Error::InvalidInput(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let err = decode(b"This is not a valid JPEG.").unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert!(err.to_string().starts_with("Error decoding image"));
    }

    #[test]
    fn test_encode_jpeg_flattens_alpha() -> Result<()> {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(8, 6, Rgba([1, 2, 3, 4])));
        let bytes = encode_jpeg(&img)?;
        let decoded = decode(&bytes)?;
        assert_eq!(decoded.dimensions(), (8, 6));
        assert!(!decoded.color().has_alpha());
        Ok(())
    }
}
