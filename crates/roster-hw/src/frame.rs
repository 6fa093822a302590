//! Frame type and light-level checks.

use image::{DynamicImage, RgbImage};

/// A captured RGB8 frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub is_dark: bool,
}

impl Frame {
    pub fn from_image(image: DynamicImage) -> Self {
        let rgb: RgbImage = image.into_rgb8();
        let (width, height) = rgb.dimensions();
        let data = rgb.into_raw();
        let is_dark = is_dark_frame(&luma(&data), 0.95);
        Self {
            data,
            width,
            height,
            is_dark,
        }
    }

    /// Average luma (0.0–255.0).
    pub fn avg_brightness(&self) -> f32 {
        let y = luma(&self.data);
        if y.is_empty() {
            return 0.0;
        }
        y.iter().map(|&b| b as f32).sum::<f32>() / y.len() as f32
    }
}

/// BT.601 luma of packed RGB8 pixels. Trailing partial pixels are ignored.
pub fn luma(rgb: &[u8]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|p| {
            let y = 0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32;
            y.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// Returns true if more than `threshold_pct` of pixels fall in the darkest
/// bucket (0–31).
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark_count = gray.iter().filter(|&&p| p < 32).count();
    (dark_count as f32 / gray.len() as f32) > threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luma_primaries() {
        assert_eq!(luma(&[255, 255, 255, 0, 0, 0]), vec![255, 0]);
        assert_eq!(luma(&[255, 0, 0]), vec![76]);
    }

    #[test]
    fn test_luma_ignores_partial_pixel() {
        assert_eq!(luma(&[10, 10, 10, 200]).len(), 1);
    }

    #[test]
    fn test_dark_frame_all_black() {
        assert!(is_dark_frame(&[0u8; 1000], 0.95));
    }

    #[test]
    fn test_dark_frame_normal() {
        assert!(!is_dark_frame(&[128u8; 1000], 0.95));
    }

    #[test]
    fn test_dark_frame_empty() {
        assert!(is_dark_frame(&[], 0.95));
    }

    #[test]
    fn test_dark_frame_borderline_bright() {
        // 94% dark, 6% bright
        let mut gray = vec![10u8; 940];
        gray.extend(vec![128u8; 60]);
        assert!(!is_dark_frame(&gray, 0.95));
    }

    #[test]
    fn test_from_image() {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 2, image::Rgb([200, 200, 200])));
        let frame = Frame::from_image(image);
        assert_eq!((frame.width, frame.height), (4, 2));
        assert_eq!(frame.data.len(), 4 * 2 * 3);
        assert!(!frame.is_dark);
        assert!((frame.avg_brightness() - 200.0).abs() < 1.0);
    }

    #[test]
    fn test_from_black_image_is_dark() {
        let image = DynamicImage::ImageRgb8(RgbImage::new(8, 8));
        assert!(Frame::from_image(image).is_dark);
    }
}
