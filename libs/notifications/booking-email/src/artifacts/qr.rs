//! Verification QR code as a PNG.

use crate::error::{NotificationError, NotificationResult};
use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use std::io::Cursor;

pub const DEFAULT_QR_WIDTH: u32 = 300;
pub const DEFAULT_QR_MARGIN: u32 = 2;

/// Output geometry. `margin` is the quiet zone in modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrOptions {
    pub width: u32,
    pub margin: u32,
}

impl Default for QrOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_QR_WIDTH,
            margin: DEFAULT_QR_MARGIN,
        }
    }
}

/// Encodes text into a scannable QR image.
#[cfg_attr(test, mockall::automock)]
pub trait QrEncoder: Send + Sync {
    /// PNG bytes for `data`. Same input, same bytes.
    fn encode(&self, data: &str, options: &QrOptions) -> NotificationResult<Vec<u8>>;
}

/// Black-on-white PNG encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngQrEncoder;

impl QrEncoder for PngQrEncoder {
    fn encode(&self, data: &str, options: &QrOptions) -> NotificationResult<Vec<u8>> {
        if data.is_empty() {
            return Err(NotificationError::ArtifactError(
                "cannot encode an empty QR payload".to_string(),
            ));
        }

        let code = QrCode::new(data.as_bytes())
            .map_err(|e| NotificationError::ArtifactError(format!("QR encoding failed: {}", e)))?;
        let modules = code.width() as u32;
        let colors = code.to_colors();

        let span = modules + options.margin * 2;
        let size = options.width.max(span);
        let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));

        for y in 0..size {
            let row = (y * span / size) as i64 - options.margin as i64;
            if row < 0 || row >= modules as i64 {
                continue;
            }
            for x in 0..size {
                let col = (x * span / size) as i64 - options.margin as i64;
                if col < 0 || col >= modules as i64 {
                    continue;
                }
                let idx = row as usize * modules as usize + col as usize;
                if colors[idx] == Color::Dark {
                    img.put_pixel(x, y, Luma([0u8]));
                }
            }
        }

        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|e| NotificationError::ArtifactError(format!("PNG encoding failed: {}", e)))?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_encodes_png() {
        let png = PngQrEncoder
            .encode("https://tours.example/bookings/verify/BK-1", &QrOptions::default())
            .unwrap();
        assert_eq!(&png[..8], &PNG_MAGIC);

        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.width(), DEFAULT_QR_WIDTH);
        assert_eq!(decoded.height(), DEFAULT_QR_WIDTH);
    }

    #[test]
    fn test_output_is_deterministic() {
        let options = QrOptions::default();
        let a = PngQrEncoder.encode("BK-42", &options).unwrap();
        let b = PngQrEncoder.encode("BK-42", &options).unwrap();
        let c = PngQrEncoder.encode("BK-43", &options).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_quiet_zone_is_white() {
        let png = PngQrEncoder
            .encode("BK-42", &QrOptions { width: 300, margin: 4 })
            .unwrap();
        let img = image::load_from_memory(&png).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0), &Luma([255u8]));
        assert_eq!(img.get_pixel(299, 299), &Luma([255u8]));
    }

    #[test]
    fn test_tiny_width_grows_to_fit_modules() {
        let png = PngQrEncoder
            .encode("BK-42", &QrOptions { width: 1, margin: 0 })
            .unwrap();
        let img = image::load_from_memory(&png).unwrap();
        assert!(img.width() >= 21);
    }

    #[test]
    fn test_empty_payload_fails() {
        let err = PngQrEncoder.encode("", &QrOptions::default()).unwrap_err();
        assert!(matches!(err, NotificationError::ArtifactError(_)));
    }
}
