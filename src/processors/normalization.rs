//! Pixel normalization into NCHW input tensors.

use crate::core::errors::{OCRError, ProcessingStage};
use crate::core::Tensor4D;
use image::RgbImage;

/// Normalizes RGB images into a batched NCHW f32 tensor.
///
/// Each channel value is mapped as `(value * scale - mean) / std`.
#[derive(Debug, Clone)]
pub struct NormalizeImage {
    scale: f32,
    mean: [f32; 3],
    std: [f32; 3],
}

impl NormalizeImage {
    /// Creates a normalizer with explicit parameters.
    pub fn new(scale: f32, mean: [f32; 3], std: [f32; 3]) -> Result<Self, OCRError> {
        if std.iter().any(|v| *v == 0.0) {
            return Err(OCRError::processing(
                ProcessingStage::Normalization,
                "std must be non-zero for every channel",
            ));
        }
        Ok(Self { scale, mean, std })
    }

    /// ImageNet statistics, used by the detection model.
    pub fn imagenet() -> Result<Self, OCRError> {
        Self::new(
            1.0 / 255.0,
            [0.485, 0.456, 0.406],
            [0.229, 0.224, 0.225],
        )
    }

    /// Symmetric [-1, 1] mapping, used by the classifier and recognizer.
    pub fn centered() -> Result<Self, OCRError> {
        Self::new(1.0 / 255.0, [0.5, 0.5, 0.5], [0.5, 0.5, 0.5])
    }

    /// Normalizes a batch of equally sized images into one NCHW tensor.
    pub fn normalize_batch(&self, images: &[RgbImage]) -> Result<Tensor4D, OCRError> {
        let first = images.first().ok_or_else(|| {
            OCRError::processing(ProcessingStage::Normalization, "empty image batch")
        })?;
        let (width, height) = (first.width() as usize, first.height() as usize);
        if images
            .iter()
            .any(|img| img.width() as usize != width || img.height() as usize != height)
        {
            return Err(OCRError::processing(
                ProcessingStage::Normalization,
                "all images in a batch must share the same dimensions",
            ));
        }

        let mut tensor = Tensor4D::zeros((images.len(), 3, height, width));
        for (n, img) in images.iter().enumerate() {
            for (x, y, pixel) in img.enumerate_pixels() {
                for c in 0..3 {
                    tensor[[n, c, y as usize, x as usize]] =
                        (pixel.0[c] as f32 * self.scale - self.mean[c]) / self.std[c];
                }
            }
        }
        Ok(tensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_rejects_zero_std() {
        assert!(NormalizeImage::new(1.0, [0.0; 3], [0.0; 3]).is_err());
    }

    #[test]
    fn test_centered_maps_extremes() {
        let norm = NormalizeImage::centered().unwrap();
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([0, 0, 0]));
        img.put_pixel(1, 0, Rgb([255, 255, 255]));
        let tensor = norm.normalize_batch(&[img]).unwrap();
        assert!((tensor[[0, 0, 0, 0]] + 1.0).abs() < 1e-6);
        assert!((tensor[[0, 0, 0, 1]] - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_rejects_mixed_dimensions() {
        let norm = NormalizeImage::centered().unwrap();
        let images = vec![RgbImage::new(2, 2), RgbImage::new(3, 2)];
        assert!(norm.normalize_batch(&images).is_err());
    }

    #[test]
    fn test_batch_layout_is_nchw() {
        let norm = NormalizeImage::new(1.0, [0.0; 3], [1.0; 3]).unwrap();
        let mut img = RgbImage::new(2, 2);
        img.put_pixel(1, 0, Rgb([7, 11, 13]));
        let tensor = norm.normalize_batch(&[img]).unwrap();
        assert_eq!(tensor.shape(), &[1, 3, 2, 2]);
        assert_eq!(tensor[[0, 0, 0, 1]], 7.0);
        assert_eq!(tensor[[0, 1, 0, 1]], 11.0);
        assert_eq!(tensor[[0, 2, 0, 1]], 13.0);
    }
}
