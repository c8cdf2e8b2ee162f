use derive_builder::Builder;
use image::{DynamicImage, imageops::FilterType};
use ndarray::Array4;
use serde::{Deserialize, Serialize};

use crate::{analysis::letterbox::LetterboxTransform, consts::BACKGROUND_FILL_VALUE, error::*};

/// Normalized `[1, 3, H, W]` input tensor.
pub type Blob = Array4<f32>;

/// Channel layout the network was trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    #[default]
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// Reorders an RGB pixel into the network layout.
    fn arrange(self, [r, g, b]: [u8; 3]) -> [u8; 3] {
        match self {
            ChannelOrder::Rgb => [r, g, b],
            ChannelOrder::Bgr => [b, g, r],
        }
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(default)]
pub struct Preprocessor {
    /// Normalized value written into the letterbox padding.
    pub fill_value: f32,
    pub channel_order: ChannelOrder,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            fill_value: BACKGROUND_FILL_VALUE,
            channel_order: ChannelOrder::Rgb,
        }
    }
}

impl Preprocessor {
    /// Builds the blob for `image` placed on the canvas described by `transform`.
    ///
    /// `expected_shape` is the input shape the inference backend declares; a
    /// canvas that does not produce exactly that shape is rejected before any
    /// pixel work happens.
    pub fn process(
        &self,
        image: &DynamicImage,
        transform: &LetterboxTransform,
        expected_shape: &[usize],
    ) -> Result<Blob, DetectError> {
        let shape = transform.target.blob_shape();
        if shape.as_slice() != expected_shape {
            return ShapeMismatchSnafu {
                actual: shape.to_vec(),
                expected: expected_shape.to_vec(),
            }
            .fail();
        }

        let resized = image
            .resize_exact(transform.new_width, transform.new_height, FilterType::Triangle)
            .to_rgb8();

        let mut blob = Array4::from_elem(shape, self.fill_value);

        let pad_left = transform.pad_left as usize;
        let pad_top = transform.pad_top as usize;
        for (x, y, pixel) in resized.enumerate_pixels() {
            let x = x as usize + pad_left;
            let y = y as usize + pad_top;
            let channels = self.channel_order.arrange(pixel.0);
            for (c, value) in channels.into_iter().enumerate() {
                blob[[0, c, y, x]] = value as f32 / 255.0;
            }
        }

        Ok(blob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::letterbox::TargetSize;
    use image::{Rgb, RgbImage};

    fn solid(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_blob_layout_and_padding() {
        let target = TargetSize::new(64, 64).unwrap();
        let image = solid(128, 64, [255, 0, 51]);
        let lb = LetterboxTransform::new(128, 64, target).unwrap();
        assert_eq!((lb.new_width, lb.new_height, lb.pad_top), (64, 32, 16));

        let blob = Preprocessor::default()
            .process(&image, &lb, &target.blob_shape())
            .unwrap();
        assert_eq!(blob.shape(), &[1, 3, 64, 64]);

        // padding rows keep the fill value
        assert_eq!(blob[[0, 0, 0, 10]], 0.0);
        assert_eq!(blob[[0, 1, 63, 10]], 0.0);

        // image rows carry the normalized pixel in RGB order
        assert!((blob[[0, 0, 30, 30]] - 1.0).abs() < 1e-6);
        assert!(blob[[0, 1, 30, 30]].abs() < 1e-6);
        assert!((blob[[0, 2, 30, 30]] - 0.2).abs() < 1e-6);

        assert!(blob.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_bgr_order_and_fill() {
        let target = TargetSize::new(32, 32).unwrap();
        let image = solid(16, 32, [255, 0, 51]);
        let lb = LetterboxTransform::new(16, 32, target).unwrap();
        assert_eq!(lb.pad_left, 8);

        let preprocessor = PreprocessorBuilder::default()
            .fill_value(144.0 / 255.0)
            .channel_order(ChannelOrder::Bgr)
            .build()
            .unwrap();
        let blob = preprocessor
            .process(&image, &lb, &target.blob_shape())
            .unwrap();

        assert!((blob[[0, 0, 5, 0]] - 144.0 / 255.0).abs() < 1e-6);
        assert!((blob[[0, 0, 5, 12]] - 0.2).abs() < 1e-6);
        assert!((blob[[0, 2, 5, 12]] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_grayscale_input_is_expanded() {
        let target = TargetSize::new(16, 16).unwrap();
        let image =
            DynamicImage::ImageLuma8(image::GrayImage::from_pixel(16, 16, image::Luma([255])));
        let lb = LetterboxTransform::new(16, 16, target).unwrap();
        let blob = Preprocessor::default()
            .process(&image, &lb, &target.blob_shape())
            .unwrap();
        assert!(blob.iter().all(|v| (*v - 1.0).abs() < 1e-6));
    }

    #[test]
    fn test_shape_mismatch() {
        let target = TargetSize::new(64, 64).unwrap();
        let image = solid(10, 10, [0, 0, 0]);
        let lb = LetterboxTransform::new(10, 10, target).unwrap();
        let result = Preprocessor::default().process(&image, &lb, &[1, 3, 640, 640]);
        match result {
            Err(DetectError::ShapeMismatch { actual, expected }) => {
                assert_eq!(actual, vec![1, 3, 64, 64]);
                assert_eq!(expected, vec![1, 3, 640, 640]);
            }
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }
}
