//! Aspect-preserving fit of an image into the fixed network canvas.
//!
//! The image is scaled uniformly so that it fits inside the target and is
//! centered with a constant-colored pad on the shorter side. The transform
//! keeps the bookkeeping needed to map network coordinates back to the
//! original image.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{
    analysis::bbox::Bbox,
    consts::{DEFAULT_INPUT_HEIGHT, DEFAULT_INPUT_WIDTH},
    error::DetectError,
};

/// Fixed network input resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSize {
    pub width: u32,
    pub height: u32,
}

impl TargetSize {
    /// Creates a target size, rejecting zero dimensions.
    pub fn new(width: u32, height: u32) -> Result<Self, DetectError> {
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidGeometry {
                image_width: 0,
                image_height: 0,
                target_width: width,
                target_height: height,
            });
        }
        Ok(Self { width, height })
    }

    /// Blob shape `[1, 3, height, width]` for this target.
    pub fn blob_shape(&self) -> [usize; 4] {
        [
            crate::consts::BATCH_SIZE,
            crate::consts::INPUT_CHANNELS,
            self.height as usize,
            self.width as usize,
        ]
    }
}

impl Default for TargetSize {
    fn default() -> Self {
        Self {
            width: DEFAULT_INPUT_WIDTH,
            height: DEFAULT_INPUT_HEIGHT,
        }
    }
}

/// Uniform scale plus centering pad mapping an image into a [`TargetSize`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxTransform {
    pub scale: f32,
    pub pad_left: u32,
    pub pad_top: u32,
    pub new_width: u32,
    pub new_height: u32,
    pub target: TargetSize,
}

impl LetterboxTransform {
    /// Computes the transform for an image of `image_width` x `image_height`.
    ///
    /// # Example
    /// ```
    /// use facedet_core::analysis::letterbox::{LetterboxTransform, TargetSize};
    /// let target = TargetSize::new(640, 640).unwrap();
    /// let lb = LetterboxTransform::new(1920, 1080, target).unwrap();
    /// assert_eq!((lb.new_width, lb.new_height), (640, 360));
    /// assert_eq!((lb.pad_left, lb.pad_top), (0, 140));
    /// ```
    pub fn new(
        image_width: u32,
        image_height: u32,
        target: TargetSize,
    ) -> Result<Self, DetectError> {
        if image_width == 0 || image_height == 0 || target.width == 0 || target.height == 0 {
            return Err(DetectError::InvalidGeometry {
                image_width,
                image_height,
                target_width: target.width,
                target_height: target.height,
            });
        }

        let scale = f32::min(
            target.width as f32 / image_width as f32,
            target.height as f32 / image_height as f32,
        );

        // extreme aspect ratios can round a side to zero; keep at least one row
        let new_width = ((image_width as f32 * scale).round() as u32).clamp(1, target.width);
        let new_height = ((image_height as f32 * scale).round() as u32).clamp(1, target.height);

        Ok(Self {
            scale,
            pad_left: (target.width - new_width) / 2,
            pad_top: (target.height - new_height) / 2,
            new_width,
            new_height,
            target,
        })
    }

    fn pad(&self) -> Vec2 {
        Vec2::new(self.pad_left as f32, self.pad_top as f32)
    }

    /// Maps a point from original image space onto the letterboxed canvas.
    pub fn forward_point(&self, point: Vec2) -> Vec2 {
        point * self.scale + self.pad()
    }

    /// Maps a point from the letterboxed canvas back to original image space.
    pub fn inverse_point(&self, point: Vec2) -> Vec2 {
        (point - self.pad()) / self.scale
    }

    /// Maps both corners of a canvas-space box back to original image space.
    pub fn inverse_bbox(&self, bbox: &Bbox) -> Bbox {
        bbox.map_corners(|p| self.inverse_point(p))
    }
}
