use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::analysis::bbox::Bbox;

/// Integer pixel rectangle in original image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Converts an already clipped box into whole pixels.
    ///
    /// Corners are truncated towards zero. Returns `None` when the truncated
    /// box has no positive width or height.
    pub fn from_clipped(bbox: &Bbox) -> Option<Self> {
        let left = bbox.min.x.max(0.0) as u32;
        let top = bbox.min.y.max(0.0) as u32;
        let right = bbox.max.x.max(0.0) as u32;
        let bottom = bbox.max.y.max(0.0) as u32;

        if right > left && bottom > top {
            Some(Self::new(left, top, right - left, bottom - top))
        } else {
            None
        }
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn to_bbox(&self) -> Bbox {
        Bbox::from_min_size(
            Vec2::new(self.x as f32, self.y as f32),
            Vec2::new(self.width as f32, self.height as f32),
        )
    }

    pub fn iou(&self, other: &Self) -> f32 {
        self.to_bbox().iou(&other.to_bbox())
    }
}

/// A decoded box that passed the confidence threshold, before suppression.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub rect: Rect,
    pub class_id: usize,
    pub confidence: f32,
    /// Position of the anchor in the network output, kept for stable ordering.
    pub anchor: usize,
}

/// A final detection in original image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub rect: Rect,
    pub class_id: usize,
    pub confidence: f32,
}

impl From<Candidate> for Detection {
    fn from(candidate: Candidate) -> Self {
        Self {
            rect: candidate.rect,
            class_id: candidate.class_id,
            confidence: candidate.confidence,
        }
    }
}
