//! Decoding of the raw `[1, R, N]` detection head into candidates.
//!
//! Every column of the output is one anchor: box geometry in canvas pixels
//! followed by the class scores. Two head layouts are accepted, told apart by
//! the row count:
//!
//! * `R = 4 + C`: `cx, cy, w, h, score_0 .. score_{C-1}`
//! * `R = 5 + C`: `cx, cy, w, h, objectness, score_0 .. score_{C-1}`, where the
//!   class confidence is `objectness * score_c`.

use glam::Vec2;
use ndarray::{ArrayD, ArrayView1, ArrayView2, ArrayViewD, Axis, Ix3, s};
use snafu::OptionExt;
use tracing::{debug, warn};

use crate::{
    analysis::{bbox::Bbox, letterbox::LetterboxTransform},
    consts::{CXYWH_OFFSET, FALLBACK_NUM_CLASSES},
    detection::{Candidate, Rect},
    error::*,
};

/// Raw output tensor as returned by an inference backend.
pub type RawOutput = ArrayD<f32>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadLayout {
    /// Box geometry directly followed by class scores.
    Plain,
    /// Box geometry, one objectness row, then class scores.
    Objectness,
}

impl HeadLayout {
    fn score_offset(self) -> usize {
        match self {
            HeadLayout::Plain => CXYWH_OFFSET,
            HeadLayout::Objectness => CXYWH_OFFSET + 1,
        }
    }
}

/// Bounds-checked view over a validated output tensor, one column per anchor.
#[derive(Debug)]
pub struct OutputView<'a> {
    rows: ArrayView2<'a, f32>,
    layout: HeadLayout,
    num_classes: usize,
}

impl<'a> OutputView<'a> {
    /// Validates the tensor contract and wraps the single batch slice.
    pub fn new(raw: ArrayViewD<'a, f32>, num_classes: usize) -> Result<Self, DetectError> {
        let shape = raw.shape().to_vec();
        let num_classes = num_classes.max(FALLBACK_NUM_CLASSES);

        if raw.ndim() != 3 {
            return MalformedOutputSnafu {
                shape,
                reason: format!("expected rank 3, got rank {}", raw.ndim()),
            }
            .fail();
        }
        if shape[0] != 1 {
            return MalformedOutputSnafu {
                reason: format!("expected batch dimension 1, got {}", shape[0]),
                shape,
            }
            .fail();
        }

        let layout = if shape[1] == CXYWH_OFFSET + num_classes {
            HeadLayout::Plain
        } else if shape[1] == CXYWH_OFFSET + 1 + num_classes {
            HeadLayout::Objectness
        } else {
            return MalformedOutputSnafu {
                reason: format!(
                    "expected {} or {} rows for {} classes, got {}",
                    CXYWH_OFFSET + num_classes,
                    CXYWH_OFFSET + 1 + num_classes,
                    num_classes,
                    shape[1]
                ),
                shape,
            }
            .fail();
        };

        let rows = raw
            .into_dimensionality::<Ix3>()
            .ok()
            .context(MalformedOutputSnafu {
                shape: shape.clone(),
                reason: "not a 3d tensor",
            })?
            .index_axis_move(Axis(0), 0);

        Ok(Self {
            rows,
            layout,
            num_classes,
        })
    }

    pub fn layout(&self) -> HeadLayout {
        self.layout
    }

    pub fn num_anchors(&self) -> usize {
        self.rows.ncols()
    }

    pub fn anchor(&self, index: usize) -> Option<AnchorView<'_>> {
        (index < self.num_anchors()).then(|| AnchorView {
            values: self.rows.column(index),
            layout: self.layout,
            num_classes: self.num_classes,
        })
    }

    pub fn anchors(&self) -> impl Iterator<Item = AnchorView<'_>> {
        self.rows.axis_iter(Axis(1)).map(|values| AnchorView {
            values,
            layout: self.layout,
            num_classes: self.num_classes,
        })
    }
}

/// One anchor column of the output.
#[derive(Debug)]
pub struct AnchorView<'a> {
    values: ArrayView1<'a, f32>,
    layout: HeadLayout,
    num_classes: usize,
}

impl AnchorView<'_> {
    /// `(center, size)` in canvas pixels.
    pub fn center_size(&self) -> (Vec2, Vec2) {
        let cxywh = self.values.slice(s![0..CXYWH_OFFSET]);
        (
            Vec2::new(cxywh[0], cxywh[1]),
            Vec2::new(cxywh[2], cxywh[3]),
        )
    }

    /// Best class and its confidence. The first maximum wins, so equal scores
    /// resolve to the lowest class index. NaN scores are never selected.
    pub fn best_class(&self) -> Option<(usize, f32)> {
        let offset = self.layout.score_offset();
        let scores = self.values.slice(s![offset..offset + self.num_classes]);

        let mut best: Option<(usize, f32)> = None;
        for (class_id, &score) in scores.iter().enumerate() {
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ if score.is_nan() => {}
                _ => best = Some((class_id, score)),
            }
        }

        match self.layout {
            HeadLayout::Plain => best,
            HeadLayout::Objectness => {
                let objectness = self.values[CXYWH_OFFSET];
                best.map(|(class_id, score)| (class_id, score * objectness))
                    .filter(|(_, confidence)| !confidence.is_nan())
            }
        }
    }
}

/// Decodes the raw output into candidates in original image pixels.
///
/// Anchors whose best confidence is not strictly above `confidence_threshold`
/// are skipped. Surviving boxes are mapped through the inverse letterbox,
/// clipped to `[0, width] x [0, height]` and dropped when nothing of them is
/// left. A tensor violating the output contract is logged and yields no
/// candidates.
pub fn decode(
    raw: ArrayViewD<'_, f32>,
    transform: &LetterboxTransform,
    original_size: (u32, u32),
    confidence_threshold: f32,
    num_classes: usize,
) -> Vec<Candidate> {
    let view = match OutputView::new(raw, num_classes) {
        Ok(view) => view,
        Err(err) => {
            warn!("Discarding model output: {}", err);
            return Vec::new();
        }
    };

    let bounds = Vec2::new(original_size.0 as f32, original_size.1 as f32);
    let mut candidates = Vec::new();
    let mut above_threshold = 0;

    for (anchor, prediction) in view.anchors().enumerate() {
        let Some((class_id, confidence)) = prediction.best_class() else {
            continue;
        };
        if confidence <= confidence_threshold {
            continue;
        }
        above_threshold += 1;

        let (center, size) = prediction.center_size();
        let bbox = transform
            .inverse_bbox(&Bbox::from_center_size(center, size))
            .clamp(Vec2::ZERO, bounds);

        let Some(rect) = Rect::from_clipped(&bbox) else {
            continue;
        };

        candidates.push(Candidate {
            rect,
            class_id,
            confidence,
            anchor,
        });
    }

    debug!(
        "Decoded {} anchors: {} above threshold, {} valid boxes",
        view.num_anchors(),
        above_threshold,
        candidates.len()
    );

    candidates
}
