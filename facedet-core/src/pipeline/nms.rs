use tracing::debug;

use crate::detection::{Candidate, Detection};

/// Greedy, class-agnostic non-maximum suppression.
///
/// Candidates are visited by descending confidence; equal confidences keep
/// their input order. Each candidate that is still alive is accepted and
/// suppresses every later live candidate whose IoU with it is strictly above
/// `nms_threshold`. The result is in descending-confidence order.
pub fn suppress(candidates: &[Candidate], nms_threshold: f32) -> Vec<Detection> {
    if candidates.is_empty() {
        return Vec::new();
    }

    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // sort_by is stable, ties keep anchor order
    order.sort_by(|&a, &b| {
        candidates[b]
            .confidence
            .total_cmp(&candidates[a].confidence)
    });

    let mut suppressed = vec![false; order.len()];
    let mut detections = Vec::new();

    for i in 0..order.len() {
        if suppressed[i] {
            continue;
        }

        let current = &candidates[order[i]];
        detections.push(Detection::from(*current));

        for j in (i + 1)..order.len() {
            if suppressed[j] {
                continue;
            }
            if current.rect.iou(&candidates[order[j]].rect) > nms_threshold {
                suppressed[j] = true;
            }
        }
    }

    debug!(
        "NMS kept {} out of {} candidates",
        detections.len(),
        candidates.len()
    );

    detections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Rect;

    fn candidate(x: u32, y: u32, w: u32, h: u32, confidence: f32, anchor: usize) -> Candidate {
        Candidate {
            rect: Rect::new(x, y, w, h),
            class_id: 0,
            confidence,
            anchor,
        }
    }

    #[test]
    fn test_full_overlap_keeps_highest() {
        let candidates = [
            candidate(10, 10, 50, 50, 0.6, 0),
            candidate(10, 10, 50, 50, 0.9, 1),
        ];
        let detections = suppress(&candidates, 0.45);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[0].rect, Rect::new(10, 10, 50, 50));
    }

    #[test]
    fn test_disjoint_boxes_survive() {
        let candidates = [
            candidate(0, 0, 10, 10, 0.7, 0),
            candidate(100, 100, 10, 10, 0.8, 1),
        ];
        for threshold in [0.0, 0.1, 0.45, 0.99] {
            let detections = suppress(&candidates, threshold);
            assert_eq!(detections.len(), 2);
            assert_eq!(detections[0].confidence, 0.8);
            assert_eq!(detections[1].confidence, 0.7);
        }
    }

    #[test]
    fn test_threshold_is_strict() {
        // IoU = 50 / (100 + 100 - 50) = 1/3
        let candidates = [
            candidate(0, 0, 10, 10, 0.9, 0),
            candidate(5, 0, 10, 10, 0.8, 1),
        ];
        assert_eq!(suppress(&candidates, 0.5).len(), 2);
        assert_eq!(suppress(&candidates, 0.3).len(), 1);
    }

    #[test]
    fn test_suppressed_box_does_not_suppress() {
        // b overlaps a and c, a and c are disjoint: suppressing b must not
        // take c down with it
        let candidates = [
            candidate(0, 0, 10, 10, 0.9, 0),
            candidate(4, 0, 10, 10, 0.8, 1),
            candidate(10, 0, 10, 10, 0.7, 2),
        ];
        let detections = suppress(&candidates, 0.4);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].confidence, 0.9);
        assert_eq!(detections[1].confidence, 0.7);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let candidates = [
            candidate(0, 0, 10, 10, 0.5, 0),
            candidate(1, 0, 10, 10, 0.5, 1),
            candidate(200, 200, 10, 10, 0.5, 2),
        ];
        let detections = suppress(&candidates, 0.45);
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].rect.x, 0);
        assert_eq!(detections[1].rect.x, 200);
    }

    #[test]
    fn test_class_agnostic() {
        let mut other = candidate(10, 10, 50, 50, 0.6, 1);
        other.class_id = 3;
        let candidates = [candidate(10, 10, 50, 50, 0.9, 0), other];
        let detections = suppress(&candidates, 0.45);
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 0);
    }

    #[test]
    fn test_empty_and_zero_area() {
        assert!(suppress(&[], 0.45).is_empty());

        // zero union never counts as overlap
        let candidates = [
            candidate(5, 5, 0, 0, 0.9, 0),
            candidate(5, 5, 0, 0, 0.8, 1),
        ];
        assert_eq!(suppress(&candidates, 0.0).len(), 2);
    }
}
