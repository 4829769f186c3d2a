//! Per-class non-maximum suppression.
//!
//! Detections are multi-label, so every class is filtered on its own: a box
//! can survive for one class and be suppressed for another. Suppression
//! zeroes the class score in place; detections are never removed, which keeps
//! the frame's detection order intact for the selector's tie-breaks.

use std::cmp::Ordering;

use crate::detect::{BoundingBox, Detection};

/// Intersection over union of two boxes in the same coordinate space.
pub fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    a.iou(b)
}

/// Suppress overlapping detections of each class.
///
/// For every class `k`, candidates with `score[k] > 0` are walked in
/// descending score order (stable, so equal scores keep detection order).
/// Each surviving candidate zeroes `score[k]` of every later candidate whose
/// IoU with it is at least `iou_threshold`.
///
/// A threshold `<= 0` disables the filter. Returns the number of
/// (detection, class) scores that were zeroed.
pub fn suppress(detections: &mut [Detection], num_classes: usize, iou_threshold: f32) -> usize {
    if iou_threshold <= 0.0 || detections.len() < 2 {
        return 0;
    }

    let mut suppressed = 0;
    let mut order: Vec<usize> = Vec::with_capacity(detections.len());

    for class in 0..num_classes {
        order.clear();
        order.extend((0..detections.len()).filter(|&i| detections[i].score(class) > 0.0));
        order.sort_by(|&a, &b| descending(detections[a].score(class), detections[b].score(class)));

        for (pos, &keep) in order.iter().enumerate() {
            if detections[keep].score(class) <= 0.0 {
                continue;
            }
            let kept_box = detections[keep].bbox;
            for &other in &order[pos + 1..] {
                let candidate = &mut detections[other];
                if candidate.score(class) <= 0.0 {
                    continue;
                }
                if kept_box.iou(&candidate.bbox) >= iou_threshold {
                    candidate.scores[class] = 0.0;
                    suppressed += 1;
                }
            }
        }
    }

    suppressed
}

fn descending(a: f32, b: f32) -> Ordering {
    b.total_cmp(&a)
}
