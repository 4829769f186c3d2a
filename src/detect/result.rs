/// Axis-aligned box in normalized coordinates.
///
/// `x`/`y` are the box center, `w`/`h` its extent, all relative to the frame
/// being reasoned about (letterboxed input or original frame). Edges may fall
/// slightly outside [0, 1]; they are not clamped.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Build from corner coordinates.
    pub fn from_corners(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            x: (left + right) / 2.0,
            y: (top + bottom) / 2.0,
            w: (right - left).max(0.0),
            h: (bottom - top).max(0.0),
        }
    }

    pub fn left(&self) -> f32 {
        self.x - self.w / 2.0
    }

    pub fn right(&self) -> f32 {
        self.x + self.w / 2.0
    }

    pub fn top(&self) -> f32 {
        self.y - self.h / 2.0
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.h / 2.0
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let w = (self.right().min(other.right()) - self.left().max(other.left())).max(0.0);
        let h = (self.bottom().min(other.bottom()) - self.top().max(other.top())).max(0.0);
        w * h
    }

    pub fn union(&self, other: &BoundingBox) -> f32 {
        self.area() + other.area() - self.intersection(other)
    }

    /// Intersection over union. Degenerate pairs (zero union) score 0.
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let union = self.union(other);
        if union <= 0.0 {
            return 0.0;
        }
        self.intersection(other) / union
    }
}

/// One candidate object: a box plus an independent score per class.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bbox: BoundingBox,
    /// Multi-label scores, one per class, each in [0, 1].
    pub scores: Vec<f32>,
}

impl Detection {
    pub fn new(bbox: BoundingBox, scores: Vec<f32>) -> Self {
        Self { bbox, scores }
    }

    /// Detection with a single non-zero class score.
    pub fn single(bbox: BoundingBox, num_classes: usize, class: usize, score: f32) -> Self {
        let mut scores = vec![0.0; num_classes];
        if let Some(slot) = scores.get_mut(class) {
            *slot = score;
        }
        Self { bbox, scores }
    }

    /// Score for `class`; classes beyond the vector score 0.
    pub fn score(&self, class: usize) -> f32 {
        self.scores.get(class).copied().unwrap_or(0.0)
    }

    pub fn num_classes(&self) -> usize {
        self.scores.len()
    }

    /// Class with the highest score, if any score is positive.
    pub fn best_class(&self) -> Option<(usize, f32)> {
        self.scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .fold(None, |best, (class, score)| match best {
                Some((_, best_score)) if best_score >= score => best,
                _ => Some((class, score)),
            })
    }

    /// True once every class score has been zeroed.
    pub fn is_empty(&self) -> bool {
        self.scores.iter().all(|score| *score <= 0.0)
    }
}

/// Ordered detections for one frame. Order only matters for tie-breaking.
pub type DetectionSet = Vec<Detection>;
