//! Steering decision from the selected box.

use std::fmt;

use crate::detect::BoundingBox;

/// Horizontal split of the frame, in normalized frame coordinates.
pub const CENTER_SPLIT: f32 = 0.5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Decision {
    Left,
    Right,
    /// No qualifying target this frame.
    #[default]
    None,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Left => "LEFT",
            Decision::Right => "RIGHT",
            Decision::None => "NONE",
        }
    }

    /// Decision for an optional target box.
    pub fn for_target(bbox: Option<&BoundingBox>) -> Self {
        bbox.map(decide).unwrap_or(Decision::None)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RIGHT when the box center is strictly right of the frame midpoint,
/// LEFT otherwise. Only `bbox.x` is read.
pub fn decide(bbox: &BoundingBox) -> Decision {
    if bbox.x > CENTER_SPLIT {
        Decision::Right
    } else {
        Decision::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_goes_left() {
        assert_eq!(decide(&BoundingBox::new(0.5, 0.1, 0.3, 0.3)), Decision::Left);
        assert_eq!(decide(&BoundingBox::new(0.50001, 0.1, 0.3, 0.3)), Decision::Right);
    }

    #[test]
    fn only_center_x_matters() {
        let a = BoundingBox::new(0.7, 0.0, 0.01, 0.9);
        let b = BoundingBox::new(0.7, 0.95, 0.8, 0.0);
        assert_eq!(decide(&a), decide(&b));
    }

    #[test]
    fn edges_outside_frame_still_decide() {
        assert_eq!(decide(&BoundingBox::new(-0.05, 0.5, 0.2, 0.2)), Decision::Left);
        assert_eq!(decide(&BoundingBox::new(1.02, 0.5, 0.2, 0.2)), Decision::Right);
    }

    #[test]
    fn missing_target_is_none() {
        assert_eq!(Decision::for_target(None), Decision::None);
        assert_eq!(Decision::None.to_string(), "NONE");
        assert_eq!(Decision::Right.to_string(), "RIGHT");
    }
}
