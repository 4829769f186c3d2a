//! Target selection among filtered detections.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::detect::{BoundingBox, Detection};

/// How to pick among several qualifying detections in one frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// First qualifying detection in detection order.
    FirstMatch,
    /// Highest confidence; earlier detection wins ties.
    #[default]
    BestMatch,
    /// Every qualifying detection, in order. Each one is reported and drawn,
    /// so the last one ends up on top of the overlay.
    AllMatches,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "first" | "first_match" | "firstmatch" => Ok(Self::FirstMatch),
            "best" | "best_match" | "bestmatch" => Ok(Self::BestMatch),
            "all" | "all_matches" | "allmatches" => Ok(Self::AllMatches),
            other => Err(format!(
                "unknown selection policy '{}'; expected first_match, best_match or all_matches",
                other
            )),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FirstMatch => "first_match",
            Self::BestMatch => "best_match",
            Self::AllMatches => "all_matches",
        };
        f.write_str(name)
    }
}

/// A qualifying detection of the class being followed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Target {
    /// Position in the frame's detection set.
    pub index: usize,
    pub bbox: BoundingBox,
    pub confidence: f32,
}

/// Box of the first detection whose `target_class` score exceeds
/// `conf_threshold`.
pub fn select(
    detections: &[Detection],
    target_class: usize,
    conf_threshold: f32,
) -> Option<BoundingBox> {
    qualifying(detections, target_class, conf_threshold)
        .next()
        .map(|target| target.bbox)
}

/// All qualifying detections in detection order.
pub fn qualifying(
    detections: &[Detection],
    target_class: usize,
    conf_threshold: f32,
) -> impl Iterator<Item = Target> + '_ {
    detections
        .iter()
        .enumerate()
        .filter_map(move |(index, det)| {
            let confidence = det.score(target_class);
            (confidence > conf_threshold).then_some(Target {
                index,
                bbox: det.bbox,
                confidence,
            })
        })
}

/// Class filter plus tie-break policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TargetSelector {
    pub target_class: usize,
    pub conf_threshold: f32,
    pub policy: SelectionPolicy,
}

impl TargetSelector {
    pub fn new(target_class: usize, conf_threshold: f32, policy: SelectionPolicy) -> Self {
        Self {
            target_class,
            conf_threshold,
            policy,
        }
    }

    /// Targets to report for this frame, in report order.
    ///
    /// `FirstMatch` and `BestMatch` yield at most one target.
    pub fn targets(&self, detections: &[Detection]) -> Vec<Target> {
        let mut candidates = qualifying(detections, self.target_class, self.conf_threshold);
        match self.policy {
            SelectionPolicy::FirstMatch => candidates.next().into_iter().collect(),
            SelectionPolicy::BestMatch => candidates
                .fold(None::<Target>, |best, t| match best {
                    Some(b) if b.confidence >= t.confidence => Some(b),
                    _ => Some(t),
                })
                .into_iter()
                .collect(),
            SelectionPolicy::AllMatches => candidates.collect(),
        }
    }

    /// The target that drives the frame's decision: the single pick, or the
    /// last one reported under `AllMatches`.
    pub fn primary(&self, detections: &[Detection]) -> Option<Target> {
        self.targets(detections).pop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x: f32, score: f32) -> Detection {
        Detection::single(BoundingBox::new(x, 0.5, 0.1, 0.1), 2, 0, score)
    }

    fn sample() -> Vec<Detection> {
        vec![det(0.1, 0.6), det(0.2, 0.4), det(0.3, 0.9), det(0.4, 0.9), det(0.8, 0.7)]
    }

    #[test]
    fn select_returns_first_qualifying_box() {
        let dets = sample();
        assert_eq!(select(&dets, 0, 0.5).map(|b| b.x), Some(0.1));
        assert_eq!(select(&dets, 0, 0.95), None);
        assert_eq!(select(&dets, 1, 0.0), None);
    }

    #[test]
    fn threshold_is_strict() {
        let dets = vec![det(0.1, 0.5)];
        assert_eq!(select(&dets, 0, 0.5), None);
    }

    #[test]
    fn best_match_takes_earliest_of_equal_confidences() {
        let selector = TargetSelector::new(0, 0.5, SelectionPolicy::BestMatch);
        let targets = selector.targets(&sample());
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].index, 2);
    }

    #[test]
    fn first_match_ignores_confidence_order() {
        let selector = TargetSelector::new(0, 0.5, SelectionPolicy::FirstMatch);
        assert_eq!(selector.primary(&sample()).map(|t| t.index), Some(0));
    }

    #[test]
    fn all_matches_reports_in_order_and_last_wins() {
        let selector = TargetSelector::new(0, 0.5, SelectionPolicy::AllMatches);
        let dets = sample();
        let indices: Vec<usize> = selector.targets(&dets).iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 2, 3, 4]);
        assert_eq!(selector.primary(&dets).map(|t| t.index), Some(4));
    }

    #[test]
    fn nothing_qualifies_in_empty_set() {
        for policy in [
            SelectionPolicy::FirstMatch,
            SelectionPolicy::BestMatch,
            SelectionPolicy::AllMatches,
        ] {
            let selector = TargetSelector::new(0, 0.5, policy);
            assert!(selector.targets(&[]).is_empty());
        }
    }

    #[test]
    fn policy_parses_common_spellings() {
        assert_eq!("firstMatch".parse::<SelectionPolicy>(), Ok(SelectionPolicy::FirstMatch));
        assert_eq!("best-match".parse::<SelectionPolicy>(), Ok(SelectionPolicy::BestMatch));
        assert_eq!("all".parse::<SelectionPolicy>(), Ok(SelectionPolicy::AllMatches));
        assert!("loudest".parse::<SelectionPolicy>().is_err());
    }
}
