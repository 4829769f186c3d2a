//! Decoding of YOLO-style output tensors into detections.

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectionRequest;
use crate::detect::result::{BoundingBox, Detection};
use crate::geometry::Letterbox;
use crate::model::{CoordinateUnits, ModelSpec, OutputLayout};

/// Raw output viewed as rows of `row_len` values.
struct OutputRows<'a> {
    values: &'a [f32],
    rows: usize,
    row_len: usize,
    transposed: bool,
}

impl<'a> OutputRows<'a> {
    fn new(spec: &ModelSpec, shape: &[usize], values: &'a [f32]) -> Result<Self> {
        let dims: Vec<usize> = shape.iter().copied().filter(|&d| d != 1).collect();
        let row_len = spec.row_len();
        let (rows, transposed) = match (dims.as_slice(), spec.transposed) {
            ([cols, rows], true) if *cols == row_len => (*rows, true),
            ([rows, cols], false) if *cols == row_len => (*rows, false),
            ([cols], _) if *cols == row_len => (1, false),
            _ => {
                return Err(anyhow!(
                    "model output shape {:?} does not match {} values per row",
                    shape,
                    row_len
                ))
            }
        };
        if values.len() != rows * row_len {
            return Err(anyhow!(
                "model output holds {} values, shape {:?} needs {}",
                values.len(),
                shape,
                rows * row_len
            ));
        }
        Ok(Self {
            values,
            rows,
            row_len,
            transposed,
        })
    }

    fn get(&self, row: usize, col: usize) -> f32 {
        if self.transposed {
            self.values[col * self.rows + row]
        } else {
            self.values[row * self.row_len + col]
        }
    }
}

fn to_normalized(spec: &ModelSpec, cx: f32, cy: f32, w: f32, h: f32) -> BoundingBox {
    match spec.coordinates {
        CoordinateUnits::Normalized => BoundingBox::new(cx, cy, w, h),
        CoordinateUnits::Pixels => {
            let nw = spec.width as f32;
            let nh = spec.height as f32;
            BoundingBox::new(cx / nw, cy / nh, w / nw, h / nh)
        }
    }
}

/// Turn one output tensor into frame-space detections.
///
/// For the objectness layout a row is kept only when its objectness is
/// above `request.hierarchy`, and each class score is objectness times the
/// class probability. Scores at or below `request.confidence` are reported
/// as 0; rows left with no score are dropped.
pub fn decode_rows(
    spec: &ModelSpec,
    shape: &[usize],
    values: &[f32],
    request: &DetectionRequest,
) -> Result<Vec<Detection>> {
    let rows = OutputRows::new(spec, shape, values)?;
    let letterbox = if request.letterboxed {
        Some(Letterbox::new(
            request.frame_width,
            request.frame_height,
            spec.width,
            spec.height,
        )?)
    } else {
        None
    };

    let first_class = spec.layout.box_columns();
    let mut detections = Vec::new();
    for row in 0..rows.rows {
        let objectness = match spec.layout {
            OutputLayout::Objectness => {
                let objectness = rows.get(row, 4);
                if objectness <= request.hierarchy {
                    continue;
                }
                objectness
            }
            OutputLayout::ClassScores => 1.0,
        };

        let scores: Vec<f32> = (0..spec.classes)
            .map(|k| {
                let score = objectness * rows.get(row, first_class + k);
                if score > request.confidence {
                    score
                } else {
                    0.0
                }
            })
            .collect();
        if scores.iter().all(|&s| s == 0.0) {
            continue;
        }

        let bbox = to_normalized(
            spec,
            rows.get(row, 0),
            rows.get(row, 1),
            rows.get(row, 2),
            rows.get(row, 3),
        );
        let bbox = match &letterbox {
            Some(letterbox) => letterbox.decode_box(&bbox),
            None => bbox,
        };
        detections.push(Detection::new(bbox, scores));
    }
    Ok(detections)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request(letterboxed: bool) -> DetectionRequest {
        DetectionRequest {
            frame_width: 64,
            frame_height: 64,
            confidence: 0.5,
            hierarchy: 0.25,
            letterboxed,
        }
    }

    fn two_class_spec() -> ModelSpec {
        ModelSpec::synthetic(64, 64, 2)
    }

    #[test]
    fn objectness_scales_class_scores() -> Result<()> {
        let spec = two_class_spec();
        let values = [0.5, 0.4, 0.2, 0.3, 0.8, 0.9, 0.7];
        let detections = decode_rows(&spec, &[1, 1, 7], &values, &request(false))?;
        assert_eq!(detections.len(), 1);
        let d = &detections[0];
        assert_relative_eq!(d.score(0), 0.72, epsilon = 1e-6);
        assert_relative_eq!(d.score(1), 0.56, epsilon = 1e-6);
        assert_eq!(d.bbox, BoundingBox::new(0.5, 0.4, 0.2, 0.3));
        Ok(())
    }

    #[test]
    fn rows_at_or_below_hierarchy_are_dropped() -> Result<()> {
        let spec = two_class_spec();
        let values = [
            0.5, 0.5, 0.1, 0.1, 0.25, 1.0, 1.0, //
            0.5, 0.5, 0.1, 0.1, 0.26, 1.0, 0.0,
        ];
        let detections = decode_rows(&spec, &[1, 2, 7], &values, &request(false))?;
        // Second row passes objectness but 0.26 is under confidence.
        assert!(detections.is_empty());

        let mut low_conf = request(false);
        low_conf.confidence = 0.1;
        let detections = decode_rows(&spec, &[1, 2, 7], &values, &low_conf)?;
        assert_eq!(detections.len(), 1);
        assert_relative_eq!(detections[0].score(0), 0.26, epsilon = 1e-6);
        assert_eq!(detections[0].score(1), 0.0);
        Ok(())
    }

    #[test]
    fn scores_at_confidence_are_zeroed() -> Result<()> {
        let spec = two_class_spec();
        let values = [0.5, 0.5, 0.1, 0.1, 1.0, 0.5, 0.6];
        let detections = decode_rows(&spec, &[1, 1, 7], &values, &request(false))?;
        assert_eq!(detections[0].scores, vec![0.0, 0.6]);
        Ok(())
    }

    #[test]
    fn transposed_output_is_read_by_column() -> Result<()> {
        let spec = ModelSpec {
            transposed: true,
            ..two_class_spec()
        };
        // Two rows laid out as [1, 7, 2].
        let rows = [
            [0.2, 0.3, 0.1, 0.1, 0.9, 0.9, 0.0],
            [0.7, 0.6, 0.2, 0.2, 0.9, 0.0, 0.8],
        ];
        let values: Vec<f32> = (0..7).flat_map(|col| rows.map(|r| r[col])).collect();
        let detections = decode_rows(&spec, &[1, 7, 2], &values, &request(false))?;
        assert_eq!(detections.len(), 2);
        assert_eq!(detections[0].bbox, BoundingBox::new(0.2, 0.3, 0.1, 0.1));
        assert_eq!(detections[0].best_class().map(|(k, _)| k), Some(0));
        assert_eq!(detections[1].bbox, BoundingBox::new(0.7, 0.6, 0.2, 0.2));
        assert_eq!(detections[1].best_class().map(|(k, _)| k), Some(1));
        Ok(())
    }

    #[test]
    fn class_scores_layout_ignores_hierarchy() -> Result<()> {
        let spec = ModelSpec {
            layout: OutputLayout::ClassScores,
            coordinates: CoordinateUnits::Pixels,
            ..two_class_spec()
        };
        let values = [32.0, 16.0, 8.0, 64.0, 0.1, 0.95];
        let mut req = request(false);
        req.hierarchy = 0.99;
        let detections = decode_rows(&spec, &[1, 1, 6], &values, &req)?;
        assert_eq!(detections.len(), 1);
        let b = detections[0].bbox;
        assert_relative_eq!(b.x, 0.5);
        assert_relative_eq!(b.y, 0.25);
        assert_relative_eq!(b.w, 0.125);
        assert_relative_eq!(b.h, 1.0);
        assert_eq!(detections[0].scores, vec![0.0, 0.95]);
        Ok(())
    }

    #[test]
    fn letterboxed_boxes_map_to_frame_space() -> Result<()> {
        let spec = two_class_spec();
        // 128x64 frame in a 64x64 input: 64x32 inner image, 16 rows of padding.
        let req = DetectionRequest {
            frame_width: 128,
            frame_height: 64,
            ..request(true)
        };
        let values = [0.5, 0.5, 0.5, 0.25, 1.0, 0.9, 0.0];
        let detections = decode_rows(&spec, &[1, 1, 7], &values, &req)?;
        let b = detections[0].bbox;
        assert_relative_eq!(b.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(b.y, 0.5, epsilon = 1e-6);
        assert_relative_eq!(b.w, 0.5, epsilon = 1e-6);
        assert_relative_eq!(b.h, 0.5, epsilon = 1e-6);
        Ok(())
    }

    #[test]
    fn mismatched_output_shape_is_an_error() {
        let spec = two_class_spec();
        assert!(decode_rows(&spec, &[1, 1, 6], &[0.0; 6], &request(false)).is_err());
        assert!(decode_rows(&spec, &[1, 2, 7], &[0.0; 7], &request(false)).is_err());
    }
}
