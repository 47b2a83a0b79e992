use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::error::Error;

/// Single-frame detector output: corner-format box, normalized confidence
/// and a category label.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Detection {
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "p")]
    pub confidence: f32,
    #[serde(rename = "c")]
    pub class_id: i32,
    #[serde(rename = "n")]
    pub class_name: String,
}

impl Detection {
    pub fn new<S: Into<String>>(
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        confidence: f32,
        class_id: i32,
        class_name: S,
    ) -> Self {
        Self {
            bbox: BBox::ltrb(x1, y1, x2, y2),
            confidence,
            class_id,
            class_name: class_name.into(),
        }
    }

    #[inline(always)]
    pub fn iou(&self, other: &Detection) -> f32 {
        self.bbox.iou(&other.bbox)
    }

    /// Corrupted coordinates or confidences abort the video instead of
    /// silently propagating into the scores.
    pub fn validate(&self) -> Result<(), Error> {
        let coords = self.bbox.as_slice();

        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::MalformedDetection(format!(
                "non-finite coordinates {:?} for class {:?}",
                coords, self.class_name
            )));
        }

        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(Error::MalformedDetection(format!(
                "confidence {} outside [0, 1] for class {:?}",
                self.confidence, self.class_name
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_unit_confidence() {
        assert!(Detection::new(0., 0., 10., 10., 1.0, 2, "car").validate().is_ok());
        assert!(Detection::new(0., 0., 10., 10., 0.0, 2, "car").validate().is_ok());
    }

    #[test]
    fn validate_rejects_out_of_range_confidence() {
        let det = Detection::new(0., 0., 10., 10., 1.2, 2, "car");
        assert!(matches!(det.validate(), Err(Error::MalformedDetection(_))));
    }

    #[test]
    fn validate_rejects_non_finite_coordinates() {
        let det = Detection::new(f32::NAN, 0., 10., 10., 0.9, 2, "car");
        assert!(matches!(det.validate(), Err(Error::MalformedDetection(_))));
    }
}
