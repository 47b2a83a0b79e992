use std::collections::HashSet;

use serde_derive::{Deserialize, Serialize};

use crate::score::frame_score;
use crate::tracker::ActiveTrack;

/// Class names counted under each safety category.
///
/// Defaults cover the COCO labels the stock detector emits; deployments
/// with a different label set pass their own groups at construction.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CategoryConfig {
    pub vehicle: HashSet<String>,
    pub pedestrian: HashSet<String>,
    pub animal: HashSet<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        fn set(names: &[&str]) -> HashSet<String> {
            names.iter().map(|s| s.to_string()).collect()
        }

        Self {
            vehicle: set(&["car", "motorcycle", "bus", "truck", "bicycle"]),
            pedestrian: set(&["person"]),
            animal: set(&[
                "bird", "cat", "dog", "horse", "sheep", "cow", "elephant", "bear", "zebra",
                "giraffe",
            ]),
        }
    }
}

/// Live per-frame category counts. Not cumulative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCounts {
    pub vehicle: u32,
    pub pedestrian: u32,
    pub animal: u32,
    pub pothole: bool,
}

impl FrameCounts {
    #[inline]
    pub fn score(&self) -> u8 {
        frame_score(self.vehicle, self.pedestrian, self.animal, self.pothole)
    }
}

/// Reduces a frame's tracked objects to the category counts the score
/// engine consumes. Stateless; pure function of its inputs.
pub struct FrameAnalyzer {
    categories: CategoryConfig,
}

impl FrameAnalyzer {
    pub fn new(categories: CategoryConfig) -> Self {
        Self { categories }
    }

    pub fn analyze(&self, tracks: &[ActiveTrack], pothole: bool) -> FrameCounts {
        let mut vehicle = 0;
        let mut pedestrian = 0;
        let mut animal = 0;

        for track in tracks {
            if self.categories.vehicle.contains(&track.class_name) {
                vehicle += 1;
            } else if self.categories.pedestrian.contains(&track.class_name) {
                pedestrian += 1;
            } else if self.categories.animal.contains(&track.class_name) {
                animal += 1;
            }
            // anything else is not safety-relevant
        }

        FrameCounts {
            vehicle,
            pedestrian,
            animal,
            pothole,
        }
    }
}

impl Default for FrameAnalyzer {
    fn default() -> Self {
        Self::new(CategoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn track(id: u32, class_name: &str) -> ActiveTrack {
        ActiveTrack {
            bbox: BBox::ltrb(0., 0., 10., 10.),
            track_id: id,
            class_name: class_name.to_string(),
        }
    }

    #[test]
    fn partitions_tracks_by_category() {
        let analyzer = FrameAnalyzer::default();

        let tracks = vec![
            track(1, "car"),
            track(2, "truck"),
            track(3, "person"),
            track(4, "dog"),
            track(5, "bicycle"),
        ];

        let counts = analyzer.analyze(&tracks, false);
        assert_eq!(counts.vehicle, 3);
        assert_eq!(counts.pedestrian, 1);
        assert_eq!(counts.animal, 1);
        assert!(!counts.pothole);
    }

    #[test]
    fn unknown_classes_are_ignored() {
        let analyzer = FrameAnalyzer::default();

        let tracks = vec![track(1, "traffic light"), track(2, "kite")];
        let counts = analyzer.analyze(&tracks, true);

        assert_eq!(counts.vehicle, 0);
        assert_eq!(counts.pedestrian, 0);
        assert_eq!(counts.animal, 0);
        assert!(counts.pothole);
    }

    #[test]
    fn custom_categories_override_defaults() {
        let mut categories = CategoryConfig::default();
        categories.vehicle.insert("rickshaw".to_string());

        let analyzer = FrameAnalyzer::new(categories);
        let counts = analyzer.analyze(&[track(1, "rickshaw")], false);
        assert_eq!(counts.vehicle, 1);
    }
}
