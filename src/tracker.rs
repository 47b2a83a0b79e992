use munkres::{solve_assignment, WeightMatrix};
use tracing::{debug, warn};

use crate::bbox::{BBox, Ltrb};
use crate::detection::Detection;
use crate::error::Error;

/// Cost assigned to forbidden pairs (class mismatch, insufficient overlap,
/// padding rows/columns). Any real match costs less than 1.0.
const FORBIDDEN: f32 = 100000.0;

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Detections at or above this confidence may create new tracks.
    pub track_thresh: f32,
    /// Minimum IoU (exclusive) for a detection to match a track.
    pub match_thresh: f32,
    /// Consecutive unmatched frames tolerated before a track is dropped.
    pub max_misses: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            track_thresh: 0.5,
            match_thresh: 0.8,
            max_misses: 5,
        }
    }
}

/// Track matched or created in the current frame.
#[derive(Debug, Clone)]
pub struct ActiveTrack {
    pub bbox: BBox<Ltrb>,
    pub track_id: u32,
    pub class_name: String,
}

#[derive(Debug)]
struct TrackedObject {
    id: u32,
    class_name: String,
    bbox: BBox<Ltrb>,
    misses: u32,
}

/// Online tracker associating per-frame detections into persistent
/// identities by IoU.
///
/// Matching runs in two passes per frame: high-confidence detections are
/// assigned to live tracks first and may create new tracks when unmatched;
/// low-confidence detections are then assigned to the tracks left over,
/// which lets a track survive a momentary confidence dip without weak noise
/// spawning identities of its own. Each pass solves a globally optimal
/// assignment over the 1-IoU cost matrix, so the result does not depend on
/// detection order.
///
/// The registry is owned by this instance; process one video per tracker.
pub struct IdentityTracker {
    config: TrackerConfig,
    tracks: Vec<TrackedObject>,
    next_id: u32,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            tracks: Vec::with_capacity(64),
            next_id: 1,
        }
    }

    /// Number of tracks currently held in the registry, including missed
    /// ones pending eviction.
    #[inline]
    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Advance the tracker by one frame.
    ///
    /// Returns the tracks matched or created this frame; tracks that found
    /// no detection are withheld from the output and dropped for good once
    /// their miss count exceeds the tolerance.
    pub fn update(&mut self, detections: &[Detection]) -> Result<Vec<ActiveTrack>, Error> {
        for det in detections {
            det.validate()?;
        }

        let mut high = Vec::new();
        let mut low = Vec::new();
        for (idx, det) in detections.iter().enumerate() {
            if det.confidence >= self.config.track_thresh {
                high.push(idx);
            } else {
                low.push(idx);
            }
        }

        let mut matched_tracks = vec![false; self.tracks.len()];
        let mut matched_dets = vec![false; detections.len()];
        let mut active = Vec::with_capacity(detections.len());

        // First pass: high-confidence detections against every live track.
        for (track_idx, det_idx) in self.assignment(detections, &high, &matched_tracks) {
            matched_tracks[track_idx] = true;
            matched_dets[det_idx] = true;
            active.push(self.apply_match(track_idx, &detections[det_idx]));
        }

        // Second pass: low-confidence detections may extend the tracks left
        // unmatched, but never create new ones.
        for (track_idx, det_idx) in self.assignment(detections, &low, &matched_tracks) {
            matched_tracks[track_idx] = true;
            matched_dets[det_idx] = true;
            active.push(self.apply_match(track_idx, &detections[det_idx]));
        }

        // Unmatched high-confidence detections become new identities.
        for &det_idx in &high {
            if matched_dets[det_idx] {
                continue;
            }

            let det = &detections[det_idx];
            let id = self.next_id;
            self.next_id += 1;

            self.tracks.push(TrackedObject {
                id,
                class_name: det.class_name.clone(),
                bbox: det.bbox.clone(),
                misses: 0,
            });

            active.push(ActiveTrack {
                bbox: det.bbox.clone(),
                track_id: id,
                class_name: det.class_name.clone(),
            });
        }

        // Eviction: only the tracks that existed before this frame can have
        // missed; freshly created ones were emitted above.
        for (idx, matched) in matched_tracks.iter().enumerate() {
            if !matched {
                self.tracks[idx].misses += 1;
            }
        }

        let max_misses = self.config.max_misses;
        self.tracks.retain(|t| {
            if t.misses > max_misses {
                debug!("track {} evicted after {} misses", t.id, t.misses);
                false
            } else {
                true
            }
        });

        Ok(active)
    }

    fn apply_match(&mut self, track_idx: usize, det: &Detection) -> ActiveTrack {
        let track = &mut self.tracks[track_idx];
        track.bbox = det.bbox.clone();
        track.misses = 0;

        ActiveTrack {
            bbox: track.bbox.clone(),
            track_id: track.id,
            class_name: track.class_name.clone(),
        }
    }

    /// Optimal assignment between the given detections and the tracks not
    /// yet matched this frame. Pairs of different classes or with
    /// IoU <= match_thresh are never produced.
    fn assignment(
        &self,
        detections: &[Detection],
        det_idx: &[usize],
        matched_tracks: &[bool],
    ) -> Vec<(usize, usize)> {
        let track_idx: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| !matched_tracks[i])
            .collect();

        if det_idx.is_empty() || track_idx.is_empty() {
            return Vec::new();
        }

        // Square matrix padded with the sentinel cost; padding rows and
        // columns absorb the unmatched leftovers.
        let n = det_idx.len().max(track_idx.len());
        let mut costs = vec![FORBIDDEN; n * n];

        for (r, &track_i) in track_idx.iter().enumerate() {
            let track = &self.tracks[track_i];

            for (c, &det_i) in det_idx.iter().enumerate() {
                let det = &detections[det_i];

                if track.class_name != det.class_name {
                    continue;
                }

                let iou = track.bbox.iou(&det.bbox);
                if iou > self.config.match_thresh {
                    costs[r * n + c] = 1.0 - iou;
                }
            }
        }

        let mut mat = WeightMatrix::from_row_vec(n, costs.clone());

        let solution = match solve_assignment(&mut mat) {
            Ok(solution) => solution,
            Err(err) => {
                warn!("assignment could not be solved: {:?}", err);
                return Vec::new();
            }
        };

        let mut pairs = Vec::new();
        for pos in solution {
            if pos.row < track_idx.len()
                && pos.column < det_idx.len()
                && costs[pos.row * n + pos.column] < FORBIDDEN
            {
                pairs.push((track_idx[pos.row], det_idx[pos.column]));
            }
        }

        pairs
    }
}

impl Default for IdentityTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}
