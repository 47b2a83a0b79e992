/// Upper bound of the safety scale; 0 is safest.
pub const MAX_SCORE: u8 = 10;

/// Instantaneous hazard score for one frame's category counts.
///
/// Integer-division bucketing caps each category's contribution
/// independently (vehicles up to 4, pedestrians up to 3, animals up to 2,
/// pothole a flat +1); the maximum raw sum exactly fills the 0-10 scale
/// with no separate normalization step.
pub fn frame_score(vehicle: u32, pedestrian: u32, animal: u32, pothole: bool) -> u8 {
    let score = (vehicle / 5).min(4) + (pedestrian / 2).min(3) + animal.min(2) + pothole as u32;

    score.min(MAX_SCORE as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_frame_scores_zero() {
        assert_eq!(frame_score(0, 0, 0, false), 0);
    }

    #[test]
    fn vehicle_term_saturates_at_cap() {
        assert_eq!(frame_score(25, 0, 0, false), 4);
        assert_eq!(frame_score(1000, 0, 0, false), 4);
    }

    #[test]
    fn pedestrian_term_saturates_at_cap() {
        assert_eq!(frame_score(0, 6, 0, false), 3);
        assert_eq!(frame_score(0, 100, 0, false), 3);
    }

    #[test]
    fn animal_term_saturates_at_cap() {
        assert_eq!(frame_score(0, 0, 2, false), 2);
        assert_eq!(frame_score(0, 0, 50, false), 2);
    }

    #[test]
    fn pothole_adds_one() {
        assert_eq!(frame_score(0, 0, 0, true), 1);
        assert_eq!(frame_score(5, 0, 0, true), 2);
    }

    #[test]
    fn maximum_raw_sum_fills_the_scale() {
        assert_eq!(frame_score(100, 100, 100, true), 10);
    }

    #[test]
    fn score_is_bounded_for_all_counts() {
        for v in [0u32, 1, 4, 5, 24, 25, 1000] {
            for p in [0u32, 1, 2, 6, 7, 500] {
                for a in [0u32, 1, 2, 3, 99] {
                    for h in [false, true] {
                        let score = frame_score(v, p, a, h);
                        assert!(score <= MAX_SCORE);
                    }
                }
            }
        }
    }
}
