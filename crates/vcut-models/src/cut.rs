//! Cut requests and validation against a video's duration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::timestamp::timestamp_to_seconds;

/// A proposed cut as human-readable timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CutRequest {
    pub start: String,
    pub end: String,
}

impl CutRequest {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
        }
    }
}

/// A cut that passed validation.
///
/// Holds `0 <= start_seconds < end_seconds <= duration` for the video it
/// was validated against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ValidatedCut {
    pub start: String,
    pub end: String,
    pub start_seconds: f64,
    pub end_seconds: f64,
}

impl ValidatedCut {
    pub fn duration_seconds(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Filter `cuts` down to the ones that fit inside `duration_seconds`.
///
/// Invalid cuts are dropped silently and the survivors keep their input
/// order. Unparseable timestamps count as `0`, so a garbage start with a
/// valid end still produces a cut from the beginning of the video.
pub fn validate_cuts(cuts: &[CutRequest], duration_seconds: f64) -> Vec<ValidatedCut> {
    cuts.iter()
        .filter_map(|cut| {
            let start_seconds = timestamp_to_seconds(&cut.start);
            let end_seconds = timestamp_to_seconds(&cut.end);

            if 0.0 <= start_seconds && start_seconds < end_seconds && end_seconds <= duration_seconds {
                Some(ValidatedCut {
                    start: cut.start.clone(),
                    end: cut.end.clone(),
                    start_seconds,
                    end_seconds,
                })
            } else {
                debug!(
                    start = %cut.start,
                    end = %cut.end,
                    duration_seconds,
                    "Dropping cut outside video bounds"
                );
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_after_end_is_dropped() {
        let cuts = vec![CutRequest::new("00:00:10", "00:00:05")];
        assert!(validate_cuts(&cuts, 100.0).is_empty());
    }

    #[test]
    fn test_end_past_duration_is_dropped() {
        let cuts = vec![CutRequest::new("00:00:00", "00:01:00")];
        assert!(validate_cuts(&cuts, 50.0).is_empty());

        let valid = validate_cuts(&cuts, 120.0);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].start_seconds, 0.0);
        assert_eq!(valid[0].end_seconds, 60.0);
        assert_eq!(valid[0].start, "00:00:00");
    }

    #[test]
    fn test_end_equal_to_duration_is_kept() {
        let cuts = vec![CutRequest::new("10", "50")];
        assert_eq!(validate_cuts(&cuts, 50.0).len(), 1);
    }

    #[test]
    fn test_keeps_valid_subset_in_order() {
        let cuts = vec![
            CutRequest::new("00:01:00", "00:01:30"),
            CutRequest::new("00:00:50", "00:00:40"),
            CutRequest::new("00:00:05", "00:00:10"),
            CutRequest::new("00:00:00", "00:10:00"),
            CutRequest::new("01:10", "01:20.5"),
        ];

        let valid = validate_cuts(&cuts, 120.0);
        let starts: Vec<f64> = valid.iter().map(|c| c.start_seconds).collect();
        assert_eq!(starts, vec![60.0, 5.0, 70.0]);
        assert!((valid[2].duration_seconds() - 10.5).abs() < 0.001);
    }

    #[test]
    fn test_garbage_start_counts_as_zero() {
        let cuts = vec![CutRequest::new("soon", "00:00:20"), CutRequest::new("5", "later")];
        let valid = validate_cuts(&cuts, 60.0);
        assert_eq!(valid.len(), 1);
        assert_eq!(valid[0].start_seconds, 0.0);
        assert_eq!(valid[0].end_seconds, 20.0);
    }

    #[test]
    fn test_negative_start_is_dropped() {
        let cuts = vec![
            CutRequest::new("-5", "10"),
            CutRequest::new("00:-1:00", "00:00:30"),
        ];
        assert!(validate_cuts(&cuts, 100.0).is_empty());
    }
}
