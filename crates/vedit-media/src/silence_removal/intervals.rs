//! Time intervals and the silent/audible complement.

use serde::{Deserialize, Serialize};

/// A half-open time range `[start, end)` in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
}

impl Interval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// Length of the interval in seconds (never negative).
    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }
}

/// Audible intervals left after removing `silent` from `[0, total_duration)`.
///
/// Silent intervals may arrive unsorted or overlapping. An empty input yields
/// the whole range.
pub fn complement(silent: &[Interval], total_duration: f64) -> Vec<Interval> {
    if silent.is_empty() {
        return vec![Interval::new(0.0, total_duration)];
    }

    let mut sorted = silent.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));

    let mut audible = Vec::new();
    let mut prev_end = 0.0_f64;

    for interval in &sorted {
        if interval.start > prev_end {
            audible.push(Interval::new(prev_end, interval.start));
        }
        prev_end = prev_end.max(interval.end);
    }

    if prev_end < total_duration {
        audible.push(Interval::new(prev_end, total_duration));
    }

    audible
}

/// Summed duration of `intervals` in seconds.
pub fn total_duration(intervals: &[Interval]) -> f64 {
    intervals.iter().map(Interval::duration).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: f64, end: f64) -> Interval {
        Interval::new(start, end)
    }

    #[test]
    fn test_complement_of_nothing_is_everything() {
        assert_eq!(complement(&[], 30.0), vec![iv(0.0, 30.0)]);
    }

    #[test]
    fn test_complement_basic() {
        let audible = complement(&[iv(10.0, 15.0), iv(25.0, 30.0)], 30.0);
        assert_eq!(audible, vec![iv(0.0, 10.0), iv(15.0, 25.0)]);
    }

    #[test]
    fn test_complement_leading_silence() {
        let audible = complement(&[iv(0.0, 2.0)], 10.0);
        assert_eq!(audible, vec![iv(2.0, 10.0)]);
    }

    #[test]
    fn test_complement_unsorted_and_overlapping() {
        let audible = complement(&[iv(12.0, 20.0), iv(5.0, 8.0), iv(6.0, 14.0)], 30.0);
        assert_eq!(audible, vec![iv(0.0, 5.0), iv(20.0, 30.0)]);
    }

    #[test]
    fn test_complement_fully_silent() {
        assert!(complement(&[iv(0.0, 30.0)], 30.0).is_empty());
    }

    #[test]
    fn test_complement_is_its_own_inverse() {
        let cases: Vec<(Vec<Interval>, f64)> = vec![
            (vec![iv(1.0, 2.0)], 10.0),
            (vec![iv(0.0, 3.0), iv(4.5, 6.0)], 10.0),
            (vec![iv(2.0, 4.0), iv(6.0, 10.0)], 10.0),
            (vec![iv(0.5, 1.0), iv(2.0, 3.0), iv(7.25, 8.75)], 9.0),
            (vec![], 12.0),
        ];

        for (silent, total) in cases {
            let back = complement(&complement(&silent, total), total);
            assert_eq!(back, silent, "round trip failed for {:?}", silent);
        }
    }

    #[test]
    fn test_total_duration() {
        assert_eq!(total_duration(&[iv(0.0, 10.0), iv(15.0, 25.0)]), 20.0);
        assert_eq!(total_duration(&[iv(5.0, 3.0)]), 0.0);
    }
}
