use serde::Serialize;

const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_warn};

/// Closed repetition: the rounded mean of its frame scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepAverage {
    pub rep_index: u32,
    pub average: u32,
}

#[derive(Debug, Clone, Default)]
struct RepBucket {
    rep_index: u32,
    frame_scores: Vec<u32>,
}

impl RepBucket {
    fn starting_at(rep_index: u32, first: u32) -> Self {
        Self {
            rep_index,
            frame_scores: vec![first],
        }
    }

    fn average(&self) -> Option<u32> {
        if self.frame_scores.is_empty() {
            return None;
        }
        let sum: u64 = self.frame_scores.iter().map(|&s| u64::from(s)).sum();
        Some((sum as f64 / self.frame_scores.len() as f64).round() as u32)
    }
}

/// Segments per-frame scores into repetitions keyed by the tracker's counter.
///
/// Exactly one bucket is open at a time. Advancing the rep index closes it,
/// a regressing index discards it, and `finalize` closes whatever is left.
#[derive(Debug, Clone)]
pub struct RepAggregator {
    last_closed_rep_index: u32,
    current: RepBucket,
    closed: Vec<RepAverage>,
    has_scored: bool,
    finalized: bool,
    skip_warmup: bool,
}

impl RepAggregator {
    pub fn new(skip_warmup: bool) -> Self {
        Self {
            last_closed_rep_index: 0,
            current: RepBucket::default(),
            closed: Vec::new(),
            has_scored: false,
            finalized: false,
            skip_warmup,
        }
    }

    /// Feeds one frame score observed while the counter reads
    /// `current_rep_index`. Returns the average of a bucket closed by this call.
    pub fn observe(&mut self, current_rep_index: u32, frame_score: u32) -> Option<RepAverage> {
        if self.finalized {
            return None;
        }

        if self.skip_warmup
            && current_rep_index == 0
            && self.last_closed_rep_index == 0
            && !self.has_scored
        {
            log_debug!("warm-up frame ignored (score {frame_score})");
            return None;
        }
        self.has_scored = true;

        if current_rep_index == self.last_closed_rep_index {
            self.current.frame_scores.push(frame_score);
            return None;
        }

        if current_rep_index > self.last_closed_rep_index {
            let emitted = self.close_current();
            self.current = RepBucket::starting_at(current_rep_index, frame_score);
            self.last_closed_rep_index = current_rep_index;
            return emitted;
        }

        log_warn!(
            "rep index regressed from {} to {}; discarding {} buffered frame(s)",
            self.last_closed_rep_index,
            current_rep_index,
            self.current.frame_scores.len()
        );
        self.current = RepBucket::starting_at(current_rep_index, frame_score);
        self.last_closed_rep_index = current_rep_index;
        None
    }

    /// Closes the in-progress bucket. Only the first call has any effect.
    pub fn finalize(&mut self) -> Option<RepAverage> {
        if self.finalized {
            return None;
        }
        self.finalized = true;
        self.close_current()
    }

    pub fn closed(&self) -> &[RepAverage] {
        &self.closed
    }

    /// Live estimate of the open bucket; never part of a persisted score.
    pub fn in_progress_average(&self) -> Option<u32> {
        if self.finalized {
            return None;
        }
        self.current.average()
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn close_current(&mut self) -> Option<RepAverage> {
        let bucket = std::mem::take(&mut self.current);
        let average = bucket.average()?;
        let closed = RepAverage {
            rep_index: bucket.rep_index,
            average,
        };
        self.closed.push(closed);
        Some(closed)
    }
}

impl Default for RepAggregator {
    fn default() -> Self {
        Self::new(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn averages(agg: &RepAggregator) -> Vec<u32> {
        agg.closed().iter().map(|r| r.average).collect()
    }

    #[test]
    fn warmup_frames_are_not_scored() {
        let mut agg = RepAggregator::new(true);
        assert_eq!(agg.observe(0, 95), None);
        assert_eq!(agg.observe(0, 95), None);
        assert_eq!(agg.in_progress_average(), None);

        agg.observe(1, 40);
        assert_eq!(agg.in_progress_average(), Some(40));
    }

    #[test]
    fn warmup_rule_can_be_disabled() {
        let mut agg = RepAggregator::new(false);
        agg.observe(0, 90);
        assert_eq!(agg.in_progress_average(), Some(90));
        assert_eq!(agg.observe(1, 50), Some(RepAverage { rep_index: 0, average: 90 }));
    }

    #[test]
    fn advancing_closes_rounded_mean() {
        let mut agg = RepAggregator::new(true);
        agg.observe(1, 80);
        agg.observe(1, 90);
        agg.observe(1, 71);
        let closed = agg.observe(2, 60);
        // (80 + 90 + 71) / 3 = 80.33
        assert_eq!(closed, Some(RepAverage { rep_index: 1, average: 80 }));
        assert_eq!(agg.in_progress_average(), Some(60));
    }

    #[test]
    fn skipped_indices_close_one_bucket() {
        let mut agg = RepAggregator::new(true);
        agg.observe(1, 70);
        agg.observe(4, 50);
        assert_eq!(averages(&agg), vec![70]);
    }

    #[test]
    fn regression_discards_open_bucket_only() {
        let mut agg = RepAggregator::new(true);
        agg.observe(1, 80);
        agg.observe(2, 10);
        agg.observe(2, 10);
        assert_eq!(agg.observe(1, 90), None);
        agg.observe(1, 70);

        // bucket 2 never closes; rep 1 restarts clean with [90, 70]
        assert_eq!(agg.in_progress_average(), Some(80));
        assert_eq!(agg.finalize(), Some(RepAverage { rep_index: 1, average: 80 }));
        assert_eq!(averages(&agg), vec![80, 80]);
    }

    #[test]
    fn finalize_is_single_shot() {
        let mut agg = RepAggregator::new(true);
        agg.observe(1, 60);
        assert!(agg.finalize().is_some());
        assert_eq!(agg.finalize(), None);
        assert_eq!(agg.observe(2, 99), None);
        assert_eq!(averages(&agg), vec![60]);
        assert!(agg.is_finalized());
    }

    #[test]
    fn finalize_on_empty_bucket_emits_nothing() {
        let mut agg = RepAggregator::new(true);
        assert_eq!(agg.finalize(), None);
        assert!(agg.closed().is_empty());
    }
}
