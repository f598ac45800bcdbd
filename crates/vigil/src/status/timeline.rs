use std::time::Duration;

use serde::Serialize;

use crate::monitoring::types::CheckResult;
use crate::time::whole_secs;

/// Default cap on how far back a single result may claim coverage.
pub const DEFAULT_RETROGRADE_VALIDITY: Duration = Duration::from_secs(30 * 60);

pub const MESSAGE_UNEXPECTED_STATUS_CODE: &str = "unexpected status code";
pub const MESSAGE_UNEXPECTED_CONTENT: &str = "unexpected content";
pub const MESSAGE_OK: &str = "ok";
pub const MESSAGE_UNKNOWN_ERROR: &str = "unknown error";

/// Closed interval `[begin, end]` of one result's coverage, in UTC seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub begin: i64,
    pub end: i64,
    pub ok: bool,
    pub message: String,
}

/// Turns a target's result history into contiguous display segments.
#[derive(Debug, Clone, Copy)]
pub struct TimelineBuilder {
    cycle_interval: i64,
    retrograde_validity: i64,
}

impl TimelineBuilder {
    pub fn new(cycle_interval: Duration, retrograde_validity: Duration) -> Self {
        Self {
            cycle_interval: whole_secs(cycle_interval),
            retrograde_validity: whole_secs(retrograde_validity),
        }
    }

    /// Lazily build one segment per non-skipped result.
    ///
    /// `results` must be one target's history sorted ascending by timestamp.
    /// Calling this again on the same slice restarts the sequence.
    pub fn segments<'a>(&self, results: &'a [CheckResult]) -> Segments<'a> {
        Segments { builder: *self, results: results.iter(), previous: None }
    }

    /// Select, sort and segment one target's results out of a mixed batch.
    pub fn for_target(&self, results: &[CheckResult], target_id: &str) -> Vec<Segment> {
        let mut own: Vec<CheckResult> =
            results.iter().filter(|r| r.target_id == target_id && !r.skip).cloned().collect();
        own.sort_by_key(|r| r.timestamp_utc);
        self.segments(&own).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Segments<'a> {
    builder: TimelineBuilder,
    results: std::slice::Iter<'a, CheckResult>,
    previous: Option<i64>,
}

impl Iterator for Segments<'_> {
    type Item = Segment;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.results.by_ref().find(|r| !r.skip)?;
        let end = result.timestamp_utc;
        let reach_back = self.previous.unwrap_or(end - self.builder.cycle_interval);
        let begin = reach_back.max(end - self.builder.retrograde_validity);
        self.previous = Some(end);

        Some(Segment { begin, end, ok: result.succeeded, message: segment_message(result) })
    }
}

/// Error text wins, then rule mismatches, then the plain outcome.
pub fn segment_message(result: &CheckResult) -> String {
    if let Some(error) = &result.error_message {
        return error.clone();
    }
    let message = if result.status_code_ok.is_failed() {
        MESSAGE_UNEXPECTED_STATUS_CODE
    } else if result.content_ok.is_failed() {
        MESSAGE_UNEXPECTED_CONTENT
    } else if result.succeeded {
        MESSAGE_OK
    } else {
        MESSAGE_UNKNOWN_ERROR
    };
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Verdict;

    fn ok_at(timestamp_utc: i64) -> CheckResult {
        CheckResult::new(timestamp_utc, "t".to_string(), Verdict::Passed, Verdict::NotApplicable, None)
    }

    fn bounds(segments: impl Iterator<Item = Segment>) -> Vec<(i64, i64)> {
        segments.map(|s| (s.begin, s.end)).collect()
    }

    #[test]
    fn segments_reach_back_to_previous_check_within_cap() {
        let builder = TimelineBuilder::new(Duration::from_secs(60), Duration::from_secs(300));
        let results = [ok_at(100), ok_at(160), ok_at(500)];

        assert_eq!(bounds(builder.segments(&results)), [(40, 100), (100, 160), (200, 500)]);
    }

    #[test]
    fn sequence_is_restartable() {
        let builder = TimelineBuilder::new(Duration::from_secs(60), Duration::from_secs(300));
        let results = [ok_at(100), ok_at(160)];
        let segments = builder.segments(&results);

        assert_eq!(bounds(segments.clone()), bounds(segments));
        assert_eq!(bounds(builder.segments(&results)), [(40, 100), (100, 160)]);
    }

    #[test]
    fn skipped_results_leave_no_segment() {
        let builder = TimelineBuilder::new(Duration::from_secs(60), Duration::from_secs(300));
        let mut skipped = ok_at(160);
        skipped.skip = true;
        let results = [ok_at(100), skipped, ok_at(220)];

        assert_eq!(bounds(builder.segments(&results)), [(40, 100), (100, 220)]);
    }

    #[test]
    fn retrograde_cap_bounds_first_segment() {
        let builder = TimelineBuilder::new(Duration::from_secs(900), Duration::from_secs(300));

        assert_eq!(bounds(builder.segments(&[ok_at(1_000)])), [(700, 1_000)]);
    }

    #[test]
    fn message_priority() {
        let error = CheckResult::new(1, "t".into(), Verdict::Failed, Verdict::Failed, Some("refused".into()));
        let status = CheckResult::new(1, "t".into(), Verdict::Failed, Verdict::Failed, None);
        let content = CheckResult::new(1, "t".into(), Verdict::Passed, Verdict::Failed, None);
        let ok = CheckResult::new(1, "t".into(), Verdict::Passed, Verdict::Passed, None);
        let mut unknown = ok.clone();
        unknown.succeeded = false;

        assert_eq!(segment_message(&error), "refused");
        assert_eq!(segment_message(&status), MESSAGE_UNEXPECTED_STATUS_CODE);
        assert_eq!(segment_message(&content), MESSAGE_UNEXPECTED_CONTENT);
        assert_eq!(segment_message(&ok), MESSAGE_OK);
        assert_eq!(segment_message(&unknown), MESSAGE_UNKNOWN_ERROR);
    }

    #[test]
    fn for_target_filters_and_sorts() {
        let builder = TimelineBuilder::new(Duration::from_secs(60), Duration::from_secs(300));
        let mut other = ok_at(130);
        other.target_id = "other".to_string();
        let results = [ok_at(160), other, ok_at(100)];

        let segments = builder.for_target(&results, "t");

        assert_eq!(bounds(segments.into_iter()), [(40, 100), (100, 160)]);
    }
}
