use std::collections::HashMap;

use serde::Serialize;

use super::types::{CheckResult, TargetConfig};

/// Default minimum share of reference targets that must succeed for a cycle's
/// other results to count as evidence.
pub const DEFAULT_REFERENCE_SUCCESS_RATIO: f64 = 0.5;

/// Reference-target tally of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReferenceHealth {
    pub total: usize,
    pub succeeded: usize,
}

impl ReferenceHealth {
    /// Success ratio of the reference targets. With no reference targets
    /// there is nothing to distrust, so the ratio is 1.0.
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.succeeded as f64 / self.total as f64
    }
}

/// Marks non-reference results as skipped when the reference targets suggest
/// the probing host itself was offline.
#[derive(Debug, Clone, Copy)]
pub struct ReferenceGate {
    threshold: f64,
}

impl Default for ReferenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_REFERENCE_SUCCESS_RATIO)
    }
}

impl ReferenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Tally reference results, then set `skip` on every non-reference result.
    /// Results whose target is unknown to `targets` are treated as non-reference.
    pub fn apply(
        &self,
        results: &mut [CheckResult],
        targets: &HashMap<String, TargetConfig>,
    ) -> ReferenceHealth {
        let is_reference =
            |result: &CheckResult| targets.get(&result.target_id).is_some_and(|t| t.is_reference);

        let mut health = ReferenceHealth { total: 0, succeeded: 0 };
        for result in results.iter().filter(|r| is_reference(r)) {
            health.total += 1;
            if result.succeeded {
                health.succeeded += 1;
            }
        }

        let skip = health.ratio() < self.threshold;
        for result in results.iter_mut() {
            result.skip = !is_reference(result) && skip;
        }

        health
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::Verdict;

    fn result(target_id: &str, succeeded: bool) -> CheckResult {
        let error = (!succeeded).then(|| "unreachable".to_string());
        CheckResult::new(100, target_id.to_string(), Verdict::NotApplicable, Verdict::NotApplicable, error)
    }

    fn targets(reference: &[&str], plain: &[&str]) -> HashMap<String, TargetConfig> {
        let references = reference.iter().map(|id| TargetConfig::new(*id, "http://r").reference());
        let plains = plain.iter().map(|id| TargetConfig::new(*id, "http://p"));
        references.chain(plains).map(|t| (t.id.clone(), t)).collect()
    }

    #[test]
    fn two_of_three_references_keep_results() {
        let map = targets(&["r1", "r2", "r3"], &["p1", "p2"]);
        let mut results = vec![
            result("r1", true),
            result("r2", true),
            result("r3", false),
            result("p1", false),
            result("p2", true),
        ];

        let health = ReferenceGate::new(0.5).apply(&mut results, &map);

        assert_eq!(health, ReferenceHealth { total: 3, succeeded: 2 });
        assert!(results.iter().all(|r| !r.skip));
    }

    #[test]
    fn one_of_three_references_skips_non_references() {
        let map = targets(&["r1", "r2", "r3"], &["p1", "p2"]);
        let mut results = vec![
            result("p1", false),
            result("r1", false),
            result("r2", true),
            result("r3", false),
            result("p2", true),
        ];

        ReferenceGate::new(0.5).apply(&mut results, &map);

        for r in &results {
            let expected = r.target_id.starts_with('p');
            assert_eq!(r.skip, expected, "{}", r.target_id);
        }
    }

    #[test]
    fn no_references_never_skips() {
        let map = targets(&[], &["p1"]);
        let mut results = vec![result("p1", false)];

        let health = ReferenceGate::new(0.5).apply(&mut results, &map);

        assert_eq!(health.total, 0);
        assert_eq!(health.ratio(), 1.0);
        assert!(!results[0].skip);
    }

    #[test]
    fn ratio_exactly_at_threshold_is_kept() {
        let map = targets(&["r1", "r2"], &["p1"]);
        let mut results = vec![result("r1", true), result("r2", false), result("p1", true)];

        ReferenceGate::new(0.5).apply(&mut results, &map);

        assert!(!results[2].skip);
    }
}
