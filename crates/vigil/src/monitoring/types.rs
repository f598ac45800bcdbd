use serde::{Deserialize, Serialize};

/// One configured endpoint, as handed out by the target source at cycle start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_content: Option<String>,
    #[serde(default)]
    pub is_reference: bool,
}

impl TargetConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            expected_status_code: None,
            expected_content: None,
            is_reference: false,
        }
    }

    pub fn expect_status(mut self, code: u16) -> Self {
        self.expected_status_code = Some(code);
        self
    }

    pub fn expect_content(mut self, needle: impl Into<String>) -> Self {
        self.expected_content = Some(needle.into());
        self
    }

    pub fn reference(mut self) -> Self {
        self.is_reference = true;
        self
    }
}

/// Outcome of an expectation rule that a target may or may not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    Failed,
    NotApplicable,
}

impl Verdict {
    /// `NotApplicable` when no rule is configured, otherwise the rule result.
    pub fn evaluate<T>(rule: Option<T>, check: impl FnOnce(T) -> bool) -> Self {
        match rule {
            Some(rule) => {
                if check(rule) {
                    Verdict::Passed
                } else {
                    Verdict::Failed
                }
            }
            None => Verdict::NotApplicable,
        }
    }

    pub fn is_failed(self) -> bool {
        self == Verdict::Failed
    }

    /// Nullable column form.
    pub fn as_column(self) -> Option<bool> {
        match self {
            Verdict::Passed => Some(true),
            Verdict::Failed => Some(false),
            Verdict::NotApplicable => None,
        }
    }

    pub fn from_column(value: Option<bool>) -> Self {
        match value {
            Some(true) => Verdict::Passed,
            Some(false) => Verdict::Failed,
            None => Verdict::NotApplicable,
        }
    }
}

/// Raw result of one probe, before it is judged against the target's rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// 0 when the connection never completed.
    pub status_code: u16,
    pub body_snippet: String,
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    pub fn unreachable(error: impl Into<String>) -> Self {
        Self { status_code: 0, body_snippet: String::new(), error_message: Some(error.into()) }
    }
}

/// Persisted unit of monitoring history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Assigned by the store on insert.
    pub id: Option<i64>,
    pub timestamp_utc: i64,
    pub target_id: String,
    pub status_code_ok: Verdict,
    pub content_ok: Verdict,
    pub error_message: Option<String>,
    pub succeeded: bool,
    pub skip: bool,
}

impl CheckResult {
    /// Judge a probe outcome against the target's expectations.
    pub fn evaluate(target: &TargetConfig, outcome: &ProbeOutcome, timestamp_utc: i64) -> Self {
        let status_code_ok =
            Verdict::evaluate(target.expected_status_code, |code| code == outcome.status_code);
        let content_ok = Verdict::evaluate(target.expected_content.as_deref(), |needle| {
            outcome.body_snippet.contains(needle)
        });

        Self::new(timestamp_utc, target.id.clone(), status_code_ok, content_ok, outcome.error_message.clone())
    }

    /// Build a result with `succeeded` derived from the other fields.
    pub fn new(
        timestamp_utc: i64,
        target_id: String,
        status_code_ok: Verdict,
        content_ok: Verdict,
        error_message: Option<String>,
    ) -> Self {
        let succeeded =
            !status_code_ok.is_failed() && !content_ok.is_failed() && error_message.is_none();
        Self {
            id: None,
            timestamp_utc,
            target_id,
            status_code_ok,
            content_ok,
            error_message,
            succeeded,
            skip: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(status_code: u16, body: &str, error: Option<&str>) -> ProbeOutcome {
        ProbeOutcome {
            status_code,
            body_snippet: body.to_string(),
            error_message: error.map(str::to_string),
        }
    }

    #[test]
    fn matching_status_without_content_rule() {
        let target = TargetConfig::new("a", "https://a.example").expect_status(200);

        let ok = CheckResult::evaluate(&target, &outcome(200, "", None), 10);
        assert_eq!(ok.status_code_ok, Verdict::Passed);
        assert_eq!(ok.content_ok, Verdict::NotApplicable);
        assert!(ok.succeeded);

        let errored = CheckResult::evaluate(&target, &outcome(200, "", Some("reset")), 10);
        assert_eq!(errored.status_code_ok, Verdict::Passed);
        assert!(!errored.succeeded);
    }

    #[test]
    fn owned_rules_are_evaluated() {
        let rule = Some(String::from("Welcome"));
        assert_eq!(Verdict::evaluate(rule, |needle| "Welcome home".contains(&needle)), Verdict::Passed);
        assert_eq!(Verdict::evaluate(Some(String::from("x")), |needle| needle.is_empty()), Verdict::Failed);
        assert_eq!(Verdict::evaluate(None::<String>, |_| true), Verdict::NotApplicable);
    }

    #[test]
    fn no_rules_means_not_applicable() {
        let target = TargetConfig::new("a", "https://a.example");
        let result = CheckResult::evaluate(&target, &outcome(503, "down", None), 10);

        assert_eq!(result.status_code_ok, Verdict::NotApplicable);
        assert_eq!(result.content_ok, Verdict::NotApplicable);
        assert!(result.succeeded);
    }

    #[test]
    fn content_match_is_case_sensitive() {
        let target = TargetConfig::new("a", "https://a.example").expect_content("Healthy");

        let miss = CheckResult::evaluate(&target, &outcome(200, "status: healthy", None), 10);
        assert_eq!(miss.content_ok, Verdict::Failed);
        assert!(!miss.succeeded);

        let hit = CheckResult::evaluate(&target, &outcome(200, "status: Healthy", None), 10);
        assert_eq!(hit.content_ok, Verdict::Passed);
        assert!(hit.succeeded);
    }

    #[test]
    fn status_mismatch_fails() {
        let target = TargetConfig::new("a", "https://a.example").expect_status(200);
        let result = CheckResult::evaluate(&target, &outcome(0, "", Some("dns error")), 10);

        assert_eq!(result.status_code_ok, Verdict::Failed);
        assert!(!result.succeeded);
        assert!(!result.skip);
        assert_eq!(result.timestamp_utc, 10);
    }

    #[test]
    fn verdict_column_mapping() {
        for verdict in [Verdict::Passed, Verdict::Failed, Verdict::NotApplicable] {
            assert_eq!(Verdict::from_column(verdict.as_column()), verdict);
        }
    }
}
