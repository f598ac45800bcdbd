use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use tracing::debug;
use vigil::status::{Segment, StatusLevel, StatusReport, status_text};
use vigil::CheckResult;
use vigil::time::whole_secs;

use crate::error::AppError;
use crate::state::{AppState, Range};

#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub failed_checks: usize,
    pub stale_checks: usize,
    pub text: String,
    pub level: StatusLevel,
    pub range: Range,
    pub targets: Vec<TargetEntry>,
}

#[derive(Debug, Serialize)]
pub struct TargetEntry {
    pub id: String,
    pub url: String,
    pub is_reference: bool,
    pub failed: bool,
    /// No segment at all, or the latest one ended `stale_after` ago or more.
    pub stale: bool,
    pub latest: Option<Segment>,
    pub segments: Vec<Segment>,
}

/// Current status of every configured target, sorted by URL.
#[get("/status")]
pub async fn status_route(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let now = chrono::Utc::now().timestamp();
    let targets = state.targets.list_targets()?;
    let results = state.store.query_by_period(state.lookback_secs()).await?;
    let report = state.deriver().derive(&targets, &results, now);

    debug!(targets = targets.len(), results = results.len(), "serving status");
    Ok(HttpResponse::Ok().json(build_status(&state, report, &results, now)))
}

fn build_status(state: &AppState, report: StatusReport, results: &[CheckResult], now: i64) -> StatusBody {
    let timeline = state.timeline();
    let stale_after = whole_secs(state.monitoring.stale_after());

    let mut targets: Vec<TargetEntry> = report
        .targets
        .into_iter()
        .map(|target| {
            let segments = timeline.for_target(results, &target.target_id);
            let latest = segments.last().cloned();
            let stale = latest.as_ref().is_none_or(|s| now - s.end >= stale_after);
            TargetEntry {
                id: target.target_id,
                url: target.url,
                is_reference: target.is_reference,
                failed: target.failed,
                stale,
                latest,
                segments,
            }
        })
        .collect();
    targets.sort_by(|a, b| a.url.cmp(&b.url));

    let (failed, stale) = (Some(report.failed_checks), Some(report.stale_checks));
    StatusBody {
        failed_checks: report.failed_checks,
        stale_checks: report.stale_checks,
        text: status_text(failed, stale),
        level: StatusLevel::from_counts(failed, stale),
        range: state.range(now),
        targets,
    }
}

#[cfg(test)]
mod tests {
    use actix_web::{App, test};
    use serde_json::Value;

    use super::*;
    use crate::routes::test_support::{result, state};

    #[actix_web::test]
    async fn status_lists_monitored_targets_sorted_by_url() {
        let now = chrono::Utc::now().timestamp();
        let (state, _dir) = state(&[
            result(now - 60, "zeta", false),
            result(now - 60, "mid", true),
            result(now - 60, "alpha", false),
        ])
        .await;
        let app = test::init_service(
            App::new().app_data(state).configure(crate::routes::routes),
        )
        .await;

        let req = test::TestRequest::get().uri("/status").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;

        assert_eq!(body["failed_checks"], 1);
        assert_eq!(body["stale_checks"], 0);
        assert_eq!(body["text"], "1 failed");
        assert_eq!(body["level"], "error");

        let targets = body["targets"].as_array().unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0]["id"], "mid");
        assert_eq!(targets[1]["id"], "zeta");
        assert_eq!(targets[1]["failed"], true);
        assert_eq!(targets[1]["latest"]["message"], "unexpected status code");
        assert_eq!(targets[1]["latest"]["end"], now - 60);
        assert!(targets.iter().all(|t| t["id"] != "alpha"));
    }

    #[actix_web::test]
    async fn targets_without_results_are_stale() {
        let (state, _dir) = state(&[]).await;
        let now = 100_000;

        let body = build_status(&state, state.deriver().derive(&state.targets.list_targets().unwrap(), &[], now), &[], now);

        assert_eq!(body.stale_checks, 2);
        assert_eq!(body.targets.len(), 2);
        assert_eq!(body.text, "2 stale");
        assert_eq!(body.level, StatusLevel::Warning);
        assert!(body.targets.iter().all(|t| t.stale && t.latest.is_none()));
        assert_eq!(body.range, Range { begin: now - 86_400, end: now });
    }
}
