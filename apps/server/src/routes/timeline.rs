use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use vigil::status::Segment;
use vigil::TargetConfig;

use crate::error::AppError;
use crate::state::{AppState, Range};

#[derive(Debug, Serialize)]
pub struct TimelineBody {
    pub target: TargetConfig,
    pub range: Range,
    pub segments: Vec<Segment>,
}

/// Display segments of one target over the lookback window.
#[get("/targets/{id}/timeline")]
pub async fn timeline_route(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let target = state
        .targets
        .list_targets()?
        .into_iter()
        .find(|t| t.id == id)
        .ok_or(AppError::TargetNotFound(id))?;

    let now = chrono::Utc::now().timestamp();
    let results = state.store.query_target(&target.id, state.lookback_secs()).await?;
    let segments = state.timeline().segments(&results).collect();

    Ok(HttpResponse::Ok().json(TimelineBody { target, range: state.range(now), segments }))
}
