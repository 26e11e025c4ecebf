use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::elements::{ElementRecord, RawElements};
use crate::tracker::{ActionId, ScheduleOutcome, WaitingAction};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Serialize, ToSchema)]
pub struct WaitingView {
    pub id: ActionId,
    pub name: String,
    pub catalog_number: u32,
    pub trigger_at: DateTime<Utc>,
    pub display_stop: DateTime<Utc>,
}

impl From<&WaitingAction> for WaitingView {
    fn from(action: &WaitingAction) -> Self {
        Self {
            id: action.id,
            name: action.record.display_name().to_string(),
            catalog_number: action.record.catalog_number(),
            trigger_at: action.trigger_at,
            display_stop: action.display_stop,
        }
    }
}

/// Follow either a catalog entry, by its exact name, or inline elements.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ScheduleRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub elements: Option<RawElements>,
    pub trigger_at: DateTime<Utc>,
    pub display_stop: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ScheduleResponse {
    Queued { id: ActionId },
    FollowingNow,
}

impl From<ScheduleOutcome> for ScheduleResponse {
    fn from(outcome: ScheduleOutcome) -> Self {
        match outcome {
            ScheduleOutcome::Queued(id) => ScheduleResponse::Queued { id },
            ScheduleOutcome::FollowingNow => ScheduleResponse::FollowingNow,
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/queue",
    tag = "queue",
    responses(
        (status = 200, description = "Waiting actions sorted by trigger time", body = Vec<WaitingView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn list_queue(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<WaitingView>>> {
    require_permission(&user, Permission::View)?;
    Ok(Json(
        state.scheduler.queue().iter().map(WaitingView::from).collect(),
    ))
}

#[utoipa::path(
    post,
    path = "/api/queue",
    tag = "queue",
    request_body = ScheduleRequest,
    responses(
        (status = 200, description = "Queued, or following straight away", body = ScheduleResponse),
        (status = 400, description = "Invalid elements or pass already over", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "No catalog entry with that name", body = ErrorResponse),
        (status = 502, description = "Mount rejected the immediate follow", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn schedule(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ScheduleRequest>,
) -> ApiResult<Json<ScheduleResponse>> {
    require_permission(&user, Permission::ControlMount)?;

    let record = match (request.elements, request.name) {
        (Some(raw), _) => Arc::new(ElementRecord::try_from(raw)?),
        (None, Some(name)) => state
            .catalog
            .read()
            .await
            .get(&name)
            .ok_or(ApiError::NotFound("record_not_found"))?,
        (None, None) => {
            return Err(ApiError::Validation(
                "either name or elements is required".into(),
            ))
        }
    };

    log::info!("{} scheduled {}", user.name, record.display_name());
    let outcome = state
        .scheduler
        .schedule_follow(record, request.trigger_at, request.display_stop)?;
    Ok(Json(outcome.into()))
}

#[utoipa::path(
    delete,
    path = "/api/queue/{id}",
    tag = "queue",
    params(("id" = String, Path, description = "Action id")),
    responses(
        (status = 204, description = "Cancelled before firing"),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "Unknown, already fired or already cancelled", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<ActionId>,
) -> ApiResult<StatusCode> {
    require_permission(&user, Permission::ControlMount)?;
    if state.scheduler.cancel(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("action_not_found"))
    }
}
