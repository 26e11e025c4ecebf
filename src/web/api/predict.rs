use axum::{extract::State, Json};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::events::Event;
use crate::predict::{build_time_series, filter_and_sort, window_stop, Pass, PropagationError, Sample};
use crate::web::api::error::{ApiError, ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct PassesRequest {
    /// Search terms; empty means the whole catalog.
    #[serde(default)]
    pub search: Vec<String>,
    /// Defaults to now.
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    /// Defaults to `start` plus the configured window.
    #[serde(default)]
    pub stop: Option<DateTime<Utc>>,
    #[serde(default)]
    pub step_minutes: Option<f64>,
    /// Minimum peak altitude in degrees.
    #[serde(default)]
    pub min_altitude: Option<f64>,
    /// Include every sample between rise and set.
    #[serde(default)]
    pub include_track: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PassView {
    pub name: String,
    pub catalog_number: u32,
    pub rise: Sample,
    pub peak: Sample,
    pub set: Sample,
    pub duration_s: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track: Option<Vec<Sample>>,
}

impl PassView {
    fn new(pass: &Pass, include_track: bool) -> Self {
        Self {
            name: pass.record.display_name().to_string(),
            catalog_number: pass.record.catalog_number(),
            rise: pass.rise(),
            peak: pass.peak,
            set: pass.set(),
            duration_s: pass.duration().num_seconds(),
            track: include_track.then(|| pass.track.clone()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FailureView {
    pub name: String,
    pub catalog_number: u32,
    pub reason: String,
}

impl From<&PropagationError> for FailureView {
    fn from(e: &PropagationError) -> Self {
        Self {
            name: e.name.clone(),
            catalog_number: e.catalog_number,
            reason: e.reason.clone(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PassesResponse {
    /// Sorted by peak time.
    pub passes: Vec<PassView>,
    pub failures: Vec<FailureView>,
    pub satellite_count: usize,
}

#[utoipa::path(
    post,
    path = "/api/passes",
    tag = "predict",
    request_body = PassesRequest,
    responses(
        (status = 200, description = "Pass predictions", body = PassesResponse),
        (status = 400, description = "Invalid time range", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 503, description = "Site not configured", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn compute_passes(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<PassesRequest>,
) -> ApiResult<Json<PassesResponse>> {
    require_permission(&user, Permission::View)?;

    let predict = &state.config.predict;
    let start = request.start.unwrap_or_else(Utc::now);
    let stop = match request.stop {
        Some(stop) => stop,
        None => {
            let window = Duration::from_std(predict.window)
                .map_err(|e| ApiError::Validation(format!("window: {e}")))?;
            window_stop(start, window)?
        }
    };
    let step = request.step_minutes.unwrap_or_else(|| predict.step_minutes());
    let min_altitude = request
        .min_altitude
        .unwrap_or(predict.default_min_elevation);

    let series = build_time_series(start, stop, step)?;
    let records = {
        let catalog = state.catalog.read().await;
        if request.search.is_empty() {
            catalog.search("")
        } else {
            catalog.search_any(&request.search)
        }
    };

    let finder = state.finder.clone();
    let report = tokio::task::spawn_blocking(move || {
        finder.compute_passes(&records, &series, min_altitude)
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    let passes = filter_and_sort(report.passes, min_altitude);
    let mut satellites: Vec<u32> = passes.iter().map(|p| p.record.catalog_number()).collect();
    satellites.sort_unstable();
    satellites.dedup();

    let response = PassesResponse {
        passes: passes
            .iter()
            .map(|p| PassView::new(p, request.include_track))
            .collect(),
        failures: report.failures.iter().map(FailureView::from).collect(),
        satellite_count: satellites.len(),
    };
    state.events.publish(Event::PassesComputed {
        passes,
        failures: report.failures,
    });
    Ok(Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::api::test_support::{loaded_state, user};
    use axum::{http::StatusCode, response::IntoResponse};

    #[tokio::test]
    async fn test_passes_sorted_by_peak() {
        let state = loaded_state().await;
        let Json(response) = compute_passes(
            State(state),
            user(&[Permission::View]),
            Json(PassesRequest {
                start: Some("2021-05-07T00:00:00Z".parse().unwrap()),
                stop: Some("2021-05-08T00:00:00Z".parse().unwrap()),
                step_minutes: Some(1.0),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert!(response.failures.is_empty());
        assert!(!response.passes.is_empty());
        assert_eq!(response.satellite_count, 1);
        for pair in response.passes.windows(2) {
            assert!(pair[0].peak.timestamp <= pair[1].peak.timestamp);
        }
        for pass in &response.passes {
            assert!(pass.rise.timestamp <= pass.peak.timestamp);
            assert!(pass.peak.timestamp <= pass.set.timestamp);
            assert!(pass.peak.altitude_deg > 0.0);
            assert!(pass.track.is_none());
        }
    }

    #[tokio::test]
    async fn test_reversed_window_rejected() {
        let state = loaded_state().await;
        let err = compute_passes(
            State(state),
            user(&[Permission::View]),
            Json(PassesRequest {
                start: Some("2021-05-08T00:00:00Z".parse().unwrap()),
                stop: Some("2021-05-07T00:00:00Z".parse().unwrap()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_overflowing_window_rejected() {
        let state = loaded_state().await;
        let err = compute_passes(
            State(state),
            user(&[Permission::View]),
            Json(PassesRequest {
                start: Some(DateTime::<Utc>::MAX_UTC - Duration::hours(1)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
