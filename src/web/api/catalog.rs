use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::catalog::LoadSummary;
use crate::elements::{ElementRecord, RawElements};
use crate::events::Event;
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Comma-separated search terms; omitted or empty lists everything.
    #[serde(default)]
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoadQuery {
    /// Keep existing records instead of replacing the catalog.
    #[serde(default)]
    pub append: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecordView {
    pub name: String,
    pub catalog_number: u32,
    pub epoch: DateTime<Utc>,
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub mean_motion: f64,
    pub elements: RawElements,
}

impl From<&ElementRecord> for RecordView {
    fn from(record: &ElementRecord) -> Self {
        Self {
            name: record.display_name().to_string(),
            catalog_number: record.catalog_number(),
            epoch: record.epoch(),
            inclination_deg: record.inclination_deg(),
            eccentricity: record.eccentricity(),
            mean_motion: record.mean_motion(),
            elements: record.to_raw(),
        }
    }
}

pub(crate) fn split_terms(search: Option<&str>) -> Vec<String> {
    search
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/catalog",
    tag = "catalog",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching element sets in catalog order", body = Vec<RecordView>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn search_catalog(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<RecordView>>> {
    require_permission(&user, Permission::View)?;

    let terms = split_terms(query.search.as_deref());
    let catalog = state.catalog.read().await;
    let records = if terms.is_empty() {
        catalog.search("")
    } else {
        catalog.search_any(&terms)
    };
    Ok(Json(records.iter().map(|r| RecordView::from(&**r)).collect()))
}

#[utoipa::path(
    post,
    path = "/api/catalog",
    tag = "catalog",
    params(LoadQuery),
    request_body(content = String, content_type = "text/plain", description = "Three-line element sets"),
    responses(
        (status = 200, description = "Load summary; malformed groups are listed, not fatal", body = LoadSummary),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 403, description = "Forbidden", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn load_catalog(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<LoadQuery>,
    body: String,
) -> ApiResult<Json<LoadSummary>> {
    require_permission(&user, Permission::ManageCatalog)?;

    let mut catalog = state.catalog.write().await;
    let report = catalog.load_from_text(&body, query.append);
    log::info!(
        "{} loaded {} element sets (append={})",
        user.name,
        report.added,
        query.append
    );
    state.events.publish(Event::CatalogUpdated {
        records: catalog.records().to_vec(),
    });
    Ok(Json(report.summary(catalog.len())))
}
