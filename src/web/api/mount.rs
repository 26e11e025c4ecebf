use axum::{extract::State, Json};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::elements::{ElementRecord, RawElements};
use crate::tracker::{Axis, Frame, MountStatus};
use crate::web::api::error::{ApiResult, ErrorResponse};
use crate::web::auth::{require_permission, AppState, AuthenticatedUser};
use crate::web::config::Permission;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AltAzRequest {
    pub altitude_deg: f64,
    pub azimuth_deg: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RaDecRequest {
    pub ra_hours: f64,
    pub dec_deg: f64,
    #[serde(default = "default_frame")]
    pub frame: Frame,
}

fn default_frame() -> Frame {
    Frame::J2000
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AxisRequest {
    pub axis: Axis,
    pub enabled: bool,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ParkRequest {
    /// Park at the current pointing instead of the park position.
    #[serde(default)]
    pub here: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TrackingRequest {
    pub enabled: bool,
}

#[utoipa::path(
    get,
    path = "/api/mount/status",
    tag = "mount",
    responses(
        (status = 200, description = "Last polled mount status, null before the first poll", body = Option<MountStatus>),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Option<MountStatus>>> {
    require_permission(&user, Permission::View)?;
    Ok(Json(state.monitor.read().await.latest()))
}

#[utoipa::path(
    post,
    path = "/api/mount/follow",
    tag = "mount",
    request_body = RawElements,
    responses(
        (status = 200, description = "Following", body = MountStatus),
        (status = 400, description = "Invalid elements", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn follow(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(raw): Json<RawElements>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let record = ElementRecord::try_from(raw)?;
    log::info!("{} requested follow of {}", user.name, record.display_name());
    let mount = state.scheduler.mount();
    mount.follow_elements(&record)?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/goto_altaz",
    tag = "mount",
    request_body = AltAzRequest,
    responses(
        (status = 200, description = "Slewing", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn goto_alt_az(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AltAzRequest>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let mount = state.scheduler.mount();
    mount.goto_alt_az(request.altitude_deg, request.azimuth_deg)?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/goto_radec",
    tag = "mount",
    request_body = RaDecRequest,
    responses(
        (status = 200, description = "Slewing", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn goto_ra_dec(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<RaDecRequest>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let mount = state.scheduler.mount();
    mount.goto_ra_dec(request.ra_hours, request.dec_deg, request.frame)?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/stop",
    tag = "mount",
    responses(
        (status = 200, description = "Stopped", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn stop(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    log::info!("{} stopped the mount", user.name);
    let mount = state.scheduler.mount();
    mount.stop()?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/connect",
    tag = "mount",
    responses(
        (status = 200, description = "Connected", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn connect(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    log::info!("{} connected the mount", user.name);
    let mount = state.scheduler.mount();
    mount.connect()?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/disconnect",
    tag = "mount",
    responses(
        (status = 200, description = "Disconnected", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn disconnect(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    log::info!("{} disconnected the mount", user.name);
    let mount = state.scheduler.mount();
    mount.disconnect()?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/axis",
    tag = "mount",
    request_body = AxisRequest,
    responses(
        (status = 200, description = "Axis switched", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn set_axis(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<AxisRequest>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let mount = state.scheduler.mount();
    mount.set_axis_enabled(request.axis, request.enabled)?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/park",
    tag = "mount",
    request_body = ParkRequest,
    responses(
        (status = 200, description = "Parked", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn park(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<ParkRequest>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    log::info!("{} parked the mount", user.name);
    let mount = state.scheduler.mount();
    mount.park(request.here)?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/home",
    tag = "mount",
    responses(
        (status = 200, description = "Homing", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn home(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let mount = state.scheduler.mount();
    mount.home()?;
    Ok(Json(mount.status()?))
}

#[utoipa::path(
    post,
    path = "/api/mount/tracking",
    tag = "mount",
    request_body = TrackingRequest,
    responses(
        (status = 200, description = "Tracking switched", body = MountStatus),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 502, description = "Mount error", body = ErrorResponse)
    ),
    security(("api_key" = []))
)]
pub async fn set_tracking(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<TrackingRequest>,
) -> ApiResult<Json<MountStatus>> {
    require_permission(&user, Permission::ControlMount)?;
    let mount = state.scheduler.mount();
    mount.set_tracking(request.enabled)?;
    Ok(Json(mount.status()?))
}
