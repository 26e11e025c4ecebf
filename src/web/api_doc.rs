use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use super::api::catalog::RecordView;
use super::api::error::ErrorResponse;
use super::api::mount::{AltAzRequest, AxisRequest, ParkRequest, RaDecRequest, TrackingRequest};
use super::api::predict::{FailureView, PassView, PassesRequest, PassesResponse};
use super::api::queue::{ScheduleRequest, ScheduleResponse, WaitingView};

#[derive(OpenApi)]
#[openapi(
    paths(
        super::api::catalog::search_catalog,
        super::api::catalog::load_catalog,
        super::api::predict::compute_passes,
        super::api::queue::list_queue,
        super::api::queue::schedule,
        super::api::queue::cancel,
        super::api::mount::status,
        super::api::mount::follow,
        super::api::mount::goto_alt_az,
        super::api::mount::goto_ra_dec,
        super::api::mount::stop,
        super::api::mount::connect,
        super::api::mount::disconnect,
        super::api::mount::set_axis,
        super::api::mount::park,
        super::api::mount::home,
        super::api::mount::set_tracking,
    ),
    components(
        schemas(
            RecordView,
            PassesRequest,
            PassesResponse,
            PassView,
            FailureView,
            WaitingView,
            ScheduleRequest,
            ScheduleResponse,
            AltAzRequest,
            RaDecRequest,
            AxisRequest,
            ParkRequest,
            TrackingRequest,
            ErrorResponse,
            crate::catalog::LoadSummary,
            crate::elements::RawElements,
            crate::predict::Sample,
            crate::tracker::ActionId,
            crate::tracker::Axis,
            crate::tracker::Frame,
            crate::tracker::MountActivity,
            crate::tracker::MountStatus,
        )
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Track-O-Mat API",
        description = "Satellite pass prediction and tracking mount scheduling",
        version = "0.1.0"
    ),
    tags(
        (name = "catalog", description = "Orbital element catalog"),
        (name = "predict", description = "Pass prediction"),
        (name = "queue", description = "Waiting list of scheduled follows"),
        (name = "mount", description = "Direct mount control and status")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}
