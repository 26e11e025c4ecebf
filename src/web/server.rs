use axum::{routing::delete, routing::get, routing::post, Router};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::catalog::ElementCatalog;
use crate::events::{Event, EventBus};
use crate::predict::PassFinder;
use crate::tracker::{ActuatorError, Axis, Mount, StatusMonitor, TrackingScheduler};

use super::api::catalog as catalog_handlers;
use super::api::mount as mount_handlers;
use super::api::predict as predict_handlers;
use super::api::queue as queue_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;
use super::config::{Config, ConfigError};

/// Wire the core together from configuration: load the configured element
/// files, place the site, and start the scheduler and status monitor.
/// Must be called inside a tokio runtime.
pub fn build_state(config: Config, mount: Arc<dyn Mount>) -> Result<AppState, ConfigError> {
    let events = EventBus::default();

    let mut catalog = ElementCatalog::new();
    for (i, path) in config.predict.tle_files.iter().enumerate() {
        match catalog.load_file(path, i > 0) {
            Ok(report) if !report.errors.is_empty() => log::warn!(
                "{}: {} malformed element groups skipped",
                path.display(),
                report.errors.len()
            ),
            Ok(_) => {}
            Err(e) => log::warn!("Failed to load {}: {}", path.display(), e),
        }
    }

    let site = config.station.site()?;
    let mut finder = PassFinder::new();
    finder.set_site(site.latitude_deg, site.longitude_deg, site.height_m)?;
    if let Some(name) = &config.station.name {
        log::info!("Station {}", name);
    }

    if config.mount.auto_connect {
        match bring_up(mount.as_ref()) {
            Ok(()) => log::info!("Mount connected"),
            Err(e) => log::warn!("Mount not ready: {}", e),
        }
    }

    let scheduler = TrackingScheduler::new(mount.clone(), events.clone());
    let monitor = StatusMonitor::start(mount, events.clone(), config.mount.poll_interval);

    events.publish(Event::CatalogUpdated {
        records: catalog.records().to_vec(),
    });

    Ok(AppState {
        config: Arc::new(config),
        catalog: Arc::new(RwLock::new(catalog)),
        finder: Arc::new(finder),
        scheduler,
        monitor: Arc::new(RwLock::new(monitor)),
        events,
    })
}

fn bring_up(mount: &dyn Mount) -> Result<(), ActuatorError> {
    mount.connect()?;
    mount.set_axis_enabled(Axis::Azimuth, true)?;
    mount.set_axis_enabled(Axis::Altitude, true)
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Catalog
        .route("/api/catalog", get(catalog_handlers::search_catalog))
        .route("/api/catalog", post(catalog_handlers::load_catalog))
        // Prediction
        .route("/api/passes", post(predict_handlers::compute_passes))
        // Waiting queue
        .route("/api/queue", get(queue_handlers::list_queue))
        .route("/api/queue", post(queue_handlers::schedule))
        .route("/api/queue/{id}", delete(queue_handlers::cancel))
        // Mount
        .route("/api/mount/status", get(mount_handlers::status))
        .route("/api/mount/follow", post(mount_handlers::follow))
        .route("/api/mount/goto_altaz", post(mount_handlers::goto_alt_az))
        .route("/api/mount/goto_radec", post(mount_handlers::goto_ra_dec))
        .route("/api/mount/stop", post(mount_handlers::stop))
        .route("/api/mount/connect", post(mount_handlers::connect))
        .route("/api/mount/disconnect", post(mount_handlers::disconnect))
        .route("/api/mount/axis", post(mount_handlers::set_axis))
        .route("/api/mount/park", post(mount_handlers::park))
        .route("/api/mount/home", post(mount_handlers::home))
        .route("/api/mount/tracking", post(mount_handlers::set_tracking))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, mount: Arc<dyn Mount>) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();
    let state = build_state(config, mount)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let scheduler = state.scheduler.clone();
    let monitor = state.monitor.clone();
    let app = router(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
            log::info!("Shutting down");
        })
        .await?;

    let dropped = scheduler.cancel_all();
    if dropped > 0 {
        log::warn!("{} waiting actions discarded at shutdown", dropped);
    }
    monitor.write().await.stop().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::DryRunMount;
    use crate::web::api::test_support::{test_state, CONFIG};

    #[tokio::test]
    async fn test_state_has_site_and_running_monitor() {
        let state = test_state();
        assert!(state.finder.site().is_some());
        assert!(state.catalog.read().await.is_empty());
        assert!(state.monitor.read().await.is_running());
        let _ = router(state);
    }

    #[tokio::test]
    async fn test_mount_brought_up_when_configured() {
        let status = test_state().scheduler.mount().status().unwrap();
        assert!(status.connected);
        assert!(status.azimuth_axis_enabled && status.altitude_axis_enabled);

        let mut config = Config::from_yaml(CONFIG).unwrap();
        config.mount.auto_connect = false;
        let state = build_state(config, Arc::new(DryRunMount::new())).unwrap();
        assert!(!state.scheduler.mount().status().unwrap().connected);
    }

    #[test]
    fn test_openapi_lists_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/catalog",
            "/api/passes",
            "/api/queue",
            "/api/queue/{id}",
            "/api/mount/status",
            "/api/mount/stop",
            "/api/mount/connect",
            "/api/mount/disconnect",
            "/api/mount/axis",
            "/api/mount/park",
            "/api/mount/home",
            "/api/mount/tracking",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
