use crate::cli::ServeArgs;
use crate::infra::{load_catalog, load_store, AppState};
use crate::routes::with_scholar_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scholar_directory::config::AppConfig;
use scholar_directory::error::AppError;
use scholar_directory::scholars::DirectoryService;
use scholar_directory::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data) = args.data.take() {
        config.directory.data_path = data;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let catalog = Arc::new(load_catalog(&config.directory)?);
    let store = Arc::new(load_store(&config.directory.data_path)?);
    let directory_service = Arc::new(DirectoryService::new(
        store,
        catalog,
        config.directory.filter_cache_ttl,
    ));

    let app = with_scholar_routes(directory_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scholar directory ready");

    axum::serve(listener, app).await?;
    Ok(())
}
