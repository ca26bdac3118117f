use crate::cli::ServeArgs;
use crate::infra::{AppState, FlowService, InMemorySessionStore};
use crate::routes::flow_router;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use conformly::config::{AppConfig, AssessmentConfig};
use conformly::error::AppError;
use conformly::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let flow = Arc::new(FlowService::new(
        AssessmentConfig::standard(),
        config.assessment.clone(),
        Arc::new(InMemorySessionStore::default()),
    ));

    let app = flow_router(flow)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "compliance self-assessment service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
