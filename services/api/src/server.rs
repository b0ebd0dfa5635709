use crate::cli::ServeArgs;
use crate::infra::{register_institutions, seed_demo_campus, AppState, Services};
use crate::routes::with_api_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use campus_admin::config::AppConfig;
use campus_admin::error::AppError;
use campus_admin::telemetry;
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
    if args.seed_demo {
        config.seed_demo = true;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let services = Services::in_memory(&config.notifications);
    for institution in register_institutions(&services.catalog, &args.institutions)? {
        info!(
            institution = %institution.id,
            slug = %institution.slug,
            "institution registered; send its id as x-institution-id"
        );
    }
    if config.seed_demo {
        let campus = seed_demo_campus(&services.catalog)?;
        info!(
            institution = %campus.institution.id,
            admin = %campus.admin.user_id,
            students = campus.students.len(),
            subjects = campus.subjects.len(),
            "demo campus seeded"
        );
    }

    let app = with_api_routes(&services)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "campus admin service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
