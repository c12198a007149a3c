//! Application state and router assembly.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use domain::services::{
    IncomeService, RequestLifecycleService, StatementIntakeService,
};
use persistence::repositories::RequestRepository;
use sqlx::PgPool;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, trace_id};
use crate::routes::{health, requests, statements};
use crate::services::{
    BenefitCaseClient, DialogClient, EmployerNotificationClient, IncomeSourceClient,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub lifecycle: Arc<RequestLifecycleService>,
    pub income: Arc<IncomeService>,
    pub intake: Arc<StatementIntakeService>,
}

pub fn create_app(config: Config, pool: PgPool) -> Router {
    let config = Arc::new(config);

    // Collaborator clients are built once and injected; no process-wide
    // singletons.
    let notifications = Arc::new(EmployerNotificationClient::new(
        config.employer_notification.clone(),
    ));
    let dialogs = Arc::new(DialogClient::new(config.dialog.clone()));
    let income_source = Arc::new(IncomeSourceClient::new(config.income_source.clone()));
    let case_lookup = Arc::new(BenefitCaseClient::new(config.benefit_case.clone()));

    let store = Arc::new(RequestRepository::new(pool.clone()));
    let lifecycle = Arc::new(RequestLifecycleService::new(
        store,
        notifications,
        dialogs,
        config.lifecycle_config(),
    ));
    let income = Arc::new(IncomeService::new(income_source));
    let intake = Arc::new(StatementIntakeService::new(lifecycle.clone(), case_lookup));

    let state = AppState {
        pool,
        config: config.clone(),
        lifecycle,
        income,
        intake,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Case-system facing lifecycle operations
        .route("/api/v1/requests", post(requests::create_request))
        .route("/api/v1/requests/close", post(requests::close_requests))
        .route("/api/v1/requests/expire", post(requests::expire_requests))
        .route("/api/v1/requests/delete", post(requests::delete_request))
        .route("/api/v1/requests/reminder", post(requests::send_reminder))
        // Employer-form facing operations
        .route("/api/v1/statements/income", get(statements::income_summary))
        .route("/api/v1/statements", post(statements::submit_statement))
        // Operational endpoints
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/metrics", get(metrics_handler))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(trace_id))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(cors)
        .with_state(state)
}
