//! Health check endpoint

use std::collections::HashMap;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::{
    context::AppContext,
    models::{HealthCheckResult, HealthResponse, HealthStatus},
};

/// Health check endpoint
///
/// Probes the database and reports per-dependency results. Responds 503
/// when any dependency is unhealthy so load balancers can rotate the
/// instance out.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    operation_id = "health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthResponse),
        (status = 503, description = "One or more dependencies unhealthy", body = HealthResponse)
    )
)]
pub async fn health(State(ctx): State<AppContext>) -> impl IntoResponse {
    let mut checks = HashMap::new();

    let db_start = std::time::Instant::now();
    let db_check = match ctx.repositories.health_check().await {
        Ok(()) => HealthCheckResult {
            status: HealthStatus::Healthy,
            message: None,
            duration_ms: db_start.elapsed().as_millis() as u64,
        },
        Err(e) => HealthCheckResult {
            status: HealthStatus::Unhealthy,
            message: Some(format!("Database check failed: {e}")),
            duration_ms: db_start.elapsed().as_millis() as u64,
        },
    };
    checks.insert("database".to_string(), db_check);

    let response = HealthResponse::from_checks(checks);
    let status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response))
}
