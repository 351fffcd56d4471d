/// HTTP Server Module
///
/// Read-only endpoint over the indexed delegations.
use anyhow::Result;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::models::{ApiResponse, DelegationsResponse};
use crate::service::DelegationService;

#[derive(Clone)]
struct AppState {
    service: DelegationService,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    msg: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiErrorBody { msg: self.message })).into_response()
    }
}

pub fn router(service: DelegationService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/xtz/delegations", get(delegations))
        .with_state(AppState { service })
}

/// Serve on an already bound listener
pub async fn serve(listener: TcpListener, service: DelegationService, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    axum::serve(listener, router(service))
        .with_graceful_shutdown(async move {
            // a closed channel also means stop
            let _ = shutdown.wait_for(|stop| *stop).await;
            info!("HTTP API shutting down");
        })
        .await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse { data: "ok" })
}

async fn delegations(State(state): State<AppState>) -> Result<Json<DelegationsResponse>, ApiError> {
    match state.service.get_delegations().await {
        Ok(response) => Ok(Json(response)),
        Err(e) => {
            warn!(error = %e, "Failed to get delegations");
            Err(ApiError::internal("failed to get delegations"))
        }
    }
}
